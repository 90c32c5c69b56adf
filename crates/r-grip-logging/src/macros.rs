//! ---
//! grip_section: "03-logging"
//! grip_subsection: "module"
//! grip_type: "source"
//! grip_scope: "code"
//! grip_description: "Structured logging adapters and sinks."
//! grip_version: "v0.0.0-prealpha"
//! grip_owner: "tbd"
//! ---
/// Emit an informational log enriched with harness context.
#[macro_export]
macro_rules! grip_info {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::INFO,
            model = ctx.model.unwrap_or(""),
            transport = ctx.transport.unwrap_or(""),
            joint = ctx.joint.map(|j| j as i64).unwrap_or(-1),
            cycle = ctx.cycle.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::grip_info!(context = $crate::LogContext::default(), $($arg)+)
    }};
}

/// Emit a debug log enriched with harness context.
#[macro_export]
macro_rules! grip_debug {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::DEBUG,
            model = ctx.model.unwrap_or(""),
            transport = ctx.transport.unwrap_or(""),
            joint = ctx.joint.map(|j| j as i64).unwrap_or(-1),
            cycle = ctx.cycle.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::grip_debug!(context = $crate::LogContext::default(), $($arg)+)
    }};
}

/// Emit a warning enriched with harness context.
#[macro_export]
macro_rules! grip_warn {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::WARN,
            model = ctx.model.unwrap_or(""),
            transport = ctx.transport.unwrap_or(""),
            joint = ctx.joint.map(|j| j as i64).unwrap_or(-1),
            cycle = ctx.cycle.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::grip_warn!(context = $crate::LogContext::default(), $($arg)+)
    }};
}

/// Emit an error log enriched with harness context.
#[macro_export]
macro_rules! grip_error {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::ERROR,
            model = ctx.model.unwrap_or(""),
            transport = ctx.transport.unwrap_or(""),
            joint = ctx.joint.map(|j| j as i64).unwrap_or(-1),
            cycle = ctx.cycle.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::grip_error!(context = $crate::LogContext::default(), $($arg)+)
    }};
}
