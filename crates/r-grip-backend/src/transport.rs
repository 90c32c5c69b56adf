//! ---
//! grip_section: "02-backend-interface"
//! grip_subsection: "module"
//! grip_type: "source"
//! grip_scope: "code"
//! grip_description: "Transport endpoints used to reach a simulation backend."
//! grip_version: "v0.0.0-prealpha"
//! grip_owner: "tbd"
//! ---
use std::fmt;

use r_grip_common::config::BackendConfig;
use r_grip_common::TransportMode;

use crate::{BackendError, Result};

/// Default port of a UDP simulation server.
pub const DEFAULT_UDP_PORT: u16 = 1234;
/// Default port of a TCP simulation server.
pub const DEFAULT_TCP_PORT: u16 = 6667;

/// Fully described transport: the mode plus, for network modes, where to reach the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEndpoint {
    /// Transport mode.
    pub mode: TransportMode,
    /// Server host for network modes.
    pub host: Option<String>,
    /// Server port for network modes.
    pub port: Option<u16>,
}

impl TransportEndpoint {
    /// Endpoint for a local (non-network) transport.
    pub fn local(mode: TransportMode) -> Self {
        Self {
            mode,
            host: None,
            port: None,
        }
    }

    /// Endpoint for a network transport.
    pub fn network(mode: TransportMode, host: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            mode,
            host: Some(host.into()),
            port,
        }
    }

    /// Endpoint for the configured preferred transport.
    pub fn preferred(config: &BackendConfig) -> Self {
        Self::from_config(config.preferred_transport, config)
    }

    /// Endpoint for the configured fallback transport.
    pub fn fallback(config: &BackendConfig) -> Self {
        Self::from_config(config.fallback_transport, config)
    }

    fn from_config(mode: TransportMode, config: &BackendConfig) -> Self {
        if mode.is_network() {
            Self {
                mode,
                host: config.host.clone(),
                port: config.port,
            }
        } else {
            Self::local(mode)
        }
    }

    /// Port to use, falling back to the mode's default for network transports.
    pub fn effective_port(&self) -> Option<u16> {
        match self.mode {
            TransportMode::Udp => Some(self.port.unwrap_or(DEFAULT_UDP_PORT)),
            TransportMode::Tcp => Some(self.port.unwrap_or(DEFAULT_TCP_PORT)),
            _ => None,
        }
    }

    /// Check that network transports carry a host.
    pub fn validate(&self) -> Result<()> {
        if self.mode.is_network() {
            match self.host.as_deref() {
                Some(host) if !host.trim().is_empty() => {}
                _ => {
                    return Err(BackendError::InvalidArgument(format!(
                        "transport {} requires a host",
                        self.mode
                    )))
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for TransportEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.host, self.effective_port()) {
            (Some(host), Some(port)) => write!(f, "{}://{}:{}", self.mode, host, port),
            _ => write!(f, "{}", self.mode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_endpoints_follow_backend_section() {
        let mut config = BackendConfig::default();
        assert_eq!(
            TransportEndpoint::preferred(&config),
            TransportEndpoint::local(TransportMode::SharedMemory)
        );
        assert_eq!(
            TransportEndpoint::fallback(&config),
            TransportEndpoint::local(TransportMode::Gui)
        );

        config.preferred_transport = TransportMode::Udp;
        config.host = Some("192.168.86.100".into());
        let endpoint = TransportEndpoint::preferred(&config);
        assert_eq!(endpoint.host.as_deref(), Some("192.168.86.100"));
        assert_eq!(endpoint.effective_port(), Some(DEFAULT_UDP_PORT));
        assert_eq!(endpoint.to_string(), "udp://192.168.86.100:1234");
    }

    #[test]
    fn local_endpoints_ignore_host() {
        let mut config = BackendConfig::default();
        config.host = Some("example.invalid".into());
        let endpoint = TransportEndpoint::preferred(&config);
        assert_eq!(endpoint.host, None);
        assert_eq!(endpoint.to_string(), "shared-memory");
    }

    #[test]
    fn network_endpoint_without_host_is_invalid() {
        let endpoint = TransportEndpoint::local(TransportMode::Tcp);
        assert!(endpoint.validate().is_err());
        let endpoint = TransportEndpoint::network(TransportMode::Tcp, "localhost", Some(7000));
        assert!(endpoint.validate().is_ok());
        assert_eq!(endpoint.to_string(), "tcp://localhost:7000");
    }
}
