//! ---
//! grip_section: "04-harness"
//! grip_subsection: "module"
//! grip_type: "source"
//! grip_scope: "code"
//! grip_description: "Lifecycle states of the simulation harness."
//! grip_version: "v0.0.0-prealpha"
//! grip_owner: "tbd"
//! ---
use std::fmt;

/// Step within the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// Waiting for the operator to request a close.
    WaitClose,
    /// Sending close targets.
    ActuateClose,
    /// Waiting for the operator to request an open.
    WaitOpen,
    /// Sending open targets.
    ActuateOpen,
}

impl LoopPhase {
    /// Phase entered after this one.
    pub fn next(self) -> Self {
        match self {
            LoopPhase::WaitClose => LoopPhase::ActuateClose,
            LoopPhase::ActuateClose => LoopPhase::WaitOpen,
            LoopPhase::WaitOpen => LoopPhase::ActuateOpen,
            LoopPhase::ActuateOpen => LoopPhase::WaitClose,
        }
    }

    /// Stable name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopPhase::WaitClose => "wait-close",
            LoopPhase::ActuateClose => "actuate-close",
            LoopPhase::WaitOpen => "wait-open",
            LoopPhase::ActuateOpen => "actuate-open",
        }
    }
}

/// Lifecycle of a [`crate::SimulationHarness`].
///
/// `Disconnected -> Connected -> SceneReady -> ModelLoaded -> Anchored -> Looping -> Disconnected`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessState {
    /// No backend connection.
    Disconnected,
    /// Connected, scene not yet reset.
    Connected,
    /// World reset and ready for a model.
    SceneReady,
    /// Model loaded, joints may be initialised.
    ModelLoaded,
    /// Model fixed to the world, ready to loop.
    Anchored,
    /// Control loop running in the given phase.
    Looping(LoopPhase),
}

impl HarnessState {
    /// Stable name used in logs, without the loop phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            HarnessState::Disconnected => "disconnected",
            HarnessState::Connected => "connected",
            HarnessState::SceneReady => "scene-ready",
            HarnessState::ModelLoaded => "model-loaded",
            HarnessState::Anchored => "anchored",
            HarnessState::Looping(_) => "looping",
        }
    }

    /// Whether the control loop owns the backend.
    pub fn is_looping(&self) -> bool {
        matches!(self, HarnessState::Looping(_))
    }
}

impl fmt::Display for HarnessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarnessState::Looping(phase) => write!(f, "looping({})", phase.as_str()),
            other => f.write_str(other.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_phases_cycle() {
        let mut phase = LoopPhase::WaitClose;
        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(phase);
            phase = phase.next();
        }
        assert_eq!(
            seen,
            vec![
                LoopPhase::WaitClose,
                LoopPhase::ActuateClose,
                LoopPhase::WaitOpen,
                LoopPhase::ActuateOpen,
                LoopPhase::WaitClose,
            ]
        );
    }

    #[test]
    fn display_names_the_phase() {
        assert_eq!(HarnessState::Anchored.to_string(), "anchored");
        assert_eq!(
            HarnessState::Looping(LoopPhase::WaitOpen).to_string(),
            "looping(wait-open)"
        );
    }
}
