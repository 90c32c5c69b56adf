//! ---
//! grip_section: "04-harness"
//! grip_subsection: "module"
//! grip_type: "source"
//! grip_scope: "code"
//! grip_description: "Error taxonomy for harness setup and control."
//! grip_version: "v0.0.0-prealpha"
//! grip_owner: "tbd"
//! ---
use r_grip_backend::BackendError;
use r_grip_common::TransportMode;
use thiserror::Error;

use crate::state::HarnessState;

/// Result alias used across the harness.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Failures surfaced by [`crate::SimulationHarness`].
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Neither the preferred nor the fallback transport connected.
    #[error(
        "no simulation backend available: {preferred} failed ({preferred_error}); {fallback} failed ({fallback_error})"
    )]
    BackendUnavailable {
        /// Transport attempted first.
        preferred: TransportMode,
        /// Transport attempted second.
        fallback: TransportMode,
        /// Failure of the first attempt.
        preferred_error: BackendError,
        /// Failure of the second attempt.
        fallback_error: BackendError,
    },
    /// The model descriptor could not be loaded.
    #[error("failed to load model '{descriptor}': {source}")]
    ModelLoad {
        /// Descriptor as configured.
        descriptor: String,
        /// Backend failure.
        #[source]
        source: BackendError,
    },
    /// Fewer initial joint positions than joints on the model.
    #[error("{supplied} initial joint positions supplied but the model has {required} joints")]
    JointIndexMismatch {
        /// Number of positions supplied.
        supplied: usize,
        /// Joint count of the model.
        required: usize,
    },
    /// The model's joint count differs from what the gripper profile was written against.
    #[error("model exposes {actual} joints but the gripper profile expects {expected}")]
    UnexpectedJointCount {
        /// Joint count declared by the profile.
        expected: usize,
        /// Joint count reported by the backend.
        actual: usize,
    },
    /// A motor command was not accepted.
    #[error("actuation of joint {joint_index} failed: {source}")]
    ActuationFailure {
        /// Joint the command targeted.
        joint_index: usize,
        /// Backend failure.
        #[source]
        source: BackendError,
    },
    /// An operation was invoked in the wrong lifecycle state.
    #[error("invalid state: expected {expected}, found {actual}")]
    InvalidState {
        /// State the operation requires.
        expected: HarnessState,
        /// State the harness was in.
        actual: HarnessState,
    },
    /// Any other backend failure.
    #[error(transparent)]
    Backend(#[from] BackendError),
}
