//! ---
//! grip_section: "02-backend-interface"
//! grip_subsection: "module"
//! grip_type: "source"
//! grip_scope: "code"
//! grip_description: "Simulation backend API surface and transport plumbing."
//! grip_version: "v0.0.0-prealpha"
//! grip_owner: "tbd"
//! ---
//! Client-side view of the external physics simulator.
//!
//! The harness never talks to a simulator directly; it goes through the
//! [`SimulationBackend`] trait, whose operations take the strongly typed
//! requests from [`types`]. Connections are produced by a
//! [`BackendConnector`] for a given [`TransportEndpoint`]. The
//! [`in_process`] module provides a deterministic simulator used by the CLI
//! demo and by tests.
#![warn(missing_docs)]

pub mod backend;
pub mod in_process;
pub mod transport;
pub mod types;

use r_grip_common::TransportMode;

/// Shared result type for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Failures reported by a simulation backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    /// The backend refused the requested transport.
    #[error("transport {transport} rejected: {reason}")]
    TransportRejected {
        /// Transport that was attempted.
        transport: TransportMode,
        /// Backend supplied reason.
        reason: String,
    },
    /// The connection has been closed by either side.
    #[error("backend connection is not open")]
    NotConnected,
    /// The descriptor could not be resolved under the configured search path.
    #[error("descriptor '{descriptor}' not found (searched: {searched})")]
    DescriptorNotFound {
        /// Descriptor as supplied by the caller.
        descriptor: String,
        /// Locations that were inspected.
        searched: String,
    },
    /// The descriptor resolved on disk but the simulator cannot instantiate it.
    #[error("descriptor '{0}' is not a model this simulator can instantiate")]
    UnknownModel(String),
    /// The body id does not refer to a live body.
    #[error("unknown body {0}")]
    UnknownBody(types::BodyId),
    /// The joint index exceeds the body's joint count.
    #[error("joint {joint_index} out of range for {body} ({joint_count} joints)")]
    JointOutOfRange {
        /// Body addressed by the call.
        body: types::BodyId,
        /// Offending joint index.
        joint_index: usize,
        /// Number of joints the body exposes.
        joint_count: usize,
    },
    /// A request failed validation at the call boundary.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The backend rejected a motor command.
    #[error("motor command rejected: {0}")]
    CommandRejected(String),
}

pub use backend::{BackendConnector, SimulationBackend};
pub use in_process::{BackendCall, InProcessBackend, InProcessConnector, SimulatorProbe};
pub use transport::TransportEndpoint;
pub use types::{
    BodyId, ConstraintEndpoint, ConstraintId, ConstraintJointType, ControlMode,
    FixedConstraintRequest, LinkIndex, LoadBodyRequest, MotorCommand, Quaternion, Vec3,
};
