//! ---
//! grip_section: "02-backend-interface"
//! grip_subsection: "module"
//! grip_type: "source"
//! grip_scope: "code"
//! grip_description: "Simulation backend API surface and transport plumbing."
//! grip_version: "v0.0.0-prealpha"
//! grip_owner: "tbd"
//! ---
use std::path::Path;

use r_grip_common::TransportMode;

use crate::transport::TransportEndpoint;
use crate::types::{BodyId, ConstraintId, FixedConstraintRequest, LoadBodyRequest, MotorCommand, Vec3};
use crate::Result;

/// Operations the harness issues against a connected simulator.
///
/// Every call is a synchronous round trip. Implementations validate typed
/// requests before acting on them and return [`crate::BackendError::NotConnected`]
/// once the connection has been closed.
pub trait SimulationBackend: Send {
    /// Transport the connection was established over.
    fn transport(&self) -> TransportMode;
    /// Whether the simulator is still reachable.
    fn is_connected(&self) -> bool;
    /// Set the root used to resolve descriptors in later loads.
    fn set_asset_search_path(&mut self, path: &Path) -> Result<()>;
    /// Remove all bodies and constraints from the world.
    fn reset_world(&mut self) -> Result<()>;
    /// Toggle visualization.
    fn set_rendering_enabled(&mut self, enabled: bool) -> Result<()>;
    /// Instantiate an articulated body.
    fn load_articulated_body(&mut self, request: &LoadBodyRequest) -> Result<BodyId>;
    /// Number of joints exposed by a body.
    fn joint_count(&self, body: BodyId) -> Result<usize>;
    /// Reset a joint to a position, bypassing dynamics.
    fn set_joint_state(&mut self, body: BodyId, joint_index: usize, position: f64) -> Result<()>;
    /// Create a fixed constraint.
    fn create_fixed_constraint(&mut self, request: &FixedConstraintRequest) -> Result<ConstraintId>;
    /// Hand a motor target to the simulator's joint controller.
    fn set_joint_motor_target(&mut self, body: BodyId, command: &MotorCommand) -> Result<()>;
    /// Set the world gravity vector.
    fn set_gravity(&mut self, gravity: Vec3) -> Result<()>;
    /// Switch between manual stepping and real-time integration.
    fn set_real_time_mode(&mut self, enabled: bool) -> Result<()>;
    /// Close the connection.
    fn disconnect(&mut self) -> Result<()>;
}

/// Factory for backend connections.
pub trait BackendConnector {
    /// Open a connection over the given endpoint.
    fn connect(&self, endpoint: &TransportEndpoint) -> Result<Box<dyn SimulationBackend>>;
}
