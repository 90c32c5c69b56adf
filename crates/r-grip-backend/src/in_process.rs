//! ---
//! grip_section: "02-backend-interface"
//! grip_subsection: "module"
//! grip_type: "source"
//! grip_scope: "code"
//! grip_description: "Deterministic in-process simulator implementing the backend API."
//! grip_version: "v0.0.0-prealpha"
//! grip_owner: "tbd"
//! ---
//! Deterministic stand-in for the external simulator.
//!
//! The in-process simulator performs no integration. It resolves
//! descriptors against the search path on disk, takes joint counts from the
//! model catalog, and stores every piece of state the harness can set so
//! that a [`SimulatorProbe`] can inspect it afterwards. Every accepted call
//! is appended to a call log that keeps the most recent entries up to a
//! fixed capacity.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use r_grip_common::{AppConfig, CatalogEntry, ModelCatalog, TransportMode};
use tracing::{debug, info, warn};

use crate::backend::{BackendConnector, SimulationBackend};
use crate::transport::TransportEndpoint;
use crate::types::{
    ensure_finite, BodyId, ConstraintEndpoint, ConstraintId, FixedConstraintRequest, LinkIndex,
    LoadBodyRequest, MotorCommand, Quaternion, Vec3,
};
use crate::{BackendError, Result};

/// Call log capacity used by [`InProcessConnector::new`].
pub const DEFAULT_CALL_LOG_CAPACITY: usize = 4096;

/// A call accepted by the in-process simulator.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    /// A client connected over the given transport.
    Connect(TransportMode),
    /// The asset search path was replaced.
    SetAssetSearchPath(PathBuf),
    /// The world was cleared.
    ResetWorld,
    /// Rendering was toggled.
    SetRenderingEnabled(bool),
    /// A body was instantiated.
    LoadArticulatedBody {
        /// Request as received.
        request: LoadBodyRequest,
        /// Handle returned to the caller.
        body: BodyId,
    },
    /// A joint was reset to a position.
    SetJointState {
        /// Body addressed.
        body: BodyId,
        /// Joint addressed.
        joint_index: usize,
        /// Position written.
        position: f64,
    },
    /// A constraint was created.
    CreateFixedConstraint {
        /// Request as received.
        request: FixedConstraintRequest,
        /// Handle returned to the caller.
        constraint: ConstraintId,
    },
    /// A motor target was accepted.
    SetJointMotorTarget {
        /// Body addressed.
        body: BodyId,
        /// Command as received.
        command: MotorCommand,
    },
    /// Gravity was changed.
    SetGravity(Vec3),
    /// Real-time integration was toggled.
    SetRealTimeMode(bool),
    /// The client disconnected.
    Disconnect,
}

#[derive(Debug, Clone)]
struct BodyState {
    descriptor: String,
    resolved_path: PathBuf,
    position: Vec3,
    orientation: Quaternion,
    joint_positions: Vec<f64>,
    motor_targets: Vec<Option<MotorCommand>>,
}

#[derive(Debug)]
struct SimulatorState {
    connected: Option<TransportMode>,
    session: u64,
    search_path: Option<PathBuf>,
    rendering_enabled: bool,
    real_time: bool,
    gravity: Vec3,
    next_body: u32,
    next_constraint: u32,
    bodies: IndexMap<BodyId, BodyState>,
    constraints: IndexMap<ConstraintId, FixedConstraintRequest>,
    calls: VecDeque<BackendCall>,
    call_log_capacity: usize,
    reject_motor_commands: bool,
    motor_commands_before_disconnect: Option<usize>,
}

impl Default for SimulatorState {
    fn default() -> Self {
        Self {
            connected: None,
            session: 0,
            search_path: None,
            rendering_enabled: true,
            real_time: false,
            gravity: [0.0; 3],
            next_body: 0,
            next_constraint: 0,
            bodies: IndexMap::new(),
            constraints: IndexMap::new(),
            calls: VecDeque::new(),
            call_log_capacity: DEFAULT_CALL_LOG_CAPACITY,
            reject_motor_commands: false,
            motor_commands_before_disconnect: None,
        }
    }
}

impl SimulatorState {
    /// Start a fresh session. The call log and fault injection survive.
    fn begin_session(&mut self, transport: TransportMode) -> u64 {
        self.session += 1;
        self.connected = Some(transport);
        self.search_path = None;
        self.rendering_enabled = true;
        self.clear_world();
        self.record(BackendCall::Connect(transport));
        self.session
    }

    /// Append to the call log, evicting the oldest entries beyond capacity.
    fn record(&mut self, call: BackendCall) {
        while self.calls.len() >= self.call_log_capacity {
            self.calls.pop_front();
        }
        self.calls.push_back(call);
    }

    fn clear_world(&mut self) {
        self.real_time = false;
        self.gravity = [0.0; 3];
        self.next_body = 0;
        self.next_constraint = 0;
        self.bodies.clear();
        self.constraints.clear();
    }

    fn is_current(&self, session: u64) -> bool {
        self.connected.is_some() && self.session == session
    }

    fn ensure_session(&self, session: u64) -> Result<()> {
        if self.is_current(session) {
            Ok(())
        } else {
            Err(BackendError::NotConnected)
        }
    }

    fn body(&self, body: BodyId) -> Result<&BodyState> {
        self.bodies.get(&body).ok_or(BackendError::UnknownBody(body))
    }

    fn body_mut(&mut self, body: BodyId) -> Result<&mut BodyState> {
        self.bodies.get_mut(&body).ok_or(BackendError::UnknownBody(body))
    }

    fn ensure_joint(&self, body: BodyId, joint_index: usize) -> Result<()> {
        let joint_count = self.body(body)?.joint_positions.len();
        if joint_index >= joint_count {
            return Err(BackendError::JointOutOfRange {
                body,
                joint_index,
                joint_count,
            });
        }
        Ok(())
    }

    fn ensure_endpoint(&self, endpoint: &ConstraintEndpoint) -> Result<()> {
        match endpoint {
            ConstraintEndpoint::World => Ok(()),
            ConstraintEndpoint::Body { body, link } => {
                let joint_count = self.body(*body)?.joint_positions.len();
                match link {
                    LinkIndex::Base => Ok(()),
                    LinkIndex::Link(index) if *index < joint_count => Ok(()),
                    LinkIndex::Link(index) => Err(BackendError::InvalidArgument(format!(
                        "link {} out of range for {} ({} links)",
                        index, body, joint_count
                    ))),
                }
            }
        }
    }
}

/// Connector for the in-process simulator.
///
/// Connectors are cheap to clone; clones share the same simulator, so a
/// [`SimulatorProbe`] obtained from any of them observes every connection.
#[derive(Debug, Clone)]
pub struct InProcessConnector {
    accepted_transports: Vec<TransportMode>,
    catalog: Arc<ModelCatalog>,
    state: Arc<Mutex<SimulatorState>>,
}

impl InProcessConnector {
    /// Create a simulator accepting the given transports and instantiating the given models.
    pub fn new(
        accepted_transports: impl IntoIterator<Item = TransportMode>,
        catalog: ModelCatalog,
    ) -> Self {
        Self {
            accepted_transports: accepted_transports.into_iter().collect(),
            catalog: Arc::new(catalog),
            state: Arc::new(Mutex::new(SimulatorState::default())),
        }
    }

    /// Create a simulator from the `[backend]` and `[catalog]` configuration sections.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.backend.in_process_transports.iter().copied(),
            config.catalog.clone(),
        )
        .with_call_log_capacity(config.backend.call_log_capacity)
    }

    /// Keep at most `capacity` entries in the call log. Zero is treated as one.
    pub fn with_call_log_capacity(self, capacity: usize) -> Self {
        {
            let mut state = self.state.lock();
            state.call_log_capacity = capacity.max(1);
            while state.calls.len() > state.call_log_capacity {
                state.calls.pop_front();
            }
        }
        self
    }

    /// Transports this simulator accepts.
    pub fn accepted_transports(&self) -> &[TransportMode] {
        &self.accepted_transports
    }

    /// Inspection handle onto the shared simulator state.
    pub fn probe(&self) -> SimulatorProbe {
        SimulatorProbe {
            state: Arc::clone(&self.state),
        }
    }
}

fn rejection_reason(endpoint: &TransportEndpoint) -> String {
    match endpoint.mode {
        TransportMode::SharedMemory => "no shared-memory server is running".to_owned(),
        TransportMode::Udp | TransportMode::Tcp => {
            format!("no simulation server reachable at {}", endpoint)
        }
        TransportMode::Gui | TransportMode::Direct => {
            "transport is not enabled for the in-process simulator".to_owned()
        }
    }
}

impl BackendConnector for InProcessConnector {
    fn connect(&self, endpoint: &TransportEndpoint) -> Result<Box<dyn SimulationBackend>> {
        endpoint.validate()?;
        if !self.accepted_transports.contains(&endpoint.mode) {
            return Err(BackendError::TransportRejected {
                transport: endpoint.mode,
                reason: rejection_reason(endpoint),
            });
        }

        let mut state = self.state.lock();
        if let Some(active) = state.connected {
            return Err(BackendError::TransportRejected {
                transport: endpoint.mode,
                reason: format!("simulator already has a client connected over {}", active),
            });
        }
        let session = state.begin_session(endpoint.mode);
        info!(transport = %endpoint, session, "in-process simulator accepted connection");

        Ok(Box::new(InProcessBackend {
            transport: endpoint.mode,
            session,
            catalog: Arc::clone(&self.catalog),
            state: Arc::clone(&self.state),
        }))
    }
}

/// Live connection to the in-process simulator.
#[derive(Debug)]
pub struct InProcessBackend {
    transport: TransportMode,
    session: u64,
    catalog: Arc<ModelCatalog>,
    state: Arc<Mutex<SimulatorState>>,
}

impl InProcessBackend {
    fn resolve_descriptor(search_path: Option<&Path>, descriptor: &str) -> Result<PathBuf> {
        let candidate = Path::new(descriptor);
        let searched = if candidate.is_absolute() {
            if candidate.is_file() {
                return Ok(candidate.to_path_buf());
            }
            candidate.display().to_string()
        } else {
            match search_path {
                Some(root) => {
                    let joined = root.join(candidate);
                    if joined.is_file() {
                        return Ok(joined);
                    }
                    joined.display().to_string()
                }
                None => "no asset search path configured".to_owned(),
            }
        };
        Err(BackendError::DescriptorNotFound {
            descriptor: descriptor.to_owned(),
            searched,
        })
    }

    fn catalog_entry(&self, descriptor: &str, resolved: &Path) -> Option<&CatalogEntry> {
        self.catalog.get(descriptor).or_else(|| {
            resolved
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| self.catalog.get(name))
        })
    }
}

impl SimulationBackend for InProcessBackend {
    fn transport(&self) -> TransportMode {
        self.transport
    }

    fn is_connected(&self) -> bool {
        self.state.lock().is_current(self.session)
    }

    fn set_asset_search_path(&mut self, path: &Path) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_session(self.session)?;
        if path.as_os_str().is_empty() {
            return Err(BackendError::InvalidArgument(
                "asset search path cannot be empty".into(),
            ));
        }
        state.search_path = Some(path.to_path_buf());
        state.record(BackendCall::SetAssetSearchPath(path.to_path_buf()));
        debug!(path = %path.display(), "asset search path set");
        Ok(())
    }

    fn reset_world(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_session(self.session)?;
        state.clear_world();
        state.record(BackendCall::ResetWorld);
        Ok(())
    }

    fn set_rendering_enabled(&mut self, enabled: bool) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_session(self.session)?;
        state.rendering_enabled = enabled;
        state.record(BackendCall::SetRenderingEnabled(enabled));
        Ok(())
    }

    fn load_articulated_body(&mut self, request: &LoadBodyRequest) -> Result<BodyId> {
        request.validate()?;
        let mut state = self.state.lock();
        state.ensure_session(self.session)?;

        let resolved = Self::resolve_descriptor(state.search_path.as_deref(), &request.descriptor)?;
        let joint_count = self
            .catalog_entry(&request.descriptor, &resolved)
            .map(|entry| entry.joint_count)
            .ok_or_else(|| BackendError::UnknownModel(request.descriptor.clone()))?;

        let body = BodyId(state.next_body);
        state.next_body += 1;
        state.bodies.insert(
            body,
            BodyState {
                descriptor: request.descriptor.clone(),
                resolved_path: resolved.clone(),
                position: request.position,
                orientation: request.orientation,
                joint_positions: vec![0.0; joint_count],
                motor_targets: vec![None; joint_count],
            },
        );
        state.record(BackendCall::LoadArticulatedBody {
            request: request.clone(),
            body,
        });
        info!(
            %body,
            descriptor = %request.descriptor,
            path = %resolved.display(),
            joint_count,
            "articulated body loaded"
        );
        Ok(body)
    }

    fn joint_count(&self, body: BodyId) -> Result<usize> {
        let state = self.state.lock();
        state.ensure_session(self.session)?;
        Ok(state.body(body)?.joint_positions.len())
    }

    fn set_joint_state(&mut self, body: BodyId, joint_index: usize, position: f64) -> Result<()> {
        ensure_finite("joint position", &[position])?;
        let mut state = self.state.lock();
        state.ensure_session(self.session)?;
        state.ensure_joint(body, joint_index)?;
        state.body_mut(body)?.joint_positions[joint_index] = position;
        state.record(BackendCall::SetJointState {
            body,
            joint_index,
            position,
        });
        Ok(())
    }

    fn create_fixed_constraint(&mut self, request: &FixedConstraintRequest) -> Result<ConstraintId> {
        request.validate()?;
        let mut state = self.state.lock();
        state.ensure_session(self.session)?;
        state.ensure_endpoint(&request.parent)?;
        state.ensure_endpoint(&request.child)?;

        let constraint = ConstraintId(state.next_constraint);
        state.next_constraint += 1;
        state.constraints.insert(constraint, request.clone());
        state.record(BackendCall::CreateFixedConstraint {
            request: request.clone(),
            constraint,
        });
        Ok(constraint)
    }

    fn set_joint_motor_target(&mut self, body: BodyId, command: &MotorCommand) -> Result<()> {
        command.validate()?;
        let mut state = self.state.lock();
        state.ensure_session(self.session)?;
        state.ensure_joint(body, command.joint_index)?;

        if let Some(remaining) = state.motor_commands_before_disconnect {
            if remaining == 0 {
                state.connected = None;
                state.motor_commands_before_disconnect = None;
                warn!(%body, joint = command.joint_index, "simulator dropped the connection");
                return Err(BackendError::NotConnected);
            }
            state.motor_commands_before_disconnect = Some(remaining - 1);
        }
        if state.reject_motor_commands {
            return Err(BackendError::CommandRejected(format!(
                "joint {} of {} is not accepting commands",
                command.joint_index, body
            )));
        }

        state.body_mut(body)?.motor_targets[command.joint_index] = Some(*command);
        state.record(BackendCall::SetJointMotorTarget {
            body,
            command: *command,
        });
        Ok(())
    }

    fn set_gravity(&mut self, gravity: Vec3) -> Result<()> {
        ensure_finite("gravity", &gravity)?;
        let mut state = self.state.lock();
        state.ensure_session(self.session)?;
        state.gravity = gravity;
        state.record(BackendCall::SetGravity(gravity));
        Ok(())
    }

    fn set_real_time_mode(&mut self, enabled: bool) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_session(self.session)?;
        state.real_time = enabled;
        state.record(BackendCall::SetRealTimeMode(enabled));
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_session(self.session)?;
        state.connected = None;
        state.record(BackendCall::Disconnect);
        info!(transport = %self.transport, session = self.session, "in-process simulator connection closed");
        Ok(())
    }
}

impl Drop for InProcessBackend {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if state.is_current(self.session) {
            state.connected = None;
            debug!(session = self.session, "in-process backend dropped without disconnect");
        }
    }
}

/// Read-only view of the simulator plus fault injection for tests.
#[derive(Debug, Clone)]
pub struct SimulatorProbe {
    state: Arc<Mutex<SimulatorState>>,
}

impl SimulatorProbe {
    /// Accepted calls still in the log, oldest first.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.lock().calls.iter().cloned().collect()
    }

    /// Accepted motor commands still in the call log, oldest first.
    pub fn motor_commands(&self) -> Vec<(BodyId, MotorCommand)> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::SetJointMotorTarget { body, command } => Some((*body, *command)),
                _ => None,
            })
            .collect()
    }

    /// Current joint positions of a body.
    pub fn joint_positions(&self, body: BodyId) -> Option<Vec<f64>> {
        self.state
            .lock()
            .bodies
            .get(&body)
            .map(|b| b.joint_positions.clone())
    }

    /// Latest motor target accepted for a joint.
    pub fn motor_target(&self, body: BodyId, joint_index: usize) -> Option<MotorCommand> {
        self.state
            .lock()
            .bodies
            .get(&body)
            .and_then(|b| b.motor_targets.get(joint_index).copied().flatten())
    }

    /// Descriptor, resolved path and pose of a body.
    pub fn body_pose(&self, body: BodyId) -> Option<(String, PathBuf, Vec3, Quaternion)> {
        self.state.lock().bodies.get(&body).map(|b| {
            (
                b.descriptor.clone(),
                b.resolved_path.clone(),
                b.position,
                b.orientation,
            )
        })
    }

    /// Live bodies in load order.
    pub fn bodies(&self) -> Vec<BodyId> {
        self.state.lock().bodies.keys().copied().collect()
    }

    /// Live constraints in creation order.
    pub fn constraints(&self) -> Vec<(ConstraintId, FixedConstraintRequest)> {
        self.state
            .lock()
            .constraints
            .iter()
            .map(|(id, request)| (*id, request.clone()))
            .collect()
    }

    /// Transport of the connected client, if any.
    pub fn connected_transport(&self) -> Option<TransportMode> {
        self.state.lock().connected
    }

    /// Whether a client is connected.
    pub fn is_connected(&self) -> bool {
        self.state.lock().connected.is_some()
    }

    /// Current asset search path.
    pub fn search_path(&self) -> Option<PathBuf> {
        self.state.lock().search_path.clone()
    }

    /// Whether rendering is enabled.
    pub fn rendering_enabled(&self) -> bool {
        self.state.lock().rendering_enabled
    }

    /// Whether real-time integration is enabled.
    pub fn real_time(&self) -> bool {
        self.state.lock().real_time
    }

    /// Current gravity vector.
    pub fn gravity(&self) -> Vec3 {
        self.state.lock().gravity
    }

    /// Make every subsequent motor command fail with [`BackendError::CommandRejected`].
    pub fn set_reject_motor_commands(&self, reject: bool) {
        self.state.lock().reject_motor_commands = reject;
    }

    /// Drop the connection once `accepted` more motor commands have been taken.
    pub fn disconnect_after_motor_commands(&self, accepted: usize) {
        self.state.lock().motor_commands_before_disconnect = Some(accepted);
    }

    /// Drop the connection from the simulator side.
    pub fn sever_connection(&self) {
        self.state.lock().connected = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn catalog() -> ModelCatalog {
        let mut catalog = ModelCatalog::new();
        catalog.insert(
            "gripper.urdf".to_owned(),
            CatalogEntry {
                joint_count: 4,
                description: None,
            },
        );
        catalog
    }

    fn asset_dir() -> TempDir {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("gripper.urdf"), "<robot name=\"gripper\"/>").expect("write urdf");
        fs::write(dir.path().join("mystery.urdf"), "<robot name=\"mystery\"/>").expect("write urdf");
        dir
    }

    fn connect_direct(connector: &InProcessConnector) -> Box<dyn SimulationBackend> {
        connector
            .connect(&TransportEndpoint::local(TransportMode::Direct))
            .expect("direct transport accepted")
    }

    #[test]
    fn rejects_shared_memory_by_default() {
        let connector = InProcessConnector::from_config(&AppConfig::default());
        let err = connector
            .connect(&TransportEndpoint::local(TransportMode::SharedMemory))
            .err()
            .expect("shared memory rejected");
        assert!(matches!(
            err,
            BackendError::TransportRejected {
                transport: TransportMode::SharedMemory,
                ..
            }
        ));
        assert!(!connector.probe().is_connected());
    }

    #[test]
    fn allows_a_single_client_at_a_time() {
        let connector = InProcessConnector::new([TransportMode::Direct, TransportMode::Gui], catalog());
        let mut first = connect_direct(&connector);
        assert!(connector
            .connect(&TransportEndpoint::local(TransportMode::Gui))
            .is_err());
        first.disconnect().expect("disconnect");
        let second = connector
            .connect(&TransportEndpoint::local(TransportMode::Gui))
            .expect("reconnect after disconnect");
        assert_eq!(second.transport(), TransportMode::Gui);
        assert!(!first.is_connected());
        assert!(second.is_connected());
    }

    #[test]
    fn resolves_descriptors_under_search_path() {
        let assets = asset_dir();
        let connector = InProcessConnector::new([TransportMode::Direct], catalog());
        let mut backend = connect_direct(&connector);

        let request = LoadBodyRequest::new("gripper.urdf", [0.5, 0.3, 0.7], [0.0, 0.0, 0.0, 1.0]);
        assert!(matches!(
            backend.load_articulated_body(&request),
            Err(BackendError::DescriptorNotFound { .. })
        ));

        backend.set_asset_search_path(assets.path()).expect("search path");
        let body = backend.load_articulated_body(&request).expect("load");
        assert_eq!(backend.joint_count(body).expect("joint count"), 4);

        let (_, resolved, position, _) = connector.probe().body_pose(body).expect("pose");
        assert_eq!(resolved, assets.path().join("gripper.urdf"));
        assert_eq!(position, [0.5, 0.3, 0.7]);

        let missing = LoadBodyRequest::new("absent.urdf", [0.0; 3], [0.0, 0.0, 0.0, 1.0]);
        assert!(matches!(
            backend.load_articulated_body(&missing),
            Err(BackendError::DescriptorNotFound { .. })
        ));
        let unknown = LoadBodyRequest::new("mystery.urdf", [0.0; 3], [0.0, 0.0, 0.0, 1.0]);
        assert!(matches!(
            backend.load_articulated_body(&unknown),
            Err(BackendError::UnknownModel(_))
        ));
    }

    #[test]
    fn joint_operations_are_range_checked() {
        let assets = asset_dir();
        let connector = InProcessConnector::new([TransportMode::Direct], catalog());
        let mut backend = connect_direct(&connector);
        backend.set_asset_search_path(assets.path()).expect("search path");
        let body = backend
            .load_articulated_body(&LoadBodyRequest::new("gripper.urdf", [0.0; 3], [0.0, 0.0, 0.0, 1.0]))
            .expect("load");

        backend.set_joint_state(body, 2, 0.55).expect("in range");
        assert!(matches!(
            backend.set_joint_state(body, 4, 0.0),
            Err(BackendError::JointOutOfRange { joint_count: 4, .. })
        ));
        assert!(matches!(
            backend.set_joint_state(BodyId(9), 0, 0.0),
            Err(BackendError::UnknownBody(BodyId(9)))
        ));
        assert!(backend.set_joint_state(body, 0, f64::NAN).is_err());
        assert_eq!(
            connector.probe().joint_positions(body),
            Some(vec![0.0, 0.0, 0.55, 0.0])
        );

        assert!(backend
            .set_joint_motor_target(body, &MotorCommand::position(5, 0.7, 1.0, 1.0))
            .is_err());
        backend
            .set_joint_motor_target(body, &MotorCommand::position(0, 0.7, 1.0, 1.0))
            .expect("motor target");
        assert_eq!(
            connector.probe().motor_target(body, 0).map(|c| c.target_position),
            Some(0.7)
        );
    }

    #[test]
    fn reset_world_clears_bodies_but_keeps_search_path() {
        let assets = asset_dir();
        let connector = InProcessConnector::new([TransportMode::Direct], catalog());
        let probe = connector.probe();
        let mut backend = connect_direct(&connector);
        backend.set_asset_search_path(assets.path()).expect("search path");
        backend.set_rendering_enabled(false).expect("rendering");
        let body = backend
            .load_articulated_body(&LoadBodyRequest::new("gripper.urdf", [0.0; 3], [0.0, 0.0, 0.0, 1.0]))
            .expect("load");
        backend
            .create_fixed_constraint(&FixedConstraintRequest::anchor_to_world(body, [0.2, 0.0, 0.0], [0.5, 0.3, 0.7]))
            .expect("constraint");
        backend.set_real_time_mode(true).expect("real time");

        backend.reset_world().expect("reset");
        backend.reset_world().expect("reset is idempotent");
        assert!(probe.bodies().is_empty());
        assert!(probe.constraints().is_empty());
        assert!(!probe.real_time());
        assert!(!probe.rendering_enabled());
        assert_eq!(probe.search_path().as_deref(), Some(assets.path()));
        assert!(matches!(backend.joint_count(body), Err(BackendError::UnknownBody(_))));
    }

    #[test]
    fn constraint_endpoints_must_exist() {
        let connector = InProcessConnector::new([TransportMode::Direct], catalog());
        let mut backend = connect_direct(&connector);
        let request = FixedConstraintRequest::anchor_to_world(BodyId(0), [0.0; 3], [0.0; 3]);
        assert!(matches!(
            backend.create_fixed_constraint(&request),
            Err(BackendError::UnknownBody(BodyId(0)))
        ));
    }

    #[test]
    fn severed_connection_fails_calls() {
        let connector = InProcessConnector::new([TransportMode::Direct], catalog());
        let probe = connector.probe();
        let mut backend = connect_direct(&connector);
        probe.sever_connection();
        assert!(!backend.is_connected());
        assert_eq!(backend.set_real_time_mode(true), Err(BackendError::NotConnected));
        assert_eq!(backend.disconnect(), Err(BackendError::NotConnected));
    }

    #[test]
    fn dropping_a_backend_releases_the_simulator() {
        let connector = InProcessConnector::new([TransportMode::Direct], catalog());
        {
            let _backend = connect_direct(&connector);
            assert!(connector.probe().is_connected());
        }
        assert!(!connector.probe().is_connected());
        let _again = connect_direct(&connector);
    }

    #[test]
    fn calls_are_recorded_only_when_accepted() {
        let connector = InProcessConnector::new([TransportMode::Direct], catalog());
        let probe = connector.probe();
        let mut backend = connect_direct(&connector);
        assert!(backend.set_gravity([0.0, 0.0, f64::INFINITY]).is_err());
        backend.set_gravity([0.0, 0.0, -10.0]).expect("gravity");
        backend.disconnect().expect("disconnect");
        assert_eq!(
            probe.calls(),
            vec![
                BackendCall::Connect(TransportMode::Direct),
                BackendCall::SetGravity([0.0, 0.0, -10.0]),
                BackendCall::Disconnect,
            ]
        );
    }

    #[test]
    fn call_log_keeps_only_the_most_recent_entries() {
        let connector =
            InProcessConnector::new([TransportMode::Direct], catalog()).with_call_log_capacity(3);
        let probe = connector.probe();
        let mut backend = connect_direct(&connector);
        for round in 0..10 {
            backend
                .set_real_time_mode(round % 2 == 0)
                .expect("real time");
        }
        backend.disconnect().expect("disconnect");
        assert_eq!(
            probe.calls(),
            vec![
                BackendCall::SetRealTimeMode(true),
                BackendCall::SetRealTimeMode(false),
                BackendCall::Disconnect,
            ]
        );
    }
}
