//! ---
//! grip_section: "04-harness"
//! grip_subsection: "module"
//! grip_type: "source"
//! grip_scope: "code"
//! grip_description: "Scene setup and interactive control loop over a simulation backend."
//! grip_version: "v0.0.0-prealpha"
//! grip_owner: "tbd"
//! ---
use std::fmt;
use std::path::Path;

use r_grip_backend::{
    BackendConnector, BackendError, BodyId, ConstraintId, FixedConstraintRequest, LoadBodyRequest,
    Quaternion, SimulationBackend, TransportEndpoint, Vec3,
};
use r_grip_common::{AppConfig, BackendConfig, SceneConfig, TransportMode};
use r_grip_logging::{
    grip_debug, grip_error, grip_info, grip_warn, log_system_event, LogContext, SystemEventOutcome,
};

use crate::cancel::CancellationToken;
use crate::error::{HarnessError, Result};
use crate::gripper::GripperProfile;
use crate::state::{HarnessState, LoopPhase};
use crate::trigger::{Trigger, TriggerSource};

/// Why the control loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopTermination {
    /// The cancellation token fired.
    Cancelled,
    /// The trigger source ran out of input.
    InputClosed,
    /// The backend dropped the connection.
    BackendDisconnected,
}

impl fmt::Display for LoopTermination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoopTermination::Cancelled => "cancelled",
            LoopTermination::InputClosed => "input-closed",
            LoopTermination::BackendDisconnected => "backend-disconnected",
        })
    }
}

/// Summary of a control loop run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopReport {
    /// Actuation rounds started.
    pub rounds: u64,
    /// Motor commands the backend accepted.
    pub commands_issued: u64,
    /// Motor commands the backend refused.
    pub actuation_failures: u64,
    /// Triggers received out of phase and dropped.
    pub ignored_triggers: u64,
    /// Why the loop stopped.
    pub termination: LoopTermination,
}

/// Owns one backend connection and drives it through setup and the control loop.
pub struct SimulationHarness {
    state: HarnessState,
    backend: Option<Box<dyn SimulationBackend>>,
    profile: GripperProfile,
    model: Option<String>,
    body: Option<BodyId>,
    constraint: Option<ConstraintId>,
}

impl fmt::Debug for SimulationHarness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationHarness")
            .field("state", &self.state)
            .field("transport", &self.transport())
            .field("model", &self.model)
            .field("body", &self.body)
            .field("constraint", &self.constraint)
            .finish()
    }
}

impl SimulationHarness {
    /// Create a disconnected harness for the given gripper.
    pub fn new(profile: GripperProfile) -> Self {
        Self {
            state: HarnessState::Disconnected,
            backend: None,
            profile,
            model: None,
            body: None,
            constraint: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> HarnessState {
        self.state
    }

    /// Gripper joints and targets driven by the loop.
    pub fn profile(&self) -> &GripperProfile {
        &self.profile
    }

    /// Transport of the live connection.
    pub fn transport(&self) -> Option<TransportMode> {
        self.backend.as_ref().map(|backend| backend.transport())
    }

    /// Handle of the loaded model.
    pub fn body(&self) -> Option<BodyId> {
        self.body
    }

    /// Handle of the anchor constraint.
    pub fn constraint(&self) -> Option<ConstraintId> {
        self.constraint
    }

    fn log_context(&self) -> LogContext<'_> {
        LogContext {
            model: self.model.as_deref(),
            transport: self
                .backend
                .as_ref()
                .map(|backend| backend.transport().as_str()),
            ..LogContext::default()
        }
    }

    fn require(&self, expected: HarnessState) -> Result<()> {
        if self.state != expected {
            return Err(HarnessError::InvalidState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    fn connected_backend(&mut self) -> Result<&mut Box<dyn SimulationBackend>> {
        if self.state.is_looping() {
            return Err(HarnessError::InvalidState {
                expected: HarnessState::Anchored,
                actual: self.state,
            });
        }
        let actual = self.state;
        self.backend
            .as_mut()
            .ok_or(HarnessError::InvalidState {
                expected: HarnessState::Connected,
                actual,
            })
    }

    /// Connect over the preferred transport, falling back once on failure.
    pub fn connect(
        &mut self,
        connector: &dyn BackendConnector,
        config: &BackendConfig,
    ) -> Result<TransportMode> {
        self.require(HarnessState::Disconnected)?;
        let preferred = TransportEndpoint::preferred(config);
        let fallback = TransportEndpoint::fallback(config);

        let backend = match connector.connect(&preferred) {
            Ok(backend) => backend,
            Err(preferred_error) => {
                grip_warn!(
                    context = LogContext::new().with_transport(preferred.mode.as_str()),
                    "preferred transport {} unavailable ({}), falling back to {}",
                    preferred,
                    preferred_error,
                    fallback
                );
                connector.connect(&fallback).map_err(|fallback_error| {
                    HarnessError::BackendUnavailable {
                        preferred: preferred.mode,
                        fallback: fallback.mode,
                        preferred_error,
                        fallback_error,
                    }
                })?
            }
        };

        let transport = backend.transport();
        self.backend = Some(backend);
        self.state = HarnessState::Connected;
        grip_info!(context = self.log_context(), "connected to simulation backend");
        Ok(transport)
    }

    /// Set the root used to resolve model descriptors.
    pub fn configure_asset_path(&mut self, path: &Path) -> Result<()> {
        self.require(HarnessState::Connected)?;
        self.connected_backend()?.set_asset_search_path(path)?;
        grip_debug!(context = self.log_context(), "asset path set to {}", path.display());
        Ok(())
    }

    /// Clear the backend world. Any loaded model and anchor are forgotten.
    pub fn reset_scene(&mut self) -> Result<()> {
        self.connected_backend()?.reset_world()?;
        self.body = None;
        self.constraint = None;
        self.model = None;
        self.state = HarnessState::SceneReady;
        Ok(())
    }

    /// Toggle viewer rendering. Only affects GUI backends.
    pub fn set_rendering_enabled(&mut self, enabled: bool) -> Result<()> {
        self.connected_backend()?.set_rendering_enabled(enabled)?;
        grip_debug!(context = self.log_context(), "rendering enabled: {}", enabled);
        Ok(())
    }

    /// Load the model and check its joint layout against the gripper profile.
    pub fn load_model(
        &mut self,
        descriptor: &str,
        position: Vec3,
        orientation: Quaternion,
    ) -> Result<BodyId> {
        self.require(HarnessState::SceneReady)?;
        let request = LoadBodyRequest::new(descriptor, position, orientation);
        let backend = self.connected_backend()?;
        let body = backend
            .load_articulated_body(&request)
            .map_err(|source| match source {
                BackendError::NotConnected => HarnessError::Backend(source),
                source => HarnessError::ModelLoad {
                    descriptor: descriptor.to_owned(),
                    source,
                },
            })?;
        let joint_count = backend.joint_count(body)?;
        self.profile.check_joint_count(joint_count)?;

        self.model = Some(descriptor.to_owned());
        self.body = Some(body);
        self.state = HarnessState::ModelLoaded;
        grip_info!(
            context = self.log_context(),
            "model loaded as {} with {} joints",
            body,
            joint_count
        );
        Ok(body)
    }

    /// Reset joints `0..joint_count` to `positions[index]`.
    ///
    /// Fails with [`HarnessError::JointIndexMismatch`] before touching any joint
    /// when fewer positions than joints are supplied. Extra positions are ignored.
    pub fn initialize_joint_state(&mut self, body: BodyId, positions: &[f64]) -> Result<()> {
        self.require(HarnessState::ModelLoaded)?;
        let backend = self.connected_backend()?;
        let joint_count = backend.joint_count(body)?;
        if positions.len() < joint_count {
            return Err(HarnessError::JointIndexMismatch {
                supplied: positions.len(),
                required: joint_count,
            });
        }
        for (joint_index, position) in positions.iter().take(joint_count).enumerate() {
            backend.set_joint_state(body, joint_index, *position)?;
        }
        if positions.len() > joint_count {
            grip_debug!(
                context = self.log_context(),
                "ignoring {} initial positions beyond joint count {}",
                positions.len() - joint_count,
                joint_count
            );
        }
        Ok(())
    }

    /// Bind `parent_point` on the model base to `world_point` with a fixed joint.
    pub fn create_fixed_anchor(
        &mut self,
        body: BodyId,
        parent_point: Vec3,
        world_point: Vec3,
    ) -> Result<ConstraintId> {
        self.require(HarnessState::ModelLoaded)?;
        let request = FixedConstraintRequest::anchor_to_world(body, parent_point, world_point);
        let constraint = self.connected_backend()?.create_fixed_constraint(&request)?;
        self.constraint = Some(constraint);
        self.state = HarnessState::Anchored;
        grip_info!(
            context = self.log_context(),
            "anchor constraint {} created",
            constraint
        );
        Ok(constraint)
    }

    /// Apply a world gravity vector.
    pub fn set_gravity(&mut self, gravity: Vec3) -> Result<()> {
        self.connected_backend()?.set_gravity(gravity)?;
        Ok(())
    }

    /// Let the backend step on its own clock instead of explicit steps.
    pub fn set_real_time_mode(&mut self, enabled: bool) -> Result<()> {
        self.connected_backend()?.set_real_time_mode(enabled)?;
        grip_debug!(context = self.log_context(), "real-time mode: {}", enabled);
        Ok(())
    }

    /// Run every setup step for `scene` in order, leaving the harness anchored.
    pub fn setup(&mut self, scene: &SceneConfig) -> Result<BodyId> {
        self.configure_asset_path(&scene.asset_path)?;
        self.reset_scene()?;
        if scene.disable_rendering_during_load {
            self.set_rendering_enabled(false)?;
        }
        let body = self.load_model(&scene.descriptor, scene.base_position, scene.base_orientation)?;
        self.initialize_joint_state(body, &scene.initial_joint_positions)?;
        self.create_fixed_anchor(body, scene.anchor_parent_point, scene.anchor_world_point)?;
        if let Some(gravity) = scene.gravity {
            self.set_gravity(gravity)?;
        }
        if scene.disable_rendering_during_load {
            self.set_rendering_enabled(true)?;
        }
        self.set_real_time_mode(scene.real_time)?;
        Ok(body)
    }

    /// Alternate close and open rounds until cancelled, out of input, or disconnected.
    ///
    /// The connection is released before returning, whatever the reason the
    /// loop stopped.
    pub fn run_control_loop(
        &mut self,
        triggers: &mut dyn TriggerSource,
        cancel: &CancellationToken,
    ) -> Result<LoopReport> {
        self.require(HarnessState::Anchored)?;
        let body = match self.body {
            Some(body) => body,
            None => {
                return Err(HarnessError::InvalidState {
                    expected: HarnessState::ModelLoaded,
                    actual: self.state,
                })
            }
        };

        let mut rounds = 0u64;
        let mut commands_issued = 0u64;
        let mut actuation_failures = 0u64;
        let mut ignored_triggers = 0u64;
        self.state = HarnessState::Looping(LoopPhase::WaitClose);
        grip_info!(context = self.log_context(), "control loop started");

        let termination = loop {
            if cancel.is_cancelled() {
                break LoopTermination::Cancelled;
            }
            let phase = match self.state {
                HarnessState::Looping(phase) => phase,
                _ => break LoopTermination::BackendDisconnected,
            };
            match phase {
                LoopPhase::WaitClose | LoopPhase::WaitOpen => {
                    let expected = if phase == LoopPhase::WaitClose {
                        Trigger::Close
                    } else {
                        Trigger::Open
                    };
                    match triggers.next_trigger(expected, cancel) {
                        None if cancel.is_cancelled() => break LoopTermination::Cancelled,
                        None => break LoopTermination::InputClosed,
                        Some(trigger) if trigger == expected => {
                            self.state = HarnessState::Looping(phase.next());
                        }
                        Some(trigger) => {
                            ignored_triggers += 1;
                            grip_warn!(
                                context = self.log_context().with_cycle(rounds),
                                "ignoring {} trigger while waiting for {}",
                                trigger,
                                expected
                            );
                        }
                    }
                }
                LoopPhase::ActuateClose | LoopPhase::ActuateOpen => {
                    let trigger = if phase == LoopPhase::ActuateClose {
                        Trigger::Close
                    } else {
                        Trigger::Open
                    };
                    rounds += 1;
                    let mut disconnected = false;
                    for command in self.profile.commands_for(trigger) {
                        let outcome = match self.backend.as_deref_mut() {
                            Some(backend) => backend.set_joint_motor_target(body, &command),
                            None => Err(BackendError::NotConnected),
                        };
                        match outcome {
                            Ok(()) => commands_issued += 1,
                            Err(source) => {
                                actuation_failures += 1;
                                let err = HarnessError::ActuationFailure {
                                    joint_index: command.joint_index,
                                    source,
                                };
                                grip_warn!(
                                    context = self
                                        .log_context()
                                        .with_joint(command.joint_index)
                                        .with_cycle(rounds),
                                    "{}",
                                    err
                                );
                                let alive = self
                                    .backend
                                    .as_ref()
                                    .map(|backend| backend.is_connected())
                                    .unwrap_or(false);
                                if !alive {
                                    disconnected = true;
                                    break;
                                }
                            }
                        }
                    }
                    if disconnected {
                        break LoopTermination::BackendDisconnected;
                    }
                    grip_debug!(
                        context = self.log_context().with_cycle(rounds),
                        "{} round complete",
                        trigger
                    );
                    self.state = HarnessState::Looping(phase.next());
                }
            }
        };

        let report = LoopReport {
            rounds,
            commands_issued,
            actuation_failures,
            ignored_triggers,
            termination,
        };
        grip_info!(
            context = self.log_context(),
            "control loop stopped ({}) after {} rounds",
            termination,
            rounds
        );
        self.release();
        Ok(report)
    }

    /// Close the backend connection.
    pub fn disconnect(&mut self) -> Result<()> {
        let mut backend = match self.backend.take() {
            Some(backend) => backend,
            None => {
                return Err(HarnessError::InvalidState {
                    expected: HarnessState::Connected,
                    actual: self.state,
                })
            }
        };
        self.state = HarnessState::Disconnected;
        self.body = None;
        self.constraint = None;
        let result = backend.disconnect();
        self.model = None;
        result.map_err(HarnessError::from)
    }

    /// Best-effort disconnect; failures are logged and dropped.
    pub fn release(&mut self) {
        if self.backend.is_none() {
            self.state = HarnessState::Disconnected;
            return;
        }
        let transport = self.transport();
        if let Err(err) = self.disconnect() {
            grip_warn!(
                context = LogContext::new().with_transport(transport.map(|t| t.as_str()).unwrap_or("")),
                "disconnect failed: {}",
                err
            );
        }
    }

    /// Connect, set up the scene, and run the loop until it stops.
    ///
    /// Setup failures release the connection before being returned.
    pub fn run(
        &mut self,
        connector: &dyn BackendConnector,
        config: &AppConfig,
        triggers: &mut dyn TriggerSource,
        cancel: &CancellationToken,
    ) -> Result<LoopReport> {
        let transport = match self.connect(connector, &config.backend) {
            Ok(transport) => transport,
            Err(err) => {
                log_system_event(None, "harness.connect", &err.to_string(), SystemEventOutcome::Fault);
                return Err(err);
            }
        };
        let ctx = LogContext::new()
            .with_transport(transport.as_str())
            .with_model(&config.scene.descriptor);

        if let Err(err) = self.setup(&config.scene) {
            log_system_event(Some(&ctx), "harness.setup", &err.to_string(), SystemEventOutcome::Fault);
            grip_error!(context = ctx, "setup aborted: {}", err);
            self.release();
            return Err(err);
        }
        log_system_event(Some(&ctx), "harness.setup", "scene anchored", SystemEventOutcome::Success);

        let report = self.run_control_loop(triggers, cancel)?;
        let outcome = match report.termination {
            LoopTermination::BackendDisconnected => SystemEventOutcome::Fault,
            _ => SystemEventOutcome::Success,
        };
        log_system_event(
            Some(&ctx),
            "harness.loop",
            &format!("{} rounds, {} commands", report.rounds, report.commands_issued),
            outcome,
        );
        Ok(report)
    }
}

impl Drop for SimulationHarness {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::ScriptedTriggers;
    use r_grip_backend::InProcessConnector;
    use r_grip_common::{CatalogEntry, ModelCatalog};
    use std::fs;
    use tempfile::TempDir;

    fn simulator() -> InProcessConnector {
        let mut catalog = ModelCatalog::new();
        for (name, joint_count) in [("gripper.urdf", 4), ("three.urdf", 3)] {
            catalog.insert(
                name.to_owned(),
                CatalogEntry {
                    joint_count,
                    description: None,
                },
            );
        }
        InProcessConnector::new([TransportMode::Direct, TransportMode::Gui], catalog)
    }

    fn assets() -> TempDir {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("gripper.urdf"), "<robot/>").expect("write");
        fs::write(dir.path().join("three.urdf"), "<robot/>").expect("write");
        dir
    }

    fn connected(connector: &InProcessConnector) -> SimulationHarness {
        let mut harness = SimulationHarness::new(GripperProfile::default());
        harness
            .connect(connector, &BackendConfig::default())
            .expect("fallback connects");
        harness
    }

    #[test]
    fn operations_out_of_order_are_rejected() {
        let connector = simulator();
        let mut harness = SimulationHarness::new(GripperProfile::default());
        assert!(matches!(
            harness.reset_scene(),
            Err(HarnessError::InvalidState {
                expected: HarnessState::Connected,
                actual: HarnessState::Disconnected
            })
        ));

        let mut harness = connected(&connector);
        assert!(matches!(
            harness.load_model("gripper.urdf", [0.0; 3], [0.0, 0.0, 0.0, 1.0]),
            Err(HarnessError::InvalidState {
                expected: HarnessState::SceneReady,
                actual: HarnessState::Connected
            })
        ));
        let mut triggers = ScriptedTriggers::default();
        assert!(matches!(
            harness.run_control_loop(&mut triggers, &CancellationToken::new()),
            Err(HarnessError::InvalidState { .. })
        ));
        assert!(matches!(
            harness.connect(&connector, &BackendConfig::default()),
            Err(HarnessError::InvalidState { .. })
        ));
    }

    #[test]
    fn model_with_wrong_joint_count_is_refused() {
        let connector = simulator();
        let dir = assets();
        let mut harness = connected(&connector);
        harness.configure_asset_path(dir.path()).expect("asset path");
        harness.reset_scene().expect("reset");
        assert!(matches!(
            harness.load_model("three.urdf", [0.0; 3], [0.0, 0.0, 0.0, 1.0]),
            Err(HarnessError::UnexpectedJointCount { expected: 4, actual: 3 })
        ));
        assert_eq!(harness.state(), HarnessState::SceneReady);
    }

    #[test]
    fn missing_descriptor_is_a_model_load_error() {
        let connector = simulator();
        let dir = assets();
        let mut harness = connected(&connector);
        harness.configure_asset_path(dir.path()).expect("asset path");
        harness.reset_scene().expect("reset");
        let err = harness
            .load_model("absent.urdf", [0.0; 3], [0.0, 0.0, 0.0, 1.0])
            .unwrap_err();
        assert!(matches!(
            err,
            HarnessError::ModelLoad {
                source: BackendError::DescriptorNotFound { .. },
                ..
            }
        ));
    }

    #[test]
    fn disconnect_twice_reports_invalid_state() {
        let connector = simulator();
        let mut harness = connected(&connector);
        harness.disconnect().expect("first disconnect");
        assert_eq!(harness.state(), HarnessState::Disconnected);
        assert!(matches!(
            harness.disconnect(),
            Err(HarnessError::InvalidState { .. })
        ));
        assert!(!connector.probe().is_connected());
    }

    #[test]
    fn dropping_the_harness_releases_the_connection() {
        let connector = simulator();
        {
            let _harness = connected(&connector);
            assert!(connector.probe().is_connected());
        }
        assert!(!connector.probe().is_connected());
        assert_eq!(
            connector.probe().calls().last(),
            Some(&r_grip_backend::BackendCall::Disconnect)
        );
    }
}
