//! ---
//! grip_section: "02-backend-interface"
//! grip_subsection: "module"
//! grip_type: "source"
//! grip_scope: "code"
//! grip_description: "End-to-end session against the in-process simulator."
//! grip_version: "v0.0.0-prealpha"
//! grip_owner: "tbd"
//! ---
use std::fs;

use anyhow::Result;
use r_grip_backend::{
    BackendCall, BackendConnector, BackendError, FixedConstraintRequest, InProcessConnector,
    LoadBodyRequest, MotorCommand, TransportEndpoint,
};
use r_grip_common::{AppConfig, TransportMode};
use tempfile::TempDir;

#[test]
fn full_session_is_recorded_in_order() -> Result<()> {
    let assets = TempDir::new()?;
    fs::write(assets.path().join("pr2_gripper.urdf"), "<robot name=\"pr2\"/>")?;

    let config = AppConfig::default();
    let connector = InProcessConnector::from_config(&config);
    let probe = connector.probe();

    let preferred = TransportEndpoint::preferred(&config.backend);
    assert!(matches!(
        connector.connect(&preferred),
        Err(BackendError::TransportRejected { .. })
    ));

    let mut backend = connector.connect(&TransportEndpoint::fallback(&config.backend))?;
    assert_eq!(backend.transport(), TransportMode::Gui);

    backend.set_asset_search_path(assets.path())?;
    backend.reset_world()?;
    backend.set_rendering_enabled(false)?;
    let body = backend.load_articulated_body(&LoadBodyRequest::new(
        config.scene.descriptor.clone(),
        config.scene.base_position,
        config.scene.base_orientation,
    ))?;
    backend.set_rendering_enabled(true)?;
    for (joint, position) in config.scene.initial_joint_positions.iter().enumerate() {
        backend.set_joint_state(body, joint, *position)?;
    }
    let anchor = FixedConstraintRequest::anchor_to_world(
        body,
        config.scene.anchor_parent_point,
        config.scene.anchor_world_point,
    );
    let constraint = backend.create_fixed_constraint(&anchor)?;
    backend.set_real_time_mode(true)?;
    backend.set_joint_motor_target(body, &MotorCommand::position(0, 0.7, 1.0, 1.0))?;
    backend.disconnect()?;

    let calls = probe.calls();
    assert_eq!(calls.first(), Some(&BackendCall::Connect(TransportMode::Gui)));
    assert_eq!(calls.last(), Some(&BackendCall::Disconnect));
    assert!(calls.contains(&BackendCall::CreateFixedConstraint {
        request: anchor,
        constraint,
    }));
    assert_eq!(
        probe.joint_positions(body),
        Some(vec![0.550569, 0.0, 0.549657, 0.0])
    );
    assert!(probe.real_time());
    assert!(probe.rendering_enabled());
    assert!(!probe.is_connected());
    Ok(())
}

#[test]
fn network_transports_need_a_server() {
    let connector = InProcessConnector::new([TransportMode::Direct], Default::default());
    let err = connector
        .connect(&TransportEndpoint::network(TransportMode::Udp, "192.168.86.100", None))
        .err()
        .expect("no udp server");
    assert_eq!(
        err.to_string(),
        "transport udp rejected: no simulation server reachable at udp://192.168.86.100:1234"
    );
}
