//! ---
//! grip_section: "01-core-functionality"
//! grip_subsection: "module"
//! grip_type: "source"
//! grip_scope: "code"
//! grip_description: "Checks the configuration shipped in configs/ against the built-in defaults."
//! grip_version: "v0.0.0-prealpha"
//! grip_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::Result;
use r_grip_common::{AppConfig, LogFormat, TransportMode};

fn shipped_config_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../configs/gripper.toml")
}

#[test]
fn shipped_config_matches_defaults() -> Result<()> {
    let shipped = AppConfig::from_path(shipped_config_path())?;
    let defaults = AppConfig::default();

    assert_eq!(shipped.backend.preferred_transport, TransportMode::SharedMemory);
    assert_eq!(shipped.backend.fallback_transport, TransportMode::Gui);
    assert_eq!(shipped.backend.call_log_capacity, defaults.backend.call_log_capacity);
    assert_eq!(shipped.scene.descriptor, defaults.scene.descriptor);
    assert_eq!(shipped.scene.base_position, defaults.scene.base_position);
    assert_eq!(shipped.scene.base_orientation, defaults.scene.base_orientation);
    assert_eq!(
        shipped.scene.initial_joint_positions,
        defaults.scene.initial_joint_positions
    );
    assert_eq!(shipped.scene.anchor_parent_point, defaults.scene.anchor_parent_point);
    assert_eq!(shipped.scene.anchor_world_point, defaults.scene.anchor_world_point);
    assert_eq!(shipped.scene.gravity, None);
    assert_eq!(shipped.gripper.actuated_joints, defaults.gripper.actuated_joints);
    assert_eq!(shipped.input.poll_interval, defaults.input.poll_interval);
    assert_eq!(shipped.logging.format, LogFormat::Pretty);
    assert_eq!(shipped.catalog, defaults.catalog);
    Ok(())
}
