//! ---
//! grip_section: "04-harness"
//! grip_subsection: "module"
//! grip_type: "source"
//! grip_scope: "code"
//! grip_description: "Gripper actuation profile derived from configuration."
//! grip_version: "v0.0.0-prealpha"
//! grip_owner: "tbd"
//! ---
use r_grip_backend::MotorCommand;
use r_grip_common::GripperConfig;

use crate::error::{HarnessError, Result};
use crate::trigger::Trigger;

/// Which joints move, where they move to, and under which caps.
#[derive(Debug, Clone, PartialEq)]
pub struct GripperProfile {
    /// Joint count the loaded model must expose.
    pub expected_joint_count: usize,
    /// Joint indices driven on every trigger, in command order.
    pub actuated_joints: Vec<usize>,
    /// Target position for a close.
    pub close_position: f64,
    /// Target position for an open.
    pub open_position: f64,
    /// Velocity cap passed with each command.
    pub max_velocity: f64,
    /// Force cap passed with each command.
    pub max_force: f64,
}

impl GripperProfile {
    /// Build the profile from the `[gripper]` section.
    pub fn from_config(config: &GripperConfig) -> Self {
        Self {
            expected_joint_count: config.expected_joint_count,
            actuated_joints: config.actuated_joints.clone(),
            close_position: config.close_position,
            open_position: config.open_position,
            max_velocity: config.max_velocity,
            max_force: config.max_force,
        }
    }

    /// Joint target for `trigger`.
    pub fn target_for(&self, trigger: Trigger) -> f64 {
        match trigger {
            Trigger::Close => self.close_position,
            Trigger::Open => self.open_position,
        }
    }

    /// One position command per actuated joint, in profile order.
    pub fn commands_for(&self, trigger: Trigger) -> Vec<MotorCommand> {
        let target = self.target_for(trigger);
        self.actuated_joints
            .iter()
            .map(|&joint| MotorCommand::position(joint, target, self.max_velocity, self.max_force))
            .collect()
    }

    /// Reject models whose joint layout does not match the profile.
    pub fn check_joint_count(&self, actual: usize) -> Result<()> {
        if actual != self.expected_joint_count
            || self.actuated_joints.iter().any(|&joint| joint >= actual)
        {
            return Err(HarnessError::UnexpectedJointCount {
                expected: self.expected_joint_count,
                actual,
            });
        }
        Ok(())
    }
}

impl Default for GripperProfile {
    fn default() -> Self {
        Self::from_config(&GripperConfig::default())
    }
}

impl From<&GripperConfig> for GripperProfile {
    fn from(config: &GripperConfig) -> Self {
        Self::from_config(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_drives_joints_zero_and_two() {
        let profile = GripperProfile::default();
        let close = profile.commands_for(Trigger::Close);
        assert_eq!(
            close.iter().map(|c| (c.joint_index, c.target_position)).collect::<Vec<_>>(),
            vec![(0, 0.7), (2, 0.7)]
        );
        let open = profile.commands_for(Trigger::Open);
        assert_eq!(
            open.iter().map(|c| (c.joint_index, c.target_position)).collect::<Vec<_>>(),
            vec![(0, 0.0), (2, 0.0)]
        );
        assert!(open.iter().all(|c| c.max_velocity == 1.0 && c.max_force == 1.0));
    }

    #[test]
    fn joint_count_must_match_profile() {
        let profile = GripperProfile::default();
        assert!(profile.check_joint_count(4).is_ok());
        assert!(matches!(
            profile.check_joint_count(3),
            Err(HarnessError::UnexpectedJointCount { expected: 4, actual: 3 })
        ));
    }
}
