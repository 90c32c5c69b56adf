//! ---
//! grip_section: "02-backend-interface"
//! grip_subsection: "module"
//! grip_type: "source"
//! grip_scope: "code"
//! grip_description: "Strongly typed request and handle types for backend calls."
//! grip_version: "v0.0.0-prealpha"
//! grip_owner: "tbd"
//! ---
use std::fmt;

use r_grip_common::config::QUATERNION_NORM_TOLERANCE;

use crate::{BackendError, Result};

/// Cartesian vector `[x, y, z]` in metres.
pub type Vec3 = [f64; 3];

/// Orientation quaternion in `[x, y, z, w]` order.
pub type Quaternion = [f64; 4];

/// Identity orientation.
pub const IDENTITY_ORIENTATION: Quaternion = [0.0, 0.0, 0.0, 1.0];

/// Handle to an articulated body loaded into the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u32);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

/// Handle to a constraint created in the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId(pub u32);

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "constraint#{}", self.0)
    }
}

/// Link addressed on a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkIndex {
    /// The body's root link.
    Base,
    /// A child link by index.
    Link(usize),
}

/// Request to instantiate an articulated body at a pose.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadBodyRequest {
    /// Descriptor path, resolved relative to the asset search path.
    pub descriptor: String,
    /// Base position in world coordinates.
    pub position: Vec3,
    /// Base orientation.
    pub orientation: Quaternion,
}

impl LoadBodyRequest {
    /// Build a request at the given pose.
    pub fn new(descriptor: impl Into<String>, position: Vec3, orientation: Quaternion) -> Self {
        Self {
            descriptor: descriptor.into(),
            position,
            orientation,
        }
    }

    /// Check the request before it reaches the simulator.
    pub fn validate(&self) -> Result<()> {
        if self.descriptor.trim().is_empty() {
            return Err(BackendError::InvalidArgument(
                "descriptor cannot be empty".into(),
            ));
        }
        ensure_finite("position", &self.position)?;
        ensure_unit_quaternion("orientation", &self.orientation)
    }
}

/// Kind of joint a constraint creates. Only fixed joints are used by the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintJointType {
    /// Zero degrees of freedom between parent and child frames.
    Fixed,
}

/// One side of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintEndpoint {
    /// A link on a loaded body.
    Body {
        /// Body handle.
        body: BodyId,
        /// Link on the body.
        link: LinkIndex,
    },
    /// The static world frame.
    World,
}

/// Request to bind a point on one frame to a point on another.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedConstraintRequest {
    /// Frame whose local point is anchored.
    pub parent: ConstraintEndpoint,
    /// Frame the point is anchored to.
    pub child: ConstraintEndpoint,
    /// Constraint joint type.
    pub joint_type: ConstraintJointType,
    /// Joint axis; ignored by fixed joints but forwarded as given.
    pub joint_axis: Vec3,
    /// Anchor point in the parent frame.
    pub parent_frame_position: Vec3,
    /// Anchor point in the child frame (world coordinates when the child is the world).
    pub child_frame_position: Vec3,
}

impl FixedConstraintRequest {
    /// Anchor `parent_point` on the base of `body` to `world_point`.
    pub fn anchor_to_world(body: BodyId, parent_point: Vec3, world_point: Vec3) -> Self {
        Self {
            parent: ConstraintEndpoint::Body {
                body,
                link: LinkIndex::Base,
            },
            child: ConstraintEndpoint::World,
            joint_type: ConstraintJointType::Fixed,
            joint_axis: [0.0, 0.0, 0.0],
            parent_frame_position: parent_point,
            child_frame_position: world_point,
        }
    }

    /// Check the request before it reaches the simulator.
    pub fn validate(&self) -> Result<()> {
        if self.parent == ConstraintEndpoint::World && self.child == ConstraintEndpoint::World {
            return Err(BackendError::InvalidArgument(
                "a constraint needs at least one body endpoint".into(),
            ));
        }
        ensure_finite("joint_axis", &self.joint_axis)?;
        ensure_finite("parent_frame_position", &self.parent_frame_position)?;
        ensure_finite("child_frame_position", &self.child_frame_position)
    }
}

/// Actuation mode for a joint motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    /// Drive the joint toward a target position under velocity and force caps.
    Position,
}

/// Actuator command for a single joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorCommand {
    /// Joint the command targets.
    pub joint_index: usize,
    /// Control mode.
    pub mode: ControlMode,
    /// Target joint position.
    pub target_position: f64,
    /// Velocity cap.
    pub max_velocity: f64,
    /// Force cap.
    pub max_force: f64,
}

impl MotorCommand {
    /// Position-control command.
    pub fn position(joint_index: usize, target_position: f64, max_velocity: f64, max_force: f64) -> Self {
        Self {
            joint_index,
            mode: ControlMode::Position,
            target_position,
            max_velocity,
            max_force,
        }
    }

    /// Check the command before it reaches the simulator.
    pub fn validate(&self) -> Result<()> {
        if !self.target_position.is_finite() {
            return Err(BackendError::InvalidArgument(format!(
                "target position for joint {} is not finite",
                self.joint_index
            )));
        }
        for (name, value) in [("max_velocity", self.max_velocity), ("max_force", self.max_force)] {
            if !value.is_finite() || value < 0.0 {
                return Err(BackendError::InvalidArgument(format!(
                    "{} for joint {} must be finite and non-negative (got {})",
                    name, self.joint_index, value
                )));
            }
        }
        Ok(())
    }
}

pub(crate) fn ensure_finite(name: &str, values: &[f64]) -> Result<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(idx) => Err(BackendError::InvalidArgument(format!(
            "{}[{}] is not finite",
            name, idx
        ))),
        None => Ok(()),
    }
}

fn ensure_unit_quaternion(name: &str, q: &Quaternion) -> Result<()> {
    ensure_finite(name, q)?;
    let norm = q.iter().map(|c| c * c).sum::<f64>().sqrt();
    if (norm - 1.0).abs() > QUATERNION_NORM_TOLERANCE {
        return Err(BackendError::InvalidArgument(format!(
            "{} is not a unit quaternion (norm {:.6})",
            name, norm
        )));
    }
    Ok(())
}
