//! ---
//! grip_section: "04-harness"
//! grip_subsection: "module"
//! grip_type: "source"
//! grip_scope: "code"
//! grip_description: "Scene setup and interactive control loop over a simulation backend."
//! grip_version: "v0.0.0-prealpha"
//! grip_owner: "tbd"
//! ---
//! Gripper simulation harness.
//!
//! [`SimulationHarness`] connects to a simulation backend, builds the scene
//! (asset path, reset, model, joint state, anchor, real-time mode) and then
//! alternates close and open actuation rounds driven by a [`TriggerSource`]
//! until a [`CancellationToken`] fires, the input ends, or the backend goes
//! away.
#![warn(missing_docs)]

pub mod cancel;
pub mod error;
pub mod gripper;
pub mod harness;
pub mod state;
pub mod trigger;

pub use cancel::CancellationToken;
pub use error::{HarnessError, Result};
pub use gripper::GripperProfile;
pub use harness::{LoopReport, LoopTermination, SimulationHarness};
pub use state::{HarnessState, LoopPhase};
pub use trigger::{ChannelTriggers, ConsoleTriggers, ScriptedTriggers, Trigger, TriggerSource};
