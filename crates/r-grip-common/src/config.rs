//! ---
//! grip_section: "01-core-functionality"
//! grip_subsection: "module"
//! grip_type: "source"
//! grip_scope: "code"
//! grip_description: "Shared primitives and utilities for the harness runtime."
//! grip_version: "v0.0.0-prealpha"
//! grip_owner: "tbd"
//! ---
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::debug;

use crate::logging::LogFormat;

/// Tolerance applied when checking that a configured orientation is a unit quaternion.
pub const QUATERNION_NORM_TOLERANCE: f64 = 1e-3;

fn default_preferred_transport() -> TransportMode {
    TransportMode::SharedMemory
}

fn default_fallback_transport() -> TransportMode {
    TransportMode::Gui
}

fn default_in_process_transports() -> Vec<TransportMode> {
    vec![TransportMode::Direct, TransportMode::Gui]
}

fn default_call_log_capacity() -> usize {
    4096
}

fn default_asset_path() -> PathBuf {
    PathBuf::from("assets")
}

fn default_descriptor() -> String {
    "pr2_gripper.urdf".to_owned()
}

fn default_base_position() -> [f64; 3] {
    [0.5, 0.300006, 0.7]
}

fn default_base_orientation() -> [f64; 4] {
    [-0.0, -0.0, -0.000031, 1.0]
}

fn default_initial_joint_positions() -> Vec<f64> {
    vec![0.550569, 0.0, 0.549657, 0.0]
}

fn default_anchor_parent_point() -> [f64; 3] {
    [0.2, 0.0, 0.0]
}

fn default_anchor_world_point() -> [f64; 3] {
    [0.5, 0.300006, 0.7]
}

fn default_true() -> bool {
    true
}

fn default_expected_joint_count() -> usize {
    4
}

fn default_actuated_joints() -> Vec<usize> {
    vec![0, 2]
}

fn default_close_position() -> f64 {
    0.7
}

fn default_motor_cap() -> f64 {
    1.0
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(50)
}

fn default_quit_words() -> Vec<String> {
    vec!["q".to_owned(), "quit".to_owned(), "exit".to_owned()]
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

/// Descriptor name to model metadata, in declaration order.
pub type ModelCatalog = IndexMap<String, CatalogEntry>;

fn default_catalog() -> ModelCatalog {
    let mut catalog = ModelCatalog::new();
    catalog.insert(
        default_descriptor(),
        CatalogEntry {
            joint_count: 4,
            description: Some("PR2 parallel gripper (two finger joints, two tip joints)".to_owned()),
        },
    );
    catalog
}

/// Primary configuration object for the R-GRIP runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub scene: SceneConfig,
    #[serde(default)]
    pub gripper: GripperConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Joint counts of the descriptors the in-process simulator knows how to instantiate.
    #[serde(default = "default_catalog")]
    pub catalog: ModelCatalog,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "R_GRIP_CONFIG";

    /// Load configuration from disk, respecting the `R_GRIP_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    /// Parse and validate a configuration file.
    pub fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to render configuration as toml")
    }

    /// Retrieve the catalog entry for a descriptor, if any.
    pub fn catalog_entry(&self, descriptor: &str) -> Option<&CatalogEntry> {
        self.catalog.get(descriptor)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.backend.validate()?;
        self.scene.validate()?;
        self.gripper.validate()?;
        self.input.validate()?;
        for descriptor in self.catalog.keys() {
            if descriptor.trim().is_empty() {
                return Err(anyhow!("catalog contains an entry with an empty descriptor"));
            }
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            scene: SceneConfig::default(),
            gripper: GripperConfig::default(),
            input: InputConfig::default(),
            logging: LoggingConfig::default(),
            catalog: default_catalog(),
        }
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Transport used to reach the simulation backend.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TransportMode {
    /// Attach to an already running simulation server over shared memory.
    SharedMemory,
    /// Start a simulation with its own interactive visualizer window.
    Gui,
    /// Headless simulation in the calling process.
    Direct,
    /// Remote simulation server reached over UDP.
    Udp,
    /// Remote simulation server reached over TCP.
    Tcp,
}

impl TransportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::SharedMemory => "shared-memory",
            TransportMode::Gui => "gui",
            TransportMode::Direct => "direct",
            TransportMode::Udp => "udp",
            TransportMode::Tcp => "tcp",
        }
    }

    /// Whether the transport needs a host/port pair.
    pub fn is_network(&self) -> bool {
        matches!(self, TransportMode::Udp | TransportMode::Tcp)
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "shared-memory" | "shm" => Ok(TransportMode::SharedMemory),
            "gui" => Ok(TransportMode::Gui),
            "direct" => Ok(TransportMode::Direct),
            "udp" => Ok(TransportMode::Udp),
            "tcp" => Ok(TransportMode::Tcp),
            other => Err(format!("unknown transport: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_preferred_transport")]
    pub preferred_transport: TransportMode,
    #[serde(default = "default_fallback_transport")]
    pub fallback_transport: TransportMode,
    /// Remote host for `udp`/`tcp` transports.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    /// Transports the in-process simulator accepts.
    #[serde(default = "default_in_process_transports")]
    pub in_process_transports: Vec<TransportMode>,
    /// Most recent calls the in-process simulator keeps in its call log.
    #[serde(default = "default_call_log_capacity")]
    pub call_log_capacity: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            preferred_transport: default_preferred_transport(),
            fallback_transport: default_fallback_transport(),
            host: None,
            port: None,
            in_process_transports: default_in_process_transports(),
            call_log_capacity: default_call_log_capacity(),
        }
    }
}

impl BackendConfig {
    pub fn validate(&self) -> Result<()> {
        if self.preferred_transport == self.fallback_transport {
            return Err(anyhow!(
                "fallback transport must differ from preferred transport ({})",
                self.preferred_transport
            ));
        }
        for transport in [self.preferred_transport, self.fallback_transport] {
            if transport.is_network() {
                let has_host = self
                    .host
                    .as_deref()
                    .map(|h| !h.trim().is_empty())
                    .unwrap_or(false);
                if !has_host {
                    return Err(anyhow!("transport '{}' requires backend.host", transport));
                }
            }
        }
        if self.call_log_capacity == 0 {
            return Err(anyhow!("backend.call_log_capacity must be greater than zero"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Root directory used to resolve model descriptors.
    #[serde(default = "default_asset_path")]
    pub asset_path: PathBuf,
    #[serde(default = "default_descriptor")]
    pub descriptor: String,
    #[serde(default = "default_base_position")]
    pub base_position: [f64; 3],
    /// Base orientation as an `[x, y, z, w]` quaternion.
    #[serde(default = "default_base_orientation")]
    pub base_orientation: [f64; 4],
    #[serde(default = "default_initial_joint_positions")]
    pub initial_joint_positions: Vec<f64>,
    /// Anchor point in the model's base frame.
    #[serde(default = "default_anchor_parent_point")]
    pub anchor_parent_point: [f64; 3],
    /// Anchor point in world coordinates.
    #[serde(default = "default_anchor_world_point")]
    pub anchor_world_point: [f64; 3],
    #[serde(default = "default_true")]
    pub real_time: bool,
    #[serde(default = "default_true")]
    pub disable_rendering_during_load: bool,
    /// Optional gravity vector applied once the model is anchored.
    #[serde(default)]
    pub gravity: Option<[f64; 3]>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            asset_path: default_asset_path(),
            descriptor: default_descriptor(),
            base_position: default_base_position(),
            base_orientation: default_base_orientation(),
            initial_joint_positions: default_initial_joint_positions(),
            anchor_parent_point: default_anchor_parent_point(),
            anchor_world_point: default_anchor_world_point(),
            real_time: true,
            disable_rendering_during_load: true,
            gravity: None,
        }
    }
}

impl SceneConfig {
    pub fn validate(&self) -> Result<()> {
        if self.descriptor.trim().is_empty() {
            return Err(anyhow!("scene.descriptor cannot be empty"));
        }
        ensure_finite("scene.base_position", &self.base_position)?;
        ensure_finite("scene.base_orientation", &self.base_orientation)?;
        ensure_finite("scene.initial_joint_positions", &self.initial_joint_positions)?;
        ensure_finite("scene.anchor_parent_point", &self.anchor_parent_point)?;
        ensure_finite("scene.anchor_world_point", &self.anchor_world_point)?;
        if let Some(gravity) = &self.gravity {
            ensure_finite("scene.gravity", gravity)?;
        }
        let norm = self
            .base_orientation
            .iter()
            .map(|c| c * c)
            .sum::<f64>()
            .sqrt();
        if (norm - 1.0).abs() > QUATERNION_NORM_TOLERANCE {
            return Err(anyhow!(
                "scene.base_orientation must be a unit quaternion (norm {:.6})",
                norm
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GripperConfig {
    /// Joint count the gripper profile was written against.
    #[serde(default = "default_expected_joint_count")]
    pub expected_joint_count: usize,
    #[serde(default = "default_actuated_joints")]
    pub actuated_joints: Vec<usize>,
    #[serde(default = "default_close_position")]
    pub close_position: f64,
    #[serde(default)]
    pub open_position: f64,
    #[serde(default = "default_motor_cap")]
    pub max_velocity: f64,
    #[serde(default = "default_motor_cap")]
    pub max_force: f64,
}

impl Default for GripperConfig {
    fn default() -> Self {
        Self {
            expected_joint_count: default_expected_joint_count(),
            actuated_joints: default_actuated_joints(),
            close_position: default_close_position(),
            open_position: 0.0,
            max_velocity: default_motor_cap(),
            max_force: default_motor_cap(),
        }
    }
}

impl GripperConfig {
    pub fn validate(&self) -> Result<()> {
        if self.actuated_joints.is_empty() {
            return Err(anyhow!("gripper.actuated_joints must name at least one joint"));
        }
        for (position, joint) in self.actuated_joints.iter().enumerate() {
            if *joint >= self.expected_joint_count {
                return Err(anyhow!(
                    "gripper.actuated_joints[{}] = {} is outside the expected joint count {}",
                    position,
                    joint,
                    self.expected_joint_count
                ));
            }
            if self.actuated_joints[..position].contains(joint) {
                return Err(anyhow!("gripper.actuated_joints lists joint {} twice", joint));
            }
        }
        ensure_finite(
            "gripper targets",
            &[self.close_position, self.open_position],
        )?;
        for (name, value) in [
            ("gripper.max_velocity", self.max_velocity),
            ("gripper.max_force", self.max_force),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(anyhow!("{} must be a finite, non-negative number", name));
            }
        }
        Ok(())
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// How long a trigger wait blocks before re-checking for cancellation.
    #[serde(default = "default_poll_interval")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub poll_interval: Duration,
    /// Console lines that end the control loop.
    #[serde(default = "default_quit_words")]
    pub quit_words: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            quit_words: default_quit_words(),
        }
    }
}

impl InputConfig {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(anyhow!("input.poll_interval must be greater than zero"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    pub joint_count: usize,
    #[serde(default)]
    pub description: Option<String>,
}

fn ensure_finite(name: &str, values: &[f64]) -> Result<()> {
    if let Some(idx) = values.iter().position(|v| !v.is_finite()) {
        return Err(anyhow!("{}[{}] is not a finite number", name, idx));
    }
    Ok(())
}
