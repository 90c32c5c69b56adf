//! ---
//! grip_section: "01-core-functionality"
//! grip_subsection: "module"
//! grip_type: "source"
//! grip_scope: "code"
//! grip_description: "Shared primitives and utilities for the harness runtime."
//! grip_version: "v0.0.0-prealpha"
//! grip_owner: "tbd"
//! ---
//! Core shared primitives for the R-GRIP workspace.
//! This crate exposes configuration loading and tracing bootstrap utilities
//! consumed by the backend, harness, and CLI crates.

pub mod config;
pub mod logging;

pub use config::{
    AppConfig, BackendConfig, CatalogEntry, GripperConfig, InputConfig,
    LoadedAppConfig, LoggingConfig, ModelCatalog, SceneConfig, TransportMode,
};
pub use logging::{init_tracing, LogFormat};
