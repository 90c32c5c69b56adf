//! ---
//! grip_section: "05-cli"
//! grip_subsection: "binary"
//! grip_type: "source"
//! grip_scope: "code"
//! grip_description: "Descriptor discovery for the list-models command."
//! grip_version: "v0.0.0-prealpha"
//! grip_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use r_grip_common::AppConfig;
use walkdir::WalkDir;

const DESCRIPTOR_EXTENSION: &str = "urdf";

/// Descriptor found under the asset path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredModel {
    /// Path relative to the asset root, as it would be passed to a load.
    pub descriptor: String,
    /// Joint count from the catalog, if the model is known.
    pub joint_count: Option<usize>,
}

pub fn discover(root: &Path, config: &AppConfig) -> Result<Vec<DiscoveredModel>> {
    if !root.is_dir() {
        bail!("asset path {} is not a directory", root.display());
    }
    let mut models = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry =
            entry.with_context(|| format!("failed to walk asset path {}", root.display()))?;
        if !entry.file_type().is_file() || !is_descriptor(entry.path()) {
            continue;
        }
        let relative: PathBuf = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_path_buf();
        let descriptor = relative.to_string_lossy().replace('\\', "/");
        let file_name = entry.file_name().to_string_lossy();
        let joint_count = config
            .catalog_entry(&descriptor)
            .or_else(|| config.catalog_entry(&file_name))
            .map(|entry| entry.joint_count);
        models.push(DiscoveredModel {
            descriptor,
            joint_count,
        });
    }
    Ok(models)
}

fn is_descriptor(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(DESCRIPTOR_EXTENSION))
        .unwrap_or(false)
}

pub fn list(config: &AppConfig) -> Result<()> {
    let root = &config.scene.asset_path;
    let models = discover(root, config)?;
    if models.is_empty() {
        println!("no descriptors found under {}", root.display());
        return Ok(());
    }
    for model in models {
        let marker = if model.descriptor == config.scene.descriptor {
            "*"
        } else {
            " "
        };
        match model.joint_count {
            Some(joints) => println!("{} {} ({} joints)", marker, model.descriptor, joints),
            None => println!("{} {} (not in catalog)", marker, model.descriptor),
        }
    }
    Ok(())
}
