//! cf-project: plant file format and validation.
//!
//! A plant file lists sensors, actuators and the control loops that tie them
//! together. Every load and save validates, so a [`PlantDef`] obtained from
//! this crate is always safe to build.

pub mod schema;
pub mod validate;

use std::path::{Path, PathBuf};

pub use schema::*;
pub use validate::{ValidationError, validate_plant};

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Unsupported plant file format: {path}")]
    UnsupportedFormat { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn parse_yaml(content: &str) -> ProjectResult<PlantDef> {
    let plant: PlantDef = serde_yaml::from_str(content)?;
    validate_plant(&plant)?;
    Ok(plant)
}

pub fn load_yaml(path: &Path) -> ProjectResult<PlantDef> {
    let content = std::fs::read_to_string(path)?;
    parse_yaml(&content)
}

pub fn save_yaml(path: &Path, plant: &PlantDef) -> ProjectResult<()> {
    validate_plant(plant)?;
    let content = serde_yaml::to_string(plant)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn parse_json(content: &str) -> ProjectResult<PlantDef> {
    let plant: PlantDef = serde_json::from_str(content)?;
    validate_plant(&plant)?;
    Ok(plant)
}

pub fn load_json(path: &Path) -> ProjectResult<PlantDef> {
    let content = std::fs::read_to_string(path)?;
    parse_json(&content)
}

pub fn save_json(path: &Path, plant: &PlantDef) -> ProjectResult<()> {
    validate_plant(plant)?;
    let content = serde_json::to_string_pretty(plant)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load a plant file, picking the format from the extension
/// (`.yaml`/`.yml` or `.json`).
pub fn load_path(path: &Path) -> ProjectResult<PlantDef> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml" | "yml") => load_yaml(path),
        Some("json") => load_json(path),
        _ => Err(ProjectError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}
