use std::fs;
use std::path::{Path, PathBuf};

use crate::io::json_store::JsonStore;
use crate::io::store::{CaseStore, StoreError};
use crate::model::config::OfficeConfig;
use crate::model::office::Office;

/// Error type for office workspace I/O
#[derive(Debug, thiserror::Error)]
pub enum OfficeError {
    #[error("not a tramita office: no tramita/ directory found")]
    NotAnOffice,
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config.toml: {0}")]
    ConfigParseError(#[from] toml::de::Error),
    #[error("invalid config.toml: {0}")]
    ConfigEditError(#[from] toml_edit::TomlError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Discover the office by walking up from the given directory, looking for
/// a `tramita/` subdirectory with a config.toml inside.
pub fn discover_office(start: &Path) -> Result<PathBuf, OfficeError> {
    let mut current = start.to_path_buf();
    loop {
        let tramita_dir = current.join("tramita");
        if tramita_dir.is_dir() && tramita_dir.join("config.toml").exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(OfficeError::NotAnOffice);
        }
    }
}

/// Load a complete office from the given root directory: config plus every
/// case in the store.
pub fn load_office(root: &Path) -> Result<Office, OfficeError> {
    let tramita_dir = root.join("tramita");
    if !tramita_dir.is_dir() {
        return Err(OfficeError::NotAnOffice);
    }

    let config_path = tramita_dir.join("config.toml");
    let config_text = fs::read_to_string(&config_path).map_err(|e| OfficeError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;
    let config: OfficeConfig = toml::from_str(&config_text)?;

    let store = JsonStore::new(&tramita_dir);
    let cases = store.all_cases()?;

    Ok(Office {
        root: root.to_path_buf(),
        tramita_dir,
        config,
        cases,
    })
}

/// Read the office config, returning both the parsed config and the raw
/// toml_edit document for round-trip-safe editing.
pub fn read_config(
    tramita_dir: &Path,
) -> Result<(OfficeConfig, toml_edit::DocumentMut), OfficeError> {
    let config_path = tramita_dir.join("config.toml");
    let config_text = fs::read_to_string(&config_path).map_err(|e| OfficeError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;
    let config: OfficeConfig = toml::from_str(&config_text)?;
    let doc: toml_edit::DocumentMut = config_text.parse()?;
    Ok((config, doc))
}

/// Write the config document back to disk, preserving formatting.
pub fn write_config(tramita_dir: &Path, doc: &toml_edit::DocumentMut) -> Result<(), OfficeError> {
    let config_path = tramita_dir.join("config.toml");
    fs::write(&config_path, doc.to_string()).map_err(|e| OfficeError::WriteError {
        path: config_path,
        source: e,
    })?;
    Ok(())
}

/// Flip a workflow rule's is_active flag in the config document. Returns
/// false when no rule with that id exists.
pub fn set_rule_active(doc: &mut toml_edit::DocumentMut, rule_id: &str, active: bool) -> bool {
    if let Some(rules) = doc.get_mut("rules").and_then(|r| r.as_array_of_tables_mut()) {
        for table in rules.iter_mut() {
            if table.get("id").and_then(|v| v.as_str()) == Some(rule_id) {
                table["is_active"] = toml_edit::value(active);
                return true;
            }
        }
    }
    false
}
