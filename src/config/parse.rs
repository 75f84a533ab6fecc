//! Configuration file parsing and discovery

use crate::config::types::Config;
use crate::error::{ConfigError, ConfigResult, Result};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file names to search for
pub const CONFIG_FILE_NAMES: &[&str] = &["brisk.yml", "brisk.yaml"];

/// Find the configuration file by searching current and parent directories
pub fn find_config_file() -> ConfigResult<PathBuf> {
    find_config_file_from(env::current_dir().map_err(|e| {
        ConfigError::Invalid(format!("Failed to get current directory: {}", e))
    })?)
}

/// Find the configuration file starting from a specific directory
pub fn find_config_file_from(start_dir: PathBuf) -> ConfigResult<PathBuf> {
    let mut current_dir = start_dir;
    let mut searched_paths = Vec::new();

    loop {
        for file_name in CONFIG_FILE_NAMES {
            let config_path = current_dir.join(file_name);
            searched_paths.push(config_path.display().to_string());

            if config_path.is_file() {
                return Ok(config_path);
            }
        }

        // Try parent directory
        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => {
                // Reached root without finding config
                return Err(ConfigError::NotFound(searched_paths.join(", ")));
            }
        }
    }
}

/// Read the raw, uninterpolated text of a configuration file
pub fn read_config_file(path: &Path) -> Result<String> {
    let contents = fs::read_to_string(path).map_err(|e| {
        ConfigError::Invalid(format!("Failed to read {}: {}", path.display(), e))
    })?;
    Ok(contents)
}

/// Parse configuration text into an order-preserving YAML tree
///
/// Empty and comment-only documents become an empty mapping.
pub fn parse_tree(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Mapping(Mapping::new()));
    }
    match serde_yaml::from_str::<Value>(text)? {
        Value::Null => Ok(Value::Mapping(Mapping::new())),
        tree => Ok(tree),
    }
}

/// Decode the definition model from a YAML tree
pub fn decode_config(tree: &Value) -> Result<Config> {
    Ok(Config::deserialize(tree)?)
}

/// Parse configuration from a string
pub fn parse_config(yaml: &str) -> Result<Config> {
    decode_config(&parse_tree(yaml)?)
}

/// Locate and read the configuration text with automatic file discovery
pub fn read_config_auto() -> Result<(String, PathBuf)> {
    let config_path = find_config_file()?;
    let text = read_config_file(&config_path)?;
    Ok((text, config_path))
}
