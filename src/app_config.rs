//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// TOML-backed file configuration for patchdl defaults.
#[derive(Debug, Clone, Default)]
pub struct FileConfig {
    /// Listing page to scrape for downloadable files.
    pub listing_url: Option<String>,
    /// Regex a link's URL path must match to be kept.
    pub file_pattern: Option<String>,
    /// Default destination directory for downloads.
    pub destination: Option<PathBuf>,
    /// Default parallel download bound (same range as CLI).
    pub max_parallel: Option<u8>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(max_parallel) = self.max_parallel
            && !(1..=16).contains(&max_parallel)
        {
            bail!("Invalid config value for `max_parallel`: {max_parallel}. Expected range: 1..=16");
        }

        if let Some(pattern) = &self.file_pattern
            && let Err(e) = regex::Regex::new(pattern)
        {
            bail!("Invalid config value for `file_pattern`: {e}");
        }

        Ok(())
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/patchdl/config.toml`
/// 2. `$HOME/.config/patchdl/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("patchdl")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("patchdl")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from an explicit path, or the default path if present.
///
/// An explicit path must exist; the default path is optional.
pub fn load_file_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let config = parse_config_file(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config: Some(config),
        });
    }

    let path = resolve_default_config_path();
    let Some(path_ref) = path.as_deref() else {
        return Ok(LoadedConfig { path, config: None });
    };

    if !path_ref.exists() {
        return Ok(LoadedConfig { path, config: None });
    }

    let config = parse_config_file(path_ref)?;
    Ok(LoadedConfig {
        path,
        config: Some(config),
    })
}

fn parse_config_file(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();

        match key {
            "listing_url" => {
                let parsed = parse_string_literal(value).with_context(|| {
                    format!("Invalid `listing_url` value on line {}", line_index + 1)
                })?;
                cfg.listing_url = Some(parsed);
            }
            "file_pattern" => {
                let parsed = parse_string_literal(value).with_context(|| {
                    format!("Invalid `file_pattern` value on line {}", line_index + 1)
                })?;
                cfg.file_pattern = Some(parsed);
            }
            "destination" => {
                let parsed = parse_string_literal(value).with_context(|| {
                    format!("Invalid `destination` value on line {}", line_index + 1)
                })?;
                cfg.destination = Some(PathBuf::from(parsed));
            }
            "max_parallel" => {
                let parsed = parse_integer_u8(value).with_context(|| {
                    format!("Invalid `max_parallel` value on line {}", line_index + 1)
                })?;
                cfg.max_parallel = Some(parsed);
            }
            unknown => {
                bail!(
                    "Unknown configuration key: '{}' on line {}",
                    unknown,
                    line_index + 1
                );
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u8(raw_value: &str) -> Result<u8> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<u16>()?;
    u8::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u8"))
}
