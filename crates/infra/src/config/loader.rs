//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//! 5. Fills missing credentials from a credentials file
//!
//! ## Environment Variables
//! - `NESTBUFFER_CLIENT_ID`: OAuth client id
//! - `NESTBUFFER_CLIENT_SECRET`: OAuth client secret
//! - `NESTBUFFER_SURVEY_LAYER_URL`: Survey point feature layer
//! - `NESTBUFFER_BUFFER_LAYER_URL`: Buffer polygon feature layer
//! - `NESTBUFFER_TOKEN_URL`: Token endpoint (optional)
//! - `NESTBUFFER_GEOMETRY_SERVICE_URL`: Geometry server (optional)
//! - `NESTBUFFER_SPATIAL_REFERENCE`: WKID (optional, default 4326)
//! - `NESTBUFFER_MAX_PARALLEL`: Concurrent remote calls per pass (optional)
//! - `NESTBUFFER_TOKEN_EXPIRATION_MINUTES`: Token lifetime (optional)
//! - `NESTBUFFER_REQUEST_TIMEOUT_SECONDS`: HTTP timeout (optional)
//! - `NESTBUFFER_LOCK_DIR`: Directory for the PID file (optional)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./nestbuffer.toml` or `./nestbuffer.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. The same names next to the executable
//!
//! Credentials files (`cred.toml`, then the INI-style `cred.config`) are
//! probed the same way and may hold the keys at the top level or under a
//! `[DEFAULT]` section.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use nestbuffer_domain::{
    Config, Credentials, EndpointConfig, NestBufferError, Result, SyncConfig, DEFAULT_GEOMETRY_SERVICE_URL,
    DEFAULT_TOKEN_URL,
};
use serde::Deserialize;

use crate::errors::InfraError;

const CONFIG_FILE_NAMES: [&str; 4] = ["nestbuffer.toml", "nestbuffer.json", "config.toml", "config.json"];
const CREDENTIALS_FILE_NAMES: [&str; 3] = ["cred.toml", "credentials.toml", "cred.config"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to `config_path` or the probed config
/// file. Credentials missing from the result are then read from
/// `credentials_path` (or a probed `cred.toml`), with `NESTBUFFER_CLIENT_ID`
/// and `NESTBUFFER_CLIENT_SECRET` taking precedence over both files.
///
/// The returned configuration has normalized endpoints and has been
/// validated.
///
/// # Errors
/// Returns `NestBufferError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing or invalid
pub fn load(config_path: Option<PathBuf>, credentials_path: Option<PathBuf>) -> Result<Config> {
    let mut config = match (config_path, load_from_env()) {
        (None, Ok(config)) => {
            tracing::info!("Configuration loaded from environment variables");
            config
        }
        (path, env_result) => {
            if let Err(e) = env_result {
                tracing::debug!(error = %e, "Failed to load from environment, trying file");
            }
            load_from_file(path)?
        }
    };

    overlay_env_credentials(&mut config.credentials, |key| std::env::var(key).ok());

    if !config.credentials.is_complete() {
        let path = match credentials_path {
            Some(path) => Some(path),
            None => probe_credentials_paths(),
        };
        if let Some(path) = path {
            let from_file = load_credentials(&path)?;
            merge_credentials(&mut config.credentials, from_file);
        }
    }

    config.endpoints = config.endpoints.normalized();
    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// The credential and layer URL variables must be present; everything else
/// falls back to its default.
///
/// # Environment Variables
/// See module documentation for the complete list.
///
/// # Errors
/// Returns `NestBufferError::Config` if required variables are missing
/// or have invalid values.
pub fn load_from_env() -> Result<Config> {
    load_from_lookup(|key| std::env::var(key).ok())
}

fn load_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config> {
    let required = |key: &str| {
        lookup(key)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| NestBufferError::Config(format!("Missing required environment variable: {key}")))
    };

    let credentials =
        Credentials::new(required("NESTBUFFER_CLIENT_ID")?, required("NESTBUFFER_CLIENT_SECRET")?);
    let endpoints = EndpointConfig {
        token_url: lookup("NESTBUFFER_TOKEN_URL").unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
        survey_layer_url: required("NESTBUFFER_SURVEY_LAYER_URL")?,
        buffer_layer_url: required("NESTBUFFER_BUFFER_LAYER_URL")?,
        geometry_service_url: lookup("NESTBUFFER_GEOMETRY_SERVICE_URL")
            .unwrap_or_else(|| DEFAULT_GEOMETRY_SERVICE_URL.to_string()),
    };

    let defaults = SyncConfig::default();
    let sync = SyncConfig {
        spatial_reference: env_parse(&lookup, "NESTBUFFER_SPATIAL_REFERENCE", defaults.spatial_reference)?,
        max_parallel: env_parse(&lookup, "NESTBUFFER_MAX_PARALLEL", defaults.max_parallel)?,
        token_expiration_minutes: env_parse(
            &lookup,
            "NESTBUFFER_TOKEN_EXPIRATION_MINUTES",
            defaults.token_expiration_minutes,
        )?,
        request_timeout_seconds: env_parse(
            &lookup,
            "NESTBUFFER_REQUEST_TIMEOUT_SECONDS",
            defaults.request_timeout_seconds,
        )?,
        lock_dir: lookup("NESTBUFFER_LOCK_DIR").map(PathBuf::from),
    };

    Ok(Config { credentials, endpoints, sync })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Arguments
/// * `path` - Optional path to config file. If `None`, uses
///   [`probe_config_paths`].
///
/// # Errors
/// Returns `NestBufferError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(NestBufferError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            NestBufferError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| NestBufferError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => Ok(toml::from_str(contents).map_err(InfraError::from)?),
        "json" => serde_json::from_str(contents)
            .map_err(|e| NestBufferError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(NestBufferError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Credentials file layout: keys at the top level, under `[DEFAULT]`, or
/// both (top level wins).
#[derive(Debug, Default, Deserialize)]
struct CredentialsFile {
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default, rename = "DEFAULT", alias = "default")]
    default: Option<Box<CredentialsFile>>,
}

/// Read client credentials from a credentials file.
///
/// `.toml` files are parsed as TOML; anything else (such as `cred.config`)
/// as INI with unquoted values.
///
/// # Errors
/// Returns `NestBufferError::Config` if the file cannot be read or parsed.
pub fn load_credentials(path: &Path) -> Result<Credentials> {
    let file = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => {
            let contents = std::fs::read_to_string(path).map_err(|e| {
                NestBufferError::Config(format!("Failed to read credentials file {}: {e}", path.display()))
            })?;
            toml::from_str::<CredentialsFile>(&contents).map_err(InfraError::from)?
        }
        _ => read_ini_credentials(path)?,
    };

    let section = file.default.unwrap_or_default();
    let credentials = Credentials::new(
        file.client_id.or(section.client_id).unwrap_or_default(),
        file.client_secret.or(section.client_secret).unwrap_or_default(),
    );

    tracing::info!(
        path = %path.display(),
        complete = credentials.is_complete(),
        "Loaded credentials file"
    );
    Ok(credentials)
}

fn read_ini_credentials(path: &Path) -> Result<CredentialsFile> {
    let invalid = |e: ::config::ConfigError| {
        NestBufferError::Config(format!("Invalid credentials file {}: {e}", path.display()))
    };

    ::config::Config::builder()
        .add_source(::config::File::from(path).format(::config::FileFormat::Ini))
        .build()
        .map_err(invalid)?
        .try_deserialize()
        .map_err(invalid)
}

/// Probe multiple paths for configuration files
///
/// Searches the current working directory, then the directory holding the
/// executable. Returns the first config file found, or `None`.
pub fn probe_config_paths() -> Option<PathBuf> {
    probe(&CONFIG_FILE_NAMES)
}

/// Probe the same locations as [`probe_config_paths`] for a credentials file.
pub fn probe_credentials_paths() -> Option<PathBuf> {
    probe(&CREDENTIALS_FILE_NAMES)
}

fn probe(names: &[&str]) -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter().flat_map(|dir| names.iter().map(move |name| dir.join(name))).find(|path| path.exists())
}

fn overlay_env_credentials(credentials: &mut Credentials, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(client_id) = lookup("NESTBUFFER_CLIENT_ID").filter(|v| !v.trim().is_empty()) {
        credentials.client_id = client_id;
    }
    if let Some(client_secret) = lookup("NESTBUFFER_CLIENT_SECRET").filter(|v| !v.trim().is_empty()) {
        credentials.client_secret = client_secret;
    }
}

/// Fill empty fields of `target` from `source`.
fn merge_credentials(target: &mut Credentials, source: Credentials) {
    if target.client_id.trim().is_empty() {
        target.client_id = source.client_id;
    }
    if target.client_secret.trim().is_empty() {
        target.client_secret = source.client_secret;
    }
}

/// Parse an optional environment variable, falling back to `default`.
fn env_parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| NestBufferError::Config(format!("Invalid value for {key}: {e}"))),
        None => Ok(default),
    }
}
