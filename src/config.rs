//! Endpoint configuration and config-file loading.
//!
//! The config file is a flat list of `key = value` lines:
//!
//! ```text
//! # ~/.config/readinglist/config.toml
//! username = "Ferris"
//! entries_url = "https://en.wikipedia.org/api/rest_v1/data/lists/110563/entries/"
//! request_interval_ms = 500
//! cache_path = "/var/cache/readinglist.db"
//! ```
//!
//! The password is never read from the file; it comes from the environment
//! or the command line.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;

/// Default login page.
pub const DEFAULT_LOGIN_URL: &str = "https://en.wikipedia.org/wiki/Special:UserLogin";

/// Default paginated entries endpoint.
pub const DEFAULT_ENTRIES_URL: &str =
    "https://en.wikipedia.org/api/rest_v1/data/lists/110563/entries/";

/// Default batch extract endpoint, up to and including `titles=`.
pub const DEFAULT_EXTRACTS_URL: &str = "https://en.wikipedia.org/w/api.php?format=json&action=query&prop=extracts&exintro&explaintext&redirects=0&titles=";

/// Largest accepted request interval in milliseconds.
pub const MAX_REQUEST_INTERVAL_MS: u64 = 60_000;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Io {
        /// Config file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A config line is malformed.
    #[error("invalid config on line {line}: {reason}")]
    InvalidLine {
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        reason: String,
    },

    /// A value is out of range or not a valid URL.
    #[error("invalid config value for `{key}`: {reason}")]
    InvalidValue {
        /// The offending key.
        key: &'static str,
        /// What was wrong.
        reason: String,
    },
}

/// Remote service URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Login page; also the credential POST target.
    pub login_url: String,
    /// Authenticated, paginated list entries endpoint.
    pub entries_url: String,
    /// Public batch extract endpoint prefix.
    pub extracts_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
            entries_url: DEFAULT_ENTRIES_URL.to_string(),
            extracts_url: DEFAULT_EXTRACTS_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Checks that every endpoint is an absolute URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad endpoint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url("login_url", &self.login_url)?;
        validate_url("entries_url", &self.entries_url)?;
        validate_url("extracts_url", &self.extracts_url)?;
        Ok(())
    }
}

fn validate_url(key: &'static str, value: &str) -> Result<(), ConfigError> {
    Url::parse(value).map(|_| ()).map_err(|e| ConfigError::InvalidValue {
        key,
        reason: format!("{value:?} is not an absolute URL ({e})"),
    })
}

/// Values read from the config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Login page URL.
    pub login_url: Option<String>,
    /// Entries endpoint URL.
    pub entries_url: Option<String>,
    /// Extract endpoint prefix.
    pub extracts_url: Option<String>,
    /// Delay before each remote call, in milliseconds.
    pub request_interval_ms: Option<u64>,
    /// SQLite cache location.
    pub cache_path: Option<PathBuf>,
    /// Account name.
    pub username: Option<String>,
}

impl FileConfig {
    /// Applies file values over the defaults.
    #[must_use]
    pub fn endpoints(&self) -> Endpoints {
        let defaults = Endpoints::default();
        Endpoints {
            login_url: self.login_url.clone().unwrap_or(defaults.login_url),
            entries_url: self.entries_url.clone().unwrap_or(defaults.entries_url),
            extracts_url: self.extracts_url.clone().unwrap_or(defaults.extracts_url),
        }
    }

    /// Validates values against runtime constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_request_interval(self.request_interval_ms)?;
        self.endpoints().validate()
    }
}

/// Checks the request interval range.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] above [`MAX_REQUEST_INTERVAL_MS`].
pub fn validate_request_interval(value: Option<u64>) -> Result<(), ConfigError> {
    match value {
        Some(ms) if ms > MAX_REQUEST_INTERVAL_MS => Err(ConfigError::InvalidValue {
            key: "request_interval_ms",
            reason: format!("{ms}. Expected range: 0..={MAX_REQUEST_INTERVAL_MS}"),
        }),
        _ => Ok(()),
    }
}

/// Config file loaded from disk, with provenance.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    /// Resolved config path (whether or not it exists).
    pub path: Option<PathBuf>,
    /// Parsed config, when a file was found.
    pub config: Option<FileConfig>,
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/readinglist/config.toml`
/// 2. `$HOME/.config/readinglist/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("readinglist")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("readinglist")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from `explicit` if given, otherwise from the default path
/// when that file exists.
///
/// # Errors
///
/// Returns [`ConfigError`] when a file exists but cannot be read, parsed or
/// validated. An explicit path that does not exist is an IO error.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    if let Some(path) = explicit {
        let config = load_file_config(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config: Some(config),
        });
    }

    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(load_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

/// Reads, parses and validates one config file.
///
/// # Errors
///
/// Returns [`ConfigError`] on read, parse or validation failure.
pub fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config_str(&raw)?;
    config.validate()?;
    Ok(config)
}

/// Parses `key = value` config text.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidLine`] for syntax errors, unknown keys and
/// ill-typed values.
pub fn parse_config_str(raw: &str) -> Result<FileConfig, ConfigError> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_number = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            return Err(invalid_line(line_number, "expected key = value"));
        };
        let key = raw_key.trim();
        let value = raw_value.trim();
        let string_value = || {
            parse_string_literal(value)
                .ok_or_else(|| invalid_line(line_number, format!("`{key}` must be a quoted string")))
        };

        match key {
            "login_url" => cfg.login_url = Some(string_value()?),
            "entries_url" => cfg.entries_url = Some(string_value()?),
            "extracts_url" => cfg.extracts_url = Some(string_value()?),
            "username" => cfg.username = Some(string_value()?),
            "cache_path" => cfg.cache_path = Some(PathBuf::from(string_value()?)),
            "request_interval_ms" => {
                let parsed = value.parse::<u64>().map_err(|_| {
                    invalid_line(line_number, "`request_interval_ms` must be a non-negative integer")
                })?;
                cfg.request_interval_ms = Some(parsed);
            }
            "password" => {
                return Err(invalid_line(
                    line_number,
                    "`password` is not accepted in the config file; use READINGLIST_PASSWORD",
                ));
            }
            other => return Err(invalid_line(line_number, format!("unknown key `{other}`"))),
        }
    }
    Ok(cfg)
}

fn invalid_line(line: usize, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidLine {
        line,
        reason: reason.into(),
    }
}

/// Drops a `#` comment that is not inside a quoted string.
fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;
    for (index, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

/// Parses a double-quoted string with `\"` and `\\` escapes.
fn parse_string_literal(value: &str) -> Option<String> {
    let inner = value.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next()? {
                '"' => out.push('"'),
                '\\' => out.push('\\'),
                _ => return None,
            }
        } else {
            out.push(ch);
        }
    }
    Some(out)
}
