//! Runtime configuration from the environment.
//!
//! | Variable                 | Default              |
//! |--------------------------|----------------------|
//! | `COLSCRIPT_PORT`         | `3000`               |
//! | `COLSCRIPT_REGISTRY_DIR` | `.colscript/scripts` |
//! | `COLSCRIPT_MAX_UPLOAD`   | 50 MiB, in bytes     |
//!
//! A `.env` file in the working directory is loaded first when present.

use std::path::PathBuf;
use std::str::FromStr;

use crate::api::logs::log_warning;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_REGISTRY_DIR: &str = ".colscript/scripts";
pub const DEFAULT_MAX_UPLOAD: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// HTTP port for `serve`
    pub port: u16,
    /// Where the script registry lives
    pub registry_dir: PathBuf,
    /// Largest accepted upload body, in bytes
    pub max_upload: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            registry_dir: PathBuf::from(DEFAULT_REGISTRY_DIR),
            max_upload: DEFAULT_MAX_UPLOAD,
        }
    }
}

impl Config {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Unparsable values keep the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            port: parse_or("COLSCRIPT_PORT", lookup("COLSCRIPT_PORT"), defaults.port),
            registry_dir: lookup("COLSCRIPT_REGISTRY_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.registry_dir),
            max_upload: parse_or(
                "COLSCRIPT_MAX_UPLOAD",
                lookup("COLSCRIPT_MAX_UPLOAD"),
                defaults.max_upload,
            ),
        }
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match value {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log_warning(format!(
                "{}='{}' is not valid, using {}",
                key, raw, default
            ));
            default
        }),
    }
}
