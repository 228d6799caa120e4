//! Dispatch configuration.
//!
//! Sources, later ones overriding earlier ones:
//! 1. built-in defaults (every capability allowed)
//! 2. an optional TOML file
//! 3. `VECMETRIC_*` environment variables
//!
//! ```toml
//! # vecmetric.toml
//! allowed = ["avx2", "neon"]   # or "avx2,neon", "none", "all"
//! ```
//!
//! `VECMETRIC_ALLOWED=serial` (or `none`) forces the portable kernels.

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::capability::Capabilities;
use crate::error::Result;

/// Prefix of every environment variable read by [`DispatchConfig`].
pub const ENV_PREFIX: &str = "VECMETRIC_";

/// Environment variable naming the TOML file read by [`DispatchConfig::from_env`].
pub const CONFIG_PATH_ENV: &str = "VECMETRIC_CONFIG";

/// Capability override applied when selecting kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Capabilities kernels may use; intersected with the detected ones.
    pub allowed: Capabilities,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            allowed: Capabilities::all(),
        }
    }
}

impl DispatchConfig {
    /// Layered provider: defaults, then `path` (if any), then the environment.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]))
    }

    /// Loads the configuration from `path` and the environment.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Config`] if a source holds a value that is not a
    /// capability list.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(path).extract()?;
        tracing::debug!(allowed = %config.allowed, path = ?path, "loaded dispatch configuration");
        Ok(config)
    }

    /// Loads from the file named by `VECMETRIC_CONFIG` (if set) and the
    /// environment, falling back to defaults when either is invalid.
    #[must_use]
    pub fn from_env() -> Self {
        let path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        Self::load(path.as_deref()).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "invalid dispatch configuration, allowing all capabilities");
            Self::default()
        })
    }
}
