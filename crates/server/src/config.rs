//! `swagger-targets.json` discovery and loading.
//!
//! The file maps an alias to a spec location, either as a plain string or as
//! `{ "spec": "...", "baseUrl": "..." }`. Relative file paths are resolved against the directory
//! containing the config file.

use crate::error::{Result, ServerError};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub const TARGETS_FILE_NAME: &str = "swagger-targets.json";
pub const CONFIG_ENV: &str = "SWAGGER_MCP_CONFIG";
const HOME_CONFIG_DIR: &str = ".swagger-mcp";

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TargetEntry {
    Spec(String),
    Detailed {
        spec: String,
        #[serde(rename = "baseUrl", default)]
        base_url: Option<String>,
    },
}

/// One configured service, with its spec location already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceTarget {
    pub alias: String,
    pub spec: String,
    #[serde(rename = "baseUrl", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TargetsConfig {
    path: Option<PathBuf>,
    targets: IndexMap<String, ServiceTarget>,
}

impl TargetsConfig {
    /// Load and resolve a targets file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a JSON object of targets.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|source| ServerError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        let entries: IndexMap<String, TargetEntry> =
            serde_json::from_slice(&bytes).map_err(|source| ServerError::ConfigParse {
                path: path.display().to_string(),
                source,
            })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let targets = entries
            .into_iter()
            .map(|(alias, entry)| {
                let (spec, base_url) = match entry {
                    TargetEntry::Spec(spec) => (spec, None),
                    TargetEntry::Detailed { spec, base_url } => (spec, base_url),
                };
                let target = ServiceTarget {
                    alias: alias.clone(),
                    spec: resolve_spec_location(base_dir, &spec),
                    base_url: base_url.filter(|b| !b.is_empty()),
                };
                (alias, target)
            })
            .collect();

        Ok(Self {
            path: Some(path.to_path_buf()),
            targets,
        })
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn get(&self, alias: &str) -> Option<&ServiceTarget> {
        self.targets.get(alias)
    }

    pub fn targets(&self) -> impl Iterator<Item = &ServiceTarget> {
        self.targets.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// URLs and absolute paths are kept verbatim; anything else is relative to `base_dir`.
fn resolve_spec_location(base_dir: &Path, spec: &str) -> String {
    let is_url = ["http://", "https://", "file://"]
        .iter()
        .any(|scheme| spec.starts_with(scheme));
    if is_url || Path::new(spec).is_absolute() {
        spec.to_string()
    } else {
        base_dir.join(spec).display().to_string()
    }
}

/// Where to look for the targets file, in priority order.
#[derive(Debug, Clone)]
pub struct ConfigLocator {
    explicit: Option<PathBuf>,
    env: Option<PathBuf>,
    cwd: Option<PathBuf>,
    home: Option<PathBuf>,
}

impl ConfigLocator {
    #[must_use]
    pub fn new(
        explicit: Option<PathBuf>,
        env: Option<PathBuf>,
        cwd: Option<PathBuf>,
        home: Option<PathBuf>,
    ) -> Self {
        Self {
            explicit,
            env,
            cwd,
            home,
        }
    }

    /// Locator for this process: `explicit`, then `$SWAGGER_MCP_CONFIG`, the working directory
    /// and `$HOME/.swagger-mcp`.
    #[must_use]
    pub fn from_process(explicit: Option<PathBuf>) -> Self {
        let env = std::env::var_os(CONFIG_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let home = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from);
        Self::new(explicit, env, std::env::current_dir().ok(), home)
    }

    /// Every candidate file, highest priority first. Directories get the file name appended.
    #[must_use]
    pub fn candidates(&self) -> Vec<PathBuf> {
        let as_file = |p: &PathBuf| {
            if p.is_dir() {
                p.join(TARGETS_FILE_NAME)
            } else {
                p.clone()
            }
        };
        let mut out: Vec<PathBuf> = Vec::new();
        out.extend(self.explicit.iter().map(as_file));
        out.extend(self.env.iter().map(as_file));
        out.extend(self.cwd.iter().map(|d| d.join(TARGETS_FILE_NAME)));
        out.extend(
            self.home
                .iter()
                .map(|h| h.join(HOME_CONFIG_DIR).join(TARGETS_FILE_NAME)),
        );
        out
    }

    /// First candidate that exists.
    #[must_use]
    pub fn locate(&self) -> Option<PathBuf> {
        self.candidates().into_iter().find(|p| p.is_file())
    }
}

/// Cached targets, re-read on demand.
pub struct ConfigStore {
    locator: ConfigLocator,
    current: RwLock<Arc<TargetsConfig>>,
}

impl ConfigStore {
    #[must_use]
    pub fn new(locator: ConfigLocator) -> Self {
        let config = load_located(&locator);
        Self {
            locator,
            current: RwLock::new(Arc::new(config)),
        }
    }

    #[must_use]
    pub fn current(&self) -> Arc<TargetsConfig> {
        self.current.read().clone()
    }

    /// Re-run discovery and replace the cached targets.
    pub fn reload(&self) -> Arc<TargetsConfig> {
        let config = Arc::new(load_located(&self.locator));
        *self.current.write() = Arc::clone(&config);
        config
    }
}

/// A missing or broken file yields an empty target set; neither is fatal.
fn load_located(locator: &ConfigLocator) -> TargetsConfig {
    let Some(path) = locator.locate() else {
        let searched: Vec<String> = locator
            .candidates()
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        info!(?searched, "no {TARGETS_FILE_NAME} found; no services configured");
        return TargetsConfig::default();
    };

    match TargetsConfig::load(&path) {
        Ok(config) => {
            info!(
                path = %path.display(),
                services = config.len(),
                "loaded service targets"
            );
            config
        }
        Err(e) => {
            warn!(error = %e, "ignoring unusable targets file");
            TargetsConfig::default()
        }
    }
}
