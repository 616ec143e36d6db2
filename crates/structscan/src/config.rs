//! Configuration for structscan.
//!
//! Loads settings from the nearest `.structscan.toml` at or above the scanned
//! sources, then from the environment. Uses figment for layered configuration
//! with provenance tracking.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment, Source,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the per-project configuration file.
pub const CONFIG_FILE_NAME: &str = ".structscan.toml";

/// Prefix for structscan-specific environment variables.
pub const ENV_PREFIX: &str = "STRUCTSCAN_";

/// structscan configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// GOPATH workspace roots, used when no `go.mod` is found (env: `GOPATH`).
    ///
    /// May hold several roots separated like `PATH`.
    #[serde(default)]
    pub gopath: Option<PathBuf>,

    /// Import path to use for `project_root` instead of the one in `go.mod`.
    #[serde(default)]
    pub module_path: Option<String>,

    /// Directory that `module_path` refers to.
    ///
    /// Relative roots are resolved against the directory holding the config
    /// file, or against the current directory when set from the environment.
    #[serde(default)]
    pub project_root: Option<PathBuf>,
}

impl Config {
    /// Load configuration for sources in the given directory.
    ///
    /// Layers: defaults <- nearest `.structscan.toml` <- `GOPATH` <- `STRUCTSCAN_*`.
    /// Returns default config if nothing is set. Reports parse errors with
    /// file, line, and key information and falls back to defaults.
    pub fn load(dir: &Path) -> Self {
        let dir = absolute(dir);
        let config_path = find_config_file(&dir);

        let figment = Figment::from(Serialized::defaults(Config::default()));

        // Only add TOML provider if a file exists
        let figment = match &config_path {
            Some(path) => figment.merge(Toml::file(path)),
            None => figment,
        };

        let figment = figment
            .merge(Env::raw().only(&["GOPATH"]).map(|_| "gopath".into()))
            .merge(Env::prefixed(ENV_PREFIX));

        match figment.extract::<Config>() {
            Ok(mut config) => {
                if let Some(path) = &config_path {
                    tracing::info!("Loaded config from {:?}", path);
                }
                if let Some(root) = config.project_root.take() {
                    let base = match figment
                        .find_metadata("project_root")
                        .and_then(|metadata| metadata.source.as_ref())
                    {
                        Some(Source::File(file)) => file
                            .parent()
                            .map(Path::to_path_buf)
                            .unwrap_or_else(|| dir.clone()),
                        _ => absolute(Path::new(".")),
                    };
                    config.project_root = Some(if root.is_relative() {
                        base.join(root)
                    } else {
                        root
                    });
                }
                config
            }
            Err(e) => {
                tracing::warn!("Config error: {}", e);
                Self::default()
            }
        }
    }

    /// Set the module path override for a project root.
    pub fn with_module(mut self, module_path: impl Into<String>, project_root: PathBuf) -> Self {
        self.module_path = Some(module_path.into());
        self.project_root = Some(project_root);
        self
    }

    /// Set the GOPATH used for import path resolution.
    pub fn with_gopath(mut self, gopath: PathBuf) -> Self {
        self.gopath = Some(gopath);
        self
    }

    /// Every GOPATH root, in order.
    pub fn gopath_roots(&self) -> Vec<PathBuf> {
        self.gopath
            .as_ref()
            .map(|gopath| {
                std::env::split_paths(gopath)
                    .filter(|root| !root.as_os_str().is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Walk up from `dir` to the nearest config file.
fn find_config_file(dir: &Path) -> Option<PathBuf> {
    dir.ancestors()
        .map(|ancestor| ancestor.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}
