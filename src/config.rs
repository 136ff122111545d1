//! Layered configuration.
//!
//! Settings are merged with `figment`, later layers winning:
//!
//! 1. Built-in defaults
//! 2. TOML config file (`<config dir>/dupeguard/config.toml`, or `--config`)
//! 3. Environment variables prefixed with `DUPEGUARD_`
//! 4. Command-line flags
//!
//! [`Settings::resolve`] then validates the merged values against the run's
//! root, action and dry-run flag, producing [`PipelineOptions`]. Every
//! failure here is a [`ConfigError`] and aborts before anything is scanned.
//!
//! ```toml
//! recursive = true
//! algorithm = "strong"
//! min_size = 4096
//! keep = "oldest"
//! io_threads = 8
//! verify = false
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::duplicates::{ActionMode, FinderConfig, KeepRule, ParseActionError};
use crate::scanner::{HashAlgorithm, WalkerConfig, DEFAULT_CHUNK_SIZE};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "DUPEGUARD_";

/// Fatal configuration errors.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The merged configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Load(Box<figment::Error>),

    /// An explicitly requested config file does not exist.
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    /// The root path does not exist.
    #[error("root path not found: {0}")]
    RootNotFound(PathBuf),

    /// The root path is not a directory.
    #[error("root path is not a directory: {0}")]
    RootNotDirectory(PathBuf),

    /// `io_threads` was zero.
    #[error("io_threads must be at least 1")]
    InvalidIoThreads,

    /// `chunk_size` was zero.
    #[error("chunk_size must be at least 1 byte")]
    InvalidChunkSize,

    /// The action string could not be parsed.
    #[error(transparent)]
    InvalidAction(#[from] ParseActionError),

    /// Dry run requested for an action that never mutates.
    #[error("--dry-run has no effect with report-only; choose delete or move:<DEST>")]
    DryRunWithReportOnly,

    /// The quarantine destination exists and is not a directory.
    #[error("quarantine destination is not a directory: {0}")]
    QuarantineNotDirectory(PathBuf),

    /// The quarantine destination would be scanned as part of the root.
    #[error("quarantine destination {0} lies inside the scanned root")]
    QuarantineInsideRoot(PathBuf),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::Load(Box::new(e))
    }
}

/// Settings that may come from the config file or environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Descend into subdirectories
    pub recursive: bool,
    /// Digest algorithm
    pub algorithm: HashAlgorithm,
    /// Files smaller than this many bytes are ignored (0 = no limit)
    pub min_size: u64,
    /// Keeper selection rule
    pub keep: KeepRule,
    /// Hashing pool size
    pub io_threads: usize,
    /// Byte-for-byte collision verification
    pub verify: bool,
    /// Follow symbolic links
    pub follow_symlinks: bool,
    /// Read buffer size in bytes
    pub chunk_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            recursive: false,
            algorithm: HashAlgorithm::default(),
            min_size: 0,
            keep: KeepRule::default(),
            io_threads: 4,
            verify: false,
            follow_symlinks: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Command-line values layered on top of file and environment settings.
///
/// `None` leaves the lower layer untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recursive: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<HashAlgorithm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep: Option<KeepRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub io_threads: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_symlinks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<usize>,
}

impl Settings {
    /// Default platform-specific config file location.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "dupeguard", "dupeguard")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Figment with defaults, file and environment layers.
    ///
    /// `config_file` replaces the default location when given.
    #[must_use]
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        let file = config_file
            .map(Path::to_path_buf)
            .or_else(Self::default_path);
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load settings from every layer, CLI overrides last.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` if `config_file` is given but missing, and
    /// `Load` if any layer holds an invalid value.
    pub fn load(config_file: Option<&Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
        if let Some(path) = config_file {
            if !path.is_file() {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
        }

        let settings: Self = Self::figment(config_file)
            .merge(Serialized::defaults(overrides))
            .extract()?;
        log::debug!("Loaded settings: {settings:?}");
        Ok(settings)
    }

    /// Validate settings for one run.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first problem found.
    pub fn resolve(
        self,
        root: &Path,
        action: ActionMode,
        dry_run: bool,
    ) -> Result<PipelineOptions, ConfigError> {
        if self.io_threads == 0 {
            return Err(ConfigError::InvalidIoThreads);
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize);
        }

        let metadata = std::fs::metadata(root)
            .map_err(|_| ConfigError::RootNotFound(root.to_path_buf()))?;
        if !metadata.is_dir() {
            return Err(ConfigError::RootNotDirectory(root.to_path_buf()));
        }
        let root = root
            .canonicalize()
            .map_err(|_| ConfigError::RootNotFound(root.to_path_buf()))?;

        if dry_run && !action.is_mutating() {
            return Err(ConfigError::DryRunWithReportOnly);
        }

        let action = match action {
            ActionMode::Move(dest) => {
                if dest.exists() && !dest.is_dir() {
                    return Err(ConfigError::QuarantineNotDirectory(dest));
                }
                let dest = absolute(&dest);
                if dest == root || (self.recursive && dest.starts_with(&root)) {
                    return Err(ConfigError::QuarantineInsideRoot(dest));
                }
                ActionMode::Move(dest)
            }
            other => other,
        };

        Ok(PipelineOptions {
            root,
            settings: self,
            action,
            dry_run,
        })
    }
}

/// Best-effort absolute form of a path that may not exist yet.
fn absolute(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        if let Ok(parent) = parent.canonicalize() {
            return parent.join(name);
        }
    }
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Validated options for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Canonical root directory
    pub root: PathBuf,
    /// Merged settings
    pub settings: Settings,
    /// Plan-wide action (quarantine path made absolute)
    pub action: ActionMode,
    /// Simulate instead of mutating
    pub dry_run: bool,
}

impl PipelineOptions {
    /// Walker configuration for these options.
    #[must_use]
    pub fn walker_config(&self) -> WalkerConfig {
        let min_size = (self.settings.min_size > 0).then_some(self.settings.min_size);
        WalkerConfig::new(self.settings.recursive, self.settings.follow_symlinks, min_size)
    }

    /// Finder configuration for these options (default sink, no shutdown flag).
    #[must_use]
    pub fn finder_config(&self) -> FinderConfig {
        FinderConfig::default()
            .with_algorithm(self.settings.algorithm)
            .with_io_threads(self.settings.io_threads)
            .with_chunk_size(self.settings.chunk_size)
            .with_verify(self.settings.verify)
            .with_walker_config(self.walker_config())
    }
}
