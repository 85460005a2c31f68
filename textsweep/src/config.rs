use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::batch::SearchMethod;
use crate::errors::{SweepError, SweepResult};
use crate::filters;
use crate::work::{DEFAULT_CONVERTER, DEFAULT_FUZZY_CUTOFF};

/// Name of the per-directory configuration file
pub const LOCAL_CONFIG_FILE: &str = ".textsweep.yaml";

/// Persistent settings of the shell.
///
/// # Configuration Locations
///
/// Files are layered, later ones overriding earlier ones:
/// 1. Global `$CONFIG_DIR/textsweep/config.yaml`
/// 2. Local `.textsweep.yaml` in the current directory
/// 3. Custom config file specified via `--config`
///
/// # Configuration Format
///
/// ```yaml
/// # Directory searched and converted
/// target_dir: "/home/me/notes"
///
/// # exact or fuzzy
/// search_method: fuzzy
///
/// # Workers per batch (default: CPU cores)
/// thread_count: 4
///
/// # Minimum confidence of fuzzy matches
/// fuzzy_score: 0.85
///
/// # Extensions converted by plain copy
/// plain_text_extensions: [".log", ".md"]
///
/// converter: pandoc
/// verbose: false
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "warn"
/// ```
///
/// Command-line flags take precedence over file values, see `merge_with_cli`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Directory the shell starts in; the current directory when unset
    #[serde(default)]
    pub target_dir: Option<PathBuf>,

    #[serde(default)]
    pub search_method: MethodSetting,

    /// Number of workers per batch
    /// Defaults to number of CPU cores if not specified
    #[serde(default = "default_thread_count")]
    pub thread_count: NonZeroUsize,

    #[serde(default = "default_fuzzy_score")]
    pub fuzzy_score: f64,

    #[serde(default = "filters::default_plain_text_extensions")]
    pub plain_text_extensions: Vec<String>,

    #[serde(default = "default_converter")]
    pub converter: String,

    /// Print one summary line per conversion category
    #[serde(default)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Persisted form of the search method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodSetting {
    #[default]
    Exact,
    Fuzzy,
}

fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_fuzzy_score() -> f64 {
    DEFAULT_FUZZY_CUTOFF
}

fn default_converter() -> String {
    DEFAULT_CONVERTER.to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            target_dir: None,
            search_method: MethodSetting::default(),
            thread_count: default_thread_count(),
            fuzzy_score: default_fuzzy_score(),
            plain_text_extensions: filters::default_plain_text_extensions(),
            converter: default_converter(),
            verbose: false,
            log_level: default_log_level(),
        }
    }
}

/// Command-line overrides; `None` keeps the file value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub target_dir: Option<PathBuf>,
    pub thread_count: Option<NonZeroUsize>,
    pub fuzzy: Option<bool>,
    pub fuzzy_score: Option<f64>,
    pub verbose: bool,
    pub log_level: Option<String>,
}

impl SweepConfig {
    /// Loads configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration from the default locations plus a specific file
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let config_files = [
            // Global config
            Self::global_path(),
            // Local config
            Some(PathBuf::from(LOCAL_CONFIG_FILE)),
        ];
        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }
        // An explicit file must exist
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path));
        }

        builder.build()?.try_deserialize()
    }

    /// `$CONFIG_DIR/textsweep/config.yaml`, where directory and method changes are saved
    pub fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("textsweep").join("config.yaml"))
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        if cli.target_dir.is_some() {
            self.target_dir = cli.target_dir;
        }
        if let Some(threads) = cli.thread_count {
            self.thread_count = threads;
        }
        match cli.fuzzy {
            Some(true) => self.search_method = MethodSetting::Fuzzy,
            Some(false) => self.search_method = MethodSetting::Exact,
            None => {}
        }
        if let Some(score) = cli.fuzzy_score {
            self.fuzzy_score = score;
        }
        if cli.verbose {
            self.verbose = true;
        }
        if let Some(level) = cli.log_level {
            self.log_level = level;
        }
        self
    }

    pub fn is_fuzzy(&self) -> bool {
        self.search_method == MethodSetting::Fuzzy
    }

    /// The configured matching strategy with its cutoff
    pub fn search_method(&self) -> SweepResult<SearchMethod> {
        if !(0.0..=1.0).contains(&self.fuzzy_score) {
            return Err(SweepError::invalid_score(self.fuzzy_score.to_string()));
        }
        Ok(match self.search_method {
            MethodSetting::Exact => SearchMethod::Exact,
            MethodSetting::Fuzzy => SearchMethod::Fuzzy {
                cutoff: self.fuzzy_score,
            },
        })
    }

    /// Writes the settings to `path`, keeping any previous file as `<path>.old`
    pub fn save(&self, path: &Path) -> SweepResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        if path.exists() {
            let mut old = path.as_os_str().to_owned();
            old.push(".old");
            fs::rename(path, PathBuf::from(old))?;
        }
        fs::write(path, serde_yaml::to_string(self)?)?;
        debug!("Saved settings to {}", path.display());
        Ok(())
    }
}

/// Installs the global tracing subscriber writing to stderr.
///
/// `RUST_LOG` wins over `level`. Calling it twice is harmless.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
