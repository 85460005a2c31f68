//! Interactive session state.
//!
//! A [`Session`] is an immutable value: every command that changes it returns a
//! new session and leaves the old one untouched, so a rejected command cannot
//! leave the shell half-updated. Worker processes never see a session, only the
//! work items built from it.
use std::num::NonZeroUsize;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};
use tracing::debug;

use crate::batch::SearchMethod;
use crate::errors::{SweepError, SweepResult};
use crate::work::DEFAULT_FUZZY_CUTOFF;

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    directory: PathBuf,
    home: PathBuf,
    workers: usize,
    available: usize,
    fuzzy: bool,
    score: f64,
}

impl Session {
    /// Starts a session in `directory` using every available worker and exact
    /// matching. `home` is where `/cd` with no argument (or `~`) leads.
    pub fn new(directory: impl Into<PathBuf>, home: impl Into<PathBuf>, available: usize) -> Self {
        let available = available.max(1);
        Self {
            directory: directory.into(),
            home: home.into(),
            workers: available,
            available,
            fuzzy: false,
            score: DEFAULT_FUZZY_CUTOFF,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn available(&self) -> usize {
        self.available
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn is_fuzzy(&self) -> bool {
        self.fuzzy
    }

    /// The matching strategy the next search will use
    pub fn search_method(&self) -> SearchMethod {
        if self.fuzzy {
            SearchMethod::Fuzzy { cutoff: self.score }
        } else {
            SearchMethod::Exact
        }
    }

    pub fn method_name(&self) -> &'static str {
        if self.fuzzy {
            "proximity match"
        } else {
            "exact match"
        }
    }

    /// Moves to another directory.
    ///
    /// - `""` or `~` goes home, `~/x` is resolved from home
    /// - `.` stays put
    /// - anything else is resolved against the current directory unless absolute
    ///
    /// `..` is applied lexically. The target must exist and be a directory.
    pub fn change_dir(&self, arg: &str) -> SweepResult<Self> {
        let arg = arg.trim();
        let foreign = if MAIN_SEPARATOR == '/' { '\\' } else { '/' };
        if arg.contains(foreign) {
            return Err(SweepError::invalid_path(format!(
                "{} contains an invalid path separator",
                arg
            )));
        }

        let target = if arg.is_empty() || arg == "~" {
            self.home.clone()
        } else if arg == "." || arg == format!(".{}", MAIN_SEPARATOR) {
            return Ok(self.clone());
        } else if let Some(rest) = arg.strip_prefix('~') {
            let rest = rest.trim_start_matches(MAIN_SEPARATOR);
            normalize(&self.home.join(rest), arg)?
        } else {
            normalize(&self.directory.join(arg), arg)?
        };

        if !target.exists() {
            return Err(SweepError::directory_not_found(target));
        }
        if !target.is_dir() {
            return Err(SweepError::not_a_directory(target));
        }

        debug!("Changed directory to {}", target.display());
        Ok(Self {
            directory: target,
            ..self.clone()
        })
    }

    /// Sets the number of workers used by the next batch. See [`allocate_workers`].
    pub fn allocate_workers(&self, arg: &str) -> SweepResult<Self> {
        let workers = allocate_workers(arg, self.available)?;
        Ok(Self {
            workers,
            ..self.clone()
        })
    }

    /// Uses `workers` as given, e.g. from the configuration file, even beyond the
    /// number of CPUs
    pub fn with_workers(&self, workers: NonZeroUsize) -> Self {
        Self {
            workers: workers.get(),
            ..self.clone()
        }
    }

    /// Sets the minimum fuzzy confidence; an empty argument restores the default
    pub fn set_score(&self, arg: &str) -> SweepResult<Self> {
        let arg = arg.trim();
        let score = if arg.is_empty() {
            DEFAULT_FUZZY_CUTOFF
        } else {
            arg.parse::<f64>()
                .map_err(|_| SweepError::invalid_score(arg))?
        };
        self.with_score(score)
    }

    pub fn with_score(&self, score: f64) -> SweepResult<Self> {
        if !(0.0..=1.0).contains(&score) {
            return Err(SweepError::invalid_score(score.to_string()));
        }
        Ok(Self {
            score,
            ..self.clone()
        })
    }

    /// Switches between exact (`-e`, `--exact`, empty) and proximity (`-p`,
    /// `--proximity`) matching
    pub fn set_method(&self, arg: &str) -> SweepResult<Self> {
        let fuzzy = match arg.trim() {
            "" | "-e" | "--exact" => false,
            "-p" | "--proximity" => true,
            other => return Err(SweepError::invalid_method(other)),
        };
        Ok(self.with_fuzzy(fuzzy))
    }

    pub fn with_fuzzy(&self, fuzzy: bool) -> Self {
        Self {
            fuzzy,
            ..self.clone()
        }
    }

    /// The directory as shown in the prompt, with home abbreviated to `~`
    pub fn prompt_dir(&self) -> String {
        match self.directory.strip_prefix(&self.home) {
            Ok(rest) if rest.as_os_str().is_empty() => "~".to_string(),
            Ok(rest) => format!("~{}{}", MAIN_SEPARATOR, rest.display()),
            Err(_) => self.directory.display().to_string(),
        }
    }
}

/// Resolves a worker count argument against the `available` workers.
///
/// Accepts a number in `1..=available`, `-a`/`--all` or an empty argument for
/// every worker, `-h`/`--half` and `-q`/`--quarter` (rounded up, so never zero).
pub fn allocate_workers(arg: &str, available: usize) -> SweepResult<usize> {
    let arg = arg.trim();
    if let Ok(requested) = arg.parse::<i64>() {
        if requested <= 0 {
            return Err(SweepError::InvalidWorkerCount);
        }
        let requested = requested as usize;
        if requested > available {
            return Err(SweepError::too_many_workers(requested, available));
        }
        return Ok(requested);
    }

    match arg {
        "" | "-a" | "--all" => Ok(available),
        "-h" | "--half" => Ok(available.div_ceil(2)),
        "-q" | "--quarter" => Ok(available.div_ceil(4)),
        other => Err(SweepError::invalid_worker_argument(other)),
    }
}

/// Applies `.` and `..` components without touching the filesystem
fn normalize(path: &Path, original: &str) -> SweepResult<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(SweepError::invalid_path(format!(
                        "{} is an invalid relative path",
                        original
                    )));
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}
