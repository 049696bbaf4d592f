//! Bruteforce configuration types and loading

use eyre::{Context, Result};
use lockstore::{Combination, DEFAULT_BASE, DEFAULT_LENGTH, SessionDefaults};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Progress file and combination space
    pub session: SessionConfig,

    /// Delays between and within attempts
    pub timing: TimingConfig,

    /// Enumeration loop behaviour
    pub runner: RunnerConfig,

    /// How guesses are delivered to the game
    pub input: InputConfig,

    /// How a successful unlock is detected
    pub detect: DetectConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Check settings that serde cannot
    pub fn validate(&self) -> Result<()> {
        self.session.defaults().context("Invalid session settings")?;
        if self.input.backend == InputBackend::Command && self.input.command.is_empty() {
            return Err(eyre::eyre!("input.backend is 'command' but input.command is empty"));
        }
        if self.detect.strategy == DetectStrategy::Command && self.detect.command.is_empty() {
            return Err(eyre::eyre!("detect.strategy is 'command' but detect.command is empty"));
        }
        if self.runner.save_every == 0 {
            return Err(eyre::eyre!("runner.save-every must be at least 1"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: ./bruteforce.yml
        let local_config = PathBuf::from("bruteforce.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/bruteforce/bruteforce.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("bruteforce").join("bruteforce.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Errors are swallowed; the full load reports them later.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(p) => vec![p.clone()],
            None => {
                let mut v = vec![PathBuf::from("bruteforce.yml")];
                if let Some(dir) = dirs::config_dir() {
                    v.push(dir.join("bruteforce").join("bruteforce.yml"));
                }
                v
            }
        };
        candidates
            .iter()
            .find(|p| p.exists())
            .and_then(|p| Self::load_from_file(p).ok())
            .and_then(|c| c.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Progress file location and the shape of the combination space
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Progress file (JSON)
    pub path: PathBuf,

    /// Append-only log of discovered combinations
    #[serde(rename = "success-log")]
    pub success_log: PathBuf,

    /// Digits per combination
    pub length: usize,

    /// Numeral base of each digit (2..=10)
    pub base: u8,

    /// Where a fresh session starts; all zeros when unset
    pub start: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let dir = default_data_dir();
        Self {
            path: dir.join("progress.json"),
            success_log: dir.join("successes.log"),
            length: DEFAULT_LENGTH,
            base: DEFAULT_BASE,
            start: None,
        }
    }
}

impl SessionConfig {
    /// Parse a combination in this session's length and base
    pub fn parse_combination(&self, s: &str) -> Result<Combination> {
        Combination::parse_with_length(s, self.length, self.base)
            .map_err(|e| eyre::eyre!("Invalid combination '{}': {}", s, e))
    }

    pub fn defaults(&self) -> Result<SessionDefaults> {
        let start = match &self.start {
            Some(s) => self.parse_combination(s)?,
            None => Combination::zero(self.length, self.base).map_err(|e| eyre::eyre!("{}", e))?,
        };
        Ok(SessionDefaults::new(start))
    }
}

/// Base directory for progress and logs
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bruteforce")
}

/// Named delay profiles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedPreset {
    Normal,
    Fast,
    #[default]
    Turbo,
    Ludicrous,
}

impl SpeedPreset {
    /// Base delays in ms: (attempt, input, click, process)
    fn delays_ms(self) -> (u64, u64, u64, u64) {
        match self {
            Self::Normal => (500, 100, 50, 200),
            Self::Fast => (100, 50, 20, 100),
            Self::Turbo => (20, 10, 10, 50),
            Self::Ludicrous => (10, 5, 5, 20),
        }
    }
}

/// Delay settings; explicit values override the preset
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub preset: SpeedPreset,

    /// Pause after each attempt
    #[serde(rename = "attempt-delay-ms")]
    pub attempt_delay_ms: Option<u64>,

    /// Pause between typed digits
    #[serde(rename = "input-delay-ms")]
    pub input_delay_ms: Option<u64>,

    /// Pause after each mouse click
    #[serde(rename = "click-delay-ms")]
    pub click_delay_ms: Option<u64>,

    /// Time the game needs to process a submitted guess
    #[serde(rename = "process-delay-ms")]
    pub process_delay_ms: Option<u64>,

    /// Countdown before the first attempt, to focus the game window
    #[serde(rename = "countdown-secs")]
    pub countdown_secs: u64,

    /// Wait before retrying an undelivered guess
    #[serde(rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            preset: SpeedPreset::default(),
            attempt_delay_ms: None,
            input_delay_ms: None,
            click_delay_ms: None,
            process_delay_ms: None,
            countdown_secs: 3,
            retry_delay_ms: 250,
        }
    }
}

/// Resolved delays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub attempt: Duration,
    pub input: Duration,
    pub click: Duration,
    pub process: Duration,
    pub retry: Duration,
}

impl TimingConfig {
    pub fn resolve(&self) -> Timing {
        let (attempt, input, click, process) = self.preset.delays_ms();
        debug!(preset = ?self.preset, "TimingConfig::resolve: called");
        Timing {
            attempt: Duration::from_millis(self.attempt_delay_ms.unwrap_or(attempt)),
            input: Duration::from_millis(self.input_delay_ms.unwrap_or(input)),
            click: Duration::from_millis(self.click_delay_ms.unwrap_or(click)),
            process: Duration::from_millis(self.process_delay_ms.unwrap_or(process)),
            retry: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// Enumeration loop behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Save progress every N delivered attempts
    #[serde(rename = "save-every")]
    pub save_every: u64,

    /// Print a progress line every N delivered attempts
    #[serde(rename = "report-every")]
    pub report_every: u64,

    /// Stop after this many undelivered guesses in a row
    #[serde(rename = "max-consecutive-failures")]
    pub max_consecutive_failures: u32,

    /// Pause when a success is detected so the operator can verify it
    #[serde(rename = "pause-on-success")]
    pub pause_on_success: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            save_every: 500,
            report_every: 200,
            max_consecutive_failures: 50,
            pause_on_success: true,
        }
    }
}

/// Input delivery backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputBackend {
    /// Log each guess without touching the desktop
    #[default]
    DryRun,
    /// Run an external program per guess
    Command,
    /// Native keyboard/mouse injection (requires the `enigo` feature)
    Enigo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub backend: InputBackend,

    /// Program and arguments; `{combination}` is replaced by the guess
    pub command: Vec<String>,

    #[serde(rename = "command-timeout-ms")]
    pub command_timeout_ms: u64,

    /// Key that submits a typed guess when no submit button is calibrated
    #[serde(rename = "submit-key")]
    pub submit_key: String,

    /// Select-all and delete before typing
    #[serde(rename = "clear-first")]
    pub clear_first: bool,

    /// Click the calibrated input field and submit button
    #[serde(rename = "auto-click")]
    pub auto_click: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            backend: InputBackend::default(),
            command: Vec::new(),
            command_timeout_ms: 5_000,
            submit_key: "enter".to_string(),
            clear_first: true,
            auto_click: true,
        }
    }
}

/// Success detection strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectStrategy {
    /// Never report success; the operator marks successes by hand
    #[default]
    Never,
    /// Run an external program after each guess; exit 0 means unlocked
    Command,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectConfig {
    pub strategy: DetectStrategy,

    /// Program and arguments; `{combination}` is replaced by the guess
    pub command: Vec<String>,

    #[serde(rename = "command-timeout-ms")]
    pub command_timeout_ms: u64,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            strategy: DetectStrategy::default(),
            command: Vec::new(),
            command_timeout_ms: 5_000,
        }
    }
}
