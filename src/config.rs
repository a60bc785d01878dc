//! Tuning tables for the scheduling core.
//!
//! Every constant the algorithms depend on lives in an immutable struct that
//! is passed into each function. Defaults reproduce the reference tuning; a
//! TOML file can override any subset of fields.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit tuning file.
pub const CONFIG_ENV_VAR: &str = "STUDY_CORE_CONFIG";

/// Tuning file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "study_core.toml";

/// Longest interval a tuning may allow (100 years).
pub const MAX_INTERVAL_DAYS: f64 = 36_500.0;

/// Longest ability window a tuning may allow (100 years).
pub const MAX_WINDOW_DAYS: i64 = 36_500;

// ==================== Errors ====================

/// Tuning file errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String, String),
    ParseError(String, String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, err) => write!(f, "IO error reading {}: {}", path, err),
            ConfigError::ParseError(path, err) => write!(f, "Parse error in {}: {}", path, err),
            ConfigError::Invalid(reason) => write!(f, "Invalid tuning: {}", reason),
        }
    }
}

impl std::error::Error for ConfigError {}

// ==================== Scheduler Configuration ====================

/// Multipliers applied to the interval of a mature item based on review context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextModifiers {
    pub morning: f64,
    pub night: f64,
    /// Study streak (days) that earns `long_streak_bonus`
    pub long_streak_days: u32,
    pub long_streak_bonus: f64,
    /// Study streak (days) that earns `short_streak_bonus`
    pub short_streak_days: u32,
    pub short_streak_bonus: f64,
    pub previous_correct: f64,
    pub previous_wrong: f64,
    /// Subject difficulty multiplier is `difficulty_base - difficulty * difficulty_slope`
    pub difficulty_base: f64,
    pub difficulty_slope: f64,
    pub max_subject_difficulty: f64,
}

impl Default for ContextModifiers {
    fn default() -> Self {
        Self {
            morning: 1.1,
            night: 0.9,
            long_streak_days: 7,
            long_streak_bonus: 1.2,
            short_streak_days: 3,
            short_streak_bonus: 1.1,
            previous_correct: 1.05,
            previous_wrong: 0.95,
            difficulty_base: 1.5,
            difficulty_slope: 0.1,
            max_subject_difficulty: 10.0,
        }
    }
}

/// SM-2+ scheduling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub initial_ease_factor: f64,
    pub min_ease_factor: f64,
    pub max_ease_factor: f64,
    pub min_interval_days: f64,
    pub max_interval_days: f64,
    /// Lowest quality counted as a successful review
    pub success_threshold: u8,
    /// Lapse count at which an item is flagged as a leech
    pub leech_threshold: u32,
    /// Interval (days) at which an item graduates
    pub graduation_interval_days: f64,
    /// Interval multiplier indexed by quality 0..=5
    pub quality_factors: [f64; 6],
    /// Uniform fuzz range for mature intervals; `[1.0, 1.0]` disables fuzz
    pub fuzz_range: [f64; 2],
    pub modifiers: ContextModifiers,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_ease_factor: 2.5,
            min_ease_factor: 1.3,
            max_ease_factor: 4.0,
            min_interval_days: 1.0,
            max_interval_days: 365.0,
            success_threshold: 3,
            leech_threshold: 8,
            graduation_interval_days: 21.0,
            quality_factors: [0.0, 0.6, 0.7, 0.8, 1.0, 1.3],
            fuzz_range: [0.95, 1.05],
            modifiers: ContextModifiers::default(),
        }
    }
}

impl SchedulerConfig {
    /// Same tuning with fuzz disabled, for replayable schedules.
    pub fn without_fuzz(mut self) -> Self {
        self.fuzz_range = [1.0, 1.0];
        self
    }

    /// Quality factor for a validated quality value.
    pub fn quality_factor(&self, quality: u8) -> f64 {
        self.quality_factors[usize::from(quality.min(5))]
    }
}

// ==================== Ability Configuration ====================

/// IRT estimation and zone classification parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityConfig {
    pub iterations: usize,
    pub learning_rate: f64,
    pub theta_min: f64,
    pub theta_max: f64,
    /// Early exit when a Newton step moves theta less than this
    pub tolerance: Option<f64>,
    pub window_days: i64,
    pub max_records: usize,
    /// Responses needed for full confidence
    pub confidence_saturation: f64,
    pub comfort_ceiling: f64,
    pub learning_ceiling: f64,
    pub challenge_ceiling: f64,
    /// Responses per half of the trend comparison
    pub trend_window: usize,
    pub trend_threshold: f64,
    pub default_ability: f64,
    pub default_confidence: f64,
}

impl Default for AbilityConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            learning_rate: 0.1,
            theta_min: -3.0,
            theta_max: 3.0,
            tolerance: None,
            window_days: 30,
            max_records: 100,
            confidence_saturation: 10.0,
            comfort_ceiling: 0.6,
            learning_ceiling: 0.85,
            challenge_ceiling: 0.95,
            trend_window: 5,
            trend_threshold: 0.1,
            default_ability: 0.5,
            default_confidence: 0.1,
        }
    }
}

// ==================== Session Configuration ====================

/// Priority weights and time defaults for session composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub overdue_base: f64,
    pub overdue_per_day: f64,
    pub leech_bonus: f64,
    pub low_retention_threshold: f64,
    pub low_retention_bonus: f64,
    pub new_item_bonus: f64,
    /// Minutes assumed for an item without its own estimate
    pub default_item_minutes: f64,
    /// Success probability targeted when ordering new items by difficulty
    pub target_success: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            overdue_base: 100.0,
            overdue_per_day: 10.0,
            leech_bonus: 50.0,
            low_retention_threshold: 0.8,
            low_retention_bonus: 30.0,
            new_item_bonus: 20.0,
            default_item_minutes: 1.0,
            target_success: 0.75,
        }
    }
}

// ==================== Core Configuration ====================

/// All tuning for the core, one table per component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub scheduler: SchedulerConfig,
    pub ability: AbilityConfig,
    pub session: SessionConfig,
}

impl CoreConfig {
    /// Parse tuning from TOML text. Missing tables and fields keep their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: CoreConfig = toml::from_str(contents)
            .map_err(|e| ConfigError::ParseError("<inline>".to_string(), e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a tuning file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(display.clone(), e.to_string()))?;
        let config: CoreConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(display, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject tunings that would break the state invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.scheduler;
        if !(s.min_ease_factor > 0.0 && s.min_ease_factor <= s.max_ease_factor && s.max_ease_factor.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "ease factor bounds [{}, {}]",
                s.min_ease_factor, s.max_ease_factor
            )));
        }
        if !(s.min_interval_days >= 1.0
            && s.min_interval_days <= s.max_interval_days
            && s.max_interval_days <= MAX_INTERVAL_DAYS)
        {
            return Err(ConfigError::Invalid(format!(
                "interval bounds [{}, {}]",
                s.min_interval_days, s.max_interval_days
            )));
        }
        if s.success_threshold > 5 {
            return Err(ConfigError::Invalid(format!(
                "success threshold {} outside 0..=5",
                s.success_threshold
            )));
        }
        let [low, high] = s.fuzz_range;
        if !(low > 0.0 && low <= high && high.is_finite()) {
            return Err(ConfigError::Invalid(format!("fuzz range [{}, {}]", low, high)));
        }
        if let Some(factor) = s.quality_factors.iter().find(|f| !(f.is_finite() && **f >= 0.0)) {
            return Err(ConfigError::Invalid(format!("quality factor {}", factor)));
        }
        let m = &s.modifiers;
        let multipliers = [
            m.morning,
            m.night,
            m.long_streak_bonus,
            m.short_streak_bonus,
            m.previous_correct,
            m.previous_wrong,
            m.difficulty_base,
            m.difficulty_slope,
            m.max_subject_difficulty,
        ];
        if multipliers.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::Invalid("context modifiers must be finite".to_string()));
        }

        let a = &self.ability;
        if !(a.theta_min < a.theta_max && a.theta_min.is_finite() && a.theta_max.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "theta bounds [{}, {}]",
                a.theta_min, a.theta_max
            )));
        }
        if !(a.learning_rate.is_finite() && a.learning_rate > 0.0) {
            return Err(ConfigError::Invalid(format!("learning rate {}", a.learning_rate)));
        }
        if a.tolerance.is_some_and(|t| !(t.is_finite() && t >= 0.0)) {
            return Err(ConfigError::Invalid(format!("tolerance {:?}", a.tolerance)));
        }
        if !(1..=MAX_WINDOW_DAYS).contains(&a.window_days) {
            return Err(ConfigError::Invalid(format!(
                "window of {} days outside 1..={}",
                a.window_days, MAX_WINDOW_DAYS
            )));
        }
        if !(a.confidence_saturation.is_finite() && a.confidence_saturation > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "confidence saturation {}",
                a.confidence_saturation
            )));
        }
        if !(a.comfort_ceiling <= a.learning_ceiling && a.learning_ceiling <= a.challenge_ceiling) {
            return Err(ConfigError::Invalid("zone ceilings must be ascending".to_string()));
        }
        if !((0.0..=1.0).contains(&a.default_ability) && (0.0..=1.0).contains(&a.default_confidence)) {
            return Err(ConfigError::Invalid("default ability and confidence must be in [0, 1]".to_string()));
        }

        let session = &self.session;
        if !(session.default_item_minutes.is_finite() && session.default_item_minutes >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "default item minutes {}",
                session.default_item_minutes
            )));
        }
        let weights = [
            session.overdue_base,
            session.overdue_per_day,
            session.leech_bonus,
            session.low_retention_threshold,
            session.low_retention_bonus,
            session.new_item_bonus,
        ];
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(ConfigError::Invalid("session weights must be finite".to_string()));
        }
        let t = session.target_success;
        if !(t > 0.0 && t < 1.0) {
            return Err(ConfigError::Invalid(format!("target success {} outside (0, 1)", t)));
        }
        Ok(())
    }
}

// ==================== Loading ====================

/// Load tuning with priority: $STUDY_CORE_CONFIG (.env honored) > study_core.toml > defaults
pub fn load_config() -> CoreConfig {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let explicit = std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from);
    load_config_from(explicit.as_deref(), Path::new(DEFAULT_CONFIG_FILE))
}

/// Load tuning from an explicit path, falling back to `fallback`, then defaults.
///
/// Unreadable or invalid files are logged and skipped rather than failing the caller.
pub fn load_config_from(explicit: Option<&Path>, fallback: &Path) -> CoreConfig {
    // Priority 1: explicit path
    if let Some(path) = explicit {
        match CoreConfig::from_file(path) {
            Ok(config) => {
                tracing::info!("Using scheduling tuning from {}", path.display());
                return config;
            }
            Err(e) => tracing::warn!("Ignoring tuning file: {}", e),
        }
    }

    // Priority 2: working-directory file
    if fallback.exists() {
        match CoreConfig::from_file(fallback) {
            Ok(config) => {
                tracing::info!("Using scheduling tuning from {}", fallback.display());
                return config;
            }
            Err(e) => tracing::warn!("Ignoring tuning file: {}", e),
        }
    }

    tracing::debug!("Using default scheduling tuning");
    CoreConfig::default()
}
