//! Configuration types for a multicover search run.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration for a multicover search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Population and generation settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Probability of applying crossover to a pair of parents.
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f64,
    /// Probability of mutating each offspring.
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
    /// Distinct witnesses required per goal (`k`).
    #[serde(default = "default_multicover_target")]
    pub multicover_target: usize,
    /// Parent selection policy.
    #[serde(default)]
    pub selection: SelectionMethod,
    /// Contestants drawn when constructing a candidate biased towards a goal.
    #[serde(default = "default_biased_tournament_size")]
    pub biased_tournament_size: usize,
    /// Share of diversity-ranked covering candidates offered to the archive
    /// per goal and generation.
    #[serde(default = "default_archive_fraction")]
    pub archive_fraction: f64,
    /// Survivor ranking settings.
    #[serde(default)]
    pub ranking: RankingConfig,
    /// Wall-clock limit, checked between generations.
    #[serde(default)]
    pub time_budget_secs: Option<f64>,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            population: PopulationConfig::default(),
            crossover_rate: default_crossover_rate(),
            mutation_rate: default_mutation_rate(),
            multicover_target: default_multicover_target(),
            selection: SelectionMethod::default(),
            biased_tournament_size: default_biased_tournament_size(),
            archive_fraction: default_archive_fraction(),
            ranking: RankingConfig::default(),
            time_budget_secs: None,
            random_seed: None,
        }
    }
}

fn default_crossover_rate() -> f64 {
    0.75
}
fn default_mutation_rate() -> f64 {
    0.75
}
fn default_multicover_target() -> usize {
    2
}
fn default_biased_tournament_size() -> usize {
    5
}
fn default_archive_fraction() -> f64 {
    0.5
}

/// Population and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of individuals kept between generations.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Generation budget.
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
    /// How the initial population and top-ups are built.
    #[serde(default)]
    pub initialization: Initialization,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            max_generations: default_max_generations(),
            initialization: Initialization::default(),
        }
    }
}

fn default_population_size() -> usize {
    50
}
fn default_max_generations() -> usize {
    50
}

/// Population construction strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Initialization {
    /// Candidates biased towards remaining goals in turn.
    #[default]
    RoundRobin,
    /// Unbiased random candidates.
    Uniform,
}

/// Parent selection policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "method")]
pub enum SelectionMethod {
    /// Tournament over mean fitness on remaining goals.
    Tournament {
        #[serde(default = "default_tournament_size")]
        size: usize,
    },
    /// Linear rank-proportional selection.
    RankBased,
    /// Uniform choice.
    Random,
}

impl Default for SelectionMethod {
    fn default() -> Self {
        Self::Tournament {
            size: default_tournament_size(),
        }
    }
}

fn default_tournament_size() -> usize {
    3
}

/// Survivor ranking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Put the best candidate for each remaining goal ahead of the
    /// non-dominated fronts.
    #[serde(default = "default_true")]
    pub preference_sorting: bool,
    /// Push candidates already present in the archive back by their
    /// appearance count.
    #[serde(default = "default_true")]
    pub demote_archived: bool,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            preference_sorting: true,
            demote_archived: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Population size must be at least 2, got {0}")]
    PopulationTooSmall(usize),
    #[error("Multicover target must be at least 1")]
    InvalidTarget,
    #[error("{name} must be within [0, 1], got {value}")]
    InvalidRate { name: &'static str, value: f64 },
    #[error("Archive fraction must be within (0, 1], got {0}")]
    InvalidArchiveFraction(f64),
    #[error("Tournament size must be at least 1")]
    InvalidTournamentSize,
    #[error("Time budget must be positive, got {0}")]
    InvalidTimeBudget(f64),
    #[error("No goals to search for")]
    NoGoals,
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl SearchConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population.size < 2 {
            return Err(ConfigError::PopulationTooSmall(self.population.size));
        }

        if self.multicover_target == 0 {
            return Err(ConfigError::InvalidTarget);
        }

        let check_rate = |value: f64, name: &'static str| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::InvalidRate { name, value })
            }
        };
        check_rate(self.crossover_rate, "crossover_rate")?;
        check_rate(self.mutation_rate, "mutation_rate")?;

        if !(self.archive_fraction > 0.0 && self.archive_fraction <= 1.0) {
            return Err(ConfigError::InvalidArchiveFraction(self.archive_fraction));
        }

        if self.biased_tournament_size == 0 {
            return Err(ConfigError::InvalidTournamentSize);
        }
        if let SelectionMethod::Tournament { size: 0 } = self.selection {
            return Err(ConfigError::InvalidTournamentSize);
        }

        if let Some(secs) = self.time_budget_secs
            && !(secs > 0.0 && Duration::try_from_secs_f64(secs).is_ok())
        {
            return Err(ConfigError::InvalidTimeBudget(secs));
        }

        Ok(())
    }

    /// Wall-clock limit as a `Duration`. `None` when unset or not representable.
    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}
