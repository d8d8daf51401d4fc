use std::env;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub session: SessionConfig,
    pub decompose: DecomposeConfig,
    pub pipeline: PipelineConfig,
    pub ensemble: EnsembleConfig,
    pub quality: QualityConfig,
    pub termination: TerminationConfig,
    pub boundary: BoundaryConfig,
    pub logging: LoggingConfig,
}

/// Session store configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum number of live sessions held in memory
    pub max_sessions: usize,
    /// Idle time after which a session is archived, then purged
    pub session_timeout_ms: u64,
}

/// Task decomposition configuration
#[derive(Debug, Clone)]
pub struct DecomposeConfig {
    /// Hard cap on tasks emitted per decomposition
    pub max_tasks: usize,
    /// Tasks with importance x selection weight below this are dropped
    pub drop_threshold: f64,
}

/// Stage pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Concurrent task processors inside the reasoning stage
    pub max_concurrency: usize,
    /// Stage ids disabled for this deployment
    pub disabled_stages: Vec<String>,
    /// Per-stage execution timeout
    pub stage_timeout_ms: u64,
}

/// Ensemble selection configuration
#[derive(Debug, Clone)]
pub struct EnsembleConfig {
    pub diversity_threshold: f64,
    pub max_candidates: usize,
    pub quality_weight: f64,
    pub diversity_weight: f64,
}

/// Quality monitoring configuration
#[derive(Debug, Clone)]
pub struct QualityConfig {
    /// Minimum confidence for a result to count as accepted
    pub acceptance_confidence_threshold: f64,
    /// Prior probability that processing can stop
    pub stop_prior: f64,
    /// Posterior above which processing stops early
    pub stop_posterior_threshold: f64,
}

/// Termination policy configuration
#[derive(Debug, Clone)]
pub struct TerminationConfig {
    /// Base wall-clock budget for a whole session
    pub max_processing_time_ms: u64,
    /// Base adequacy threshold for the sufficiency check
    pub sufficiency_threshold: f64,
    /// Per-task processing timeout
    pub task_timeout_ms: u64,
    /// Global cap on tasks processed across iterations
    pub max_tasks_processed: usize,
    /// Global cap on processing steps across iterations
    pub max_processing_steps: u64,
}

/// Boundary synthesis configuration
#[derive(Debug, Clone)]
pub struct BoundaryConfig {
    /// Reported contrast strength for synthesized boundaries
    pub contrast_ratio: f64,
    /// Reported confidence for synthesized boundaries
    pub boundary_confidence: f64,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let session = SessionConfig {
            max_sessions: env_parse("VERACITY_MAX_SESSIONS", 10),
            session_timeout_ms: env_parse("VERACITY_SESSION_TIMEOUT_MS", 300_000),
        };

        let decompose = DecomposeConfig {
            max_tasks: env_parse("VERACITY_MAX_TASKS", 8),
            drop_threshold: env_parse("VERACITY_DROP_THRESHOLD", 0.3),
        };

        let pipeline = PipelineConfig {
            max_concurrency: env_parse("VERACITY_MAX_CONCURRENCY", 4),
            disabled_stages: env::var("VERACITY_STAGES_DISABLED")
                .map(|s| {
                    s.split(',')
                        .map(|id| id.trim().to_lowercase())
                        .filter(|id| !id.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            stage_timeout_ms: env_parse("VERACITY_STAGE_TIMEOUT_MS", 10_000),
        };

        let ensemble = EnsembleConfig {
            diversity_threshold: env_parse("VERACITY_ENSEMBLE_DIVERSITY_THRESHOLD", 0.3),
            max_candidates: env_parse("VERACITY_ENSEMBLE_MAX_CANDIDATES", 3),
            quality_weight: env_parse("VERACITY_ENSEMBLE_QUALITY_WEIGHT", 0.7),
            diversity_weight: env_parse("VERACITY_ENSEMBLE_DIVERSITY_WEIGHT", 0.3),
        };

        let quality = QualityConfig {
            acceptance_confidence_threshold: env_parse(
                "VERACITY_ACCEPTANCE_CONFIDENCE_THRESHOLD",
                0.6,
            ),
            stop_prior: env_parse("VERACITY_STOP_PRIOR", 0.3),
            stop_posterior_threshold: env_parse("VERACITY_STOP_POSTERIOR_THRESHOLD", 0.8),
        };

        let termination = TerminationConfig {
            max_processing_time_ms: env_parse("VERACITY_MAX_PROCESSING_TIME_MS", 30_000),
            sufficiency_threshold: env_parse("VERACITY_SUFFICIENCY_THRESHOLD", 0.7),
            task_timeout_ms: env_parse("VERACITY_TASK_TIMEOUT_MS", 5_000),
            max_tasks_processed: env_parse("VERACITY_MAX_TASKS_PROCESSED", 15),
            max_processing_steps: env_parse("VERACITY_MAX_PROCESSING_STEPS", 100),
        };

        let boundary = BoundaryConfig {
            contrast_ratio: env_parse("VERACITY_CONTRAST_RATIO", 0.9),
            boundary_confidence: env_parse("VERACITY_BOUNDARY_CONFIDENCE", 0.8),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let config = Config {
            session,
            decompose,
            pipeline,
            ensemble,
            quality,
            termination,
            boundary,
            logging,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values outside their meaningful ranges
    pub fn validate(&self) -> Result<(), AppError> {
        fn unit(name: &str, value: f64) -> Result<(), AppError> {
            if !(0.0..=1.0).contains(&value) {
                return Err(AppError::Config {
                    message: format!("{name} must be in [0,1], got {value}"),
                });
            }
            Ok(())
        }

        unit("VERACITY_DROP_THRESHOLD", self.decompose.drop_threshold)?;
        unit(
            "VERACITY_ENSEMBLE_DIVERSITY_THRESHOLD",
            self.ensemble.diversity_threshold,
        )?;
        unit(
            "VERACITY_ENSEMBLE_QUALITY_WEIGHT",
            self.ensemble.quality_weight,
        )?;
        unit(
            "VERACITY_ENSEMBLE_DIVERSITY_WEIGHT",
            self.ensemble.diversity_weight,
        )?;
        unit(
            "VERACITY_ACCEPTANCE_CONFIDENCE_THRESHOLD",
            self.quality.acceptance_confidence_threshold,
        )?;
        unit("VERACITY_STOP_PRIOR", self.quality.stop_prior)?;
        unit(
            "VERACITY_STOP_POSTERIOR_THRESHOLD",
            self.quality.stop_posterior_threshold,
        )?;
        unit(
            "VERACITY_SUFFICIENCY_THRESHOLD",
            self.termination.sufficiency_threshold,
        )?;
        unit("VERACITY_CONTRAST_RATIO", self.boundary.contrast_ratio)?;
        unit(
            "VERACITY_BOUNDARY_CONFIDENCE",
            self.boundary.boundary_confidence,
        )?;

        if self.session.max_sessions == 0 {
            return Err(AppError::Config {
                message: "VERACITY_MAX_SESSIONS must be at least 1".to_string(),
            });
        }
        if self.ensemble.max_candidates == 0 {
            return Err(AppError::Config {
                message: "VERACITY_ENSEMBLE_MAX_CANDIDATES must be at least 1".to_string(),
            });
        }
        if self.pipeline.max_concurrency == 0 {
            return Err(AppError::Config {
                message: "VERACITY_MAX_CONCURRENCY must be at least 1".to_string(),
            });
        }
        if self.ensemble.quality_weight + self.ensemble.diversity_weight == 0.0 {
            return Err(AppError::Config {
                message: "ensemble weights must not both be zero".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            decompose: DecomposeConfig::default(),
            pipeline: PipelineConfig::default(),
            ensemble: EnsembleConfig::default(),
            quality: QualityConfig::default(),
            termination: TerminationConfig::default(),
            boundary: BoundaryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: 10,
            session_timeout_ms: 300_000,
        }
    }
}

impl Default for DecomposeConfig {
    fn default() -> Self {
        Self {
            max_tasks: 8,
            drop_threshold: 0.3,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            disabled_stages: Vec::new(),
            stage_timeout_ms: 10_000,
        }
    }
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            diversity_threshold: 0.3,
            max_candidates: 3,
            quality_weight: 0.7,
            diversity_weight: 0.3,
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            acceptance_confidence_threshold: 0.6,
            stop_prior: 0.3,
            stop_posterior_threshold: 0.8,
        }
    }
}

impl Default for TerminationConfig {
    fn default() -> Self {
        Self {
            max_processing_time_ms: 30_000,
            sufficiency_threshold: 0.7,
            task_timeout_ms: 5_000,
            max_tasks_processed: 15,
            max_processing_steps: 100,
        }
    }
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            contrast_ratio: 0.9,
            boundary_confidence: 0.8,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
