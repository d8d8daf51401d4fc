//! # Veracity
//!
//! A bounded, multi-stage content validation orchestrator. Content is
//! decomposed into typed validation tasks, processed through a staged
//! pipeline under explicit resource budgets, and assessed for quality
//! until the run converges or a budget is exhausted.
//!
//! ## Features
//!
//! - **Task Decomposition**: Context-aware splitting of content into typed
//!   validation tasks with importance weights and dependencies
//! - **Adaptive Policy**: Scoring weights, quality thresholds, and budgets
//!   derived from the problem context and stakes
//! - **Staged Pipeline**: Structure, normalize, fuse, candidates, scoring,
//!   selection, verification, and reasoning stages with graceful degradation
//! - **Ensemble Selection**: Multi-candidate scoring with diversity metrics
//!   and weighted agreement
//! - **Quality Monitoring**: Dimension scores, deficiency analysis, and
//!   bounded refinement decisions
//! - **Boundary Synthesis**: Contrastive applicability boundaries and a
//!   final verdict for tasks without a known methodology
//! - **Session Lifecycle**: Concurrent session store with status
//!   transitions, idle sweeping, and archival events
//!
//! ## Architecture
//!
//! ```text
//! Content → Decompose → Pipeline pass → Quality assessment
//!               ↑                             ↓
//!               └──────── refine? ←───────────┤
//!                                             ↓
//!                              Boundary synthesis → Report
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use veracity::{Config, Orchestrator};
//! use veracity::task::{ContextType, ProblemContext, Stakes};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let orchestrator = Orchestrator::new(config);
//!     let context = ProblemContext::new(ContextType::Technical)
//!         .with_stakes(Stakes::High);
//!     let report = orchestrator.validate("content to check", context).await?;
//!     println!("{}", report.verdict);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Contrastive boundary synthesis and verdicts.
pub mod boundary;
/// Configuration management for the validator.
pub mod config;
/// Content decomposition into validation tasks.
pub mod decompose;
/// Content characteristic detection heuristics.
pub mod detect;
/// Error types and result aliases for the application.
pub mod error;
/// Run orchestration across sessions, passes, and reports.
pub mod orchestrator;
/// Staged validation pipeline and ensemble selection.
pub mod pipeline;
/// Scoring policy generation from problem context.
pub mod policy;
/// Task processors and the processor registry.
pub mod processors;
/// Quality assessment and refinement decisions.
pub mod quality;
/// Session state, status transitions, and the session store.
pub mod session;
/// Task types, problem context, and task results.
pub mod task;
/// Bounded termination policy.
pub mod termination;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use orchestrator::{Orchestrator, RunStats, ValidationReport};
