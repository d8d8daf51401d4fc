//! Pluggable task processors.
//!
//! This module provides:
//! - `TaskProcessor`: The analyzer trait tasks are routed to
//! - `ProcessorRegistry`: Registration and lookup with a generic fallback
//! - Built-in pattern-matching processors for every task category

mod builtins;
mod registry;

pub use builtins::*;
pub use registry::ProcessorRegistry;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TaskOpResult;
use crate::task::{ProblemContext, TaskResult, ValidationTask};

/// Everything a processor needs to work on one task.
///
/// Content is shared, not copied, so fanning a request out across
/// concurrent processors stays cheap.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    /// The content under validation.
    pub content: Arc<str>,
    /// The task to perform.
    pub task: ValidationTask,
    /// The context the content was submitted under.
    pub context: ProblemContext,
}

impl ProcessRequest {
    /// Bundle a task with its content and context
    pub fn new(content: Arc<str>, task: ValidationTask, context: ProblemContext) -> Self {
        Self {
            content,
            task,
            context,
        }
    }
}

/// An analyzer that can process validation tasks.
///
/// Implementations must be cheap to call concurrently; the pipeline
/// fans tasks out across processors without coordination beyond the
/// concurrency limit.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskProcessor: Send + Sync {
    /// Stable processor name for logs and reports
    fn name(&self) -> &'static str;

    /// Capabilities this processor advertises
    fn capabilities(&self) -> Vec<&'static str>;

    /// Process one task against the content
    async fn process(&self, request: ProcessRequest) -> TaskOpResult<TaskResult>;
}
