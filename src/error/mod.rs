use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    #[error("Stage error: {0}")]
    Stage(#[from] StageError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Session store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("Session busy: {session_id} already has an active run")]
    SessionBusy { session_id: String },

    #[error("Session capacity exceeded: limit {limit}")]
    CapacityExceeded { limit: usize },

    #[error("Invalid session status: {session_id} is {status}")]
    InvalidStatus { session_id: String, status: String },
}

/// Task processing errors
///
/// These are recoverable: the pipeline converts them into failed
/// task results instead of aborting the run.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Processor failed for task {task_id}: {message}")]
    ProcessorFailed { task_id: String, message: String },

    #[error("Task {task_id} timed out after {timeout_ms}ms")]
    Timeout { task_id: String, timeout_ms: u64 },

    #[error("Invalid processor output for task {task_id}: {reason}")]
    InvalidOutput { task_id: String, reason: String },
}

/// Stage execution errors
///
/// Converted into failed stage results; later stages still run.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("Stage {stage} failed: {message}")]
    ExecutionFailed { stage: String, message: String },

    #[error("Stage {stage} timed out after {timeout_ms}ms")]
    Timeout { stage: String, timeout_ms: u64 },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for fallible task operations
pub type TaskOpResult<T> = Result<T, TaskError>;

/// Result type alias for stage operations
pub type StageOpResult<T> = Result<T, StageError>;
