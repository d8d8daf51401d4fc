//! Processor registry mapping task types to analyzers.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::error;

use super::builtins::{
    FactualProcessor, GenericProcessor, LinguisticProcessor, LogicProcessor,
    QuantitativeProcessor, StructureProcessor, ToneProcessor,
};
use super::TaskProcessor;
use crate::task::TaskType;

/// Registry for task processors.
///
/// Thread-safe lookup by task type, with built-in processors
/// registered on creation and a generic fallback for task types
/// nothing claims.
pub struct ProcessorRegistry {
    processors: RwLock<HashMap<TaskType, Arc<dyn TaskProcessor>>>,
    fallback: Arc<dyn TaskProcessor>,
}

impl ProcessorRegistry {
    /// Create a new registry with built-in processors.
    pub fn new() -> Self {
        let registry = Self {
            processors: RwLock::new(HashMap::new()),
            fallback: Arc::new(GenericProcessor),
        };
        registry.register_builtins();
        registry
    }

    /// Register a processor for a task type.
    ///
    /// # Errors
    /// Returns error if the processor is malformed or the task type
    /// already has a processor. Use [`ProcessorRegistry::replace`] to
    /// swap one out.
    pub fn register(
        &self,
        task_type: TaskType,
        processor: Arc<dyn TaskProcessor>,
    ) -> Result<(), String> {
        if processor.name().is_empty() {
            return Err("Processor name is required".to_string());
        }
        if processor.capabilities().is_empty() {
            return Err("Processor must advertise at least one capability".to_string());
        }

        let mut processors = self.processors.write().unwrap();
        if processors.contains_key(&task_type) {
            return Err(format!(
                "Task type '{}' already has a processor",
                task_type
            ));
        }

        processors.insert(task_type, processor);
        Ok(())
    }

    /// Replace the processor for a task type unconditionally.
    pub fn replace(&self, task_type: TaskType, processor: Arc<dyn TaskProcessor>) {
        self.processors.write().unwrap().insert(task_type, processor);
    }

    /// Remove the processor for a task type, reverting it to the
    /// generic fallback. Returns whether one was registered.
    pub fn unregister(&self, task_type: TaskType) -> bool {
        self.processors.write().unwrap().remove(&task_type).is_some()
    }

    /// Get the processor for a task type, falling back to the generic
    /// analyzer when nothing is registered.
    pub fn get(&self, task_type: TaskType) -> Arc<dyn TaskProcessor> {
        self.processors
            .read()
            .unwrap()
            .get(&task_type)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }

    /// Whether a dedicated processor is registered for a task type.
    pub fn has(&self, task_type: TaskType) -> bool {
        self.processors.read().unwrap().contains_key(&task_type)
    }

    /// Get the number of registered processors.
    pub fn count(&self) -> usize {
        self.processors.read().unwrap().len()
    }

    fn register_builtins(&self) {
        let logic: Arc<dyn TaskProcessor> = Arc::new(LogicProcessor);
        let linguistic: Arc<dyn TaskProcessor> = Arc::new(LinguisticProcessor);
        let tone: Arc<dyn TaskProcessor> = Arc::new(ToneProcessor);
        let factual: Arc<dyn TaskProcessor> = Arc::new(FactualProcessor);
        let quantitative: Arc<dyn TaskProcessor> = Arc::new(QuantitativeProcessor);
        let structure: Arc<dyn TaskProcessor> = Arc::new(StructureProcessor);

        let assignments: [(TaskType, Arc<dyn TaskProcessor>); 13] = [
            (TaskType::LogicalConsistency, Arc::clone(&logic)),
            (TaskType::MethodologyCheck, Arc::clone(&logic)),
            (TaskType::LinguisticQuality, Arc::clone(&linguistic)),
            (TaskType::TerminologyPrecision, Arc::clone(&linguistic)),
            (TaskType::ToneAppropriateness, Arc::clone(&tone)),
            (TaskType::VoiceConsistency, Arc::clone(&tone)),
            (TaskType::FactualVerification, Arc::clone(&factual)),
            (TaskType::CitationSupport, Arc::clone(&factual)),
            (TaskType::ComparativeClaims, Arc::clone(&factual)),
            (TaskType::CausalClaims, Arc::clone(&factual)),
            (TaskType::StatisticalClaims, Arc::clone(&quantitative)),
            (TaskType::UnitConsistency, Arc::clone(&quantitative)),
            (TaskType::StructuralOrganization, Arc::clone(&structure)),
        ];

        for (task_type, processor) in assignments {
            if let Err(e) = self.register(task_type, processor) {
                error!(
                    task_type = %task_type,
                    error = %e,
                    "Failed to register builtin processor - this indicates a programming error"
                );
            }
        }
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
