//! Built-in pattern-matching processors.
//!
//! These analyzers are deliberately lexical: fast, deterministic, and
//! explainable. They form the local baseline that richer analyzers can
//! replace through the registry.

use async_trait::async_trait;
use tracing::debug;

use super::{ProcessRequest, TaskProcessor};
use crate::detect::ContentScan;
use crate::error::TaskOpResult;
use crate::task::{
    ContextType, Issue, IssueCategory, IssueSeverity, TaskResult, TaskType, ValidationTask,
};

const CONTRADICTION_PAIRS: &[(&str, &str)] = &[
    ("always", "never"),
    ("all ", " none"),
    ("everyone", "no one"),
    ("increases", "decreases"),
    ("must ", "must not"),
];

const INFORMAL_MARKERS: &[&str] = &[
    "gonna", "wanna", "kinda", "sorta", "awesome", "cool", "lol", "btw",
];

const VAGUE_TERMS: &[&str] = &["thing", "stuff", "various", "somehow", "a lot", "etc"];

const METRIC_UNITS: &[&str] = &[" km", " kg", " meters", " metres", " celsius", " cm", " ml"];
const IMPERIAL_UNITS: &[&str] = &[
    " miles", " lbs", " pounds", " fahrenheit", " feet", " inches",
];

const SAMPLE_MARKERS: &[&str] = &["sample", "n=", "participants", "respondents", "trials"];

const METHOD_MARKERS: &[&str] = &["method", "sample", "control", "procedure", "protocol"];

/// Penalize adequacy by issue severity, from a near-perfect baseline.
fn score_issues(task: &ValidationTask, issues: Vec<Issue>, confidence: f64) -> TaskResult {
    let penalty: f64 = issues
        .iter()
        .map(|issue| match issue.severity {
            IssueSeverity::Critical => 0.25,
            IssueSeverity::Error => 0.15,
            IssueSeverity::Warning => 0.07,
            IssueSeverity::Info => 0.02,
        })
        .sum();
    let adequacy = (0.9 - penalty).clamp(0.05, 1.0);

    let mut result = TaskResult::new(&task.id, task.task_type)
        .with_adequacy(adequacy)
        .with_importance_weight(task.importance)
        .with_confidence(confidence);
    for issue in issues {
        result = result.with_issue(issue);
    }
    result
}

/// Empty input is a finding, not a failure.
/// Empty content leaves nothing to examine; the reading is weak, not
/// confident.
fn empty_content_result(task: &ValidationTask) -> TaskResult {
    TaskResult::new(&task.id, task.task_type)
        .with_adequacy(0.1)
        .with_importance_weight(task.importance)
        .with_confidence(0.3)
        .with_issue(Issue::new(
            IssueCategory::Structural,
            IssueSeverity::Warning,
            "Content is empty",
        ))
}

fn truncate_excerpt(sentence: &str) -> String {
    let trimmed = sentence.trim();
    if trimmed.len() <= 80 {
        trimmed.to_string()
    } else {
        let mut end = 80;
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &trimmed[..end])
    }
}

// ============================================================================
// Logic
// ============================================================================

/// Checks arguments for contradictions and unsupported methodology.
pub struct LogicProcessor;

#[async_trait]
impl TaskProcessor for LogicProcessor {
    fn name(&self) -> &'static str {
        "logic"
    }

    fn capabilities(&self) -> Vec<&'static str> {
        vec!["logic_analysis"]
    }

    async fn process(&self, request: ProcessRequest) -> TaskOpResult<TaskResult> {
        let scan = ContentScan::analyze(&request.content);
        if scan.is_empty() {
            return Ok(empty_content_result(&request.task));
        }

        let mut issues = Vec::new();
        for sentence in request.content.split(['.', '!', '?']) {
            let lower = sentence.to_lowercase();
            for (a, b) in CONTRADICTION_PAIRS {
                if lower.contains(a) && lower.contains(b) {
                    issues.push(
                        Issue::new(
                            IssueCategory::Logical,
                            IssueSeverity::Error,
                            "Contradictory absolutes within one sentence",
                        )
                        .with_excerpt(truncate_excerpt(sentence))
                        .with_evidence(format!("'{}' and '{}' in the same claim", a.trim(), b.trim())),
                    );
                }
            }
            if lower.contains("because it is") || lower.contains("because they are") {
                issues.push(
                    Issue::new(
                        IssueCategory::Logical,
                        IssueSeverity::Warning,
                        "Circular justification",
                    )
                    .with_excerpt(truncate_excerpt(sentence)),
                );
            }
        }

        if request.task.task_type == TaskType::MethodologyCheck && scan.word_count > 30 {
            let lower = request.content.to_lowercase();
            if !METHOD_MARKERS.iter().any(|m| lower.contains(m)) {
                issues.push(Issue::new(
                    IssueCategory::Logical,
                    IssueSeverity::Warning,
                    "No methodology described for the claims made",
                ));
            }
        }

        debug!(
            processor = self.name(),
            task_type = %request.task.task_type,
            issues = issues.len(),
            "Logic analysis complete"
        );
        Ok(score_issues(&request.task, issues, 0.8))
    }
}

// ============================================================================
// Linguistic
// ============================================================================

/// Checks surface language quality and terminology precision.
pub struct LinguisticProcessor;

#[async_trait]
impl TaskProcessor for LinguisticProcessor {
    fn name(&self) -> &'static str {
        "linguistic"
    }

    fn capabilities(&self) -> Vec<&'static str> {
        vec!["text_analysis"]
    }

    async fn process(&self, request: ProcessRequest) -> TaskOpResult<TaskResult> {
        let scan = ContentScan::analyze(&request.content);
        if scan.is_empty() {
            return Ok(empty_content_result(&request.task));
        }

        let mut issues = Vec::new();
        let content = request.content.as_ref();

        if content.contains("  ") {
            issues.push(Issue::new(
                IssueCategory::Linguistic,
                IssueSeverity::Info,
                "Doubled whitespace",
            ));
        }

        let words: Vec<&str> = content.split_whitespace().collect();
        for pair in words.windows(2) {
            let a = pair[0].trim_matches(|c: char| !c.is_alphanumeric());
            let b = pair[1].trim_matches(|c: char| !c.is_alphanumeric());
            if a.len() > 1 && a.eq_ignore_ascii_case(b) && a.chars().all(|c| c.is_alphabetic()) {
                issues.push(
                    Issue::new(
                        IssueCategory::Linguistic,
                        IssueSeverity::Warning,
                        "Repeated word",
                    )
                    .with_excerpt(format!("{} {}", pair[0], pair[1])),
                );
                break;
            }
        }

        for sentence in content.split(['.', '!', '?']) {
            if sentence.split_whitespace().count() > 40 {
                issues.push(
                    Issue::new(
                        IssueCategory::Linguistic,
                        IssueSeverity::Warning,
                        "Sentence is too long to follow",
                    )
                    .with_excerpt(truncate_excerpt(sentence)),
                );
            }
        }

        let trimmed = content.trim_end();
        if trimmed
            .chars()
            .last()
            .map(|c| c.is_alphanumeric())
            .unwrap_or(false)
        {
            issues.push(Issue::new(
                IssueCategory::Linguistic,
                IssueSeverity::Info,
                "Missing terminal punctuation",
            ));
        }

        if request.task.task_type == TaskType::TerminologyPrecision {
            let lower = content.to_lowercase();
            for term in VAGUE_TERMS {
                if lower.contains(term) {
                    issues.push(
                        Issue::new(
                            IssueCategory::Linguistic,
                            IssueSeverity::Warning,
                            "Vague term where precision is expected",
                        )
                        .with_excerpt((*term).to_string()),
                    );
                }
            }
        }

        debug!(
            processor = self.name(),
            task_type = %request.task.task_type,
            issues = issues.len(),
            "Linguistic analysis complete"
        );
        Ok(score_issues(&request.task, issues, 0.85))
    }
}

// ============================================================================
// Tone
// ============================================================================

/// Checks register fit and narrative voice stability.
pub struct ToneProcessor;

#[async_trait]
impl TaskProcessor for ToneProcessor {
    fn name(&self) -> &'static str {
        "tone"
    }

    fn capabilities(&self) -> Vec<&'static str> {
        vec!["tone_analysis"]
    }

    async fn process(&self, request: ProcessRequest) -> TaskOpResult<TaskResult> {
        let scan = ContentScan::analyze(&request.content);
        if scan.is_empty() {
            return Ok(empty_content_result(&request.task));
        }

        let mut issues = Vec::new();
        let lower = request.content.to_lowercase();

        let formal_expected = request.context.characteristics.requires_professional_tone
            || request.context.context_type == ContextType::Professional;
        if formal_expected {
            for marker in INFORMAL_MARKERS {
                if lower.contains(marker) {
                    issues.push(
                        Issue::new(
                            IssueCategory::Tone,
                            IssueSeverity::Warning,
                            "Informal language in professional content",
                        )
                        .with_excerpt((*marker).to_string()),
                    );
                }
            }
        }

        if request.content.matches('!').count() > 2 {
            issues.push(Issue::new(
                IssueCategory::Tone,
                IssueSeverity::Info,
                "Heavy exclamation use",
            ));
        }

        if request.task.task_type == TaskType::VoiceConsistency {
            let padded = format!(" {} ", lower);
            if padded.contains(" i ") && padded.contains(" we ") {
                issues.push(Issue::new(
                    IssueCategory::Tone,
                    IssueSeverity::Info,
                    "Narrative person shifts between singular and plural",
                ));
            }
        }

        debug!(
            processor = self.name(),
            task_type = %request.task.task_type,
            issues = issues.len(),
            "Tone analysis complete"
        );
        Ok(score_issues(&request.task, issues, 0.7))
    }
}

// ============================================================================
// Factual
// ============================================================================

/// Checks claim support: citations, hedging, and overclaiming.
pub struct FactualProcessor;

#[async_trait]
impl TaskProcessor for FactualProcessor {
    fn name(&self) -> &'static str {
        "factual"
    }

    fn capabilities(&self) -> Vec<&'static str> {
        vec!["fact_checking"]
    }

    async fn process(&self, request: ProcessRequest) -> TaskOpResult<TaskResult> {
        let scan = ContentScan::analyze(&request.content);
        if scan.is_empty() {
            return Ok(empty_content_result(&request.task));
        }

        let mut issues = Vec::new();
        let severity = if request.context.requires_factual_accuracy() {
            IssueSeverity::Error
        } else {
            IssueSeverity::Warning
        };

        if scan.certainty_without_citations() {
            for marker in &scan.certainty_markers {
                issues.push(
                    Issue::new(
                        IssueCategory::Factual,
                        severity,
                        "Absolute claim without supporting citation",
                    )
                    .with_excerpt((*marker).to_string())
                    .with_remediation("Cite a source or soften the claim"),
                );
            }
        }

        if scan.has_statistical_claims() && !scan.has_citations() {
            issues.push(Issue::new(
                IssueCategory::Factual,
                IssueSeverity::Warning,
                "Statistical claim lacks a source",
            ));
        }

        match request.task.task_type {
            TaskType::CitationSupport => {
                let makes_claims = scan.certainty_marker_count > 0
                    || scan.has_statistical_claims()
                    || scan.has_causal_claims();
                if makes_claims && !scan.has_citations() {
                    issues.push(Issue::new(
                        IssueCategory::Factual,
                        IssueSeverity::Error,
                        "Claims lack citation support",
                    ));
                }
            }
            TaskType::ComparativeClaims => {
                if scan.has_comparative_claims() && !scan.has_citations() && !scan.has_numbers {
                    issues.push(Issue::new(
                        IssueCategory::Factual,
                        IssueSeverity::Warning,
                        "Comparative claim without measurement or source",
                    ));
                }
            }
            TaskType::CausalClaims => {
                if scan.has_causal_claims() && scan.hedge_count == 0 {
                    issues.push(Issue::new(
                        IssueCategory::Factual,
                        IssueSeverity::Warning,
                        "Causal claim stated without qualification",
                    ));
                }
            }
            _ => {}
        }

        debug!(
            processor = self.name(),
            task_type = %request.task.task_type,
            issues = issues.len(),
            "Factual analysis complete"
        );
        Ok(score_issues(&request.task, issues, 0.75))
    }
}

// ============================================================================
// Quantitative
// ============================================================================

/// Checks numeric coherence: unit systems, proportions, samples.
pub struct QuantitativeProcessor;

#[async_trait]
impl TaskProcessor for QuantitativeProcessor {
    fn name(&self) -> &'static str {
        "quantitative"
    }

    fn capabilities(&self) -> Vec<&'static str> {
        vec!["mathematical_analysis"]
    }

    async fn process(&self, request: ProcessRequest) -> TaskOpResult<TaskResult> {
        let scan = ContentScan::analyze(&request.content);
        if scan.is_empty() {
            return Ok(empty_content_result(&request.task));
        }

        let mut issues = Vec::new();
        let lower = request.content.to_lowercase();

        let metric = METRIC_UNITS.iter().find(|u| lower.contains(*u));
        let imperial = IMPERIAL_UNITS.iter().find(|u| lower.contains(*u));
        if let (Some(m), Some(i)) = (metric, imperial) {
            issues.push(
                Issue::new(
                    IssueCategory::Mathematical,
                    IssueSeverity::Warning,
                    "Mixed unit systems",
                )
                .with_evidence(format!("both '{}' and '{}' appear", m.trim(), i.trim())),
            );
        }

        for word in lower.split_whitespace() {
            if let Some(stripped) = word.strip_suffix('%') {
                if let Ok(value) = stripped.parse::<f64>() {
                    if value > 100.0 && lower.contains(" of ") {
                        issues.push(
                            Issue::new(
                                IssueCategory::Mathematical,
                                IssueSeverity::Warning,
                                "Percentage over 100 used as a proportion",
                            )
                            .with_excerpt(word.to_string()),
                        );
                    }
                }
            }
        }

        if request.task.task_type == TaskType::StatisticalClaims
            && scan.has_statistical_claims()
            && !SAMPLE_MARKERS.iter().any(|m| lower.contains(m))
        {
            issues.push(Issue::new(
                IssueCategory::Mathematical,
                IssueSeverity::Warning,
                "Statistical claim without sample information",
            ));
        }

        debug!(
            processor = self.name(),
            task_type = %request.task.task_type,
            issues = issues.len(),
            "Quantitative analysis complete"
        );
        Ok(score_issues(&request.task, issues, 0.8))
    }
}

// ============================================================================
// Structure
// ============================================================================

/// Checks document organization at the paragraph and sentence level.
pub struct StructureProcessor;

#[async_trait]
impl TaskProcessor for StructureProcessor {
    fn name(&self) -> &'static str {
        "structure"
    }

    fn capabilities(&self) -> Vec<&'static str> {
        vec!["text_analysis"]
    }

    async fn process(&self, request: ProcessRequest) -> TaskOpResult<TaskResult> {
        let scan = ContentScan::analyze(&request.content);
        if scan.is_empty() {
            return Ok(empty_content_result(&request.task));
        }

        let mut issues = Vec::new();

        if scan.paragraph_count == 1 && scan.word_count > 150 {
            issues.push(Issue::new(
                IssueCategory::Structural,
                IssueSeverity::Warning,
                "Long content without paragraph breaks",
            ));
        }

        if scan.word_count < 10 {
            issues.push(Issue::new(
                IssueCategory::Structural,
                IssueSeverity::Info,
                "Too brief to assess structure",
            ));
        }

        if scan.sentence_count > 0 {
            let avg_words = scan.word_count as f64 / scan.sentence_count as f64;
            if avg_words > 35.0 {
                issues.push(Issue::new(
                    IssueCategory::Structural,
                    IssueSeverity::Warning,
                    "Consistently long sentences impede structure",
                ));
            }
        }

        debug!(
            processor = self.name(),
            task_type = %request.task.task_type,
            issues = issues.len(),
            "Structure analysis complete"
        );
        Ok(score_issues(&request.task, issues, 0.7))
    }
}

// ============================================================================
// Generic fallback
// ============================================================================

/// Neutral analyzer for task types with no specialist registered.
pub struct GenericProcessor;

#[async_trait]
impl TaskProcessor for GenericProcessor {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn capabilities(&self) -> Vec<&'static str> {
        vec!["text_analysis"]
    }

    async fn process(&self, request: ProcessRequest) -> TaskOpResult<TaskResult> {
        let scan = ContentScan::analyze(&request.content);
        if scan.is_empty() {
            return Ok(empty_content_result(&request.task));
        }

        debug!(
            processor = self.name(),
            task_type = %request.task.task_type,
            "Generic pass-through analysis"
        );
        Ok(TaskResult::new(&request.task.id, request.task.task_type)
            .with_adequacy(0.5)
            .with_importance_weight(request.task.importance)
            .with_confidence(0.5)
            .with_metadata(serde_json::json!({ "processor": "generic" })))
    }
}
