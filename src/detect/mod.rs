//! Lightweight lexical probes over the content under validation.
//!
//! These are deliberately cheap pattern scans, not semantic analysis.
//! They feed task decomposition (which claims need checking), the
//! scoring policy (mathematical content boosts logical weight), and
//! the builtin processors (certainty without citations).

const STATISTICAL_MARKERS: &[&str] = &[
    "percent",
    "% of",
    "statistics show",
    "statistically",
    "on average",
    "median",
    "survey found",
    "study found",
    "studies show",
    "majority of",
];

const COMPARATIVE_MARKERS: &[&str] = &[
    "better than",
    "worse than",
    "more than",
    "less than",
    "faster than",
    "slower than",
    "superior to",
    "outperforms",
    "compared to",
    "twice as",
];

const CAUSAL_MARKERS: &[&str] = &[
    "causes",
    "caused by",
    "leads to",
    "results in",
    "due to",
    "because of",
    "triggers",
    "drives",
    "produces",
    "is responsible for",
];

const CERTAINTY_MARKERS: &[&str] = &[
    "definitely",
    "certainly",
    "undoubtedly",
    "proves",
    "proven",
    "always",
    "never",
    "guaranteed",
    "without question",
    "obviously",
    "clearly",
    "unquestionably",
];

const CITATION_MARKERS: &[&str] = &[
    "et al",
    "according to",
    "source:",
    "doi:",
    "reference",
    "cited in",
    "[1]",
    "(19",
    "(20",
];

const MATH_MARKERS: &[&str] = &[
    "equation",
    "formula",
    "calculate",
    "calculation",
    "sum of",
    "divided by",
    "multiplied by",
    " = ",
    " + ",
    " * ",
];

const HEDGE_MARKERS: &[&str] = &[
    "may",
    "might",
    "could",
    "suggests",
    "appears to",
    "likely",
    "possibly",
    "estimated",
];

/// Lexical feature summary of one piece of content.
#[derive(Debug, Clone, Default)]
pub struct ContentScan {
    /// Whitespace-separated word count.
    pub word_count: usize,
    /// Rough sentence count from terminal punctuation.
    pub sentence_count: usize,
    /// Blank-line separated paragraph count.
    pub paragraph_count: usize,
    /// Total statistical-claim marker hits.
    pub statistical_claims: usize,
    /// Total comparative-claim marker hits.
    pub comparative_claims: usize,
    /// Total causal-claim marker hits.
    pub causal_claims: usize,
    /// Total certainty-marker hits.
    pub certainty_marker_count: usize,
    /// Distinct certainty markers that matched.
    pub certainty_markers: Vec<&'static str>,
    /// Total citation marker hits.
    pub citation_count: usize,
    /// Total hedging marker hits.
    pub hedge_count: usize,
    /// Whether mathematical notation or vocabulary is present.
    pub has_mathematical_content: bool,
    /// Whether any digits appear at all.
    pub has_numbers: bool,
}

fn count_hits(haystack: &str, markers: &[&str]) -> usize {
    markers
        .iter()
        .map(|marker| haystack.matches(marker).count())
        .sum()
}

impl ContentScan {
    /// Scan content once and derive all lexical features
    pub fn analyze(content: &str) -> Self {
        let lower = content.to_lowercase();

        let certainty_markers: Vec<&'static str> = CERTAINTY_MARKERS
            .iter()
            .copied()
            .filter(|marker| lower.contains(marker))
            .collect();

        Self {
            word_count: content.split_whitespace().count(),
            sentence_count: content
                .split(['.', '!', '?'])
                .filter(|s| !s.trim().is_empty())
                .count(),
            paragraph_count: content
                .split("\n\n")
                .filter(|p| !p.trim().is_empty())
                .count(),
            statistical_claims: count_hits(&lower, STATISTICAL_MARKERS)
                + lower.matches('%').count(),
            comparative_claims: count_hits(&lower, COMPARATIVE_MARKERS),
            causal_claims: count_hits(&lower, CAUSAL_MARKERS),
            certainty_marker_count: count_hits(&lower, CERTAINTY_MARKERS),
            certainty_markers,
            citation_count: count_hits(&lower, CITATION_MARKERS),
            hedge_count: count_hits(&lower, HEDGE_MARKERS),
            has_mathematical_content: count_hits(&lower, MATH_MARKERS) > 0
                || lower.matches('%').count() >= 2,
            has_numbers: content.chars().any(|c| c.is_ascii_digit()),
        }
    }

    /// Whether the content makes statistical claims
    pub fn has_statistical_claims(&self) -> bool {
        self.statistical_claims > 0
    }

    /// Whether the content makes comparative claims
    pub fn has_comparative_claims(&self) -> bool {
        self.comparative_claims > 0
    }

    /// Whether the content makes causal claims
    pub fn has_causal_claims(&self) -> bool {
        self.causal_claims > 0
    }

    /// Whether any citation shapes appear
    pub fn has_citations(&self) -> bool {
        self.citation_count > 0
    }

    /// Strong assertions with nothing backing them
    pub fn certainty_without_citations(&self) -> bool {
        self.certainty_marker_count > 0 && self.citation_count == 0
    }

    /// Whether the content is empty or whitespace only
    pub fn is_empty(&self) -> bool {
        self.word_count == 0
    }
}
