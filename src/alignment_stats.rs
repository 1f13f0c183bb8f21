use crate::field_aligner::{is_absent, TokenTagSequence};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// How often one field had a value and how often that value was found
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCoverage {
    pub present: usize,
    pub matched: usize,
    pub tokens: usize,
}

impl FieldCoverage {
    pub fn match_rate(&self) -> f64 {
        if self.present == 0 {
            return 0.0;
        }
        self.matched as f64 / self.present as f64
    }

    /// Present values that never reached the tagger
    pub fn unmatched(&self) -> usize {
        self.present - self.matched
    }
}

/// Label-noise report over aligned records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlignmentStats {
    pub records: usize,
    pub tokens: usize,
    pub other_tokens: usize,
    pub fields: FxHashMap<String, FieldCoverage>,
}

impl AlignmentStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one aligned record
    pub fn add(&mut self, fields: &[(String, String)], sequence: &TokenTagSequence<'_>) {
        self.records += 1;
        self.tokens += sequence.len();

        for (name, value) in fields {
            if is_absent(value) || value.trim().is_empty() {
                continue;
            }
            self.fields.entry(name.clone()).or_default().present += 1;
        }

        for span in sequence.spans() {
            let coverage = self.fields.entry(span.field.to_string()).or_default();
            coverage.matched += 1;
            coverage.tokens += span.len();
        }

        let tagged: usize = sequence.spans().iter().map(|s| s.len()).sum();
        self.other_tokens += sequence.len() - tagged;
    }

    pub fn coverage(&self, field: &str) -> FieldCoverage {
        self.fields.get(field).copied().unwrap_or_default()
    }

    /// Fraction of present field values that were located in the raw text
    pub fn overall_match_rate(&self) -> f64 {
        let (present, matched) = self
            .fields
            .values()
            .fold((0, 0), |(p, m), c| (p + c.present, m + c.matched));
        if present == 0 {
            return 0.0;
        }
        matched as f64 / present as f64
    }

    /// Fields ordered by ascending match rate, worst first
    pub fn worst_fields(&self, limit: usize) -> Vec<(&str, FieldCoverage)> {
        let mut fields: Vec<_> = self
            .fields
            .iter()
            .map(|(name, c)| (name.as_str(), *c))
            .collect();
        fields.sort_by(|a, b| {
            a.1.match_rate()
                .partial_cmp(&b.1.match_rate())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        fields.truncate(limit);
        fields
    }

    /// Merge another set of statistics into this one
    pub fn merge(&mut self, other: &AlignmentStats) {
        self.records += other.records;
        self.tokens += other.tokens;
        self.other_tokens += other.other_tokens;
        for (name, c) in &other.fields {
            let entry = self.fields.entry(name.clone()).or_default();
            entry.present += c.present;
            entry.matched += c.matched;
            entry.tokens += c.tokens;
        }
    }

    pub fn log_summary(&self) {
        tracing::info!(
            records = self.records,
            tokens = self.tokens,
            other_tokens = self.other_tokens,
            match_rate = %format!("{:.1}%", self.overall_match_rate() * 100.0),
            "alignment summary"
        );
        for (name, c) in self.worst_fields(5) {
            if c.unmatched() > 0 {
                tracing::info!(
                    field = name,
                    present = c.present,
                    matched = c.matched,
                    "field values missing from raw text"
                );
            }
        }
    }
}
