/// Dependency injection traits for dataset preparation and testing
///
/// This module provides trait-based abstractions for:
/// - Dataset loading (labeled log records)
/// - Sub-word splitting (pretrained vocabulary lookup)
///
/// This allows you to swap a real HuggingFace tokenizer for a small
/// in-memory vocabulary in tests, or a CSV file for an in-memory dataset.
use anyhow::Result;

// ============================================================================
// Labeled Records
// ============================================================================

/// One labeled log event: the raw line plus its structured field values
///
/// Fields are kept as an ordered list. Alignment resolves ties by this order,
/// so it must be stable across runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledRecord {
    /// The raw log text
    pub raw: String,
    /// Ordered (field name, field value) pairs
    pub fields: Vec<(String, String)>,
}

impl LabeledRecord {
    pub fn new(raw: impl Into<String>, fields: Vec<(String, String)>) -> Self {
        Self {
            raw: raw.into(),
            fields,
        }
    }

    /// Convenience constructor for literal field lists
    pub fn from_pairs(raw: impl Into<String>, fields: &[(&str, &str)]) -> Self {
        Self::new(
            raw,
            fields
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        )
    }

    /// Field names in order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Look up a field value by name
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value.as_str())
    }
}

// ============================================================================
// Dataset Loader Trait
// ============================================================================

/// Trait for loading labeled datasets
///
/// Implementations can load from:
/// - CSV exports of parsed security logs
/// - In-memory test data
pub trait DatasetLoader: Send + Sync {
    /// Load every labeled record, in file order
    fn load_records(&self) -> Result<Vec<LabeledRecord>>;

    /// Get the dataset name (for reporting)
    fn name(&self) -> &str;
}

// ============================================================================
// Sub-word Splitter Trait
// ============================================================================

/// Pretrained sub-word vocabulary, treated as an opaque capability
///
/// Implementations must be deterministic and stateless so a single instance
/// can be shared across rayon workers.
pub trait SubwordSplitter: Send + Sync {
    /// Split one whitespace token into ordered sub-word pieces
    ///
    /// Out-of-vocabulary fragments come back as the unknown piece.
    fn split(&self, token: &str) -> Vec<String>;

    /// Map a piece to its vocabulary id
    fn piece_to_id(&self, piece: &str) -> u32;

    /// The piece used to pad sequences to a fixed length
    fn padding_piece(&self) -> &str {
        "[PAD]"
    }

    /// The piece emitted for out-of-vocabulary fragments
    fn unknown_piece(&self) -> &str {
        "[UNK]"
    }

    /// Id of the padding piece
    fn padding_id(&self) -> u32 {
        self.piece_to_id(self.padding_piece())
    }

    /// Get the name/identifier of this splitter (for reporting)
    fn name(&self) -> &str;
}
