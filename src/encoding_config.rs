use serde::{Deserialize, Serialize};

/// Reference sequence length for BERT-base token classification
pub const DEFAULT_MAX_LEN: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingConfig {
    pub max_len: usize,
    pub output_format: OutputFormat,
    pub parallel: bool,
}

/// File format for persisted encoded examples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// One JSON object per line, readable by any trainer
    Jsonl,
    /// bincode-encoded `Vec<EncodedExample>`
    Bincode,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jsonl => "jsonl",
            OutputFormat::Bincode => "bin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "jsonl" | "json" => Some(OutputFormat::Jsonl),
            "bincode" | "bin" => Some(OutputFormat::Bincode),
            _ => None,
        }
    }
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            max_len: DEFAULT_MAX_LEN,
            output_format: OutputFormat::Jsonl,
            parallel: true,
        }
    }
}

impl EncodingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Short sequences for quick experiments on single event types
    pub fn compact() -> Self {
        Self {
            max_len: 128,
            ..Default::default()
        }
    }

    /// BERT's positional limit, for long multi-line Windows events
    pub fn extended() -> Self {
        Self {
            max_len: 512,
            ..Default::default()
        }
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len.max(1);
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }
}
