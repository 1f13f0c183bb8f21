use crate::traits::{DatasetLoader, LabeledRecord, SubwordSplitter};
use anyhow::Result;
use std::path::Path;
use tokenizers::Tokenizer;

/// Sub-word splitter backed by a HuggingFace `tokenizer.json`
///
/// Each whitespace token is encoded on its own without special tokens, so
/// the normalizer and pre-tokenizer of the pretrained model (e.g. BERT's
/// punctuation splitting) still apply inside the token.
pub struct TokenizerSplitter {
    tokenizer: Tokenizer,
    name: String,
    unknown_piece: String,
    unknown_id: u32,
    padding_piece: String,
    padding_id: u32,
}

impl TokenizerSplitter {
    pub fn from_file(path: &Path) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path).map_err(|e| {
            anyhow::anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e)
        })?;
        let name = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or("tokenizer")
            .to_string();
        Self::new(tokenizer, name)
    }

    /// Wrap a tokenizer for per-token splitting
    ///
    /// Padding and truncation saved in `tokenizer.json` are turned off: they
    /// would apply to every single token and scatter `[PAD]` pieces through
    /// the content. Sequence length is fitted later by `propagate`.
    pub fn new(mut tokenizer: Tokenizer, name: impl Into<String>) -> Result<Self> {
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(None)
            .map_err(|e| anyhow::anyhow!("Cannot disable tokenizer truncation: {}", e))?;

        let unknown_piece = "[UNK]".to_string();
        let padding_piece = "[PAD]".to_string();
        let unknown_id = tokenizer.token_to_id(&unknown_piece).unwrap_or(100);
        // BERT vocabularies reserve id 0 for padding
        let padding_id = tokenizer.token_to_id(&padding_piece).unwrap_or(0);

        Ok(Self {
            tokenizer,
            name: name.into(),
            unknown_piece,
            unknown_id,
            padding_piece,
            padding_id,
        })
    }

    pub fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }
}

impl SubwordSplitter for TokenizerSplitter {
    fn split(&self, token: &str) -> Vec<String> {
        match self.tokenizer.encode(token, false) {
            Ok(encoding) => encoding.get_tokens().to_vec(),
            Err(e) => {
                tracing::warn!(token, error = %e, "tokenizer failed, using unknown piece");
                vec![self.unknown_piece.clone()]
            }
        }
    }

    fn piece_to_id(&self, piece: &str) -> u32 {
        if piece == self.padding_piece {
            return self.padding_id;
        }
        self.tokenizer.token_to_id(piece).unwrap_or(self.unknown_id)
    }

    fn padding_piece(&self) -> &str {
        &self.padding_piece
    }

    fn unknown_piece(&self) -> &str {
        &self.unknown_piece
    }

    fn padding_id(&self) -> u32 {
        self.padding_id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// In-memory dataset for testing and programmatic use
pub struct InMemoryDataset {
    name: String,
    records: Vec<LabeledRecord>,
}

impl InMemoryDataset {
    pub fn new(name: &str, records: Vec<LabeledRecord>) -> Self {
        Self {
            name: name.to_string(),
            records,
        }
    }
}

impl DatasetLoader for InMemoryDataset {
    fn load_records(&self) -> Result<Vec<LabeledRecord>> {
        for (idx, record) in self.records.iter().enumerate() {
            if record.raw.trim().is_empty() {
                anyhow::bail!("Record {} in dataset '{}' has empty raw text", idx, self.name);
            }
        }
        Ok(self.records.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
