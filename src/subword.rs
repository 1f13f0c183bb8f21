//! Sub-word label propagation and encoding
//!
//! Each whitespace token is split into pieces by a pretrained vocabulary. The
//! first piece keeps the token's tag and every later piece gets the
//! continuation tag `X`, which evaluation skips. The flat piece sequence is
//! then padded or truncated to a fixed length.

use crate::field_aligner::{Tag, TokenTagSequence};
use crate::tag_vocabulary::TagVocabulary;
use crate::traits::SubwordSplitter;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Fixed-length sequence of (piece, tag) pairs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceTagSequence<'a> {
    pieces: Vec<String>,
    tags: Vec<Tag<'a>>,
    /// Pieces produced before padding or truncation
    natural_len: usize,
}

impl<'a> PieceTagSequence<'a> {
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn pieces(&self) -> &[String] {
        &self.pieces
    }

    pub fn tags(&self) -> &[Tag<'a>] {
        &self.tags
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Tag<'a>)> + '_ {
        self.pieces
            .iter()
            .map(|p| p.as_str())
            .zip(self.tags.iter().copied())
    }

    /// Number of pieces the record produced before fitting to length
    pub fn natural_len(&self) -> usize {
        self.natural_len
    }

    pub fn was_truncated(&self) -> bool {
        self.natural_len > self.pieces.len()
    }
}

/// Model-ready example: piece ids, tag ids and attention mask
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedExample {
    pub input_ids: Vec<u32>,
    pub tag_ids: Vec<u32>,
    pub attention_mask: Vec<u8>,
}

impl EncodedExample {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Count of real (non-padding) positions
    pub fn content_len(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m == 1).count()
    }
}

/// Split tokens into pieces, propagate tags, and fit to `max_len`
pub fn propagate<'a, S>(
    tokens_with_tags: &TokenTagSequence<'a>,
    splitter: &S,
    max_len: usize,
) -> PieceTagSequence<'a>
where
    S: SubwordSplitter + ?Sized,
{
    let mut pieces = Vec::with_capacity(max_len);
    let mut tags = Vec::with_capacity(max_len);

    for (token, tag) in tokens_with_tags.iter() {
        let mut split = splitter.split(token);
        if split.is_empty() {
            split.push(splitter.unknown_piece().to_string());
        }

        for (i, piece) in split.into_iter().enumerate() {
            pieces.push(piece);
            tags.push(if i == 0 { tag } else { Tag::Continuation });
        }
    }

    let natural_len = pieces.len();
    if natural_len > max_len {
        tracing::debug!(natural_len, max_len, "truncating piece sequence");
        pieces.truncate(max_len);
        tags.truncate(max_len);
    } else {
        let padding = splitter.padding_piece();
        pieces.resize_with(max_len, || padding.to_string());
        tags.resize(max_len, Tag::Padding);
    }

    PieceTagSequence {
        pieces,
        tags,
        natural_len,
    }
}

/// Map pieces and tags to ids and derive the attention mask
///
/// Fails only if a tag is missing from the vocabulary, which means the
/// vocabulary was not built over the data being encoded.
pub fn encode<S>(
    sequence: &PieceTagSequence<'_>,
    splitter: &S,
    vocabulary: &TagVocabulary,
) -> Result<EncodedExample>
where
    S: SubwordSplitter + ?Sized,
{
    let padding_id = splitter.padding_id();

    let input_ids: Vec<u32> = sequence
        .pieces()
        .iter()
        .map(|piece| splitter.piece_to_id(piece))
        .collect();

    let tag_ids = sequence
        .tags()
        .iter()
        .map(|&tag| {
            vocabulary
                .tag_id(tag)
                .ok_or_else(|| anyhow::anyhow!("Tag '{}' is not in the tag vocabulary", tag))
        })
        .collect::<Result<Vec<u32>>>()?;

    let attention_mask = input_ids
        .iter()
        .map(|&id| u8::from(id != padding_id))
        .collect();

    Ok(EncodedExample {
        input_ids,
        tag_ids,
        attention_mask,
    })
}
