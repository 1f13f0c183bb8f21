/// Field Alignment for Token Classification Labels
///
/// Maps structured field values back onto the whitespace tokens of a raw log
/// line, producing one tag per token:
/// 1. OTHER: token not covered by any field value
/// 2. FIELD(name): token is part of the value of field `name`
///
/// Matching is greedy and order-sensitive:
/// - fields are processed in the order given
/// - each field claims the first exact, unclaimed occurrence of its value
/// - a field whose value never appears unclaimed contributes nothing
use crate::traits::LabeledRecord;
use smallvec::SmallVec;
use std::fmt;

/// Tag for tokens not covered by any field
pub const OTHER_TAG: &str = "other";
/// Tag for non-initial sub-word pieces of a token
pub const CONTINUATION_TAG: &str = "X";
/// Tag for positions past the end of a record
pub const PADDING_TAG: &str = "PAD";

/// Tag names that can never be used as field names
pub const RESERVED_TAGS: &[&str] = &[PADDING_TAG, CONTINUATION_TAG, OTHER_TAG];

/// Encoded values that mean "this field has no value"
pub const EMPTY_MARKERS: &[&str] = &["", "-", "None", "NaN"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag<'a> {
    /// Not part of any field value
    Other,
    /// Part of the value of the named field
    Field(&'a str),
    /// Non-initial piece of a multi-piece token
    Continuation,
    /// Padding beyond the record's true length
    Padding,
}

impl<'a> Tag<'a> {
    pub fn as_str(&self) -> &'a str {
        match *self {
            Tag::Other => OTHER_TAG,
            Tag::Field(name) => name,
            Tag::Continuation => CONTINUATION_TAG,
            Tag::Padding => PADDING_TAG,
        }
    }
}

impl fmt::Display for Tag<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token range `[start, end)` claimed by one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpan<'a> {
    pub field: &'a str,
    pub start: usize,
    pub end: usize,
}

impl FieldSpan<'_> {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn overlaps(&self, other: &FieldSpan<'_>) -> bool {
        self.start < other.end && other.start < self.end
    }
}

// Most security events match fewer than 8 fields
type SpanVec<'a> = SmallVec<[FieldSpan<'a>; 8]>;

/// One tag per whitespace token of a raw log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTagSequence<'a> {
    tokens: Vec<&'a str>,
    tags: Vec<Tag<'a>>,
    spans: SpanVec<'a>,
}

impl<'a> TokenTagSequence<'a> {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[&'a str] {
        &self.tokens
    }

    pub fn tags(&self) -> &[Tag<'a>] {
        &self.tags
    }

    /// Spans of matched fields, in the order fields were processed
    pub fn spans(&self) -> &[FieldSpan<'a>] {
        &self.spans
    }

    /// (token, tag) pairs in token order
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, Tag<'a>)> + '_ {
        self.tokens.iter().copied().zip(self.tags.iter().copied())
    }

    /// Whether the named field claimed any tokens
    pub fn is_matched(&self, field: &str) -> bool {
        self.spans.iter().any(|span| span.field == field)
    }
}

/// Whether a field value should be skipped as empty
pub fn is_absent(value: &str) -> bool {
    EMPTY_MARKERS.contains(&value)
}

/// Align ordered field values onto the whitespace tokens of `raw`
pub fn align<'a>(raw: &'a str, fields: &'a [(String, String)]) -> TokenTagSequence<'a> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let mut tags = vec![Tag::Other; tokens.len()];
    let mut claimed = vec![false; tokens.len()];
    let mut spans = SpanVec::new();

    for (name, value) in fields {
        if is_absent(value) {
            continue;
        }

        let sublist: Vec<&str> = value.split_whitespace().collect();
        if sublist.is_empty() {
            continue;
        }

        match find_unclaimed(&tokens, &sublist, &claimed) {
            Some(start) => {
                let end = start + sublist.len();
                for i in start..end {
                    tags[i] = Tag::Field(name);
                    claimed[i] = true;
                }
                spans.push(FieldSpan {
                    field: name,
                    start,
                    end,
                });
            }
            None => {
                tracing::trace!(field = %name, "no unclaimed occurrence of field value");
            }
        }
    }

    TokenTagSequence {
        tokens,
        tags,
        spans,
    }
}

/// Align a labeled record
pub fn align_record(record: &LabeledRecord) -> TokenTagSequence<'_> {
    align(&record.raw, &record.fields)
}

/// First start index where `sublist` matches exactly over unclaimed tokens
fn find_unclaimed(tokens: &[&str], sublist: &[&str], claimed: &[bool]) -> Option<usize> {
    let k = sublist.len();
    if k == 0 || k > tokens.len() {
        return None;
    }

    (0..=tokens.len() - k).find(|&i| {
        tokens[i] == sublist[0]
            && tokens[i..i + k] == *sublist
            && claimed[i..i + k].iter().all(|&c| !c)
    })
}
