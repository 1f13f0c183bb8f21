//! Tag vocabulary shared by encoding and evaluation
//!
//! Ids are assigned deterministically so two preparation runs over the same
//! data produce interchangeable vocabularies:
//! `PAD` = 0, `X` = 1, `other` = 2, then field names in lexical order.

use crate::field_aligner::{
    Tag, TokenTagSequence, CONTINUATION_TAG, OTHER_TAG, PADDING_TAG, RESERVED_TAGS,
};
use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

pub const PADDING_TAG_ID: u32 = 0;
pub const CONTINUATION_TAG_ID: u32 = 1;
pub const OTHER_TAG_ID: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagVocabulary {
    tags: Vec<String>,
    ids: FxHashMap<String, u32>,
}

/// On-disk form: tag names in id order
#[derive(Debug, Serialize, Deserialize)]
struct TagVocabularyFile {
    tags: Vec<String>,
}

impl TagVocabulary {
    /// Build from the field names observed across every record
    ///
    /// Reserved tags are always present. Passing a reserved name is an error,
    /// since a field called `other` could never be told apart from untagged
    /// tokens.
    pub fn from_field_names<I, S>(field_names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut fields = BTreeSet::new();
        for name in field_names {
            let name = name.as_ref();
            if RESERVED_TAGS.contains(&name) {
                anyhow::bail!("Field name '{}' collides with a reserved tag", name);
            }
            fields.insert(name.to_string());
        }

        let tags = RESERVED_TAGS
            .iter()
            .map(|t| t.to_string())
            .chain(fields)
            .collect();

        Ok(Self::from_ordered(tags))
    }

    /// Build from the field tags appearing in aligned sequences
    pub fn from_sequences<'s, 'a: 's, I>(sequences: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'s TokenTagSequence<'a>>,
    {
        let mut names = BTreeSet::new();
        for seq in sequences {
            for tag in seq.tags() {
                if let Tag::Field(name) = tag {
                    names.insert(*name);
                }
            }
        }
        Self::from_field_names(names)
    }

    fn from_ordered(tags: Vec<String>) -> Self {
        let ids = tags
            .iter()
            .enumerate()
            .map(|(id, tag)| (tag.clone(), id as u32))
            .collect();
        Self { tags, ids }
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn id_of(&self, tag: &str) -> Option<u32> {
        self.ids.get(tag).copied()
    }

    pub fn tag_id(&self, tag: Tag<'_>) -> Option<u32> {
        match tag {
            Tag::Padding => Some(PADDING_TAG_ID),
            Tag::Continuation => Some(CONTINUATION_TAG_ID),
            Tag::Other => Some(OTHER_TAG_ID),
            Tag::Field(name) => self.id_of(name),
        }
    }

    pub fn tag_of(&self, id: u32) -> Option<&str> {
        self.tags.get(id as usize).map(|s| s.as_str())
    }

    pub fn padding_id(&self) -> u32 {
        PADDING_TAG_ID
    }

    pub fn continuation_id(&self) -> u32 {
        CONTINUATION_TAG_ID
    }

    pub fn other_id(&self) -> u32 {
        OTHER_TAG_ID
    }

    /// Whether predictions at this id are scored (not `X` or `PAD`)
    pub fn is_scored_id(&self, id: u32) -> bool {
        id != PADDING_TAG_ID && id != CONTINUATION_TAG_ID && (id as usize) < self.tags.len()
    }

    /// All tags in id order
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Field tags only, in id order
    pub fn field_tags(&self) -> &[String] {
        &self.tags[RESERVED_TAGS.len()..]
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let file = TagVocabularyFile {
            tags: self.tags.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write tag vocabulary: {}", path.display()))
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read tag vocabulary: {}", path.display()))?;
        let file: TagVocabularyFile = serde_json::from_str(&content)
            .with_context(|| format!("Invalid tag vocabulary: {}", path.display()))?;

        if file.tags.len() < RESERVED_TAGS.len()
            || file.tags[..RESERVED_TAGS.len()] != *RESERVED_TAGS
        {
            anyhow::bail!(
                "Tag vocabulary {} must start with {}, {}, {}",
                path.display(),
                PADDING_TAG,
                CONTINUATION_TAG,
                OTHER_TAG
            );
        }

        let mut seen = BTreeSet::new();
        if let Some(duplicate) = file.tags.iter().find(|tag| !seen.insert(tag.as_str())) {
            anyhow::bail!(
                "Tag vocabulary {} lists '{}' more than once",
                path.display(),
                duplicate
            );
        }

        Ok(Self::from_ordered(file.tags))
    }
}
