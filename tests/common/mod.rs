// Shared test doubles for integration tests
#![allow(dead_code)]

use log_field_tagger::traits::SubwordSplitter;
use std::collections::HashMap;

/// Greedy longest-match WordPiece over a fixed vocabulary
///
/// Mirrors BERT's splitting closely enough for label-propagation tests:
/// continuation pieces carry a `##` prefix and a token with any
/// unmatchable suffix becomes a single `[UNK]`.
pub struct WordPieceSplitter {
    ids: HashMap<String, u32>,
}

impl WordPieceSplitter {
    pub fn new(pieces: &[&str]) -> Self {
        let mut ids = HashMap::new();
        ids.insert("[PAD]".to_string(), 0);
        ids.insert("[UNK]".to_string(), 1);
        for piece in pieces {
            let next = ids.len() as u32;
            ids.entry(piece.to_string()).or_insert(next);
        }
        Self { ids }
    }

    /// Vocabulary covering the Windows security event fixtures
    pub fn security() -> Self {
        Self::new(&[
            "LogName", "##=", "Security", "EventCode", "46", "##24", "##25", "Account", "Name",
            "##:", "tony", "##free", "##man", "##@", "##acme", "##.", "##com", "Subject",
            "New", "Logon", "Type", "Information", "Success", "Audit", "10", "##0", "##1",
            "##2", "Source", "Network", "Address",
        ])
    }

    /// Splitter where every character is its own piece
    pub fn characters() -> Self {
        let mut pieces: Vec<String> = Vec::new();
        for c in (b'a'..=b'z').chain(b'0'..=b'9') {
            let c = c as char;
            pieces.push(c.to_string());
            pieces.push(format!("##{}", c));
        }
        let refs: Vec<&str> = pieces.iter().map(|s| s.as_str()).collect();
        Self::new(&refs)
    }
}

impl SubwordSplitter for WordPieceSplitter {
    fn split(&self, token: &str) -> Vec<String> {
        let chars: Vec<char> = token.chars().collect();
        let mut pieces = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let mut end = chars.len();
            let mut found = None;
            while end > start {
                let body: String = chars[start..end].iter().collect();
                let candidate = if start == 0 { body } else { format!("##{}", body) };
                if self.ids.contains_key(&candidate) {
                    found = Some(candidate);
                    break;
                }
                end -= 1;
            }

            match found {
                Some(piece) => {
                    pieces.push(piece);
                    start = end;
                }
                None => return vec!["[UNK]".to_string()],
            }
        }

        pieces
    }

    fn piece_to_id(&self, piece: &str) -> u32 {
        self.ids.get(piece).copied().unwrap_or(1)
    }

    fn name(&self) -> &str {
        "wordpiece-test"
    }
}

pub fn fields(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(n, v)| (n.to_string(), v.to_string()))
        .collect()
}
