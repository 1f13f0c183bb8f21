/// Labeled log dataset loader
///
/// Loads security events exported as CSV: one `raw` column holding the log
/// line and one column per structured field.
use crate::traits::{DatasetLoader, LabeledRecord};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Remove escaping backslashes that exporters add inconsistently
///
/// Applied to raw text and field values alike, otherwise values such as
/// `ACME\\bob` would stop matching the cleaned raw line.
fn strip_backslashes(text: &str) -> String {
    if text.contains('\\') {
        text.replace('\\', "")
    } else {
        text.to_string()
    }
}

/// Parse `primary:fallback` pairs, e.g. `src_ip:src_ip2,dest_ip:dest_ip2`
pub fn parse_field_fallbacks(value: &str) -> Result<Vec<(String, String)>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (primary, fallback) = pair
                .split_once(':')
                .with_context(|| format!("Invalid field fallback '{}', expected primary:fallback", pair))?;
            Ok((primary.trim().to_string(), fallback.trim().to_string()))
        })
        .collect()
}

pub struct CsvDatasetLoader {
    dataset_name: String,
    path: PathBuf,
    raw_column: String,
    field_columns: Option<Vec<String>>,
    field_fallbacks: Vec<(String, String)>,
    strip_backslashes: bool,
}

impl CsvDatasetLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let dataset_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("dataset")
            .to_string();

        Self {
            dataset_name,
            path,
            raw_column: "raw".to_string(),
            field_columns: None,
            field_fallbacks: Vec::new(),
            strip_backslashes: true,
        }
    }

    pub fn with_raw_column(mut self, column: &str) -> Self {
        self.raw_column = column.to_string();
        self
    }

    /// Use exactly these columns as fields, in this order
    ///
    /// Without this, every non-raw, non-fallback column becomes a field in
    /// header order.
    pub fn with_field_columns(mut self, columns: Vec<String>) -> Self {
        self.field_columns = Some(columns);
        self
    }

    pub fn with_field_fallbacks(mut self, fallbacks: Vec<(String, String)>) -> Self {
        self.field_fallbacks = fallbacks;
        self
    }

    pub fn with_backslash_stripping(mut self, enabled: bool) -> Self {
        self.strip_backslashes = enabled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn clean(&self, text: &str) -> String {
        if self.strip_backslashes {
            strip_backslashes(text)
        } else {
            text.to_string()
        }
    }

    /// Resolve header names to (field name, column index, fallback index)
    fn resolve_columns(
        &self,
        headers: &csv::StringRecord,
    ) -> Result<(usize, Vec<(String, usize, Option<usize>)>)> {
        let index_of = |name: &str| headers.iter().position(|h| h.trim() == name);

        let raw_idx = index_of(&self.raw_column).with_context(|| {
            format!(
                "Raw column '{}' not found in {}",
                self.raw_column,
                self.path.display()
            )
        })?;

        let fallback_columns: Vec<&str> = self
            .field_fallbacks
            .iter()
            .map(|(_, fallback)| fallback.as_str())
            .collect();

        let names: Vec<String> = match &self.field_columns {
            Some(columns) => columns.clone(),
            None => headers
                .iter()
                .map(|h| h.trim())
                .filter(|h| *h != self.raw_column && !fallback_columns.contains(h))
                .map(|h| h.to_string())
                .collect(),
        };

        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            if name == self.raw_column {
                anyhow::bail!("Raw column '{}' cannot also be a field column", name);
            }
            if fallback_columns.contains(&name.as_str()) {
                anyhow::bail!("Fallback column '{}' cannot also be a field column", name);
            }

            let idx = index_of(&name).with_context(|| {
                format!("Field column '{}' not found in {}", name, self.path.display())
            })?;
            let fallback_idx = match self.field_fallbacks.iter().find(|(p, _)| *p == name) {
                Some((_, fallback)) => Some(index_of(fallback).with_context(|| {
                    format!(
                        "Fallback column '{}' not found in {}",
                        fallback,
                        self.path.display()
                    )
                })?),
                None => None,
            };
            columns.push((name, idx, fallback_idx));
        }

        Ok((raw_idx, columns))
    }
}

impl DatasetLoader for CsvDatasetLoader {
    fn load_records(&self) -> Result<Vec<LabeledRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .with_context(|| format!("Failed to open dataset: {}", self.path.display()))?;

        let headers = reader
            .headers()
            .with_context(|| format!("Failed to read header of {}", self.path.display()))?
            .clone();
        let (raw_idx, columns) = self.resolve_columns(&headers)?;

        let mut records = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let line = result
                .with_context(|| format!("Failed to parse row {} of {}", row + 1, self.path.display()))?;

            let raw = self.clean(line.get(raw_idx).unwrap_or(""));
            if raw.trim().is_empty() {
                anyhow::bail!(
                    "Row {} of {} has empty raw text",
                    row + 1,
                    self.path.display()
                );
            }

            let fields = columns
                .iter()
                .map(|(name, idx, fallback_idx)| {
                    let mut value = line.get(*idx).unwrap_or("");
                    if crate::field_aligner::is_absent(value) {
                        if let Some(fb) = fallback_idx {
                            value = line.get(*fb).unwrap_or("");
                        }
                    }
                    (name.clone(), self.clean(value))
                })
                .collect();

            records.push(LabeledRecord { raw, fields });
        }

        tracing::info!(
            dataset = %self.dataset_name,
            records = records.len(),
            fields = columns.len(),
            "loaded labeled dataset"
        );

        Ok(records)
    }

    fn name(&self) -> &str {
        &self.dataset_name
    }
}
