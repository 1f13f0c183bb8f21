/// Dataset preparation pipeline with dependency injection support
///
/// Accepts pluggable dataset loaders and sub-word splitters, and produces
/// model-ready train/validation examples plus the tag vocabulary needed to
/// read predictions back.
use crate::alignment_stats::AlignmentStats;
use crate::dataset_splitter::{event_shape, split_dataset, DatasetSplit, SplitConfig, SplitStats};
use crate::encoding_config::{EncodingConfig, OutputFormat};
use crate::field_aligner::{align_record, TokenTagSequence};
use crate::subword::{encode, propagate, EncodedExample};
use crate::tag_vocabulary::TagVocabulary;
use crate::traits::{DatasetLoader, LabeledRecord, SubwordSplitter};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

pub const TAG_VOCAB_FILE: &str = "tag_vocab.json";
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub encoding: EncodingConfig,
    pub split: SplitConfig,
}

/// Summary of one preparation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreparationReport {
    pub dataset: String,
    pub splitter: String,
    pub records: usize,
    pub train_examples: usize,
    pub validation_examples: usize,
    pub truncated: usize,
    pub max_len: usize,
    pub tags: usize,
    pub elapsed_secs: f64,
    pub created_at: DateTime<Utc>,
}

impl PreparationReport {
    /// Pretty-print the results
    pub fn print(&self, stats: &AlignmentStats) {
        println!("\n{}", "=".repeat(80));
        println!("📊 Dataset Preparation: {}", self.dataset);
        println!("{}\n", "=".repeat(80));

        println!("📝 Records:");
        println!("   Total records:           {:>10}", self.records);
        println!("   Train examples:          {:>10}", self.train_examples);
        println!("   Validation examples:     {:>10}", self.validation_examples);
        println!(
            "   Truncated to {:>4}:       {:>10}",
            self.max_len, self.truncated
        );
        println!("   Tag vocabulary size:     {:>10}", self.tags);
        println!("   Splitter:                {:>10}", self.splitter);
        println!("   Elapsed:                 {:>9.2}s\n", self.elapsed_secs);

        println!("🎯 Alignment:");
        println!(
            "   Field match rate:        {:>9.2}%",
            stats.overall_match_rate() * 100.0
        );
        for (name, c) in stats.worst_fields(10) {
            println!(
                "   {:<24} {:>6}/{:<6} ({:.1}%)",
                name,
                c.matched,
                c.present,
                c.match_rate() * 100.0
            );
        }

        println!("\n{}", "=".repeat(80));
    }
}

/// Everything the external trainer needs
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub vocabulary: TagVocabulary,
    pub train: Vec<EncodedExample>,
    pub validation: Vec<EncodedExample>,
    pub stats: AlignmentStats,
    pub report: PreparationReport,
}

impl PreparedDataset {
    pub fn split_stats(&self) -> SplitStats {
        SplitStats {
            train_size: self.train.len(),
            validation_size: self.validation.len(),
            total_size: self.train.len() + self.validation.len(),
        }
    }

    /// Write vocabulary, both partitions and a manifest into `dir`
    pub fn save(&self, dir: &Path, format: OutputFormat) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

        self.vocabulary.save_json(&dir.join(TAG_VOCAB_FILE))?;
        save_examples(&dir.join(partition_file("train", format)), &self.train, format)?;
        save_examples(
            &dir.join(partition_file("validation", format)),
            &self.validation,
            format,
        )?;

        let manifest = serde_json::to_string_pretty(&self.report)?;
        fs::write(dir.join(MANIFEST_FILE), manifest)
            .with_context(|| format!("Failed to write manifest in {}", dir.display()))?;

        tracing::info!(
            dir = %dir.display(),
            format = format.extension(),
            "saved prepared dataset"
        );
        Ok(())
    }
}

/// File name of a partition, e.g. `train.jsonl`
pub fn partition_file(partition: &str, format: OutputFormat) -> String {
    format!("{}.{}", partition, format.extension())
}

pub fn save_examples(
    path: &Path,
    examples: &[EncodedExample],
    format: OutputFormat,
) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create examples file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    match format {
        OutputFormat::Jsonl => {
            for example in examples {
                serde_json::to_writer(&mut writer, example)?;
                writer.write_all(b"\n")?;
            }
        }
        OutputFormat::Bincode => {
            bincode::serialize_into(&mut writer, examples)
                .with_context(|| format!("Failed to encode examples: {}", path.display()))?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Read examples back, choosing the format from the file extension
pub fn load_examples(path: &Path) -> Result<Vec<EncodedExample>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open examples file: {}", path.display()))?;
    let reader = BufReader::new(file);

    let is_bincode = path.extension().and_then(|e| e.to_str()) == Some("bin");
    if is_bincode {
        return bincode::deserialize_from(reader)
            .with_context(|| format!("Failed to decode examples: {}", path.display()));
    }

    read_json_lines(reader, path)
}

/// Read one JSON value per non-blank line
pub fn read_json_lines<T, R>(reader: R, path: &Path) -> Result<Vec<T>>
where
    T: serde::de::DeserializeOwned,
    R: BufRead,
{
    let mut items = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(&line)
            .with_context(|| format!("Invalid JSON on line {} of {}", idx + 1, path.display()))?;
        items.push(item);
    }
    Ok(items)
}

/// Align, split and encode a labeled dataset
pub fn prepare_dataset<D, S>(
    dataset: &D,
    splitter: &S,
    config: &PipelineConfig,
) -> Result<PreparedDataset>
where
    D: DatasetLoader + ?Sized,
    S: SubwordSplitter + ?Sized,
{
    let start = Instant::now();
    tracing::info!(
        dataset = dataset.name(),
        splitter = splitter.name(),
        max_len = config.encoding.max_len,
        "preparing dataset"
    );

    let records = dataset.load_records()?;
    let prepared = prepare_records(&records, splitter, config)?;

    let report = PreparationReport {
        dataset: dataset.name().to_string(),
        splitter: splitter.name().to_string(),
        records: records.len(),
        train_examples: prepared.train.len(),
        validation_examples: prepared.validation.len(),
        truncated: prepared.truncated,
        max_len: config.encoding.max_len,
        tags: prepared.vocabulary.len(),
        elapsed_secs: start.elapsed().as_secs_f64(),
        created_at: Utc::now(),
    };

    Ok(PreparedDataset {
        vocabulary: prepared.vocabulary,
        train: prepared.train,
        validation: prepared.validation,
        stats: prepared.stats,
        report,
    })
}

struct PreparedRecords {
    vocabulary: TagVocabulary,
    train: Vec<EncodedExample>,
    validation: Vec<EncodedExample>,
    stats: AlignmentStats,
    truncated: usize,
}

fn prepare_records<S>(
    records: &[LabeledRecord],
    splitter: &S,
    config: &PipelineConfig,
) -> Result<PreparedRecords>
where
    S: SubwordSplitter + ?Sized,
{
    let sequences: Vec<TokenTagSequence<'_>> = if config.encoding.parallel {
        records.par_iter().map(align_record).collect()
    } else {
        records.iter().map(align_record).collect()
    };

    let stats = collect_stats(records, &sequences, config.encoding.parallel);
    stats.log_summary();

    // Closed over train + validation before anything is encoded
    let vocabulary = TagVocabulary::from_sequences(&sequences)?;
    tracing::info!(tags = vocabulary.len(), "built tag vocabulary");

    let items: Vec<(&LabeledRecord, TokenTagSequence<'_>)> =
        records.iter().zip(sequences).collect();
    let split: DatasetSplit<TokenTagSequence<'_>> =
        split_dataset(items, |(record, _)| event_shape(&record.fields), &config.split)
            .map(|part| part.into_iter().map(|(_, sequence)| sequence).collect());
    let split_stats = split.stats();
    tracing::info!(
        train = split_stats.train_size,
        validation = split_stats.validation_size,
        train_ratio = %format!("{:.2}", split_stats.train_ratio()),
        validation_ratio = %format!("{:.2}", split_stats.validation_ratio()),
        "split dataset"
    );

    let (train, train_truncated) =
        encode_sequences(&split.train, splitter, &vocabulary, &config.encoding)?;
    let (validation, validation_truncated) =
        encode_sequences(&split.validation, splitter, &vocabulary, &config.encoding)?;

    let truncated = train_truncated + validation_truncated;
    if truncated > 0 {
        tracing::warn!(
            truncated,
            max_len = config.encoding.max_len,
            "records exceeded max_len and lost trailing pieces"
        );
    }

    Ok(PreparedRecords {
        vocabulary,
        train,
        validation,
        stats,
        truncated,
    })
}

/// Per-chunk stats merged into one, so parallel runs count like serial ones
fn collect_stats(
    records: &[LabeledRecord],
    sequences: &[TokenTagSequence<'_>],
    parallel: bool,
) -> AlignmentStats {
    if parallel {
        records
            .par_iter()
            .zip(sequences.par_iter())
            .fold(AlignmentStats::new, |mut stats, (record, sequence)| {
                stats.add(&record.fields, sequence);
                stats
            })
            .reduce(AlignmentStats::new, |mut a, b| {
                a.merge(&b);
                a
            })
    } else {
        let mut stats = AlignmentStats::new();
        for (record, sequence) in records.iter().zip(sequences) {
            stats.add(&record.fields, sequence);
        }
        stats
    }
}

fn encode_sequence<S>(
    sequence: &TokenTagSequence<'_>,
    splitter: &S,
    vocabulary: &TagVocabulary,
    max_len: usize,
) -> Result<(EncodedExample, bool)>
where
    S: SubwordSplitter + ?Sized,
{
    let pieces = propagate(sequence, splitter, max_len);
    let example = encode(&pieces, splitter, vocabulary)?;
    Ok((example, pieces.was_truncated()))
}

/// Propagate and encode one partition, counting truncated records
fn encode_sequences<S>(
    sequences: &[TokenTagSequence<'_>],
    splitter: &S,
    vocabulary: &TagVocabulary,
    config: &EncodingConfig,
) -> Result<(Vec<EncodedExample>, usize)>
where
    S: SubwordSplitter + ?Sized,
{
    let encoded: Vec<(EncodedExample, bool)> = if config.parallel {
        sequences
            .par_iter()
            .map(|sequence| encode_sequence(sequence, splitter, vocabulary, config.max_len))
            .collect::<Result<_>>()?
    } else {
        sequences
            .iter()
            .map(|sequence| encode_sequence(sequence, splitter, vocabulary, config.max_len))
            .collect::<Result<_>>()?
    };

    let truncated = encoded.iter().filter(|(_, t)| *t).count();
    let examples = encoded.into_iter().map(|(example, _)| example).collect();
    Ok((examples, truncated))
}
