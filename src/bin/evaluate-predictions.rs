/// Score model predictions against a prepared validation set
///
/// Reads PREPARED_DIR/tag_vocab.json and the validation examples written by
/// prepare-dataset, plus PREDICTIONS_PATH: one JSON array of predicted tag
/// ids per line, in validation order.

use anyhow::{Context, Result};
use log_field_tagger::encoding_config::OutputFormat;
use log_field_tagger::evaluation::evaluate;
use log_field_tagger::pipeline::{load_examples, partition_file, read_json_lines, TAG_VOCAB_FILE};
use log_field_tagger::tag_vocabulary::TagVocabulary;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let prepared_dir = PathBuf::from(
        std::env::var("PREPARED_DIR").unwrap_or_else(|_| "prepared".to_string()),
    );
    let predictions_path = match std::env::var("PREDICTIONS_PATH") {
        Ok(path) => PathBuf::from(path),
        Err(_) => {
            tracing::error!("❌ PREDICTIONS_PATH environment variable is required");
            std::process::exit(1);
        }
    };

    let vocabulary = TagVocabulary::load_json(&prepared_dir.join(TAG_VOCAB_FILE))?;

    // Prefer JSONL, fall back to the bincode output of prepare-dataset
    let jsonl = prepared_dir.join(partition_file("validation", OutputFormat::Jsonl));
    let validation_path = if jsonl.exists() {
        jsonl
    } else {
        prepared_dir.join(partition_file("validation", OutputFormat::Bincode))
    };
    let gold = load_examples(&validation_path)?;

    let file = File::open(&predictions_path)
        .with_context(|| format!("Failed to open predictions: {}", predictions_path.display()))?;
    let predicted: Vec<Vec<u32>> = read_json_lines(BufReader::new(file), &predictions_path)?;

    tracing::info!(
        examples = gold.len(),
        predictions = predicted.len(),
        tags = vocabulary.len(),
        "scoring predictions"
    );

    let report = evaluate(&gold, &predicted, &vocabulary)?;
    report.print(&format!("Field Extraction: {}", predictions_path.display()));

    Ok(())
}
