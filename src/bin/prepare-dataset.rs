/// Prepare a labeled security-log CSV for token classification fine-tuning
///
/// Aligns field values onto raw log tokens, splits into train/validation,
/// propagates tags onto sub-word pieces and writes model-ready examples plus
/// the tag vocabulary to OUTPUT_DIR.

use anyhow::Result;
use log_field_tagger::config::Config;
use log_field_tagger::csv_loader::CsvDatasetLoader;
use log_field_tagger::implementations::TokenizerSplitter;
use log_field_tagger::pipeline::prepare_dataset;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("❌ Configuration error: {}", e);
            tracing::error!("💡 Please set the required environment variables:");
            tracing::error!("   - DATASET_PATH: labeled CSV with a raw column and one column per field");
            tracing::error!("   - TOKENIZER_PATH: HuggingFace tokenizer.json (e.g., bert-base-cased)");
            tracing::error!("   - RAW_COLUMN: raw text column (optional, default: raw)");
            tracing::error!("   - FIELD_COLUMNS: ordered field columns (optional, default: all others)");
            tracing::error!("   - FIELD_FALLBACKS: primary:fallback pairs (optional, e.g. src_ip:src_ip2)");
            tracing::error!("   - MAX_SEQ_LEN: pieces per example (optional, default: 256)");
            tracing::error!("   - OUTPUT_DIR / OUTPUT_FORMAT: where and how to write (optional)");
            tracing::error!("   - TRAIN_RATIO / SPLIT_SEED / STRATIFIED_SPLIT: split settings (optional)");
            std::process::exit(1);
        }
    };

    config.log_config();

    let mut loader = CsvDatasetLoader::new(&config.dataset_path)
        .with_raw_column(&config.raw_column)
        .with_field_fallbacks(config.field_fallbacks.clone())
        .with_backslash_stripping(config.strip_backslashes);
    if let Some(columns) = &config.field_columns {
        loader = loader.with_field_columns(columns.clone());
    }

    let splitter = TokenizerSplitter::from_file(&config.tokenizer_path)?;
    tracing::info!(vocab_size = splitter.vocab_size(), "loaded tokenizer");

    let pipeline_config = config.pipeline_config();
    let prepared = prepare_dataset(&loader, &splitter, &pipeline_config)?;

    prepared.save(&config.output_dir, pipeline_config.encoding.output_format)?;
    prepared.report.print(&prepared.stats);

    Ok(())
}
