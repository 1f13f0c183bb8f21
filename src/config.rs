use crate::csv_loader::parse_field_fallbacks;
use crate::dataset_splitter::SplitConfig;
use crate::encoding_config::{EncodingConfig, OutputFormat, DEFAULT_MAX_LEN};
use crate::pipeline::PipelineConfig;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    // Input dataset
    pub dataset_path: PathBuf,
    pub raw_column: String,
    pub field_columns: Option<Vec<String>>, // explicit order, e.g. "logname,eventcode"
    pub field_fallbacks: Vec<(String, String)>, // e.g. "src_ip:src_ip2"
    pub strip_backslashes: bool,

    // Pretrained sub-word vocabulary
    pub tokenizer_path: PathBuf, // HuggingFace tokenizer.json

    // Encoding
    pub max_len: usize,
    pub output_format: OutputFormat,
    pub output_dir: PathBuf,

    // Train/validation split
    pub train_ratio: f64,
    pub split_seed: u64,
    pub stratified: bool,
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, String> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| format!("{} has an invalid value: '{}'", name, value)),
        Err(_) => Ok(default),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let output_format = match env::var("OUTPUT_FORMAT") {
            Ok(value) => OutputFormat::parse(&value)
                .ok_or_else(|| format!("OUTPUT_FORMAT must be 'jsonl' or 'bincode', got '{}'", value))?,
            Err(_) => OutputFormat::Jsonl,
        };

        let field_fallbacks = match env::var("FIELD_FALLBACKS") {
            Ok(value) => parse_field_fallbacks(&value).map_err(|e| e.to_string())?,
            Err(_) => Vec::new(),
        };

        let train_ratio: f64 = parse_var("TRAIN_RATIO", 0.8)?;
        if !(0.0..=1.0).contains(&train_ratio) {
            return Err(format!("TRAIN_RATIO must be between 0 and 1, got {}", train_ratio));
        }

        Ok(Config {
            dataset_path: env::var("DATASET_PATH")
                .map_err(|_| "DATASET_PATH environment variable is required")?
                .into(),

            raw_column: env::var("RAW_COLUMN").unwrap_or_else(|_| "raw".to_string()),

            field_columns: env::var("FIELD_COLUMNS")
                .ok()
                .map(|v| parse_list(&v))
                .filter(|columns| !columns.is_empty()),

            field_fallbacks,

            strip_backslashes: parse_var("STRIP_BACKSLASHES", true)?,

            tokenizer_path: env::var("TOKENIZER_PATH")
                .map_err(|_| "TOKENIZER_PATH environment variable is required")?
                .into(),

            max_len: parse_var("MAX_SEQ_LEN", DEFAULT_MAX_LEN)?,

            output_format,

            output_dir: env::var("OUTPUT_DIR")
                .unwrap_or_else(|_| "prepared".to_string())
                .into(),

            train_ratio,

            split_seed: parse_var("SPLIT_SEED", 42)?,

            stratified: parse_var("STRATIFIED_SPLIT", false)?,
        })
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            encoding: EncodingConfig::new()
                .with_max_len(self.max_len)
                .with_output_format(self.output_format),
            split: SplitConfig {
                train_ratio: self.train_ratio,
                seed: self.split_seed,
                stratified: self.stratified,
                ..SplitConfig::default()
            },
        }
    }

    pub fn log_config(&self) {
        tracing::info!("📋 Configuration:");
        tracing::info!("   Dataset: {}", self.dataset_path.display());
        tracing::info!("   Raw column: {}", self.raw_column);
        match &self.field_columns {
            Some(columns) => tracing::info!("   Field columns: {}", columns.join(", ")),
            None => tracing::info!("   Field columns: all non-raw columns in header order"),
        }
        for (primary, fallback) in &self.field_fallbacks {
            tracing::info!("   Field fallback: {} <- {}", primary, fallback);
        }
        tracing::info!("   Strip backslashes: {}", self.strip_backslashes);
        tracing::info!("   Tokenizer: {}", self.tokenizer_path.display());
        tracing::info!("   Max sequence length: {}", self.max_len);
        tracing::info!("   Output: {} ({})", self.output_dir.display(), self.output_format.extension());
        tracing::info!(
            "   Split: train_ratio={} seed={} stratified={}",
            self.train_ratio,
            self.split_seed,
            self.stratified
        );
    }
}
