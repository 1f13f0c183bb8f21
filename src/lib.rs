// Label preparation core
pub mod field_aligner;
pub mod subword;
pub mod tag_vocabulary;

// Dataset plumbing and configuration
pub mod alignment_stats;
pub mod config;
pub mod csv_loader;
pub mod dataset_splitter;
pub mod encoding_config;
pub mod evaluation;
pub mod implementations;
pub mod pipeline;
pub mod traits;
