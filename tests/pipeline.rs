/// End-to-end preparation: load, align, split, encode, save, evaluate
mod common;

use common::WordPieceSplitter;
use log_field_tagger::csv_loader::CsvDatasetLoader;
use log_field_tagger::dataset_splitter::SplitConfig;
use log_field_tagger::encoding_config::{EncodingConfig, OutputFormat};
use log_field_tagger::evaluation::evaluate;
use log_field_tagger::implementations::InMemoryDataset;
use log_field_tagger::pipeline::{
    load_examples, partition_file, prepare_dataset, PipelineConfig, MANIFEST_FILE, TAG_VOCAB_FILE,
};
use log_field_tagger::tag_vocabulary::TagVocabulary;
use log_field_tagger::traits::{DatasetLoader, LabeledRecord};
use std::fs;

fn security_records() -> Vec<LabeledRecord> {
    let mut records = Vec::new();
    for i in 0..12 {
        records.push(LabeledRecord::from_pairs(
            "LogName= Security EventCode= 4624 Subject: Account Name: tonyfreeman",
            &[
                ("logname", "Security"),
                ("eventcode", "4624"),
                ("subject_account_name", if i % 3 == 0 { "-" } else { "tonyfreeman" }),
            ],
        ));
        records.push(LabeledRecord::from_pairs(
            "LogName= Security EventCode= 4625 Type= Information",
            &[
                ("logname", "Security"),
                ("eventcode", "4625"),
                ("type", "Information"),
            ],
        ));
    }
    records
}

fn config(max_len: usize) -> PipelineConfig {
    PipelineConfig {
        encoding: EncodingConfig::new().with_max_len(max_len),
        split: SplitConfig {
            train_ratio: 0.75,
            seed: 7,
            stratified: true,
            min_validation_samples: 1,
        },
    }
}

#[test]
fn test_prepare_in_memory_dataset() {
    let dataset = InMemoryDataset::new("security", security_records());
    let splitter = WordPieceSplitter::security();

    let prepared = prepare_dataset(&dataset, &splitter, &config(32)).unwrap();

    let split = prepared.split_stats();
    assert_eq!(split.total_size, 24);
    assert!(split.validation_size > 0);
    assert!(split.train_size > split.validation_size);

    assert_eq!(
        prepared.vocabulary.field_tags(),
        &["eventcode", "logname", "subject_account_name", "type"]
    );
    for example in prepared.train.iter().chain(&prepared.validation) {
        assert_eq!(example.len(), 32);
        assert!(example.content_len() > 0);
        assert!(example
            .tag_ids
            .iter()
            .all(|&id| prepared.vocabulary.tag_of(id).is_some()));
    }

    assert_eq!(prepared.report.records, 24);
    assert_eq!(prepared.report.truncated, 0);
    assert_eq!(prepared.stats.records, 24);
    assert_eq!(prepared.stats.coverage("subject_account_name").present, 8);
    assert_eq!(prepared.stats.coverage("subject_account_name").matched, 8);
}

#[test]
fn test_split_is_deterministic_for_a_seed() {
    let dataset = InMemoryDataset::new("security", security_records());
    let splitter = WordPieceSplitter::security();

    let first = prepare_dataset(&dataset, &splitter, &config(32)).unwrap();
    let second = prepare_dataset(&dataset, &splitter, &config(32)).unwrap();

    assert_eq!(first.train, second.train);
    assert_eq!(first.validation, second.validation);
    assert_eq!(first.vocabulary, second.vocabulary);
}

#[test]
fn test_stratified_split_keeps_every_event_shape_in_validation() {
    let dataset = InMemoryDataset::new("security", security_records());
    let splitter = WordPieceSplitter::security();
    let prepared = prepare_dataset(&dataset, &splitter, &config(32)).unwrap();

    let type_id = prepared.vocabulary.id_of("type").unwrap();
    let account_id = prepared.vocabulary.id_of("subject_account_name").unwrap();
    let has = |id: u32| prepared.validation.iter().any(|e| e.tag_ids.contains(&id));
    assert!(has(type_id));
    assert!(has(account_id));
}

#[test]
fn test_truncation_is_reported() {
    let dataset = InMemoryDataset::new("security", security_records());
    let splitter = WordPieceSplitter::security();
    let prepared = prepare_dataset(&dataset, &splitter, &config(4)).unwrap();

    assert_eq!(prepared.report.truncated, 24);
    assert!(prepared
        .train
        .iter()
        .all(|e| e.attention_mask.iter().all(|&m| m == 1)));
}

#[test]
fn test_empty_raw_record_fails_preparation() {
    let mut records = security_records();
    records.push(LabeledRecord::from_pairs("  ", &[("logname", "Security")]));
    let dataset = InMemoryDataset::new("broken", records);

    let result = prepare_dataset(&dataset, &WordPieceSplitter::security(), &config(32));
    assert!(result.is_err());
}

#[test]
fn test_save_and_reload_both_formats() {
    let dataset = InMemoryDataset::new("security", security_records());
    let splitter = WordPieceSplitter::security();
    let prepared = prepare_dataset(&dataset, &splitter, &config(32)).unwrap();

    for format in [OutputFormat::Jsonl, OutputFormat::Bincode] {
        let dir = tempfile::tempdir().unwrap();
        prepared.save(dir.path(), format).unwrap();

        let train = load_examples(&dir.path().join(partition_file("train", format))).unwrap();
        let validation =
            load_examples(&dir.path().join(partition_file("validation", format))).unwrap();
        assert_eq!(train, prepared.train);
        assert_eq!(validation, prepared.validation);

        let vocabulary = TagVocabulary::load_json(&dir.path().join(TAG_VOCAB_FILE)).unwrap();
        assert_eq!(vocabulary, prepared.vocabulary);

        let manifest = fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap();
        let manifest: serde_json::Value = serde_json::from_str(&manifest).unwrap();
        assert_eq!(manifest["records"], 24);
        assert_eq!(manifest["dataset"], "security");
    }
}

#[test]
fn test_gold_predictions_score_perfectly() {
    let dataset = InMemoryDataset::new("security", security_records());
    let splitter = WordPieceSplitter::security();
    let prepared = prepare_dataset(&dataset, &splitter, &config(32)).unwrap();

    let predicted: Vec<Vec<u32>> = prepared
        .validation
        .iter()
        .map(|e| e.tag_ids.clone())
        .collect();
    let report = evaluate(&prepared.validation, &predicted, &prepared.vocabulary).unwrap();

    assert_eq!(report.accuracy(), 1.0);
    assert_eq!(report.micro_fields.f1(), 1.0);
    assert_eq!(report.examples, prepared.validation.len());
}

#[test]
fn test_all_other_predictions_miss_every_field() {
    let dataset = InMemoryDataset::new("security", security_records());
    let splitter = WordPieceSplitter::security();
    let prepared = prepare_dataset(&dataset, &splitter, &config(32)).unwrap();

    let other = prepared.vocabulary.other_id();
    let predicted: Vec<Vec<u32>> = prepared
        .validation
        .iter()
        .map(|e| vec![other; e.len()])
        .collect();
    let report = evaluate(&prepared.validation, &predicted, &prepared.vocabulary).unwrap();

    assert_eq!(report.micro_fields.true_positives, 0);
    assert_eq!(report.micro_fields.recall(), 0.0);
    assert_eq!(report.score("other").unwrap().recall(), 1.0);
}

#[test]
fn test_csv_dataset_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notables.csv");
    let mut csv = String::from("raw,logname,eventcode,src_ip,src_ip2\n");
    for _ in 0..6 {
        csv.push_str("\"LogName= Security EventCode= 4624 Source Network Address: 10.0.1.2\",Security,4624,-,10.0.1.2\n");
        csv.push_str("\"LogName= Security EventCode= 4625\",Security,4625,,\n");
    }
    fs::write(&path, csv).unwrap();

    let loader = CsvDatasetLoader::new(&path)
        .with_field_fallbacks(vec![("src_ip".to_string(), "src_ip2".to_string())]);
    let records = loader.load_records().unwrap();
    assert_eq!(records.len(), 12);
    assert_eq!(records[0].field("src_ip"), Some("10.0.1.2"));
    let names: Vec<&str> = records[0].field_names().collect();
    assert_eq!(names, vec!["logname", "eventcode", "src_ip"]);

    let prepared = prepare_dataset(&loader, &WordPieceSplitter::security(), &config(24)).unwrap();
    assert_eq!(prepared.report.dataset, "notables");
    assert_eq!(prepared.stats.coverage("src_ip").matched, 6);
    assert!(prepared.vocabulary.id_of("src_ip").is_some());
    assert!(prepared.vocabulary.id_of("src_ip2").is_none());
}
