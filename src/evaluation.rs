/// Field-level scoring of token classification predictions
///
/// Only positions that carry a real token tag are scored: padding positions
/// and continuation pieces (`X`) are skipped on the gold side, the way the
/// tagger is trained to ignore them.
use crate::field_aligner::OTHER_TAG;
use crate::subword::EncodedExample;
use crate::tag_vocabulary::TagVocabulary;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Counts and scores for one tag
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagScore {
    pub tag: String,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    /// Gold positions carrying this tag
    pub support: usize,
}

impl TagScore {
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Per-tag scores in vocabulary id order (`other` first, then fields)
    pub per_tag: Vec<TagScore>,
    /// Micro-average over field tags, `other` excluded
    pub micro_fields: TagScore,
    pub scored_positions: usize,
    pub correct_positions: usize,
    pub examples: usize,
}

impl EvaluationReport {
    pub fn accuracy(&self) -> f64 {
        ratio(self.correct_positions, self.scored_positions)
    }

    pub fn score(&self, tag: &str) -> Option<&TagScore> {
        self.per_tag.iter().find(|s| s.tag == tag)
    }

    /// Pretty-print the results
    pub fn print(&self, title: &str) {
        println!("\n{}", "=".repeat(80));
        println!("📊 {}", title);
        println!("{}\n", "=".repeat(80));

        println!(
            "   {:<32} {:>10} {:>10} {:>10} {:>10}",
            "tag", "precision", "recall", "f1-score", "support"
        );
        for score in &self.per_tag {
            println!(
                "   {:<32} {:>10.4} {:>10.4} {:>10.4} {:>10}",
                score.tag,
                score.precision(),
                score.recall(),
                score.f1(),
                score.support
            );
        }
        println!();
        println!(
            "   {:<32} {:>10.4} {:>10.4} {:>10.4} {:>10}",
            "micro avg (fields)",
            self.micro_fields.precision(),
            self.micro_fields.recall(),
            self.micro_fields.f1(),
            self.micro_fields.support
        );
        println!();
        println!("🎯 Token accuracy:          {:>9.2}%", self.accuracy() * 100.0);
        println!("   Examples:                {:>10}", self.examples);
        println!("   Scored positions:        {:>10}", self.scored_positions);
        println!("\n{}", "=".repeat(80));
    }
}

/// Score predicted tag ids against gold encoded examples
///
/// `predicted[i]` must have one tag id per position of `gold[i]`.
pub fn evaluate(
    gold: &[EncodedExample],
    predicted: &[Vec<u32>],
    vocabulary: &TagVocabulary,
) -> Result<EvaluationReport> {
    if gold.len() != predicted.len() {
        anyhow::bail!(
            "Prediction count mismatch: {} gold examples vs {} predictions",
            gold.len(),
            predicted.len()
        );
    }

    let n_tags = vocabulary.len();
    let mut tp = vec![0usize; n_tags];
    let mut fp = vec![0usize; n_tags];
    let mut fn_ = vec![0usize; n_tags];
    let mut support = vec![0usize; n_tags];
    let mut scored_positions = 0;
    let mut correct_positions = 0;

    for (idx, (example, prediction)) in gold.iter().zip(predicted).enumerate() {
        if prediction.len() != example.len() {
            anyhow::bail!(
                "Example {}: prediction has {} positions, expected {}",
                idx,
                prediction.len(),
                example.len()
            );
        }

        for pos in 0..example.len() {
            let gold_id = example.tag_ids[pos];
            if example.attention_mask[pos] == 0 || !vocabulary.is_scored_id(gold_id) {
                continue;
            }

            let pred_id = prediction[pos];
            if pred_id as usize >= n_tags {
                anyhow::bail!("Example {}: unknown predicted tag id {}", idx, pred_id);
            }

            scored_positions += 1;
            support[gold_id as usize] += 1;

            if pred_id == gold_id {
                correct_positions += 1;
                tp[gold_id as usize] += 1;
            } else {
                fn_[gold_id as usize] += 1;
                if vocabulary.is_scored_id(pred_id) {
                    fp[pred_id as usize] += 1;
                }
            }
        }
    }

    let per_tag: Vec<TagScore> = (0..n_tags as u32)
        .filter(|&id| vocabulary.is_scored_id(id))
        .map(|id| {
            let i = id as usize;
            TagScore {
                tag: vocabulary.tag_of(id).unwrap_or_default().to_string(),
                true_positives: tp[i],
                false_positives: fp[i],
                false_negatives: fn_[i],
                support: support[i],
            }
        })
        .collect();

    let micro_fields = per_tag.iter().filter(|s| s.tag != OTHER_TAG).fold(
        TagScore {
            tag: "micro".to_string(),
            ..TagScore::default()
        },
        |mut acc, s| {
            acc.true_positives += s.true_positives;
            acc.false_positives += s.false_positives;
            acc.false_negatives += s.false_negatives;
            acc.support += s.support;
            acc
        },
    );

    Ok(EvaluationReport {
        per_tag,
        micro_fields,
        scored_positions,
        correct_positions,
        examples: gold.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> TagVocabulary {
        // PAD=0 X=1 other=2 host=3 user=4
        TagVocabulary::from_field_names(["host", "user"]).unwrap()
    }

    fn example(tag_ids: Vec<u32>) -> EncodedExample {
        let attention_mask = tag_ids.iter().map(|&t| u8::from(t != 0)).collect();
        EncodedExample {
            input_ids: tag_ids.iter().map(|&t| if t == 0 { 0 } else { 500 }).collect(),
            tag_ids,
            attention_mask,
        }
    }

    #[test]
    fn test_perfect_predictions() {
        let gold = vec![example(vec![2, 3, 1, 4, 0, 0])];
        let predicted = vec![vec![2, 3, 1, 4, 0, 0]];

        let report = evaluate(&gold, &predicted, &vocab()).unwrap();

        assert_eq!(report.scored_positions, 3);
        assert_eq!(report.accuracy(), 1.0);
        assert_eq!(report.micro_fields.f1(), 1.0);
        assert_eq!(report.score("host").unwrap().support, 1);
    }

    #[test]
    fn test_continuation_and_padding_not_scored() {
        let gold = vec![example(vec![2, 3, 1, 0])];
        // Wrong at the X and PAD positions only
        let predicted = vec![vec![2, 3, 4, 4]];

        let report = evaluate(&gold, &predicted, &vocab()).unwrap();

        assert_eq!(report.scored_positions, 2);
        assert_eq!(report.accuracy(), 1.0);
        assert_eq!(report.score("user").unwrap().false_positives, 0);
    }

    #[test]
    fn test_confusion_counts() {
        let gold = vec![example(vec![3, 4, 2, 2])];
        // host -> user, user -> user, other -> host, other -> other
        let predicted = vec![vec![4, 4, 3, 2]];

        let report = evaluate(&gold, &predicted, &vocab()).unwrap();
        let host = report.score("host").unwrap();
        let user = report.score("user").unwrap();

        assert_eq!(
            (host.true_positives, host.false_positives, host.false_negatives),
            (0, 1, 1)
        );
        assert_eq!(
            (user.true_positives, user.false_positives, user.false_negatives),
            (1, 1, 0)
        );
        assert_eq!(user.precision(), 0.5);
        assert_eq!(user.recall(), 1.0);

        // micro over host+user: tp=1 fp=2 fn=1
        assert!((report.micro_fields.precision() - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.micro_fields.recall(), 0.5);
        assert_eq!(report.accuracy(), 0.5);
    }

    #[test]
    fn test_predicting_continuation_is_a_miss() {
        let gold = vec![example(vec![3, 0])];
        let predicted = vec![vec![1, 0]];

        let report = evaluate(&gold, &predicted, &vocab()).unwrap();
        let host = report.score("host").unwrap();
        assert_eq!(host.false_negatives, 1);
        assert!(report.per_tag.iter().all(|s| s.false_positives == 0));
    }

    #[test]
    fn test_shape_errors() {
        let gold = vec![example(vec![2, 3])];
        assert!(evaluate(&gold, &[], &vocab()).is_err());
        assert!(evaluate(&gold, &[vec![2]], &vocab()).is_err());
        assert!(evaluate(&gold, &[vec![2, 99]], &vocab()).is_err());
    }

    #[test]
    fn test_undefined_scores_are_zero() {
        let score = TagScore::default();
        assert_eq!(score.precision(), 0.0);
        assert_eq!(score.recall(), 0.0);
        assert_eq!(score.f1(), 0.0);
    }
}
