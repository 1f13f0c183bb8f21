/// Train/validation split for encoded datasets
///
/// Splits records to fine-tune and evaluate the tagger:
/// - Train set: fine-tune the token classifier
/// - Validation set: score field-level precision/recall/F1
///
/// Supports stratified splitting so every event shape appears in both sets
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone)]
pub struct DatasetSplit<T> {
    pub train: Vec<T>,
    pub validation: Vec<T>,
}

impl<T> DatasetSplit<T> {
    /// Get statistics about the split
    pub fn stats(&self) -> SplitStats {
        SplitStats {
            train_size: self.train.len(),
            validation_size: self.validation.len(),
            total_size: self.train.len() + self.validation.len(),
        }
    }

    /// Apply `f` to both partitions, keeping the split intact
    pub fn map<U, F>(self, mut f: F) -> DatasetSplit<U>
    where
        F: FnMut(Vec<T>) -> Vec<U>,
    {
        DatasetSplit {
            train: f(self.train),
            validation: f(self.validation),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitStats {
    pub train_size: usize,
    pub validation_size: usize,
    pub total_size: usize,
}

impl SplitStats {
    pub fn train_ratio(&self) -> f64 {
        self.train_size as f64 / self.total_size.max(1) as f64
    }

    pub fn validation_ratio(&self) -> f64 {
        self.validation_size as f64 / self.total_size.max(1) as f64
    }
}

/// Configuration for dataset splitting
#[derive(Debug, Clone)]
pub struct SplitConfig {
    /// Ratio of data to use for training (0.0 to 1.0)
    pub train_ratio: f64,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Whether to use stratified split (every event shape in both sets)
    pub stratified: bool,
    /// Minimum samples per stratum in validation set (for stratified split)
    pub min_validation_samples: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_ratio: 0.8,
            seed: 42,
            stratified: false,
            min_validation_samples: 1,
        }
    }
}

/// Split items into disjoint train and validation sets
///
/// `strata_key` is only consulted for stratified splits.
pub fn split_dataset<T, K>(items: Vec<T>, strata_key: K, config: &SplitConfig) -> DatasetSplit<T>
where
    K: Fn(&T) -> String,
{
    let indices = if config.stratified {
        let keys: Vec<String> = items.iter().map(&strata_key).collect();
        stratified_indices(&keys, config)
    } else {
        random_indices(items.len(), config)
    };

    partition(items, indices)
}

/// Simple random split (small strata may land on one side only)
fn random_indices(len: usize, config: &SplitConfig) -> (Vec<usize>, Vec<usize>) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(config.seed);
    let mut indices: Vec<usize> = (0..len).collect();
    indices.shuffle(&mut rng);

    let train_size = (len as f64 * config.train_ratio.clamp(0.0, 1.0)) as usize;
    let validation = indices.split_off(train_size);
    (indices, validation)
}

/// Stratified split - every stratum with 2+ items appears on both sides
fn stratified_indices(keys: &[String], config: &SplitConfig) -> (Vec<usize>, Vec<usize>) {
    // BTreeMap so iteration order, and therefore the rng stream, is stable
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, key) in keys.iter().enumerate() {
        groups.entry(key.as_str()).or_default().push(i);
    }

    let mut rng = rand::rngs::StdRng::seed_from_u64(config.seed);
    let mut train_indices = Vec::new();
    let mut validation_indices = Vec::new();

    for indices in groups.values_mut() {
        indices.shuffle(&mut rng);

        let group_train = (indices.len() as f64 * config.train_ratio.clamp(0.0, 1.0)) as usize;

        // Ensure at least min_validation_samples in validation set
        let group_train = if indices.len() - group_train < config.min_validation_samples {
            indices.len().saturating_sub(config.min_validation_samples)
        } else {
            group_train
        };

        // Also ensure at least 1 in train set
        let group_train = group_train.max(1.min(indices.len() - 1));

        train_indices.extend_from_slice(&indices[..group_train]);
        validation_indices.extend_from_slice(&indices[group_train..]);
    }

    // Shuffle the final indices to mix strata
    train_indices.shuffle(&mut rng);
    validation_indices.shuffle(&mut rng);

    (train_indices, validation_indices)
}

/// Move items into their partitions without cloning
fn partition<T>(items: Vec<T>, (train_idx, validation_idx): (Vec<usize>, Vec<usize>)) -> DatasetSplit<T> {
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let mut take = |indices: Vec<usize>| -> Vec<T> {
        indices
            .into_iter()
            .filter_map(|i| slots.get_mut(i).and_then(Option::take))
            .collect()
    };

    let train = take(train_idx);
    let validation = take(validation_idx);
    DatasetSplit { train, validation }
}

/// Strata key for labeled records: the ordered names of present fields
pub fn event_shape(fields: &[(String, String)]) -> String {
    let mut seen = HashSet::new();
    fields
        .iter()
        .filter(|(_, value)| !crate::field_aligner::is_absent(value))
        .map(|(name, _)| name.as_str())
        .filter(|name| seen.insert(*name))
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_split() {
        let items: Vec<u32> = (0..5).collect();
        let config = SplitConfig {
            train_ratio: 0.6,
            seed: 42,
            stratified: false,
            min_validation_samples: 1,
        };

        let split = split_dataset(items, |_| String::new(), &config);
        let stats = split.stats();

        assert_eq!(stats.train_size, 3); // 60% of 5
        assert_eq!(stats.validation_size, 2); // 40% of 5
        assert_eq!(stats.total_size, 5);
    }

    #[test]
    fn test_split_ratios() {
        let config = SplitConfig::default();
        let split = split_dataset((0..10).collect::<Vec<u32>>(), |_| String::new(), &config);
        let stats = split.stats();
        assert_eq!(stats.train_ratio(), 0.8);
        assert!((stats.validation_ratio() - 0.2).abs() < 1e-9);

        let empty = split_dataset(Vec::<u32>::new(), |_| String::new(), &config);
        assert_eq!(empty.stats().validation_ratio(), 0.0);
    }

    #[test]
    fn test_split_is_disjoint_and_covering() {
        let items: Vec<u32> = (0..100).collect();
        let split = split_dataset(items, |_| String::new(), &SplitConfig::default());

        let mut all: Vec<u32> = split.train.iter().chain(&split.validation).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
        assert_eq!(split.train.len(), 80);
    }

    #[test]
    fn test_split_is_deterministic_for_seed() {
        let config = SplitConfig::default();
        let a = split_dataset((0..50).collect::<Vec<u32>>(), |_| String::new(), &config);
        let b = split_dataset((0..50).collect::<Vec<u32>>(), |_| String::new(), &config);
        assert_eq!(a.train, b.train);
        assert_eq!(a.validation, b.validation);

        let other = SplitConfig {
            seed: 7,
            ..SplitConfig::default()
        };
        let c = split_dataset((0..50).collect::<Vec<u32>>(), |_| String::new(), &other);
        assert_ne!(a.train, c.train);
    }

    #[test]
    fn test_stratified_split() {
        let items = vec!["E1", "E1", "E2", "E2", "E3", "E3"];
        let config = SplitConfig {
            train_ratio: 0.8,
            seed: 42,
            stratified: true,
            min_validation_samples: 1,
        };

        let split = split_dataset(items, |s| s.to_string(), &config);

        // All 3 shapes should appear in both sets
        let train: HashSet<_> = split.train.iter().collect();
        let validation: HashSet<_> = split.validation.iter().collect();
        assert_eq!(train.len(), 3);
        assert_eq!(validation.len(), 3);
    }

    #[test]
    fn test_event_shape_skips_absent_values() {
        let fields = vec![
            ("logname".to_string(), "Security".to_string()),
            ("type".to_string(), "-".to_string()),
            ("eventcode".to_string(), "4624".to_string()),
        ];
        assert_eq!(event_shape(&fields), "logname|eventcode");
    }

    #[test]
    fn test_map_keeps_partitions() {
        let split = DatasetSplit {
            train: vec![1, 2],
            validation: vec![3],
        };
        let doubled = split.map(|v| v.into_iter().map(|x| x * 2).collect());
        assert_eq!(doubled.train, vec![2, 4]);
        assert_eq!(doubled.validation, vec![6]);
    }
}
