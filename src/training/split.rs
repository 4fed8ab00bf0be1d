use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Row indices for the two partitions of a seeded shuffle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffles `0..n_samples` with `seed` and holds out `ceil(n_samples * test_ratio)` rows.
pub fn train_test_split(n_samples: usize, test_ratio: f64, seed: u64) -> TrainTestSplit {
    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n_samples as f64 * test_ratio).ceil() as usize).min(n_samples);
    let train = indices.split_off(n_test);
    TrainTestSplit {
        train,
        test: indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eight_rows_split_six_two() {
        let split = train_test_split(8, 0.2, 42);
        assert_eq!(split.train.len(), 6);
        assert_eq!(split.test.len(), 2);
    }

    #[test]
    fn partitions_are_disjoint_and_complete() {
        let split = train_test_split(37, 0.2, 1);
        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..37).collect::<Vec<_>>());
        assert_eq!(split.test.len(), 8);
    }

    #[test]
    fn same_seed_same_split() {
        assert_eq!(train_test_split(50, 0.2, 42), train_test_split(50, 0.2, 42));
        assert_ne!(train_test_split(50, 0.2, 42), train_test_split(50, 0.2, 43));
    }
}
