//! Tree ensemble and data partitioning used by the employment predictor.

pub mod decision_tree;
pub mod random_forest;
pub mod split;

pub use decision_tree::DecisionTree;
pub use random_forest::RandomForest;
pub use split::{train_test_split, TrainTestSplit};
