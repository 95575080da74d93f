pub mod clustering;
pub mod distributions;
mod kmeans;
pub mod metrics;
mod silhouette;
mod stopwords;
mod tfidf;

pub use clustering::{cluster_defects, DEFAULT_CLUSTERS};
pub use distributions::calculate_distributions;
pub use metrics::{calculate_mean_time_to_fix, calculate_reopen_rate};
