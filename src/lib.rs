//! VinoScope: exploratory data analysis for the UCI wine-quality dataset
//!
//! This library provides the building blocks of a small EDA pipeline: CSV
//! loading, red/white dataset combination, interquartile-range outlier
//! flagging, SQLite persistence, unsupervised clustering and visualization.

pub mod cli;
pub mod data;
pub mod model;
pub mod outliers;
pub mod store;
pub mod viz;

// Re-export public items for easier access
pub use cli::{Args, ClusterMethod};
pub use data::{combine_wine_datasets, load_wine_csv, prepare_features, WineFeatures};
pub use model::{fit_agglomerative, fit_kmeans, inertia_curve, project_pca, KMeansModel};
pub use outliers::{add_outlier_flag, detect_outliers_iqr, detect_outliers_iqr_by_type};
pub use store::{query_to_dataframe, store_dataframe};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
