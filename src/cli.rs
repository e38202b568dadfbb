//! Command-line interface definitions and argument parsing

use clap::{Parser, ValueEnum};

/// Clustering algorithm applied to the standardized features
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClusterMethod {
    /// K-Means with L2 distance
    Kmeans,
    /// Agglomerative clustering with Ward linkage
    Agglomerative,
}

/// Wine-quality EDA pipeline: combine, flag outliers, persist, cluster, plot
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the red wine CSV file
    #[arg(long, default_value = "winequality-red.csv")]
    pub red: String,

    /// Path to the white wine CSV file
    #[arg(long, default_value = "winequality-white.csv")]
    pub white: String,

    /// CSV field separator
    #[arg(long, default_value = ";")]
    pub separator: char,

    /// IQR multiplier used for the outlier bounds
    #[arg(short = 't', long, default_value = "1.5")]
    pub threshold: f64,

    /// Compute IQR bounds separately for red and white wines
    #[arg(long)]
    pub by_wine_type: bool,

    /// Directory where the SQLite database is created
    #[arg(long, default_value = "data")]
    pub db_dir: String,

    /// SQLite database file name
    #[arg(long, default_value = "wine_data.db")]
    pub db_name: String,

    /// Table name for the cleaned dataset
    #[arg(long, default_value = "wine_quality")]
    pub table: String,

    /// Exclude rows with a raised outlier flag from the clustering stage
    #[arg(long)]
    pub drop_outliers: bool,

    /// Number of clusters
    #[arg(short = 'k', long, default_value = "3")]
    pub clusters: usize,

    /// Clustering method
    #[arg(long, value_enum, default_value = "agglomerative")]
    pub method: ClusterMethod,

    /// Largest cluster count evaluated by the elbow sweep
    #[arg(long, default_value = "10")]
    pub max_clusters: usize,

    /// Maximum iterations for the K-Means algorithm
    #[arg(long, default_value = "300")]
    pub max_iters: usize,

    /// Tolerance for K-Means convergence
    #[arg(long, default_value = "1e-4")]
    pub tolerance: f64,

    /// Seed for K-Means centroid initialization
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Output directory for the generated plots
    #[arg(short, long, default_value = "plots")]
    pub output: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Separator byte handed to the CSV reader
    pub fn separator_byte(&self) -> crate::Result<u8> {
        if !self.separator.is_ascii() {
            anyhow::bail!("CSV separator must be a single ASCII character");
        }
        Ok(self.separator as u8)
    }
}
