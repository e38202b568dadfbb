//! Wine dataset loading, combination and feature preparation using Polars

use linfa::traits::{Fit, Transformer};
use linfa::Dataset;
use linfa_preprocessing::linear_scaling::LinearScaler;
use ndarray::{Array1, Array2};
use polars::prelude::*;

/// Column holding the red/white discriminator added by [`combine_wine_datasets`]
pub const WINE_TYPE_COLUMN: &str = "wine_type";
/// Value of [`WINE_TYPE_COLUMN`] for red wines
pub const WINE_TYPE_RED: &str = "red";
/// Value of [`WINE_TYPE_COLUMN`] for white wines
pub const WINE_TYPE_WHITE: &str = "white";
/// Sensory quality score column
pub const QUALITY_COLUMN: &str = "quality";

/// Physicochemical measurements used as clustering features
pub const FEATURE_COLUMNS: [&str; 11] = [
    "fixed_acidity",
    "volatile_acidity",
    "citric_acid",
    "residual_sugar",
    "chlorides",
    "free_sulfur_dioxide",
    "total_sulfur_dioxide",
    "density",
    "pH",
    "sulphates",
    "alcohol",
];

/// Feature matrices extracted from the combined dataset, plus the fitted scaler
#[derive(Debug)]
pub struct WineFeatures {
    /// Standardized features as ndarray (n_samples, 11)
    pub features: Array2<f64>,
    /// Raw feature values before standardization
    pub raw_features: Array2<f64>,
    /// Fitted standard scaler (zero mean, unit variance per column)
    pub scaler: LinearScaler<f64>,
    /// Quality scores corresponding to each row
    pub quality: Vec<i64>,
}

impl WineFeatures {
    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }
}

/// Load a wine-quality CSV file into a DataFrame
///
/// The UCI distribution is semicolon-separated with quoted headers that
/// contain spaces; spaces in column names are replaced with underscores so
/// the columns can be addressed as identifiers downstream.
///
/// # Arguments
/// * `file_path` - Path to the CSV file
/// * `separator` - Field separator byte (b';' for the UCI files)
pub fn load_wine_csv(file_path: &str, separator: u8) -> crate::Result<DataFrame> {
    let df = CsvReader::from_path(file_path)?
        .has_header(true)
        .with_separator(separator)
        .finish()?;

    if df.height() == 0 {
        anyhow::bail!("No rows found in {}", file_path);
    }

    sanitize_column_names(df)
}

/// Replace spaces in column names with underscores, preserving case
fn sanitize_column_names(mut df: DataFrame) -> crate::Result<DataFrame> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.replace(' ', "_"))
        .collect();
    df.set_column_names(&names)?;
    Ok(df)
}

/// Combine the red and white datasets into a single DataFrame
///
/// Each input gets a `wine_type` column and the two frames are stacked
/// red-then-white. The inputs must share the same schema.
pub fn combine_wine_datasets(
    df_red: DataFrame,
    df_white: DataFrame,
) -> crate::Result<DataFrame> {
    let mut red = df_red;
    let mut white = df_white;

    let red_type = Series::new(WINE_TYPE_COLUMN, vec![WINE_TYPE_RED; red.height()]);
    red.with_column(red_type)?;

    let white_type = Series::new(WINE_TYPE_COLUMN, vec![WINE_TYPE_WHITE; white.height()]);
    white.with_column(white_type)?;

    let combined = red.vstack(&white)?;
    Ok(combined)
}

/// Extract the physicochemical feature matrix and fit a standard scaler
///
/// # Arguments
/// * `df` - Combined dataset holding every column of [`FEATURE_COLUMNS`]
///
/// # Returns
/// * `WineFeatures` with raw and standardized matrices, the fitted scaler
///   and the quality scores
pub fn prepare_features(df: &DataFrame) -> crate::Result<WineFeatures> {
    let n_samples = df.height();
    let n_features = FEATURE_COLUMNS.len();

    if n_samples == 0 {
        anyhow::bail!("Cannot prepare features from an empty dataset");
    }

    let mut columns: Vec<Vec<f64>> = Vec::with_capacity(n_features);
    for name in FEATURE_COLUMNS {
        let values: Vec<f64> = df
            .column(name)?
            .cast(&DataType::Float64)?
            .f64()?
            .into_no_null_iter()
            .collect();

        if values.len() != n_samples {
            anyhow::bail!("Feature column '{}' contains null values", name);
        }
        columns.push(values);
    }

    // Interleave the per-column vectors into a row-major matrix
    let mut raw_data = Vec::with_capacity(n_samples * n_features);
    for i in 0..n_samples {
        for column in &columns {
            raw_data.push(column[i]);
        }
    }
    let raw_features = Array2::from_shape_vec((n_samples, n_features), raw_data)?;

    let quality: Vec<i64> = df
        .column(QUALITY_COLUMN)?
        .cast(&DataType::Int64)?
        .i64()?
        .into_no_null_iter()
        .collect();
    if quality.len() != n_samples {
        anyhow::bail!("Column '{}' contains null values", QUALITY_COLUMN);
    }

    // Fit the standard scaler and transform the features
    let dataset = Dataset::new(raw_features.clone(), Array1::<usize>::zeros(n_samples));
    let scaler = LinearScaler::standard().fit(&dataset)?;
    let features = scaler.transform(raw_features.clone());

    Ok(WineFeatures {
        features,
        raw_features,
        scaler,
        quality,
    })
}
