//! Interquartile-range outlier detection over the combined wine dataset

use polars::prelude::*;

use crate::data::{WINE_TYPE_COLUMN, WINE_TYPE_RED, WINE_TYPE_WHITE};

/// Default IQR multiplier for the outlier bounds
pub const DEFAULT_IQR_THRESHOLD: f64 = 1.5;
/// Suffix of the per-column boolean outlier marker
pub const OUTLIER_SUFFIX: &str = "_outlier";
/// Name of the aggregate row-wise outlier column
pub const OUTLIER_FLAG_COLUMN: &str = "outlier_flag";

/// Detect outliers in every numeric column using the interquartile range
///
/// For each numeric column `c` the quartiles Q1 and Q3 are computed with
/// linear interpolation, and values outside
/// `[Q1 - threshold * IQR, Q3 + threshold * IQR]` are marked in a new
/// boolean column `{c}_outlier`. Null values are never marked.
///
/// # Arguments
/// * `df` - Dataset to scan
/// * `threshold` - IQR multiplier (1.5 is the conventional default)
pub fn detect_outliers_iqr(df: &DataFrame, threshold: f64) -> crate::Result<DataFrame> {
    if df.height() == 0 {
        anyhow::bail!("Cannot detect outliers in an empty dataset");
    }

    let mut out = df.clone();
    for name in numeric_column_names(df) {
        let column = df.column(&name)?.cast(&DataType::Float64)?;
        let values = column.f64()?;

        let q1 = values
            .quantile(0.25, QuantileInterpolOptions::Linear)?
            .ok_or_else(|| anyhow::anyhow!("Column '{}' has no values", name))?;
        let q3 = values
            .quantile(0.75, QuantileInterpolOptions::Linear)?
            .ok_or_else(|| anyhow::anyhow!("Column '{}' has no values", name))?;

        let iqr = q3 - q1;
        let lower_bound = q1 - threshold * iqr;
        let upper_bound = q3 + threshold * iqr;

        let flags: Vec<bool> = values
            .into_iter()
            .map(|v| v.map_or(false, |v| v < lower_bound || v > upper_bound))
            .collect();

        let marker = Series::new(&format!("{}{}", name, OUTLIER_SUFFIX), flags);
        out.with_column(marker)?;
    }

    Ok(out)
}

/// Detect outliers with IQR bounds computed separately per wine type
///
/// The red and white partitions are scanned independently and re-stacked
/// red-then-white, matching the combined row order. Rows carrying any other
/// `wine_type` value are rejected.
pub fn detect_outliers_iqr_by_type(df: &DataFrame, threshold: f64) -> crate::Result<DataFrame> {
    let wine_type = df.column(WINE_TYPE_COLUMN)?.utf8()?;

    let red = df.filter(&wine_type.equal(WINE_TYPE_RED))?;
    let white = df.filter(&wine_type.equal(WINE_TYPE_WHITE))?;

    if red.height() + white.height() != df.height() {
        anyhow::bail!(
            "Column '{}' holds values other than '{}' and '{}'",
            WINE_TYPE_COLUMN,
            WINE_TYPE_RED,
            WINE_TYPE_WHITE
        );
    }
    if red.height() == 0 || white.height() == 0 {
        anyhow::bail!("Both wine types must be present for stratified detection");
    }

    let red_marked = detect_outliers_iqr(&red, threshold)?;
    let white_marked = detect_outliers_iqr(&white, threshold)?;

    let combined = red_marked.vstack(&white_marked)?;
    Ok(combined)
}

/// Add the aggregate `outlier_flag` column, true when any `*_outlier` is true
pub fn add_outlier_flag(df: &DataFrame) -> crate::Result<DataFrame> {
    let mut flags = vec![false; df.height()];

    for series in df.get_columns() {
        if !series.name().ends_with(OUTLIER_SUFFIX) {
            continue;
        }
        let markers = series.bool()?;
        for (i, marked) in markers.into_iter().enumerate() {
            if marked.unwrap_or(false) {
                flags[i] = true;
            }
        }
    }

    let mut out = df.clone();
    out.with_column(Series::new(OUTLIER_FLAG_COLUMN, flags))?;
    Ok(out)
}

/// Names of the numeric columns of a DataFrame, in schema order
fn numeric_column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|series| {
            matches!(
                series.dtype(),
                DataType::Float64
                    | DataType::Float32
                    | DataType::Int64
                    | DataType::Int32
                    | DataType::Int16
                    | DataType::Int8
                    | DataType::UInt64
                    | DataType::UInt32
                    | DataType::UInt16
                    | DataType::UInt8
            )
        })
        .map(|series| series.name().to_string())
        .collect()
}
