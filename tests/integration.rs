//! Integration tests for the wine-quality EDA pipeline

use std::io::Write;

use polars::prelude::NamedFrom;
use tempfile::{tempdir, NamedTempFile};
use vinoscope::data::{FEATURE_COLUMNS, WINE_TYPE_COLUMN};
use vinoscope::outliers::OUTLIER_FLAG_COLUMN;
use vinoscope::{
    add_outlier_flag, combine_wine_datasets, detect_outliers_iqr_by_type, fit_agglomerative,
    fit_kmeans, inertia_curve, load_wine_csv, prepare_features, project_pca, query_to_dataframe,
    store_dataframe, viz,
};

const HEADER: &str = "\"fixed acidity\";\"volatile acidity\";\"citric acid\";\"residual sugar\";\
                      \"chlorides\";\"free sulfur dioxide\";\"total sulfur dioxide\";\"density\";\
                      \"pH\";\"sulphates\";\"alcohol\";\"quality\"";

/// Write a synthetic wine CSV: twelve rows on an arithmetic progression per
/// column, plus one row with a single extreme measurement. The progression
/// keeps every regular value inside its IQR bounds, so exactly the extreme
/// row gets flagged.
fn write_wine_csv(base: [f64; 11], delta: [f64; 11], extreme_column: usize, extreme_value: f64) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", HEADER).unwrap();

    for i in 0..12 {
        let fields: Vec<String> = base
            .iter()
            .zip(delta.iter())
            .map(|(b, d)| format!("{:.4}", b + d * i as f64))
            .collect();
        writeln!(file, "{};{}", fields.join(";"), 5 + i % 3).unwrap();
    }

    // Extreme row: mid-progression values except for one measurement
    let fields: Vec<String> = base
        .iter()
        .zip(delta.iter())
        .enumerate()
        .map(|(idx, (b, d))| {
            if idx == extreme_column {
                format!("{:.4}", extreme_value)
            } else {
                format!("{:.4}", b + d * 5.0)
            }
        })
        .collect();
    writeln!(file, "{};{}", fields.join(";"), 6).unwrap();

    file
}

fn red_csv() -> NamedTempFile {
    let base = [7.0, 0.50, 0.10, 1.8, 0.070, 10.0, 30.0, 0.9960, 3.20, 0.50, 9.0];
    let delta = [0.05, 0.010, 0.02, 0.05, 0.001, 0.5, 1.5, 0.0002, 0.01, 0.01, 0.1];
    // total sulfur dioxide far beyond the red bounds
    write_wine_csv(base, delta, 6, 300.0)
}

fn white_csv() -> NamedTempFile {
    let base = [6.5, 0.25, 0.30, 5.0, 0.040, 30.0, 120.0, 0.9930, 3.10, 0.45, 10.0];
    let delta = [0.05, 0.005, 0.01, 0.20, 0.0005, 1.0, 2.0, 0.0002, 0.01, 0.01, 0.1];
    // chlorides far beyond the white bounds
    write_wine_csv(base, delta, 4, 0.40)
}

#[test]
fn test_end_to_end_pipeline() {
    let red_file = red_csv();
    let white_file = white_csv();

    // Load and combine
    let red = load_wine_csv(red_file.path().to_str().unwrap(), b';').unwrap();
    let white = load_wine_csv(white_file.path().to_str().unwrap(), b';').unwrap();
    assert_eq!(red.height(), 13);
    assert_eq!(white.height(), 13);

    let combined = combine_wine_datasets(red, white).unwrap();
    assert_eq!(combined.height(), 26);
    assert!(combined
        .get_column_names()
        .contains(&WINE_TYPE_COLUMN));

    // Flag outliers per wine type
    let marked = detect_outliers_iqr_by_type(&combined, 1.5).unwrap();
    let flagged = add_outlier_flag(&marked).unwrap();

    let raised: Vec<bool> = flagged
        .column(OUTLIER_FLAG_COLUMN)
        .unwrap()
        .bool()
        .unwrap()
        .into_no_null_iter()
        .collect();
    assert_eq!(raised.iter().filter(|&&flag| flag).count(), 2);
    // The extreme rows sit at the end of each partition
    assert!(raised[12]);
    assert!(raised[25]);

    // Persist and query back
    let dir = tempdir().unwrap();
    let db_path = store_dataframe(
        &flagged,
        dir.path().to_str().unwrap(),
        "wine_data.db",
        "wine_quality",
    )
    .unwrap();

    let summary = query_to_dataframe(
        &db_path,
        "SELECT wine_type, COUNT(*) AS samples, SUM(outlier_flag) AS outliers \
         FROM wine_quality GROUP BY wine_type ORDER BY wine_type",
    )
    .unwrap();
    assert_eq!(summary.height(), 2);
    let samples: Vec<i64> = summary
        .column("samples")
        .unwrap()
        .i64()
        .unwrap()
        .into_no_null_iter()
        .collect();
    assert_eq!(samples, vec![13, 13]);
    let outliers: Vec<i64> = summary
        .column("outliers")
        .unwrap()
        .i64()
        .unwrap()
        .into_no_null_iter()
        .collect();
    assert_eq!(outliers, vec![1, 1]);

    let clean = query_to_dataframe(
        &db_path,
        "SELECT * FROM wine_quality WHERE outlier_flag = 0",
    )
    .unwrap();
    assert_eq!(clean.height(), 24);

    // Standardize and cluster
    let features = prepare_features(&clean).unwrap();
    assert_eq!(features.features.shape(), &[24, FEATURE_COLUMNS.len()]);

    let labels = fit_agglomerative(&features.features, 2).unwrap();
    assert_eq!(labels.len(), 24);
    assert!(labels.iter().all(|&label| label < 2));

    // Project and render the report
    let projection = project_pca(&features.features, 2).unwrap();
    assert_eq!(projection.coords.shape(), &[24, 2]);

    let mut clustered = clean;
    let cluster_column: Vec<i64> = labels.iter().map(|&label| label as i64).collect();
    clustered
        .with_column(polars::prelude::Series::new("cluster", cluster_column))
        .unwrap();

    let plot_dir = tempdir().unwrap();
    let curve = inertia_curve(&features.features, 4, 100, 1e-4, 42).unwrap();
    viz::generate_visualization_report(
        &clustered,
        &features,
        &projection,
        &labels,
        2,
        &curve,
        plot_dir.path().to_str().unwrap(),
    )
    .unwrap();

    assert!(plot_dir.path().join("elbow.png").exists());
    assert!(plot_dir.path().join("clusters_pca.png").exists());
    assert!(plot_dir.path().join("cluster_boxplots.png").exists());
}

#[test]
fn test_kmeans_on_loaded_features() {
    let red_file = red_csv();
    let white_file = white_csv();

    let red = load_wine_csv(red_file.path().to_str().unwrap(), b';').unwrap();
    let white = load_wine_csv(white_file.path().to_str().unwrap(), b';').unwrap();
    let combined = combine_wine_datasets(red, white).unwrap();

    let features = prepare_features(&combined).unwrap();
    let model = fit_kmeans(&features.features, 2, 100, 1e-4, 42).unwrap();

    assert_eq!(model.labels.len(), 26);
    assert_eq!(model.centroids.shape(), &[2, FEATURE_COLUMNS.len()]);
    assert!(model.inertia.is_finite() && model.inertia >= 0.0);

    let sizes = model.cluster_sizes();
    assert_eq!(sizes.iter().sum::<usize>(), 26);
}

#[test]
fn test_elbow_curve_shrinks_with_more_clusters() {
    let red_file = red_csv();
    let white_file = white_csv();

    let red = load_wine_csv(red_file.path().to_str().unwrap(), b';').unwrap();
    let white = load_wine_csv(white_file.path().to_str().unwrap(), b';').unwrap();
    let combined = combine_wine_datasets(red, white).unwrap();

    let features = prepare_features(&combined).unwrap();
    let curve = inertia_curve(&features.features, 5, 100, 1e-4, 42).unwrap();

    assert_eq!(curve.len(), 5);
    assert!(curve.first().unwrap().1 >= curve.last().unwrap().1);
}

#[test]
fn test_mismatched_schemas_rejected() {
    let red_file = red_csv();
    let mut truncated = NamedTempFile::new().unwrap();
    writeln!(truncated, "\"fixed acidity\";\"volatile acidity\"").unwrap();
    writeln!(truncated, "7.0;0.5").unwrap();

    let red = load_wine_csv(red_file.path().to_str().unwrap(), b';').unwrap();
    let odd = load_wine_csv(truncated.path().to_str().unwrap(), b';').unwrap();

    assert!(combine_wine_datasets(red, odd).is_err());
}
