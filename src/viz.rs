//! Visualization functions using Plotters for the clustering results

use std::fs;
use std::path::Path;

use ndarray::Array1;
use plotters::prelude::*;
use polars::prelude::{DataFrame, DataType};

use crate::data::{WineFeatures, FEATURE_COLUMNS, QUALITY_COLUMN};
use crate::model::{cluster_sizes, silhouette_sample, PcaProjection};

/// Color palette for different clusters
const CLUSTER_COLORS: [RGBColor; 5] = [RED, BLUE, GREEN, YELLOW, MAGENTA];

/// Points scored by the silhouette diagnostic in the statistics report
const SILHOUETTE_SAMPLE_SIZE: usize = 500;

fn cluster_color(cluster: usize) -> &'static RGBColor {
    &CLUSTER_COLORS[cluster % CLUSTER_COLORS.len()]
}

/// Plot the elbow curve: K-Means inertia against the cluster count
pub fn create_elbow_plot(curve: &[(usize, f64)], output_path: &str) -> crate::Result<()> {
    if curve.is_empty() {
        anyhow::bail!("Elbow curve holds no points");
    }

    let max_k = curve.iter().map(|&(k, _)| k).max().unwrap_or(1);
    let max_inertia = curve.iter().map(|&(_, i)| i).fold(f64::NEG_INFINITY, f64::max);

    let root = BitMapBackend::new(output_path, (640, 480)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Elbow Method for Cluster Count Selection", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.5..(max_k as f64 + 0.5), 0.0..(max_inertia * 1.05).max(1.0))?;

    chart
        .configure_mesh()
        .x_desc("Number of clusters")
        .y_desc("Inertia")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(LineSeries::new(
        curve.iter().map(|&(k, inertia)| (k as f64, inertia)),
        &BLUE,
    ))?;
    chart.draw_series(
        curve
            .iter()
            .map(|&(k, inertia)| Circle::new((k as f64, inertia), 4, BLUE.filled())),
    )?;

    root.present()?;
    println!("Elbow plot saved to: {}", output_path);

    Ok(())
}

/// Scatter plot of the 2-D PCA embedding, one colored series per cluster
pub fn create_pca_scatter(
    projection: &PcaProjection,
    labels: &Array1<usize>,
    n_clusters: usize,
    output_path: &str,
    plot_title: Option<&str>,
) -> crate::Result<()> {
    if projection.coords.ncols() < 2 {
        anyhow::bail!("PCA scatter needs a two-component projection");
    }
    if projection.coords.nrows() != labels.len() {
        anyhow::bail!("Projection and labels disagree on the sample count");
    }

    let title = plot_title.unwrap_or("Wine Clusters in Principal Component Space");

    let xs = projection.coords.column(0);
    let ys = projection.coords.column(1);

    let x_min = xs.iter().fold(f64::INFINITY, |a, &b| a.min(b)) - 0.5;
    let x_max = xs.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b)) + 0.5;
    let y_min = ys.iter().fold(f64::INFINITY, |a, &b| a.min(b)) - 0.5;
    let y_max = ys.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b)) + 0.5;

    let ratios = &projection.explained_variance_ratio;
    let x_desc = format!("PC1 ({:.1}% variance)", ratios[0] * 100.0);
    let y_desc = format!("PC2 ({:.1}% variance)", ratios[1] * 100.0);

    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 26))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for cluster in 0..n_clusters {
        let color = *cluster_color(cluster);
        chart
            .draw_series(
                labels
                    .iter()
                    .enumerate()
                    .filter(|&(_, &label)| label == cluster)
                    .map(|(i, _)| Circle::new((xs[i], ys[i]), 3, color.filled())),
            )?
            .label(format!("Cluster {}", cluster))
            .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
    }

    chart.configure_series_labels().draw()?;

    root.present()?;
    println!("PCA cluster scatter saved to: {}", output_path);

    Ok(())
}

/// Grid of per-feature boxplots split by cluster
///
/// Covers the physicochemical features plus the quality score, three
/// panels per row.
pub fn create_cluster_boxplots(
    df: &DataFrame,
    labels: &Array1<usize>,
    n_clusters: usize,
    output_path: &str,
) -> crate::Result<()> {
    if df.height() != labels.len() {
        anyhow::bail!("Dataset and labels disagree on the sample count");
    }

    let mut panels: Vec<&str> = FEATURE_COLUMNS.to_vec();
    panels.push(QUALITY_COLUMN);

    let n_cols = 3usize;
    let n_rows = (panels.len() + n_cols - 1) / n_cols;

    let root = BitMapBackend::new(
        output_path,
        (n_cols as u32 * 400, n_rows as u32 * 300),
    )
    .into_drawing_area();
    root.fill(&WHITE)?;
    let areas = root.split_evenly((n_rows, n_cols));

    for (panel, feature) in panels.iter().enumerate() {
        let values: Vec<f64> = df
            .column(feature)?
            .cast(&DataType::Float64)?
            .f64()?
            .into_no_null_iter()
            .collect();
        if values.len() != labels.len() {
            anyhow::bail!("Column '{}' contains null values", feature);
        }

        let mut grouped: Vec<Vec<f64>> = vec![Vec::new(); n_clusters];
        for (value, &label) in values.iter().zip(labels.iter()) {
            if label < n_clusters {
                grouped[label].push(*value);
            }
        }

        let value_min = values.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let value_max = values.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        let pad = ((value_max - value_min) * 0.1).max(0.1);

        // The Boxplot element draws f32 values
        let y_range = ((value_min - pad) as f32)..((value_max + pad) as f32);

        let mut chart = ChartBuilder::on(&areas[panel])
            .caption(format!("{} by cluster", feature), ("sans-serif", 16))
            .margin(8)
            .x_label_area_size(28)
            .y_label_area_size(45)
            .build_cartesian_2d((0..n_clusters as i32).into_segmented(), y_range)?;

        chart
            .configure_mesh()
            .x_desc("Cluster")
            .axis_desc_style(("sans-serif", 12))
            .draw()?;

        chart.draw_series(grouped.iter().enumerate().filter_map(|(cluster, members)| {
            if members.is_empty() {
                return None;
            }
            let quartiles = Quartiles::new(members);
            Some(
                Boxplot::new_vertical(SegmentValue::CenterOf(cluster as i32), &quartiles)
                    .width(24)
                    .style(cluster_color(cluster)),
            )
        }))?;
    }

    root.present()?;
    println!("Cluster boxplots saved to: {}", output_path);

    Ok(())
}

/// Print cluster statistics to the console
pub fn print_cluster_statistics(
    features: &WineFeatures,
    labels: &Array1<usize>,
    n_clusters: usize,
) {
    let n_samples = features.n_samples();

    println!("\n=== Cluster Statistics ===");
    println!("Number of clusters: {}", n_clusters);
    println!("Total samples: {}", n_samples);

    let silhouette = silhouette_sample(
        &features.features,
        labels,
        n_clusters,
        SILHOUETTE_SAMPLE_SIZE.min(n_samples),
    );
    println!("Silhouette score (sample): {:.3}", silhouette);

    let sizes = cluster_sizes(labels, n_clusters);
    println!("\nCluster sizes:");
    for (cluster, &size) in sizes.iter().enumerate() {
        let percentage = (size as f64 / n_samples as f64) * 100.0;
        println!("  Cluster {}: {} samples ({:.1}%)", cluster, size, percentage);
    }

    // Per-cluster feature means in raw units
    println!("\nPer-cluster feature means:");
    print!("  {:<22}", "feature");
    for cluster in 0..n_clusters {
        print!(" | {:>10}", format!("cluster {}", cluster));
    }
    println!();

    for (idx, feature) in FEATURE_COLUMNS.iter().enumerate() {
        print!("  {:<22}", feature);
        for cluster in 0..n_clusters {
            let mut sum = 0.0;
            let mut count = 0usize;
            for (row, &label) in labels.iter().enumerate() {
                if label == cluster {
                    sum += features.raw_features[[row, idx]];
                    count += 1;
                }
            }
            let mean = if count > 0 { sum / count as f64 } else { f64::NAN };
            print!(" | {:>10.3}", mean);
        }
        println!();
    }
}

/// Generate the full visualization report into an output directory
///
/// Emits the elbow plot, the PCA cluster scatter and the per-feature
/// boxplots, then prints the cluster statistics.
pub fn generate_visualization_report(
    df: &DataFrame,
    features: &WineFeatures,
    projection: &PcaProjection,
    labels: &Array1<usize>,
    n_clusters: usize,
    curve: &[(usize, f64)],
    output_dir: &str,
) -> crate::Result<()> {
    fs::create_dir_all(output_dir)?;

    let elbow_path = Path::new(output_dir).join("elbow.png");
    create_elbow_plot(curve, path_str(&elbow_path)?)?;

    let scatter_path = Path::new(output_dir).join("clusters_pca.png");
    create_pca_scatter(projection, labels, n_clusters, path_str(&scatter_path)?, None)?;

    let boxplot_path = Path::new(output_dir).join("cluster_boxplots.png");
    create_cluster_boxplots(df, labels, n_clusters, path_str(&boxplot_path)?)?;

    print_cluster_statistics(features, labels, n_clusters);

    Ok(())
}

fn path_str(path: &Path) -> crate::Result<&str> {
    path.to_str()
        .ok_or_else(|| anyhow::anyhow!("Output path is not valid UTF-8: {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::project_pca;
    use ndarray::Array2;
    use polars::prelude::*;
    use tempfile::tempdir;

    fn test_labels() -> Array1<usize> {
        Array1::from_vec(vec![0, 0, 0, 1, 1, 1])
    }

    fn test_features() -> Array2<f64> {
        Array2::from_shape_vec(
            (6, 2),
            vec![0.0, 0.0, 0.1, -0.1, -0.1, 0.1, 10.0, 10.0, 10.1, 9.9, 9.9, 10.1],
        )
        .unwrap()
    }

    fn test_frame() -> DataFrame {
        let n = 6;
        let mut columns: Vec<Series> = FEATURE_COLUMNS
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let values: Vec<f64> = (0..n).map(|i| (i + idx) as f64).collect();
                Series::new(name, values)
            })
            .collect();
        columns.push(Series::new(QUALITY_COLUMN, vec![5i64, 5, 6, 6, 7, 7]));
        DataFrame::new(columns).unwrap()
    }

    #[test]
    fn test_create_elbow_plot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("elbow.png");
        let curve = vec![(1, 120.0), (2, 30.0), (3, 12.0), (4, 8.0)];

        create_elbow_plot(&curve, path.to_str().unwrap()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_create_elbow_plot_empty_curve() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("elbow.png");
        assert!(create_elbow_plot(&[], path.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_create_pca_scatter() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scatter.png");

        let projection = project_pca(&test_features(), 2).unwrap();
        create_pca_scatter(&projection, &test_labels(), 2, path.to_str().unwrap(), None).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_create_cluster_boxplots() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("boxplots.png");

        create_cluster_boxplots(&test_frame(), &test_labels(), 2, path.to_str().unwrap()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_boxplots_reject_mismatched_labels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("boxplots.png");
        let labels = Array1::from_vec(vec![0, 1]);

        assert!(
            create_cluster_boxplots(&test_frame(), &labels, 2, path.to_str().unwrap()).is_err()
        );
    }
}
