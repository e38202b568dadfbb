//! Unsupervised clustering models over the standardized wine features

use std::collections::HashMap;

use kodama::{linkage, Method};
use linfa::prelude::*;
use linfa::Dataset;
use linfa_clustering::KMeans;
use linfa_nn::distance::L2Dist;
use linfa_reduction::Pca;
use ndarray::{Array1, Array2};
use rand::rngs::SmallRng;
use rand::SeedableRng;

/// K-Means model wrapper with fitted parameters
#[derive(Debug)]
pub struct KMeansModel {
    /// Number of clusters
    pub n_clusters: usize,
    /// Cluster assignments for the training data
    pub labels: Array1<usize>,
    /// Cluster centroids in standardized space
    pub centroids: Array2<f64>,
    /// Within-cluster sum of squares (inertia)
    pub inertia: f64,
}

impl KMeansModel {
    /// Get cluster sizes
    pub fn cluster_sizes(&self) -> Vec<usize> {
        cluster_sizes(&self.labels, self.n_clusters)
    }
}

/// Two-dimensional PCA embedding used for cluster visualization
#[derive(Debug)]
pub struct PcaProjection {
    /// Embedded coordinates (n_samples, n_components)
    pub coords: Array2<f64>,
    /// Fraction of total variance captured by each component
    pub explained_variance_ratio: Array1<f64>,
}

/// Fit a K-Means model on the standardized features
///
/// # Arguments
/// * `features` - Standardized feature matrix (n_samples, n_features)
/// * `n_clusters` - Number of clusters
/// * `max_iters` - Maximum iterations for convergence
/// * `tolerance` - Convergence tolerance
/// * `seed` - RNG seed for centroid initialization, for reproducible runs
pub fn fit_kmeans(
    features: &Array2<f64>,
    n_clusters: usize,
    max_iters: usize,
    tolerance: f64,
    seed: u64,
) -> crate::Result<KMeansModel> {
    validate_cluster_count(features.nrows(), n_clusters)?;

    let n_samples = features.nrows();
    let targets: Array1<usize> = Array1::zeros(n_samples);
    let dataset = Dataset::new(features.clone(), targets);

    let rng = SmallRng::seed_from_u64(seed);
    let model = KMeans::params_with(n_clusters, rng, L2Dist)
        .max_n_iterations(max_iters as u64)
        .tolerance(tolerance)
        .fit(&dataset)?;

    let labels = model.predict(features);
    let centroids = model.centroids().clone();
    let inertia = compute_inertia(features, &labels, &centroids);

    Ok(KMeansModel {
        n_clusters,
        labels,
        centroids,
        inertia,
    })
}

/// Elbow-method sweep: K-Means inertia for every k in `1..=max_clusters`
pub fn inertia_curve(
    features: &Array2<f64>,
    max_clusters: usize,
    max_iters: usize,
    tolerance: f64,
    seed: u64,
) -> crate::Result<Vec<(usize, f64)>> {
    if max_clusters == 0 {
        anyhow::bail!("Elbow sweep needs at least one cluster count");
    }
    if max_clusters > features.nrows() {
        anyhow::bail!(
            "Elbow sweep up to {} clusters needs at least as many samples, got {}",
            max_clusters,
            features.nrows()
        );
    }

    let mut curve = Vec::with_capacity(max_clusters);
    for k in 1..=max_clusters {
        let model = fit_kmeans(features, k, max_iters, tolerance, seed)?;
        curve.push((k, model.inertia));
    }
    Ok(curve)
}

/// Agglomerative clustering with Ward linkage over Euclidean distances
///
/// The dendrogram is cut at `n_clusters` groups; labels are renumbered
/// `0..n_clusters` in order of first appearance, so runs are deterministic.
pub fn fit_agglomerative(
    features: &Array2<f64>,
    n_clusters: usize,
) -> crate::Result<Array1<usize>> {
    validate_cluster_count(features.nrows(), n_clusters)?;

    let n_samples = features.nrows();

    // Condensed pairwise distance matrix, row-major upper triangle
    let mut condensed = Vec::with_capacity(n_samples * (n_samples - 1) / 2);
    for i in 0..n_samples {
        for j in (i + 1)..n_samples {
            condensed.push(euclidean_distance(&features.row(i), &features.row(j)));
        }
    }

    let dendrogram = linkage(&mut condensed, n_samples, Method::Ward);

    // Merge step i joins two clusters into a new cluster n_samples + i.
    // Applying the first n_samples - n_clusters steps leaves n_clusters
    // groups standing.
    let mut parent: Vec<usize> = (0..2 * n_samples - 1).collect();
    for (i, step) in dendrogram
        .steps()
        .iter()
        .take(n_samples - n_clusters)
        .enumerate()
    {
        parent[step.cluster1] = n_samples + i;
        parent[step.cluster2] = n_samples + i;
    }

    let mut root_labels: HashMap<usize, usize> = HashMap::new();
    let mut labels = Array1::zeros(n_samples);
    for observation in 0..n_samples {
        let mut node = observation;
        while parent[node] != node {
            node = parent[node];
        }
        let next = root_labels.len();
        labels[observation] = *root_labels.entry(node).or_insert(next);
    }

    Ok(labels)
}

/// Project the standardized features onto their principal components
pub fn project_pca(features: &Array2<f64>, n_components: usize) -> crate::Result<PcaProjection> {
    if n_components == 0 || n_components > features.ncols() {
        anyhow::bail!(
            "Number of components must be between 1 and {}, got {}",
            features.ncols(),
            n_components
        );
    }
    if features.nrows() < 2 {
        anyhow::bail!("PCA needs at least two samples");
    }

    let n_samples = features.nrows();
    let targets: Array1<usize> = Array1::zeros(n_samples);
    let dataset = Dataset::new(features.clone(), targets);

    let pca = Pca::params(n_components).fit(&dataset)?;
    let coords = pca.predict(features);
    let explained_variance_ratio = pca.explained_variance_ratio();

    Ok(PcaProjection {
        coords,
        explained_variance_ratio,
    })
}

/// Count the members of each cluster
pub fn cluster_sizes(labels: &Array1<usize>, n_clusters: usize) -> Vec<usize> {
    let mut sizes = vec![0; n_clusters];
    for &label in labels.iter() {
        if label < n_clusters {
            sizes[label] += 1;
        }
    }
    sizes
}

/// Compute a basic silhouette coefficient for a subset of points
pub fn silhouette_sample(
    features: &Array2<f64>,
    labels: &Array1<usize>,
    n_clusters: usize,
    sample_size: usize,
) -> f64 {
    let n_samples = features.nrows().min(sample_size);
    if n_samples < 2 {
        return 0.0;
    }

    let mut silhouette_sum = 0.0;

    for i in 0..n_samples {
        let point = features.row(i);
        let cluster_label = labels[i];

        // a(i): mean distance to points in the same cluster
        let mut same_cluster_distances = Vec::new();
        let mut other_cluster_distances: Vec<Vec<f64>> = vec![Vec::new(); n_clusters];

        for j in 0..n_samples {
            if i == j {
                continue;
            }

            let other_point = features.row(j);
            let distance = euclidean_distance(&point, &other_point);
            let other_label = labels[j];

            if other_label == cluster_label {
                same_cluster_distances.push(distance);
            } else if other_label < n_clusters {
                other_cluster_distances[other_label].push(distance);
            }
        }

        let a_i = if same_cluster_distances.is_empty() {
            0.0
        } else {
            same_cluster_distances.iter().sum::<f64>() / same_cluster_distances.len() as f64
        };

        // b(i): smallest mean distance to any other cluster
        let b_i = other_cluster_distances
            .iter()
            .filter(|distances| !distances.is_empty())
            .map(|distances| distances.iter().sum::<f64>() / distances.len() as f64)
            .fold(f64::INFINITY, f64::min);

        let silhouette_i = if b_i.is_infinite() || (a_i == 0.0 && b_i == 0.0) {
            0.0
        } else {
            (b_i - a_i) / a_i.max(b_i)
        };

        silhouette_sum += silhouette_i;
    }

    silhouette_sum / n_samples as f64
}

fn validate_cluster_count(n_samples: usize, n_clusters: usize) -> crate::Result<()> {
    if n_clusters == 0 {
        anyhow::bail!("Number of clusters must be at least 1");
    }
    if n_samples < n_clusters {
        anyhow::bail!(
            "Number of samples ({}) must be at least the number of clusters ({})",
            n_samples,
            n_clusters
        );
    }
    Ok(())
}

/// Compute within-cluster sum of squares (inertia)
fn compute_inertia(features: &Array2<f64>, labels: &Array1<usize>, centroids: &Array2<f64>) -> f64 {
    let mut inertia = 0.0;

    for (i, &cluster) in labels.iter().enumerate() {
        if cluster < centroids.nrows() {
            let point = features.row(i);
            let centroid = centroids.row(cluster);
            let distance_sq = point
                .iter()
                .zip(centroid.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>();
            inertia += distance_sq;
        }
    }

    inertia
}

/// Calculate Euclidean distance between two points
fn euclidean_distance(point1: &ndarray::ArrayView1<f64>, point2: &ndarray::ArrayView1<f64>) -> f64 {
    point1
        .iter()
        .zip(point2.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two well-separated blobs of three points each
    fn blob_features() -> Array2<f64> {
        Array2::from_shape_vec(
            (6, 2),
            vec![
                0.0, 0.0, //
                0.1, -0.1, //
                -0.1, 0.1, //
                10.0, 10.0, //
                10.1, 9.9, //
                9.9, 10.1, //
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_fit_kmeans_separates_blobs() {
        let features = blob_features();
        let model = fit_kmeans(&features, 2, 100, 1e-4, 42).unwrap();

        assert_eq!(model.n_clusters, 2);
        assert_eq!(model.labels.len(), 6);
        assert_eq!(model.centroids.shape(), &[2, 2]);
        assert!(model.inertia >= 0.0 && model.inertia.is_finite());

        // All points of a blob share a label, and the blobs differ
        assert_eq!(model.labels[0], model.labels[1]);
        assert_eq!(model.labels[0], model.labels[2]);
        assert_eq!(model.labels[3], model.labels[4]);
        assert_eq!(model.labels[3], model.labels[5]);
        assert_ne!(model.labels[0], model.labels[3]);

        let sizes = model.cluster_sizes();
        assert_eq!(sizes.iter().sum::<usize>(), 6);
    }

    #[test]
    fn test_fit_kmeans_is_reproducible() {
        let features = blob_features();
        let first = fit_kmeans(&features, 2, 100, 1e-4, 7).unwrap();
        let second = fit_kmeans(&features, 2, 100, 1e-4, 7).unwrap();
        assert_eq!(first.labels, second.labels);
    }

    #[test]
    fn test_fit_kmeans_invalid_parameters() {
        let features = blob_features();
        assert!(fit_kmeans(&features, 0, 100, 1e-4, 42).is_err());
        assert!(fit_kmeans(&features, 7, 100, 1e-4, 42).is_err());
    }

    #[test]
    fn test_inertia_curve_is_decreasing() {
        let features = blob_features();
        let curve = inertia_curve(&features, 3, 100, 1e-4, 42).unwrap();

        assert_eq!(curve.len(), 3);
        assert_eq!(curve[0].0, 1);
        for window in curve.windows(2) {
            assert!(window[1].1 <= window[0].1 + 1e-9);
        }
    }

    #[test]
    fn test_fit_agglomerative_separates_blobs() {
        let features = blob_features();
        let labels = fit_agglomerative(&features, 2).unwrap();

        assert_eq!(labels.len(), 6);
        // First-appearance renumbering pins the first blob to label 0
        assert_eq!(labels[0], 0);
        assert_eq!(labels[1], 0);
        assert_eq!(labels[2], 0);
        assert_eq!(labels[3], 1);
        assert_eq!(labels[4], 1);
        assert_eq!(labels[5], 1);
    }

    #[test]
    fn test_fit_agglomerative_singleton_clusters() {
        let features = blob_features();
        let labels = fit_agglomerative(&features, 6).unwrap();

        let mut seen: Vec<usize> = labels.to_vec();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_fit_agglomerative_invalid_parameters() {
        let features = blob_features();
        assert!(fit_agglomerative(&features, 0).is_err());
        assert!(fit_agglomerative(&features, 7).is_err());
    }

    #[test]
    fn test_project_pca() {
        let features = blob_features();
        let projection = project_pca(&features, 2).unwrap();

        assert_eq!(projection.coords.shape(), &[6, 2]);
        assert_eq!(projection.explained_variance_ratio.len(), 2);

        let ratios = &projection.explained_variance_ratio;
        assert!(ratios.iter().all(|&r| (0.0..=1.0 + 1e-9).contains(&r)));
        assert!(ratios[0] >= ratios[1]);
        assert!(ratios.sum() <= 1.0 + 1e-9);
    }

    #[test]
    fn test_project_pca_invalid_components() {
        let features = blob_features();
        assert!(project_pca(&features, 0).is_err());
        assert!(project_pca(&features, 3).is_err());
    }

    #[test]
    fn test_silhouette_on_separated_blobs() {
        let features = blob_features();
        let labels = fit_agglomerative(&features, 2).unwrap();

        let score = silhouette_sample(&features, &labels, 2, 6);
        assert!(score > 0.8, "separated blobs scored {}", score);
    }

    #[test]
    fn test_cluster_sizes() {
        let labels = Array1::from_vec(vec![0, 1, 1, 0, 2]);
        assert_eq!(cluster_sizes(&labels, 3), vec![2, 2, 1]);
    }
}
