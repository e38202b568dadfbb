//! VinoScope: wine-quality EDA pipeline CLI
//!
//! This is the main entrypoint that orchestrates CSV loading, outlier
//! flagging, SQLite persistence, clustering and visualization.

use anyhow::Result;
use clap::Parser;
use polars::prelude::{NamedFrom, Series};
use std::time::Instant;
use vinoscope::outliers::OUTLIER_FLAG_COLUMN;
use vinoscope::{
    add_outlier_flag, combine_wine_datasets, detect_outliers_iqr, detect_outliers_iqr_by_type,
    fit_agglomerative, fit_kmeans, inertia_curve, load_wine_csv, prepare_features, project_pca,
    query_to_dataframe, store_dataframe, viz, Args, ClusterMethod,
};

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    if args.verbose {
        println!("VinoScope - Wine Quality EDA Pipeline");
        println!("=====================================\n");
    }

    run_pipeline(&args)
}

/// Run the full pipeline: load, combine, flag, persist, query, cluster, plot
fn run_pipeline(args: &Args) -> Result<()> {
    println!("=== Wine Quality EDA Pipeline ===\n");

    let start_time = Instant::now();
    let separator = args.separator_byte()?;

    // Step 1: Load the red and white datasets
    if args.verbose {
        println!("Step 1: Loading source data");
        println!("  Red wine file: {}", args.red);
        println!("  White wine file: {}", args.white);
    }

    let load_start = Instant::now();
    let red = load_wine_csv(&args.red, separator)?;
    let white = load_wine_csv(&args.white, separator)?;
    let combined = combine_wine_datasets(red, white)?;

    println!("✓ Data loaded: {} samples", combined.height());
    if args.verbose {
        println!("  Loading time: {:.2}s", load_start.elapsed().as_secs_f64());
    }

    // Step 2: Flag outliers with IQR bounds
    if args.verbose {
        println!("\nStep 2: Detecting outliers");
        println!("  IQR threshold: {}", args.threshold);
        println!("  Stratified by wine type: {}", args.by_wine_type);
    }

    let outlier_start = Instant::now();
    let marked = if args.by_wine_type {
        detect_outliers_iqr_by_type(&combined, args.threshold)?
    } else {
        detect_outliers_iqr(&combined, args.threshold)?
    };
    let flagged = add_outlier_flag(&marked)?;

    let outlier_count = flagged
        .column(OUTLIER_FLAG_COLUMN)?
        .bool()?
        .into_no_null_iter()
        .filter(|&flag| flag)
        .count();
    println!(
        "✓ Outlier detection complete: {} of {} rows flagged",
        outlier_count,
        flagged.height()
    );
    if args.verbose {
        println!(
            "  Detection time: {:.2}s",
            outlier_start.elapsed().as_secs_f64()
        );
    }

    // Step 3: Persist the cleaned table
    if args.verbose {
        println!("\nStep 3: Storing the table");
        println!("  Database: {}/{}", args.db_dir, args.db_name);
        println!("  Table: {}", args.table);
    }

    let db_path = store_dataframe(&flagged, &args.db_dir, &args.db_name, &args.table)?;
    println!("✓ Table '{}' stored in {}", args.table, db_path.display());

    // Query the stored table back
    let summary = query_to_dataframe(
        &db_path,
        &format!(
            "SELECT wine_type, COUNT(*) AS samples, SUM(outlier_flag) AS outliers \
             FROM \"{}\" GROUP BY wine_type ORDER BY wine_type",
            args.table
        ),
    )?;
    println!("\n=== Stored table summary ===");
    println!("{}", summary);

    let select = if args.drop_outliers {
        format!(
            "SELECT * FROM \"{}\" WHERE {} = 0",
            args.table, OUTLIER_FLAG_COLUMN
        )
    } else {
        format!("SELECT * FROM \"{}\"", args.table)
    };
    let analysis_df = query_to_dataframe(&db_path, &select)?;
    println!(
        "✓ Clustering input: {} rows{}",
        analysis_df.height(),
        if args.drop_outliers {
            " (outliers excluded)"
        } else {
            ""
        }
    );

    // Standardize the clustering features
    let features = prepare_features(&analysis_df)?;

    // Elbow sweep
    if args.verbose {
        println!("\nStep 4: Elbow sweep up to {} clusters", args.max_clusters);
    }

    let sweep_start = Instant::now();
    let max_clusters = args.max_clusters.min(features.n_samples());
    let curve = inertia_curve(
        &features.features,
        max_clusters,
        args.max_iters,
        args.tolerance,
        args.seed,
    )?;
    if args.verbose {
        for &(k, inertia) in &curve {
            println!("  k = {:>2}: inertia = {:.2}", k, inertia);
        }
        println!("  Sweep time: {:.2}s", sweep_start.elapsed().as_secs_f64());
    }

    // Fit the selected clustering model
    if args.verbose {
        println!("\nStep 5: Clustering");
        println!("  Method: {:?}", args.method);
        println!("  Number of clusters: {}", args.clusters);
    }

    let model_start = Instant::now();
    let labels = match args.method {
        ClusterMethod::Kmeans => {
            let model = fit_kmeans(
                &features.features,
                args.clusters,
                args.max_iters,
                args.tolerance,
                args.seed,
            )?;
            if args.verbose {
                println!("  Inertia: {:.2}", model.inertia);
            }
            model.labels
        }
        ClusterMethod::Agglomerative => fit_agglomerative(&features.features, args.clusters)?,
    };
    println!("✓ Model fitted successfully");
    if args.verbose {
        println!("  Fitting time: {:.2}s", model_start.elapsed().as_secs_f64());
    }

    // PCA projection and visualization report
    let projection = project_pca(&features.features, 2)?;

    let mut clustered = analysis_df;
    let cluster_column: Vec<i64> = labels.iter().map(|&label| label as i64).collect();
    clustered.with_column(Series::new("cluster", cluster_column))?;

    viz::generate_visualization_report(
        &clustered,
        &features,
        &projection,
        &labels,
        args.clusters,
        &curve,
        &args.output,
    )?;

    println!("\n=== Pipeline Complete ===");
    println!(
        "Total processing time: {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    println!("Plots saved to: {}", args.output);

    Ok(())
}
