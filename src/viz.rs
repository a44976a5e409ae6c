//! Chart rendering with Plotters and console report printing

use crate::kpi::HourPerformance;
use crate::pipeline::{AnalyticsReport, ScatterPoint};
use plotters::prelude::*;

/// Color palette for different clusters
const CLUSTER_COLORS: [RGBColor; 5] = [RED, BLUE, GREEN, YELLOW, MAGENTA];

/// Palette color for a cluster, black past the end of the palette
pub fn cluster_color(cluster: usize) -> RGBColor {
    CLUSTER_COLORS.get(cluster).copied().unwrap_or(BLACK)
}

/// Padded (min, max) range covering `values`; `(0, 1)` when empty
pub fn axis_bounds<I: IntoIterator<Item = f64>>(values: I) -> (f64, f64) {
    let (min, max) = values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let padding = ((max - min) * 0.05).max(1.0);
    (min - padding, max + padding)
}

/// Scatter of likes against comments, colored by cluster
pub fn create_engagement_scatter(
    points: &[ScatterPoint],
    output_path: &str,
    plot_title: Option<&str>,
) -> anyhow::Result<()> {
    let title = plot_title.unwrap_or("Engagement: Likes vs Comments (Colored by Cluster)");

    let (likes_min, likes_max) = axis_bounds(points.iter().map(|p| p.num_likes as f64));
    let (comments_min, comments_max) = axis_bounds(points.iter().map(|p| p.num_comments as f64));

    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(likes_min..likes_max, comments_min..comments_max)?;

    chart
        .configure_mesh()
        .x_desc("Likes")
        .y_desc("Comments")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    let mut clusters: Vec<usize> = points.iter().map(|p| p.cluster_label).collect();
    clusters.sort_unstable();
    clusters.dedup();

    for cluster in clusters {
        let color = cluster_color(cluster);
        chart
            .draw_series(
                points
                    .iter()
                    .filter(|p| p.cluster_label == cluster)
                    .map(|p| {
                        Circle::new(
                            (p.num_likes as f64, p.num_comments as f64),
                            4,
                            color.filled(),
                        )
                    }),
            )?
            .label(format!("Cluster {cluster}"))
            .legend(move |(x, y)| Circle::new((x + 5, y), 4, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    tracing::info!(path = output_path, "engagement scatter saved");

    Ok(())
}

/// Bar chart of mean reactions per publication hour
pub fn create_hour_chart(hours: &[HourPerformance], output_path: &str) -> anyhow::Result<()> {
    let max_reactions = hours
        .iter()
        .map(|h| h.num_reactions)
        .fold(0.0_f64, f64::max)
        .max(1.0);

    let root = BitMapBackend::new(output_path, (800, 400)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Mean Reactions by Hour", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..24f64, 0f64..(max_reactions * 1.1))?;

    chart
        .configure_mesh()
        .x_desc("Hour of day")
        .y_desc("Mean reactions")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(hours.iter().map(|h| {
        let x = h.hour as f64;
        Rectangle::new([(x + 0.1, 0.0), (x + 0.9, h.num_reactions)], BLUE.filled())
    }))?;

    root.present()?;
    tracing::info!(path = output_path, "hourly chart saved");

    Ok(())
}

/// Print the report to the console
pub fn print_report(report: &AnalyticsReport) {
    println!("\n=== Global KPIs ===");
    println!("Mean likes:    {}", report.kpis.mean_likes);
    println!("Mean comments: {}", report.kpis.mean_comments);
    println!("Mean shares:   {}", report.kpis.mean_shares);

    println!("\n=== Cluster KPIs ===");
    println!("  Cluster | Posts |   Likes | Comments |  Shares");
    println!("  --------|-------|---------|----------|--------");
    for kpi in &report.cluster_kpis {
        println!(
            "  {:7} | {:5} | {:7.1} | {:8.1} | {:7.1}",
            kpi.cluster_label, kpi.posts, kpi.num_likes, kpi.num_comments, kpi.num_shares
        );
    }

    println!("\n=== Reactions by Content Type ===");
    for perf in &report.type_performance {
        println!("  {:<10} {:8.1}", perf.status_type, perf.num_reactions);
    }

    println!("\n=== Top Posts per Cluster ===");
    for post in &report.top_posts {
        println!(
            "  Cluster {}: {} ({}) reactions={} comments={} shares={}",
            post.cluster_label,
            post.status_id,
            post.status_type,
            post.num_reactions,
            post.num_comments,
            post.num_shares
        );
    }

    println!("\n=== Recommendations ===");
    for text in report.recommendation_texts() {
        println!("  - {}", text);
    }
}

/// Render both charts and print the console report
pub fn generate_visualization_report(
    report: &AnalyticsReport,
    scatter_path: &str,
    hour_chart_path: &str,
) -> anyhow::Result<()> {
    create_engagement_scatter(&report.scatter, scatter_path, None)?;
    create_hour_chart(&report.hour_performance, hour_chart_path)?;
    print_report(report);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn points() -> Vec<ScatterPoint> {
        vec![
            ScatterPoint { num_likes: 10, num_comments: 2, cluster_label: 0 },
            ScatterPoint { num_likes: 400, num_comments: 300, cluster_label: 1 },
            ScatterPoint { num_likes: 80, num_comments: 5, cluster_label: 7 },
        ]
    }

    #[test]
    fn test_cluster_color() {
        assert_eq!(cluster_color(0), RED);
        assert_eq!(cluster_color(4), MAGENTA);
        assert_eq!(cluster_color(9), BLACK);
    }

    #[test]
    fn test_axis_bounds() {
        assert_eq!(axis_bounds(Vec::new()), (0.0, 1.0));
        assert_eq!(axis_bounds(vec![5.0, 5.0]), (4.0, 6.0));

        let (lo, hi) = axis_bounds(vec![0.0, 100.0]);
        assert_eq!((lo, hi), (-5.0, 105.0));
    }

    #[test]
    #[ignore = "needs system fonts for chart captions"]
    fn test_create_engagement_scatter() {
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("scatter.png");
        let output_str = output_path.to_str().unwrap();

        create_engagement_scatter(&points(), output_str, None).unwrap();
        assert!(Path::new(output_str).exists());
    }

    #[test]
    #[ignore = "needs system fonts for chart captions"]
    fn test_create_hour_chart() {
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("hours.png");
        let output_str = output_path.to_str().unwrap();

        let hours = vec![
            HourPerformance { hour: 6, num_reactions: 120.5 },
            HourPerformance { hour: 22, num_reactions: 40.0 },
        ];
        create_hour_chart(&hours, output_str).unwrap();
        assert!(Path::new(output_str).exists());
    }
}
