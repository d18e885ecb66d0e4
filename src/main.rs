// Example runner for the `sunspot_merge` library.
//
// Usage: sunspot_merge [--config <config.json>] [frame.json ...]
//
// Each frame file holds a JSON array of contours, each contour an array of
// `{ "x": .., "y": .. }` points. With no frame files a synthetic frame of two
// touching spots is processed. Reports are printed as JSON, one per frame.

use anyhow::{Context, bail};
use std::env;
use std::fs;
use sunspot_merge::parallel_pipeline::ParallelPipeline;
use sunspot_merge::pipeline::{PipelineConfig, Point};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    // --- 1. Argument Parsing ---
    let mut config = PipelineConfig::default();
    let mut frame_paths = Vec::new();
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            let Some(path) = args.next() else {
                bail!("--config needs a path");
            };
            let json = fs::read_to_string(&path).with_context(|| format!("reading config {path}"))?;
            config = PipelineConfig::from_json_str(&json).with_context(|| format!("loading config {path}"))?;
        } else {
            frame_paths.push(arg);
        }
    }

    // --- 2. Frame Loading ---
    let frames = if frame_paths.is_empty() {
        vec![synthetic_frame()]
    } else {
        frame_paths
            .iter()
            .map(|path| load_frame(path))
            .collect::<anyhow::Result<Vec<_>>>()?
    };

    // --- 3. Processing ---
    let pipeline = ParallelPipeline::new(config);
    let reports = pipeline.process_batch(frames).await?;

    for report in &reports {
        println!("{}", serde_json::to_string_pretty(report)?);
    }
    Ok(())
}

fn load_frame(path: &str) -> anyhow::Result<Vec<Vec<Point>>> {
    let json = fs::read_to_string(path).with_context(|| format!("reading frame {path}"))?;
    serde_json::from_str(&json).with_context(|| format!("parsing frame {path}"))
}

/// Two round spots 10 px apart, the textbook case of a split sunspot.
fn synthetic_frame() -> Vec<Vec<Point>> {
    [(100.0, 100.0), (150.0, 100.0)]
        .into_iter()
        .map(|(cx, cy)| {
            let radius: f64 = 20.0;
            let steps = 320;
            let mut points: Vec<Point> = (0..steps)
                .map(|i| {
                    let angle = std::f64::consts::TAU * i as f64 / steps as f64;
                    Point::from_f64(cx + radius * angle.cos(), cy + radius * angle.sin())
                })
                .collect();
            points.dedup();
            points
        })
        .collect()
}
