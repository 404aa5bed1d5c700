mod hazard_scan;

use anyhow::{Context, Result, bail};
use clap::Parser;
use hazard_scan::{HazardScan, scan_image};
use hazard_survey::parallel_pipeline::ParallelPlanner;
use hazard_survey::pipeline::{PlannerConfig, SurveyPipeline, SurveyReport};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Plans hazard inspection routes for a batch of survey images.
#[derive(Parser, Debug)]
#[command(name = "survey_tester", version)]
struct Args {
    /// PNG images, or directories containing them.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Planner configuration in TOML.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Cells per side of the grid; overrides the configuration.
    #[arg(long)]
    grid: Option<u32>,

    /// Number of agents for the full-coverage baseline.
    #[arg(long, default_value_t = 1)]
    agents: u32,

    /// Directory to write `label: (x, y)` hazard center files into.
    #[arg(long)]
    coords_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // --- 1. Argument Parsing & Setup ---
    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            PlannerConfig::from_toml_str(&source)?
        }
        None => PlannerConfig::default(),
    };
    if let Some(grid) = args.grid {
        config.grid_dimension = grid;
    }
    config.validate()?;

    // --- 2. Image Discovery ---
    let images = collect_images(&args.inputs)?;
    if images.is_empty() {
        bail!("no .png images found in the given inputs");
    }
    tracing::info!(images = images.len(), grid = config.grid_dimension, "starting survey batch");

    // --- 3. Hazard Detection ---
    let scans = images
        .iter()
        .map(|path| scan_image(path, config.grid_dimension))
        .collect::<Result<Vec<HazardScan>>>()?;

    if let Some(dir) = &args.coords_dir {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
        for (path, scan) in images.iter().zip(&scans) {
            write_hazard_centers(dir, path, scan)?;
        }
    }

    // --- 4. Route Planning ---
    // Images of different sizes have different cell geometry, so each size gets its own planner.
    let mut reports: Vec<Option<SurveyReport>> = vec![None; scans.len()];
    for indices in group_by_image_size(&scans).values() {
        let geometry = scans[indices[0]].geometry;
        let planner = ParallelPlanner::new(PlannerConfig {
            cell_width: geometry.cell_width(),
            cell_height: geometry.cell_height(),
            ..config.clone()
        })?;
        let grids = indices.iter().map(|&i| scans[i].flagged.clone()).collect();
        for (&i, result) in indices.iter().zip(planner.plan_batch(grids).await) {
            let report = result.with_context(|| format!("planning failed for {}", images[i].display()))?;
            reports[i] = Some(report);
        }
        planner.shutdown().await;
    }

    // --- 5. Reporting ---
    for ((path, scan), report) in images.iter().zip(&scans).zip(&reports) {
        let (min_threshold, max_threshold) = scan.thresholds;
        println!(
            "{}: {} hazard cells (std-dev band {min_threshold}..={max_threshold})",
            path.display(),
            scan.flagged.len()
        );
        match report {
            Some(SurveyReport::Hazards(plan)) => {
                for component in &plan.components {
                    if let Some(((top, left), (bottom, right))) =
                        component.bounding_box(scan.geometry.dimension())?
                    {
                        println!(
                            "  Hazard {}: {} cells, rows {top}-{bottom}, cols {left}-{right}",
                            component.id,
                            component.size_in_cells()
                        );
                    }
                }
                println!("  Agents: {}", plan.group_count());
                for route in &plan.routes {
                    println!(
                        "  Group {} Path: {:?} ({:.1} px)",
                        route.group_id, route.stops, route.length
                    );
                    let waypoints: Vec<String> = plan
                        .waypoints(route)
                        .iter()
                        .map(|p| format!("({:.1}, {:.1})", p.x, p.y))
                        .collect();
                    println!("    Waypoints: {}", waypoints.join(" -> "));
                }
            }
            Some(SurveyReport::NoHazards) | None => println!("  No hazards to inspect"),
        }
    }

    // --- 6. Coverage Baseline ---
    let baseline = SurveyPipeline::new(config)?;
    let dimension = baseline.geometry().dimension();
    println!("Coverage baseline on a {dimension}x{dimension} grid:");
    for path in baseline.plan_coverage(args.agents)? {
        println!("Agent {} coverage:", path.band.agent);
        println!("  Columns: {}..{}", path.band.start_col, path.band.end_col);
        if let (Some(start), Some(end)) = (path.start(), path.end()) {
            println!("  Start point: {start:?}");
            println!("  End point: {end:?}");
        }
        println!("  Cells covered: {}", path.steps.len());
    }

    Ok(())
}

fn collect_images(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(input)
                .with_context(|| format!("failed to list {}", input.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| is_png(path))
                .collect();
            found.sort();
            images.extend(found);
        } else {
            images.push(input.clone());
        }
    }
    Ok(images)
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
}

/// Scan indices keyed by image `(width, height)`.
fn group_by_image_size(scans: &[HazardScan]) -> BTreeMap<(u32, u32), Vec<usize>> {
    let mut groups: BTreeMap<(u32, u32), Vec<usize>> = BTreeMap::new();
    for (idx, scan) in scans.iter().enumerate() {
        groups
            .entry((scan.image_width, scan.image_height))
            .or_default()
            .push(idx);
    }
    groups
}

/// One `label: (x, y)` line per flagged cell, ascending by label.
fn hazard_centers_body(scan: &HazardScan) -> String {
    scan.centers
        .iter()
        .map(|(label, center)| format!("{label}: ({:.1}, {:.1})\n", center.x, center.y))
        .collect()
}

fn write_hazard_centers(dir: &Path, image: &Path, scan: &HazardScan) -> Result<()> {
    let stem = image
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    let target = dir.join(format!("{stem}.txt"));
    fs::write(&target, hazard_centers_body(scan)).with_context(|| format!("failed to write {}", target.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hazard_scan::scan_luma;
    use image::{ImageBuffer, Luma};

    /// A 40x40 dark image with a checkerboard in cell 7 of a 4x4 grid.
    fn textured_scan() -> HazardScan {
        let gray = ImageBuffer::from_fn(40, 40, |x, y| {
            let in_cell = (20..30).contains(&x) && (10..20).contains(&y);
            if in_cell && (x + y) % 2 == 0 { Luma([120u16 * 257]) } else { Luma([0u16]) }
        });
        scan_luma(&gray, 4).unwrap()
    }

    fn flat_scan(width: u32, height: u32) -> HazardScan {
        scan_luma(&ImageBuffer::from_pixel(width, height, Luma([0u16])), 4).unwrap()
    }

    #[test]
    fn directories_yield_only_pngs_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "notes.txt", "A.PNG", "a.png", "survey"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let loose = PathBuf::from("loose/anything.jpg");

        let images = collect_images(&[dir.path().to_path_buf(), loose.clone()]).unwrap();
        assert_eq!(
            images,
            vec![
                dir.path().join("A.PNG"),
                dir.path().join("a.png"),
                dir.path().join("b.png"),
                loose,
            ]
        );
    }

    #[test]
    fn png_detection_needs_a_png_extension() {
        assert!(is_png(Path::new("scan.PnG")));
        assert!(is_png(Path::new("dir/scan.png")));
        assert!(!is_png(Path::new("survey")));
        assert!(!is_png(Path::new("notes.txt")));
        assert!(!is_png(Path::new("png")));
    }

    #[test]
    fn hazard_centers_are_written_per_image() {
        let scan = textured_scan();
        assert_eq!(hazard_centers_body(&scan), "7: (25.0, 15.0)\n");

        let dir = tempfile::tempdir().unwrap();
        write_hazard_centers(dir.path(), Path::new("shots/site_3.png"), &scan).unwrap();
        let written = fs::read_to_string(dir.path().join("site_3.txt")).unwrap();
        assert_eq!(written, "7: (25.0, 15.0)\n");
    }

    #[test]
    fn clean_image_writes_an_empty_centers_file() {
        assert_eq!(hazard_centers_body(&flat_scan(40, 40)), "");
    }

    #[test]
    fn scans_are_grouped_by_image_size() {
        let scans = vec![flat_scan(40, 40), flat_scan(80, 40), textured_scan()];
        let groups = group_by_image_size(&scans);

        let keys: Vec<_> = groups.keys().copied().collect();
        assert_eq!(keys, vec![(40, 40), (80, 40)]);
        assert_eq!(groups[&(40, 40)], vec![0, 2]);
        assert_eq!(groups[&(80, 40)], vec![1]);
        // Each group has its own cell geometry.
        assert_eq!(scans[groups[&(40, 40)][0]].geometry.cell_width(), 10.0);
        assert_eq!(scans[groups[&(80, 40)][0]].geometry.cell_width(), 20.0);
    }
}
