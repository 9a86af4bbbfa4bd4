//! Slices an extruded notched block and prints its outlines and shells.
//!
//! ```text
//! cargo run --example slice_prism
//! RUST_LOG=skein=trace cargo run --example slice_prism
//! ```

use skein::geometry::Mesh;
use skein::math::Point2;
use skein::{SkeinError, SliceParams, Slicer};

fn notched_block() -> Vec<Point2> {
    [
        (0.0, 0.0),
        (30.0, 0.0),
        (30.0, 20.0),
        (20.0, 20.0),
        (20.0, 4.0),
        (10.0, 4.0),
        (10.0, 20.0),
        (0.0, 20.0),
    ]
    .into_iter()
    .map(|(x, y)| Point2::new(x, y))
    .collect()
}

fn print_paths(label: &str, paths: &[skein::topology::Path]) {
    for (i, path) in paths.iter().enumerate() {
        let points: Vec<String> = path
            .points()
            .iter()
            .map(|p| format!("({:.3}, {:.3})", p.x, p.y))
            .collect();
        println!("  {label} {i}: {}", points.join(" "));
    }
}

fn main() -> Result<(), SkeinError> {
    // Default: WARN for everything, INFO for skein.
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        .add_directive("skein=info".parse().unwrap_or_default());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let mesh = Mesh::prism(&notched_block(), 0.0, 1.2);
    let params = SliceParams {
        shell_count: 2,
        ..SliceParams::with_width_over_thickness(0.4, 5.0)
    };
    let slicer = Slicer::new(&mesh, params)?;

    for layer in slicer.slice_all() {
        let mut layer = layer?;
        println!("layer {} at z = {:.3}", layer.index(), layer.z());
        print_paths("outline", layer.outline());
        println!(
            "  {} motorcycles",
            layer.motorcycle_graph().motorcycles().len()
        );
        let offsets = layer.shell_offsets().to_vec();
        for (n, paths) in layer.shells()?.into_iter().enumerate() {
            print_paths(&format!("shell {n} @ {:.2}", offsets[n]), paths);
        }
    }
    Ok(())
}
