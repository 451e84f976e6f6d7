use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glam::Mat4;
use sierpinski_geometry::{Depth, MeshStats, generate_fractal_mesh};
use sierpinski_render::build_projection;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sierpinski-cli", about = "Inspect Sierpinski pyramid meshes and projections")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Generate the mesh and validate its buffers
    Mesh {
        /// Recursion depth
        #[arg(short, long, default_value_t = Depth::DEFAULT.get())]
        depth: u32,
        /// Print stats as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print buffer sizes for a depth without generating the mesh
    Stats {
        /// Recursion depth
        #[arg(short, long, default_value_t = Depth::DEFAULT.get())]
        depth: u32,
        /// Print stats as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the horizontal-FOV projection matrix
    Projection {
        /// Horizontal field of view in degrees
        #[arg(long, default_value = "45")]
        fov: f32,
        /// Viewport width divided by height
        #[arg(long, default_value = "1.7777778")]
        aspect: f32,
        /// Near plane distance
        #[arg(long, default_value = "0.1")]
        near: f32,
        /// Far plane distance
        #[arg(long, default_value = "5000")]
        far: f32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    run(cli.command)
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Info => {
            println!("sierpinski-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("geometry: {}", sierpinski_geometry::crate_info());
            println!("render: {}", sierpinski_render::crate_info());
            println!("input: {}", sierpinski_input::crate_info());
            println!("default depth: {}, max depth: {}", Depth::DEFAULT, Depth::MAX);
        }
        Commands::Mesh { depth, json } => {
            let (stats, elapsed) = generated_stats(depth)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Mesh at depth {depth} generated in {elapsed:?}");
                print_stats(&stats);
                println!("Index bounds: OK");
            }
        }
        Commands::Stats { depth, json } => {
            let stats = predicted_stats(depth)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Mesh at depth {depth} (not generated)");
                print_stats(&stats);
            }
        }
        Commands::Projection {
            fov,
            aspect,
            near,
            far,
        } => {
            let m = build_projection(fov, aspect, near, far).context("projection rejected")?;
            println!("Projection: fov={fov} aspect={aspect} near={near} far={far}");
            print_matrix(&m);
        }
    }

    Ok(())
}

/// Generate the mesh, check its index bounds and return its stats with the
/// generation time.
fn generated_stats(depth: u32) -> Result<(MeshStats, Duration)> {
    let start = Instant::now();
    let mesh = generate_fractal_mesh(depth).context("fractal mesh generation failed")?;
    let elapsed = start.elapsed();
    tracing::debug!(depth, leaves = mesh.leaf_count(), ?elapsed, "mesh generated");

    if !mesh.indices_in_bounds() {
        anyhow::bail!("index buffer references vertices past the end of the vertex buffer");
    }
    Ok((mesh.stats(), elapsed))
}

fn predicted_stats(depth: u32) -> Result<MeshStats> {
    let depth = Depth::new(depth).context("invalid depth")?;
    Ok(MeshStats::for_depth(depth))
}

fn print_stats(stats: &MeshStats) {
    println!("  leaves:   {}", stats.leaf_count);
    println!(
        "  vertices: {} ({:.1} MiB)",
        stats.vertex_count,
        mib(stats.vertex_bytes)
    );
    println!(
        "  indices:  {} ({:.1} MiB)",
        stats.index_count,
        mib(stats.index_bytes)
    );
}

fn print_matrix(m: &Mat4) {
    for (i, col) in m.to_cols_array_2d().iter().enumerate() {
        println!(
            "  col{i}: [{:>12.6}, {:>12.6}, {:>12.6}, {:>12.6}]",
            col[0], col[1], col[2], col[3]
        );
    }
}

fn mib(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
