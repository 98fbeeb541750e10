//! Entry point of the `force-layout` binary.
//!
//! Reads a JSON graph, runs a force-directed layout for a fixed number of
//! steps and writes the final node positions as JSON. The layout itself
//! is delegated to [`graph::layout`].

mod graph;

use anyhow::{Context, Result, bail};
use clap::Parser;
use glam::{DVec2, DVec3};
use graph::{Graph, LayoutParams};
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Force-directed layout of a JSON node-link graph.
#[derive(Parser, Debug)]
#[command(name = "force-layout")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Input graph: { "nodes": [..], "links": [{ "source", "target" }] }
    input: PathBuf,

    /// Number of simulation steps
    #[arg(short, long, default_value_t = 300)]
    steps: usize,

    /// Layout dimensions (2 or 3)
    #[arg(short, long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(2..=3))]
    dimensions: u8,

    /// Many-body strength; negative values repel
    #[arg(long, default_value_t = -30.0, allow_negative_numbers = true)]
    charge: f64,

    /// Rest length of every link
    #[arg(long, default_value_t = 30.0)]
    link_distance: f64,

    /// Node radius for collision separation; no collide force if omitted
    #[arg(long)]
    collide_radius: Option<f64>,

    /// Jitter seed, overriding the config file
    #[arg(long)]
    seed: Option<u32>,

    /// Simulation config JSON (alpha schedule, velocity decay, seed)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file; stdout if omitted
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    debug!(?cli, "parsed arguments");

    let graph = Graph::load(&cli.input)?;
    let mut config = match &cli.config {
        Some(path) => graph::load_config(path)?,
        None => Default::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    let params = LayoutParams {
        steps: cli.steps,
        charge: cli.charge,
        link_distance: cli.link_distance,
        collide_radius: cli.collide_radius,
    };

    let nodes = match cli.dimensions {
        2 => graph::layout::<DVec2>(&graph, &params, config)?,
        3 => graph::layout::<DVec3>(&graph, &params, config)?,
        d => bail!("unsupported dimension count {d}"),
    };

    let json = serde_json::to_string_pretty(&nodes)?;
    match &cli.output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_with_defaults() {
        let cli = Cli::try_parse_from(["force-layout", "graph.json"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("graph.json"));
        assert_eq!(cli.steps, 300);
        assert_eq!(cli.dimensions, 2);
        assert_eq!(cli.charge, -30.0);
        assert!(cli.collide_radius.is_none());
        assert!(cli.output.is_none());
    }

    #[test]
    fn cli_parses_overrides() {
        let cli = Cli::try_parse_from([
            "force-layout",
            "g.json",
            "--steps",
            "10",
            "--dimensions",
            "3",
            "--charge",
            "-80",
            "--collide-radius",
            "4.5",
            "--seed",
            "9",
            "--output",
            "out.json",
        ])
        .unwrap();
        assert_eq!(cli.steps, 10);
        assert_eq!(cli.dimensions, 3);
        assert_eq!(cli.charge, -80.0);
        assert_eq!(cli.collide_radius, Some(4.5));
        assert_eq!(cli.seed, Some(9));
        assert_eq!(cli.output, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn cli_rejects_four_dimensions() {
        assert!(Cli::try_parse_from(["force-layout", "g.json", "--dimensions", "4"]).is_err());
    }
}
