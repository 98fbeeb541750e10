//! JSON graph input and layout output for the `force-layout` binary.

use anyhow::{Context, Result};
use force_core::{
    Simulation, SimulationConfig, Vector,
    forces::{Center, Collide, ManyBody},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// A graph as read from disk.
#[derive(Debug, Deserialize)]
pub struct Graph {
    pub nodes: Vec<String>,
    #[serde(default)]
    pub links: Vec<LinkSpec>,
}

#[derive(Debug, Deserialize)]
pub struct LinkSpec {
    pub source: String,
    pub target: String,
}

/// One laid-out node, as written to the output.
#[derive(Debug, Serialize, PartialEq)]
pub struct NodeLayout {
    pub id: String,
    pub position: Vec<f64>,
    pub velocity: Vec<f64>,
}

/// Force parameters taken from the command line.
#[derive(Debug, Clone, Copy)]
pub struct LayoutParams {
    pub steps: usize,
    pub charge: f64,
    pub link_distance: f64,
    pub collide_radius: Option<f64>,
}

impl Graph {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read graph {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse graph {}", path.display()))
    }
}

/// Reads a [`SimulationConfig`] from a JSON file; missing keys keep their
/// defaults.
pub fn load_config(path: &Path) -> Result<SimulationConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse config {}", path.display()))
}

/// Lays out `graph` in the space of `V`.
///
/// Attaches many-body, link and center forces (plus collide when a radius
/// is given), runs `params.steps` steps and returns the final snapshot.
///
/// ### Parameters
/// - `graph` - Nodes and links by string ID.
/// - `params` - Force parameters and step count.
/// - `config` - Cooling schedule and seed.
pub fn layout<V: Vector>(
    graph: &Graph,
    params: &LayoutParams,
    config: SimulationConfig,
) -> Result<Vec<NodeLayout>> {
    let mut sim: Simulation<String, V> = Simulation::new(graph.nodes.iter().cloned(), config)?;

    sim.attach_force(ManyBody::new().with_strength(params.charge))?;
    if !graph.links.is_empty() {
        let links = sim
            .link_force(
                graph
                    .links
                    .iter()
                    .map(|l| (l.source.clone(), l.target.clone())),
            )?
            .with_distance(params.link_distance);
        sim.attach_force(links)?;
    }
    if let Some(radius) = params.collide_radius {
        sim.attach_force(Collide::new().with_radius(radius))?;
    }
    sim.attach_force(Center::default())?;

    sim.tick(params.steps);
    info!(
        nodes = sim.len(),
        steps = params.steps,
        alpha = sim.alpha(),
        converged = sim.is_converged(),
        "layout finished"
    );

    Ok(sim
        .snapshot()
        .into_iter()
        .map(|node| NodeLayout {
            id: node.id,
            position: node.position.to_vec(),
            velocity: node.velocity.to_vec(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{DVec2, DVec3};

    fn params() -> LayoutParams {
        LayoutParams {
            steps: 50,
            charge: -30.0,
            link_distance: 30.0,
            collide_radius: Some(3.0),
        }
    }

    fn triangle() -> Graph {
        serde_json::from_str(
            r#"{
                "nodes": ["a", "b", "c"],
                "links": [
                    { "source": "a", "target": "b" },
                    { "source": "b", "target": "c" }
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn lays_out_in_two_and_three_dimensions() {
        let graph = triangle();
        let flat = layout::<DVec2>(&graph, &params(), SimulationConfig::default()).unwrap();
        let deep = layout::<DVec3>(&graph, &params(), SimulationConfig::default()).unwrap();

        assert_eq!(flat.len(), 3);
        assert_eq!(flat[0].id, "a");
        assert_eq!(flat[0].position.len(), 2);
        assert_eq!(deep[2].velocity.len(), 3);
        assert!(flat.iter().flat_map(|n| &n.position).all(|x| x.is_finite()));
    }

    #[test]
    fn links_are_optional() {
        let graph: Graph = serde_json::from_str(r#"{ "nodes": ["x", "y"] }"#).unwrap();
        assert!(graph.links.is_empty());
        assert!(layout::<DVec2>(&graph, &params(), SimulationConfig::default()).is_ok());
    }

    #[test]
    fn unknown_link_endpoint_fails() {
        let graph: Graph = serde_json::from_str(
            r#"{ "nodes": ["x"], "links": [{ "source": "x", "target": "nope" }] }"#,
        )
        .unwrap();
        let err = layout::<DVec2>(&graph, &params(), SimulationConfig::default()).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn same_input_same_output() {
        let graph = triangle();
        let a = layout::<DVec2>(&graph, &params(), SimulationConfig::default()).unwrap();
        let b = layout::<DVec2>(&graph, &params(), SimulationConfig::default()).unwrap();
        assert_eq!(a, b);
    }
}
