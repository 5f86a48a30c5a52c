//! # RenderFrame — Visão para o Renderizador
//!
//! Foto imutável do grafo após um tick: posições, calor, papéis e uma lista
//! **deduplicada** de arestas (cada uma uma única vez, `source < target`).
//! É o que o endpoint `/graph` serializa e o que o frontend desenha.

use serde::Serialize;

use super::graph_store::GraphStore;
use super::link::LinkKind;
use super::node::NodeId;

/// Nó como o renderizador o vê.
#[derive(Clone, Debug, Serialize)]
pub struct RenderNode {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    pub heat: f64,
    pub entry: bool,
    pub anchor: bool,
    pub user_placed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub degree: usize,
}

/// Aresta deduplicada.
#[derive(Clone, Debug, Serialize)]
pub struct RenderEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub weight: f64,
    pub kind: LinkKind,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct RenderFrame {
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<RenderEdge>,
}

impl RenderFrame {
    /// Captura o estado atual do store.
    pub fn capture(store: &GraphStore) -> Self {
        let nodes = store
            .nodes()
            .map(|node| RenderNode {
                id: node.id,
                x: node.pos.x,
                y: node.pos.y,
                heat: node.heat,
                entry: node.entry,
                anchor: node.anchor,
                user_placed: node.user_placed,
                label: node.label.clone(),
                category: node
                    .category
                    .and_then(|c| store.category_name(c))
                    .map(str::to_owned),
                degree: node.degree(),
            })
            .collect();
        let edges = store
            .edges()
            .into_iter()
            .map(|edge| RenderEdge {
                source: edge.source,
                target: edge.target,
                weight: edge.weight,
                kind: edge.kind,
            })
            .collect();
        Self { nodes, edges }
    }
}
