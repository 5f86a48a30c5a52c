//! Classificação (hub / ponte) e score composto.

use serde::{Deserialize, Serialize};

use super::GraphView;

/// Pesos do score composto. Padrão: `0.40 / 0.30 / 0.20 / 0.10`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub relevance: f64,
    pub betweenness: f64,
    pub closeness: f64,
    pub degree: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            relevance: 0.40,
            betweenness: 0.30,
            closeness: 0.20,
            degree: 0.10,
        }
    }
}

/// Hub: grau normalizado ≥ limiar. Nós sem arestas nunca são hubs.
pub fn is_hub(normalized_degree: f64, threshold: f64) -> bool {
    normalized_degree > 0.0 && normalized_degree >= threshold
}

/// Ponte: betweenness ≥ limiar e vizinhos em pelo menos duas comunidades.
pub fn is_bridge(betweenness: f64, neighbor_communities: usize, threshold: f64) -> bool {
    betweenness > 0.0 && betweenness >= threshold && neighbor_communities >= 2
}

/// Quantas comunidades distintas os vizinhos imediatos de `index` ocupam.
pub fn neighbor_communities(view: &GraphView, index: usize, communities: &[usize]) -> usize {
    let mut seen: Vec<usize> = view.adjacency[index]
        .iter()
        .filter_map(|&(j, _)| communities.get(j).copied())
        .collect();
    seen.sort_unstable();
    seen.dedup();
    seen.len()
}

pub fn composite_score(
    relevance: f64,
    betweenness: f64,
    closeness: f64,
    normalized_degree: f64,
    weights: &ScoreWeights,
) -> f64 {
    weights.relevance * relevance
        + weights.betweenness * betweenness
        + weights.closeness * closeness
        + weights.degree * normalized_degree
}
