//! Distância semântica: Dijkstra com custo `1/(w + ε)` por aresta.
//!
//! Arestas fortes são "curtas": o caminho semântico prefere vários
//! filamentos grossos a um único filamento fino.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::Serialize;

use super::GraphView;
use crate::core::NodeId;

/// Caminho de menor custo entre dois nós.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SemanticPath {
    /// Nós do caminho, da origem ao destino (inclusive).
    pub nodes: Vec<NodeId>,
    pub cost: f64,
}

/// Entrada da fila de prioridade (min-heap por custo, empate por índice).
#[derive(Copy, Clone, PartialEq)]
struct State {
    cost: f64,
    index: usize,
}

impl Eq for State {}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Custo do caminho semântico, ou `f64::INFINITY` se não há caminho
/// (ou algum dos ids não existe).
pub fn semantic_distance(view: &GraphView, from: NodeId, to: NodeId, epsilon: f64) -> f64 {
    semantic_path(view, from, to, epsilon).map_or(f64::INFINITY, |path| path.cost)
}

/// Caminho de menor custo `Σ 1/(w + ε)` entre `from` e `to`.
pub fn semantic_path(view: &GraphView, from: NodeId, to: NodeId, epsilon: f64) -> Option<SemanticPath> {
    let source = view.index_of(from)?;
    let target = view.index_of(to)?;
    let epsilon = if epsilon.is_finite() && epsilon > 0.0 { epsilon } else { 1e-6 };

    let n = view.len();
    let mut dist = vec![f64::INFINITY; n];
    let mut parent: Vec<Option<usize>> = vec![None; n];
    let mut heap = BinaryHeap::new();

    dist[source] = 0.0;
    heap.push(State { cost: 0.0, index: source });

    while let Some(State { cost, index }) = heap.pop() {
        if index == target {
            let mut nodes = vec![view.index_to_node[target]];
            let mut current = target;
            while let Some(previous) = parent[current] {
                nodes.push(view.index_to_node[previous]);
                current = previous;
            }
            nodes.reverse();
            return Some(SemanticPath { nodes, cost });
        }
        if cost > dist[index] {
            continue;
        }
        for &(next, weight) in &view.adjacency[index] {
            let next_cost = cost + 1.0 / (weight + epsilon);
            if next_cost < dist[next] {
                dist[next] = next_cost;
                parent[next] = Some(index);
                heap.push(State {
                    cost: next_cost,
                    index: next,
                });
            }
        }
    }
    None
}
