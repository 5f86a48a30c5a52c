//! Centralidades: betweenness (Brandes), closeness e grau normalizado.
//!
//! Todas tratam o grafo como **não direcionado e sem pesos** (distância em
//! saltos). Os pesos só entram na distância semântica.

use std::collections::VecDeque;

use rayon::prelude::*;

use super::GraphView;

/// Origens processadas por tarefa do rayon.
const SOURCES_PER_TASK: usize = 32;

/// Betweenness de Brandes, normalizada para `[0, 1]`.
///
/// Para grafos não direcionados cada par é contado duas vezes; junto com o
/// fator `2/((n−1)(n−2))` isso dá a escala `1/((n−1)(n−2))`. Com `n ≤ 2`
/// nenhum nó pode estar entre outros dois: tudo zero.
pub fn betweenness(view: &GraphView) -> Vec<f64> {
    let n = view.len();
    if n <= 2 {
        return vec![0.0; n];
    }

    let sources: Vec<usize> = (0..n).collect();
    let partials: Vec<Vec<f64>> = sources
        .par_chunks(SOURCES_PER_TASK)
        .map(|chunk| {
            let mut acc = vec![0.0; n];
            let mut scratch = BrandesScratch::new(n);
            for &s in chunk {
                scratch.accumulate(view, s, &mut acc);
            }
            acc
        })
        .collect();

    // Soma em ordem fixa: o resultado não depende do agendamento das threads.
    let mut scores = vec![0.0; n];
    for partial in &partials {
        for (score, value) in scores.iter_mut().zip(partial) {
            *score += value;
        }
    }

    let scale = 1.0 / ((n - 1) as f64 * (n - 2) as f64);
    for score in &mut scores {
        *score = (*score * scale).clamp(0.0, 1.0);
    }
    scores
}

/// Buffers de uma busca de Brandes, reaproveitados entre origens.
struct BrandesScratch {
    stack: Vec<usize>,
    predecessors: Vec<Vec<usize>>,
    sigma: Vec<f64>,
    dist: Vec<i64>,
    delta: Vec<f64>,
    queue: VecDeque<usize>,
}

impl BrandesScratch {
    fn new(n: usize) -> Self {
        Self {
            stack: Vec::with_capacity(n),
            predecessors: vec![Vec::new(); n],
            sigma: vec![0.0; n],
            dist: vec![-1; n],
            delta: vec![0.0; n],
            queue: VecDeque::with_capacity(n),
        }
    }

    fn accumulate(&mut self, view: &GraphView, s: usize, acc: &mut [f64]) {
        self.stack.clear();
        self.queue.clear();
        for preds in &mut self.predecessors {
            preds.clear();
        }
        self.sigma.fill(0.0);
        self.dist.fill(-1);
        self.delta.fill(0.0);

        self.sigma[s] = 1.0;
        self.dist[s] = 0;
        self.queue.push_back(s);

        while let Some(v) = self.queue.pop_front() {
            self.stack.push(v);
            for &(w, _) in &view.adjacency[v] {
                if self.dist[w] < 0 {
                    self.dist[w] = self.dist[v] + 1;
                    self.queue.push_back(w);
                }
                if self.dist[w] == self.dist[v] + 1 {
                    self.sigma[w] += self.sigma[v];
                    self.predecessors[w].push(v);
                }
            }
        }

        while let Some(w) = self.stack.pop() {
            for &v in &self.predecessors[w] {
                self.delta[v] += (self.sigma[v] / self.sigma[w]) * (1.0 + self.delta[w]);
            }
            if w != s {
                acc[w] += self.delta[w];
            }
        }
    }
}

/// Closeness por BFS: `alcançáveis / Σ distâncias`, ou `0` se nada é alcançável.
///
/// Em grafos desconexos só conta o componente do nó.
pub fn closeness(view: &GraphView) -> Vec<f64> {
    let n = view.len();
    (0..n)
        .into_par_iter()
        .map(|s| {
            let mut dist = vec![usize::MAX; n];
            let mut queue = VecDeque::new();
            dist[s] = 0;
            queue.push_back(s);
            let mut reachable = 0usize;
            let mut total = 0usize;
            while let Some(v) = queue.pop_front() {
                for &(w, _) in &view.adjacency[v] {
                    if dist[w] == usize::MAX {
                        dist[w] = dist[v] + 1;
                        reachable += 1;
                        total += dist[w];
                        queue.push_back(w);
                    }
                }
            }
            if total == 0 {
                0.0
            } else {
                reachable as f64 / total as f64
            }
        })
        .collect()
}

/// `grau / grau máximo`; tudo zero se não há arestas.
pub fn normalized_degree(view: &GraphView) -> Vec<f64> {
    let max = view.adjacency.iter().map(Vec::len).max().unwrap_or(0);
    if max == 0 {
        return vec![0.0; view.len()];
    }
    view.adjacency
        .iter()
        .map(|neighbors| neighbors.len() as f64 / max as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::tests::{barbell, ring5};
    use crate::core::NodeId;

    fn star(leaves: u64) -> GraphView {
        let nodes: Vec<NodeId> = (0..=leaves).collect();
        let edges: Vec<(NodeId, NodeId, f64)> = (1..=leaves).map(|i| (0, i, 1.0)).collect();
        GraphView::from_edges(&nodes, &edges)
    }

    #[test]
    fn star_centre_has_full_betweenness() {
        let scores = betweenness(&star(6));
        assert!((scores[0] - 1.0).abs() < 1e-12);
        assert!(scores[1..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn path_middle_is_one() {
        let view = GraphView::from_edges(&[1, 2, 3], &[(1, 2, 0.5), (2, 3, 0.5)]);
        assert_eq!(betweenness(&view), vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn tiny_or_edgeless_graphs_are_zero() {
        let pair = GraphView::from_edges(&[1, 2], &[(1, 2, 1.0)]);
        assert_eq!(betweenness(&pair), vec![0.0, 0.0]);
        let loose = GraphView::from_edges(&[1, 2, 3, 4], &[]);
        assert_eq!(betweenness(&loose), vec![0.0; 4]);
        assert_eq!(closeness(&loose), vec![0.0; 4]);
        assert_eq!(normalized_degree(&loose), vec![0.0; 4]);
    }

    /// Betweenness sempre em `[0, 1]`, em qualquer forma de grafo
    #[test]
    fn betweenness_is_bounded() {
        for view in [ring5(), barbell(), star(40)] {
            for score in betweenness(&view) {
                assert!((0.0..=1.0).contains(&score));
            }
        }
    }

    #[test]
    fn large_graph_matches_across_chunks() {
        // Mais origens que SOURCES_PER_TASK: várias somas parciais.
        let nodes: Vec<NodeId> = (0..100).collect();
        let edges: Vec<(NodeId, NodeId, f64)> = (0..100).map(|i| (i, (i + 1) % 100, 1.0)).collect();
        let view = GraphView::from_edges(&nodes, &edges);
        let scores = betweenness(&view);
        for score in &scores {
            assert!((score - scores[0]).abs() < 1e-9);
        }
    }

    #[test]
    fn closeness_counts_only_reachable_nodes() {
        let view = GraphView::from_edges(&[1, 2, 3, 4], &[(1, 2, 1.0), (2, 3, 1.0)]);
        let scores = closeness(&view);
        assert!((scores[0] - 2.0 / 3.0).abs() < 1e-12);
        assert!((scores[1] - 1.0).abs() < 1e-12);
        assert_eq!(scores[3], 0.0);
    }
}
