//! # Módulo Analytics — Lendo a Estrutura do Rizoma
//!
//! Análises clássicas de grafos sobre uma **foto** imutável do store
//! ([`GraphView`]). Nada aqui muta o grafo: a simulação pode continuar
//! rodando enquanto a análise trabalha na cópia.
//!
//! ## Métricas
//!
//! | Métrica | Algoritmo | Faixa |
//! |---------|-----------|-------|
//! | Betweenness | Brandes (BFS), normalizada por `2/((n−1)(n−2))` | `[0, 1]` |
//! | Closeness | BFS: `alcançáveis / Σ distâncias` | `[0, 1]` |
//! | Grau normalizado | `grau / grau máximo` | `[0, 1]` |
//! | Comunidades | propagação de rótulos ponderada (≤ 10 passes) | ids `0..k` |
//! | Distância semântica | Dijkstra com custo `1/(w + ε)` | `[0, ∞]` |
//!
//! ## Classificação e Score
//!
//! - **Hub**: grau normalizado ≥ `hub_threshold` (padrão 0.6)
//! - **Ponte**: betweenness ≥ `bridge_threshold` (padrão 0.3) **e** vizinhos
//!   em ≥ 2 comunidades distintas
//! - **Score composto**: `0.40·relevância + 0.30·betweenness + 0.20·closeness + 0.10·grau`
//!
//! ## Paralelismo
//!
//! Betweenness e closeness fazem uma busca por nó de origem; as buscas são
//! independentes e rodam em paralelo com `rayon`. As somas parciais são
//! combinadas sempre na mesma ordem, então o resultado não depende do
//! número de threads.

pub mod centrality;
pub mod community;
pub mod pathfinding;
pub mod scoring;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::{GraphStore, NodeId};

pub use centrality::{betweenness, closeness, normalized_degree};
pub use community::label_propagation;
pub use pathfinding::{semantic_distance, semantic_path, SemanticPath};
pub use scoring::{composite_score, is_bridge, is_hub, neighbor_communities, ScoreWeights};

/// Foto do grafo em índices densos `0..n`, pronta para os algoritmos.
#[derive(Clone, Debug, Default)]
pub struct GraphView {
    pub index_to_node: Vec<NodeId>,
    pub node_to_index: HashMap<NodeId, usize>,
    /// Vizinhos `(índice, peso)` de cada nó, espelhados.
    pub adjacency: Vec<Vec<(usize, f64)>>,
    pub relevance: Vec<f64>,
}

impl GraphView {
    /// Copia nós, arestas e relevâncias do store, na ordem de iteração dele.
    pub fn from_store(store: &GraphStore) -> Self {
        let index_to_node = store.ids();
        let node_to_index: HashMap<NodeId, usize> = index_to_node
            .iter()
            .enumerate()
            .map(|(index, &id)| (id, index))
            .collect();
        let mut adjacency = Vec::with_capacity(index_to_node.len());
        let mut relevance = Vec::with_capacity(index_to_node.len());
        for node in store.nodes() {
            adjacency.push(
                node.links()
                    .filter_map(|(other, link)| node_to_index.get(&other).map(|&j| (j, link.weight)))
                    .collect(),
            );
            relevance.push(node.relevance);
        }
        Self {
            index_to_node,
            node_to_index,
            adjacency,
            relevance,
        }
    }

    /// Monta uma visão a partir de listas de nós e arestas `(a, b, peso)`.
    ///
    /// Laços, ids desconhecidos, pesos não positivos e arestas repetidas são
    /// ignorados. Relevância padrão `0.5`.
    pub fn from_edges(nodes: &[NodeId], edges: &[(NodeId, NodeId, f64)]) -> Self {
        let mut view = Self::default();
        for &id in nodes {
            if view.node_to_index.contains_key(&id) {
                continue;
            }
            view.node_to_index.insert(id, view.index_to_node.len());
            view.index_to_node.push(id);
            view.adjacency.push(Vec::new());
            view.relevance.push(0.5);
        }
        for &(a, b, weight) in edges {
            let (Some(&i), Some(&j)) = (view.node_to_index.get(&a), view.node_to_index.get(&b)) else {
                continue;
            };
            if i == j || !(weight > 0.0) || view.adjacency[i].iter().any(|&(k, _)| k == j) {
                continue;
            }
            let weight = weight.min(1.0);
            view.adjacency[i].push((j, weight));
            view.adjacency[j].push((i, weight));
        }
        view
    }

    pub fn len(&self) -> usize {
        self.index_to_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_to_node.is_empty()
    }

    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.node_to_index.get(&id).copied()
    }

    pub fn degree(&self, index: usize) -> usize {
        self.adjacency.get(index).map_or(0, Vec::len)
    }
}

/// Parâmetros das análises.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Grau normalizado mínimo para ser hub.
    pub hub_threshold: f64,
    /// Betweenness mínima para ser ponte.
    pub bridge_threshold: f64,
    /// Pesos do score composto.
    pub weights: ScoreWeights,
    /// `ε` do custo `1/(w + ε)` na distância semântica.
    pub epsilon: f64,
    /// Máximo de passes da propagação de rótulos.
    pub max_passes: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            hub_threshold: 0.6,
            bridge_threshold: 0.3,
            weights: ScoreWeights::default(),
            epsilon: 1e-6,
            max_passes: 10,
        }
    }
}

/// Quais nós reportar.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    #[default]
    All,
    Nodes(Vec<NodeId>),
}

/// Todas as métricas de um nó.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoreBundle {
    pub id: NodeId,
    pub degree: usize,
    pub normalized_degree: f64,
    pub betweenness: f64,
    pub closeness: f64,
    pub community: usize,
    pub relevance: f64,
    pub is_hub: bool,
    pub is_bridge: bool,
    pub composite: f64,
}

/// Calcula as métricas do grafo inteiro e reporta os nós selecionados.
///
/// Para [`Selection::Nodes`], a ordem pedida é mantida e ids desconhecidos
/// são ignorados.
pub fn analyze(view: &GraphView, selection: &Selection, config: &AnalyticsConfig) -> Vec<ScoreBundle> {
    let between = betweenness(view);
    let close = closeness(view);
    let degree = normalized_degree(view);
    let communities = label_propagation(view, config.max_passes);

    let bundle = |index: usize| {
        let spanned = neighbor_communities(view, index, &communities);
        ScoreBundle {
            id: view.index_to_node[index],
            degree: view.degree(index),
            normalized_degree: degree[index],
            betweenness: between[index],
            closeness: close[index],
            community: communities[index],
            relevance: view.relevance[index],
            is_hub: is_hub(degree[index], config.hub_threshold),
            is_bridge: is_bridge(between[index], spanned, config.bridge_threshold),
            composite: composite_score(
                view.relevance[index],
                between[index],
                close[index],
                degree[index],
                &config.weights,
            ),
        }
    };

    let bundles: Vec<ScoreBundle> = match selection {
        Selection::All => (0..view.len()).map(bundle).collect(),
        Selection::Nodes(ids) => ids.iter().filter_map(|&id| view.index_of(id)).map(bundle).collect(),
    };
    tracing::debug!(nodes = view.len(), reported = bundles.len(), "Análise concluída");
    bundles
}

/// Ordena por score composto decrescente (empates: id crescente).
pub fn rank(mut bundles: Vec<ScoreBundle>) -> Vec<ScoreBundle> {
    bundles.sort_by(|a, b| b.composite.total_cmp(&a.composite).then(a.id.cmp(&b.id)));
    bundles
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Anel 0-1-2-3-4-0 com peso uniforme 0.5.
    pub(crate) fn ring5() -> GraphView {
        let nodes: Vec<NodeId> = (0..5).collect();
        let edges: Vec<(NodeId, NodeId, f64)> = (0..5).map(|i| (i, (i + 1) % 5, 0.5)).collect();
        GraphView::from_edges(&nodes, &edges)
    }

    /// Dois triângulos {0,1,2} e {4,5,6} ligados pela ponte 2–3–4.
    pub(crate) fn barbell() -> GraphView {
        let nodes: Vec<NodeId> = (0..7).collect();
        let edges = [
            (0, 1, 1.0),
            (1, 2, 1.0),
            (0, 2, 1.0),
            (2, 3, 0.5),
            (3, 4, 0.5),
            (4, 5, 1.0),
            (5, 6, 1.0),
            (4, 6, 1.0),
        ];
        GraphView::from_edges(&nodes, &edges)
    }

    #[test]
    fn from_edges_ignores_invalid_and_duplicates() {
        let view = GraphView::from_edges(&[1, 2, 3], &[(1, 2, 0.5), (2, 1, 0.9), (1, 1, 0.5), (1, 9, 0.5), (2, 3, 0.0)]);
        assert_eq!(view.degree(0), 1);
        assert_eq!(view.degree(1), 1);
        assert_eq!(view.degree(2), 0);
    }

    #[test]
    fn view_mirrors_the_store() {
        use crate::core::{NodeSpec, Vec2};
        let mut store = GraphStore::new(8);
        let a = store.insert_node(Vec2::ZERO, NodeSpec::anonymous().with_relevance(0.9)).unwrap();
        let b = store.insert_node(Vec2::ZERO, NodeSpec::anonymous()).unwrap();
        store.connect(a, b, 0.4);
        let view = GraphView::from_store(&store);
        assert_eq!(view.adjacency[0], vec![(1, 0.4)]);
        assert_eq!(view.adjacency[1], vec![(0, 0.4)]);
        assert_eq!(view.relevance[0], 0.9);
    }

    #[test]
    fn selection_filters_and_keeps_order() {
        let view = ring5();
        let bundles = analyze(&view, &Selection::Nodes(vec![3, 99, 1]), &AnalyticsConfig::default());
        let ids: Vec<NodeId> = bundles.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    /// Anel de 5: closeness e betweenness iguais (e não nulas) em todos os nós
    #[test]
    fn ring_is_symmetric() {
        let bundles = analyze(&ring5(), &Selection::All, &AnalyticsConfig::default());
        for b in &bundles {
            assert!((b.closeness - 2.0 / 3.0).abs() < 1e-12);
            assert!((b.betweenness - 1.0 / 6.0).abs() < 1e-12);
            assert!(!b.is_bridge);
        }
    }

    #[test]
    fn barbell_centre_is_the_bridge() {
        let bundles = analyze(&barbell(), &Selection::All, &AnalyticsConfig::default());
        let centre = &bundles[3];
        assert!(centre.is_bridge);
        assert!(!bundles[0].is_bridge);
        let ranked = rank(bundles);
        assert!(ranked.windows(2).all(|w| w[0].composite >= w[1].composite));
        assert!(ranked[..3].iter().any(|b| b.id == 3));
    }

    #[test]
    fn empty_graph_yields_nothing() {
        let view = GraphView::default();
        assert!(analyze(&view, &Selection::All, &AnalyticsConfig::default()).is_empty());
    }
}
