//! # Snapshot — Salvar e Retomar a Simulação
//!
//! Um [`SimulationSnapshot`] contém **tudo** o que influencia os próximos
//! ticks: nós na ordem de iteração, vizinhanças achatadas em
//! `(vizinho, peso, tipo)` na ordem de criação, contador de ids, categorias,
//! parâmetros, modo, timers e o estado interno do gerador aleatório.
//!
//! Restaurar e continuar produz a **mesma trajetória bit a bit** que a
//! simulação original teria produzido. O JSON usa `float_roundtrip` do
//! `serde_json`, então nenhum `f64` perde precisão no caminho.
//!
//! O índice de labels não é serializado: é reconstruído na restauração,
//! junto com a verificação do espelho das arestas.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::{CategoryId, GraphStore, Link, LinkKind, Node, NodeId, Vec2};
use crate::error::SnapshotError;

use super::{SimMode, SimParams, SimRng, Simulation, Timers, VisualParams};

/// Versão do formato de snapshot.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkEntry {
    pub neighbor: NodeId,
    pub weight: f64,
    pub kind: LinkKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub pos: Vec2,
    pub vel: Vec2,
    pub heat: f64,
    pub entry: bool,
    pub anchor: bool,
    pub user_placed: bool,
    pub age: f64,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<CategoryId>,
    pub relevance: f64,
    pub popularity: f64,
    pub links: Vec<LinkEntry>,
}

impl NodeSnapshot {
    fn capture(node: &Node) -> Self {
        Self {
            id: node.id,
            pos: node.pos,
            vel: node.vel,
            heat: node.heat,
            entry: node.entry,
            anchor: node.anchor,
            user_placed: node.user_placed,
            age: node.age,
            label: node.label.clone(),
            description: node.description.clone(),
            category: node.category,
            relevance: node.relevance,
            popularity: node.popularity,
            links: node
                .links()
                .map(|(neighbor, link)| LinkEntry {
                    neighbor,
                    weight: link.weight,
                    kind: link.kind,
                })
                .collect(),
        }
    }

    fn into_node(self) -> Node {
        let links: IndexMap<NodeId, Link> = self
            .links
            .into_iter()
            .map(|entry| {
                (
                    entry.neighbor,
                    Link {
                        weight: entry.weight,
                        kind: entry.kind,
                    },
                )
            })
            .collect();
        Node {
            id: self.id,
            pos: self.pos,
            vel: self.vel,
            heat: self.heat,
            entry: self.entry,
            anchor: self.anchor,
            user_placed: self.user_placed,
            age: self.age,
            label: self.label,
            description: self.description,
            category: self.category,
            relevance: self.relevance,
            popularity: self.popularity,
            links,
        }
    }
}

/// Estado completo e serializável de uma [`Simulation`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub next_id: NodeId,
    pub max_nodes: usize,
    pub categories: Vec<String>,
    pub nodes: Vec<NodeSnapshot>,
    pub params: SimParams,
    pub visual: VisualParams,
    pub mode: SimMode,
    pub timers: Timers,
    pub elapsed: f64,
    pub ticks: u64,
    /// Semente e estado interno do gerador.
    pub rng: SimRng,
}

impl SimulationSnapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Simulation {
    /// Captura o estado completo da simulação.
    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            next_id: self.store.next_id(),
            max_nodes: self.store.max_nodes(),
            categories: self.store.categories().map(str::to_owned).collect(),
            nodes: self.store.nodes().map(NodeSnapshot::capture).collect(),
            params: self.params,
            visual: self.visual,
            mode: self.mode,
            timers: self.timers,
            elapsed: self.elapsed,
            ticks: self.ticks,
            rng: self.rng.clone(),
        }
    }

    /// Reconstrói uma simulação a partir de um snapshot.
    ///
    /// # Erros
    ///
    /// - [`SnapshotError::UnsupportedVersion`] para formatos desconhecidos
    /// - [`SnapshotError::Corrupt`] se ids, categorias, labels ou o espelho
    ///   das arestas estiverem inconsistentes
    pub fn restore(snapshot: SimulationSnapshot) -> Result<Self, SnapshotError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }
        let nodes = snapshot.nodes.into_iter().map(NodeSnapshot::into_node).collect();
        let store = GraphStore::from_parts(
            snapshot.max_nodes,
            snapshot.next_id,
            snapshot.categories,
            nodes,
        )
        .map_err(SnapshotError::Corrupt)?;
        tracing::info!(
            nodes = store.len(),
            edges = store.edge_count(),
            saved_at = %snapshot.saved_at,
            "Simulação restaurada"
        );
        Ok(Self {
            store,
            params: snapshot.params.clamped(),
            visual: snapshot.visual.clamped(),
            mode: snapshot.mode,
            rng: snapshot.rng,
            timers: snapshot.timers,
            elapsed: snapshot.elapsed,
            ticks: snapshot.ticks,
            accel: Vec::new(),
        })
    }
}
