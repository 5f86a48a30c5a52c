//! # Rizoma — Grafo Vivo com Layout por Forças
//!
//! Um grafo que **cresce sozinho** enquanto é desenhado: nós entram por
//! ingestão em streaming (objetos JSON no meio de texto), por crescimento
//! orgânico, por entradas espontâneas ou pela mão do usuário. Arestas se
//! formam, se fortalecem, decaem e são esquecidas. Um simulador de forças
//! dá a cada nó uma posição 2D estável o suficiente para ser renderizada.
//!
//! ## Arquitetura
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ ingest   stream de bytes ─▶ RecordScanner ─▶ NodeRecord      │
//! │          ─▶ Placement (setor + fração áurea) ─▶ GraphStore   │
//! ├──────────────────────────────────────────────────────────────┤
//! │ sim      tick(Δt): entrada, crescimento, forças, captura,    │
//! │          linhas de fuga, reagrupamento, decaimento, poda     │
//! ├──────────────────────────────────────────────────────────────┤
//! │ core     GraphStore: nós + adjacência espelhada, ids estáveis│
//! ├──────────────────────────────────────────────────────────────┤
//! │ analytics  GraphView ─▶ betweenness, closeness, comunidades, │
//! │            distância semântica, hubs, pontes, score composto │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Módulos
//!
//! | Módulo | Responsabilidade |
//! |--------|------------------|
//! | [`core`] | `Node`, `Link`, `GraphStore`, `RenderFrame` |
//! | [`sim`] | `Simulation`, forças, ciclo de vida, RNG, snapshots |
//! | [`ingest`] | scanner de JSON parcial, colocação, sessão de ingestão |
//! | [`analytics`] | centralidades, comunidades, caminhos, classificação |
//! | [`events`] | feed de atividade (`GraphEvent`) |
//! | [`config`] | `EngineConfig` em TOML |
//! | [`persistence`] | snapshot em disco |
//! | [`error`] | `IngestError`, `SnapshotError` |
//!
//! ## Determinismo
//!
//! Toda decisão aleatória passa por um único [`sim::rng::SimRng`] semeado.
//! Mesma semente, mesmos parâmetros e mesma sequência de operações e Δt
//! produzem o mesmo grafo, bit a bit.

pub mod analytics;
pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod ingest;
pub mod persistence;
pub mod sim;

pub use config::EngineConfig;
pub use error::{IngestError, SnapshotError};
pub use events::GraphEvent;
pub use sim::Simulation;
