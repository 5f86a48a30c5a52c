//! # Estado da Aplicação Web
//!
//! Tudo o que os handlers e o loop de ticks compartilham.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ AppState                     │
//! │  ├── sim ────────── Arc<Mutex<Simulation>> ◀── loop de ticks
//! │  ├── events_tx ──── broadcast<GraphEvent>  ──▶ GET /events
//! │  ├── ingestion ──── StopHandle da ingestão ativa (no máximo uma)
//! │  └── config ─────── EngineConfig (somente leitura)
//! └──────────────────────────────┘
//! ```
//!
//! O `Mutex` da simulação é `parking_lot` e **nunca** é segurado através
//! de um `.await`.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use rizoma::core::{GraphStore, NodeId};
use rizoma::ingest::StopHandle;
use rizoma::{EngineConfig, GraphEvent, Simulation};

/// Capacidade do canal de eventos. Assinantes lentos perdem os mais antigos.
pub const EVENT_CAPACITY: usize = 256;

/// Estado compartilhado da aplicação Axum.
#[derive(Clone)]
pub struct AppState {
    pub sim: Arc<Mutex<Simulation>>,
    pub events_tx: broadcast::Sender<GraphEvent>,
    /// Ingestão em andamento, se houver.
    pub ingestion: Arc<Mutex<Option<StopHandle>>>,
    pub config: Arc<EngineConfig>,
}

impl AppState {
    pub fn new(sim: Simulation, config: EngineConfig) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            sim: Arc::new(Mutex::new(sim)),
            events_tx,
            ingestion: Arc::new(Mutex::new(None)),
            config: Arc::new(config),
        }
    }

    /// Publica um evento; sem assinantes não é erro.
    pub fn publish(&self, event: GraphEvent) {
        let _ = self.events_tx.send(event);
    }

    pub fn is_ingesting(&self) -> bool {
        self.ingestion.lock().is_some()
    }
}

/// Primeira âncora do grafo, alvo das ligações da ingestão.
pub fn primary_anchor(store: &GraphStore) -> Option<NodeId> {
    store.nodes().find(|node| node.anchor).map(|node| node.id)
}

/// Marca a ingestão ativa e a libera ao sair de escopo, inclusive quando o
/// cliente desconecta e o handler é descartado no meio.
pub struct ActiveIngestion {
    slot: Arc<Mutex<Option<StopHandle>>>,
}

impl ActiveIngestion {
    /// `None` se já existe uma ingestão em andamento.
    pub fn acquire(state: &AppState, handle: StopHandle) -> Option<Self> {
        let mut slot = state.ingestion.lock();
        if slot.is_some() {
            return None;
        }
        *slot = Some(handle);
        Some(Self {
            slot: state.ingestion.clone(),
        })
    }
}

impl Drop for ActiveIngestion {
    fn drop(&mut self) {
        self.slot.lock().take();
    }
}
