//! # Eventos do Grafo
//!
//! Define o enum [`GraphEvent`] — o feed de atividade publicado num canal
//! `tokio::sync::broadcast` durante a ingestão e a poda. O binário repassa
//! esses eventos ao frontend via Server-Sent Events.
//!
//! ## Ciclo de Vida de uma Ingestão
//!
//! ```text
//! IngestionStarted → [NodeCreated | NodeMerged | LinkCreated* | RecordSkipped]*
//!                  → IngestionFinished
//!                 ou IngestionCancelled
//!                 ou IngestionFailed
//! ```
//!
//! `NodesPruned` vem do loop de ticks, independente de qualquer ingestão.
//!
//! ## Serialização
//!
//! `#[serde(tag = "type")]` produz JSON com discriminador:
//!
//! ```json
//! { "type": "NodeCreated", "id": 7, "label": "Rizoma", "category": "filosofia" }
//! ```

use serde::Serialize;

use crate::core::{LinkKind, NodeId};
use crate::ingest::IngestSummary;

/// Evento publicado no feed de atividade.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum GraphEvent {
    /// Primeiro evento de uma ingestão.
    IngestionStarted,

    /// Registro novo virou nó.
    NodeCreated {
        id: NodeId,
        label: String,
        category: String,
    },

    /// Registro com label existente: só novas conexões foram ligadas.
    NodeMerged {
        id: NodeId,
        label: String,
        new_links: usize,
    },

    /// Aresta criada pela ingestão (conexão por label, âncora ou pendência resolvida).
    LinkCreated {
        source: NodeId,
        target: NodeId,
        kind: LinkKind,
    },

    /// Registro descartado: JSON malformado, sem label, ou store cheio.
    RecordSkipped {
        index: usize,
        reason: String,
    },

    /// Nós isolados removidos pelo decaimento.
    NodesPruned {
        ids: Vec<NodeId>,
    },

    IngestionFinished {
        summary: IngestSummary,
    },

    IngestionCancelled {
        summary: IngestSummary,
    },

    /// A fonte de chunks falhou. Os nós já inseridos permanecem.
    IngestionFailed {
        message: String,
        summary: IngestSummary,
    },
}
