//! # Módulo Ingest — Do Stream de Texto ao Grafo
//!
//! Transforma a saída em streaming de um gerador (texto com objetos JSON
//! espalhados) em nós e arestas, **enquanto o texto ainda está chegando**.
//!
//! ## Pipeline
//!
//! ```text
//! chunks (Stream<Item = Result<bytes, E>>)
//!   │
//!   ▼
//! RecordScanner ──▶ spans { ... } ──▶ NodeRecord::parse ──▶ rejeitados: pulados
//!   │
//!   ▼
//! IngestionSession::apply
//!   ├─ label já existe? ─▶ só liga conexões novas (merge)
//!   ├─ Placement ───────▶ setor da categoria + fração áurea + raio crescente
//!   ├─ conexões ────────▶ arestas por label (pendentes se o alvo ainda não chegou)
//!   └─ âncora ──────────▶ só se directLink ou relevância acima do limiar
//! ```
//!
//! ## Concorrência
//!
//! [`run_ingestion`] só suspende esperando o próximo chunk. Cada chunk é
//! aplicado inteiro sob o `Mutex` da simulação, e o lock **nunca** atravessa
//! um `.await`: o tick e a ingestão nunca mutam o store ao mesmo tempo.
//!
//! ## Cancelamento
//!
//! [`stop_pair`] cria um [`StopHandle`] (idempotente, clonável) e um
//! [`StopSignal`]. Parar não desfaz nada: os nós já inseridos ficam, e
//! resultados parciais são válidos.

pub mod placement;
pub mod record;
pub mod scanner;

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tracing::Instrument;

use crate::core::{label_key, GraphStore, LinkKind, NodeId, NodeSpec, Vec2};
use crate::error::IngestError;
use crate::events::GraphEvent;
use crate::sim::Simulation;

pub use placement::{Placement, PlacementConfig, GOLDEN_FRACTION};
pub use record::{NodeRecord, RecordRejection, DEFAULT_CATEGORY};
pub use scanner::{RecordScanner, ScannedRecord};

/// Contadores de uma sessão de ingestão.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// Spans candidatos vistos (válidos ou não).
    pub records: usize,
    pub created: usize,
    pub merged: usize,
    /// Registros válidos descartados por falta de capacidade.
    pub dropped: usize,
    /// Spans malformados ou sem label.
    pub skipped: usize,
    pub links: usize,
}

/// O que aconteceu com um span candidato.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordOutcome {
    Created {
        id: NodeId,
        label: String,
        category: String,
        /// Vizinhos ligados por este registro.
        links: Vec<NodeId>,
    },
    Merged {
        id: NodeId,
        label: String,
        links: Vec<NodeId>,
    },
    Dropped {
        index: usize,
        label: String,
    },
    Skipped {
        index: usize,
        reason: RecordRejection,
    },
}

impl RecordOutcome {
    /// Eventos correspondentes para o feed de atividade.
    pub fn events(&self) -> Vec<GraphEvent> {
        fn link_events(id: NodeId, links: &[NodeId]) -> impl Iterator<Item = GraphEvent> + '_ {
            links.iter().map(move |&other| GraphEvent::LinkCreated {
                source: id,
                target: other,
                kind: LinkKind::Local,
            })
        }
        match self {
            RecordOutcome::Created { id, label, category, links } => {
                let mut events = vec![GraphEvent::NodeCreated {
                    id: *id,
                    label: label.clone(),
                    category: category.clone(),
                }];
                events.extend(link_events(*id, links));
                events
            }
            RecordOutcome::Merged { id, label, links } => {
                let mut events = vec![GraphEvent::NodeMerged {
                    id: *id,
                    label: label.clone(),
                    new_links: links.len(),
                }];
                events.extend(link_events(*id, links));
                events
            }
            RecordOutcome::Dropped { index, label } => vec![GraphEvent::RecordSkipped {
                index: *index,
                reason: format!("store cheio, {label:?} descartado"),
            }],
            RecordOutcome::Skipped { index, reason } => vec![GraphEvent::RecordSkipped {
                index: *index,
                reason: reason.to_string(),
            }],
        }
    }
}

/// Estado de uma ingestão: scanner, posicionamento, âncora e conexões pendentes.
#[derive(Clone, Debug)]
pub struct IngestionSession {
    scanner: RecordScanner,
    placement: Placement,
    anchor: Option<NodeId>,
    /// Label (chave normalizada) ainda inexistente → nós que a citaram.
    pending: HashMap<String, Vec<NodeId>>,
    summary: IngestSummary,
}

impl IngestionSession {
    pub fn new(anchor: Option<NodeId>, placement: PlacementConfig) -> Self {
        Self {
            scanner: RecordScanner::default(),
            placement: Placement::new(placement),
            anchor,
            pending: HashMap::new(),
            summary: IngestSummary::default(),
        }
    }

    /// Sessão sobre um grafo já povoado: o posicionamento continua de onde
    /// as sessões anteriores pararam.
    pub fn resume(anchor: Option<NodeId>, placement: PlacementConfig, store: &GraphStore) -> Self {
        Self {
            placement: Placement::resume(placement, store),
            ..Self::new(anchor, placement)
        }
    }

    pub fn summary(&self) -> &IngestSummary {
        &self.summary
    }

    /// Quantas labels citadas ainda não chegaram.
    pub fn pending_labels(&self) -> usize {
        self.pending.len()
    }

    /// Aplica um chunk de texto e retorna o destino de cada span completado.
    pub fn feed(&mut self, chunk: &[u8], sim: &mut Simulation) -> Vec<RecordOutcome> {
        self.scanner
            .push(chunk)
            .into_iter()
            .map(|scanned| self.apply_scanned(scanned, sim))
            .collect()
    }

    /// Fim do stream: reporta um span aberto como truncado.
    pub fn finish(&mut self) -> Option<RecordOutcome> {
        let scanned = self.scanner.finish()?;
        self.summary.records += 1;
        self.summary.skipped += 1;
        let reason = scanned.outcome.err().unwrap_or(RecordRejection::Truncated);
        Some(RecordOutcome::Skipped {
            index: scanned.index,
            reason,
        })
    }

    fn apply_scanned(&mut self, scanned: ScannedRecord, sim: &mut Simulation) -> RecordOutcome {
        self.summary.records += 1;
        match scanned.outcome {
            Ok(record) => self.apply(scanned.index, record, sim),
            Err(reason) => {
                self.summary.skipped += 1;
                RecordOutcome::Skipped {
                    index: scanned.index,
                    reason,
                }
            }
        }
    }

    /// Aplica um registro validado: merge por label ou criação.
    pub fn apply(&mut self, index: usize, record: NodeRecord, sim: &mut Simulation) -> RecordOutcome {
        let anchor_weight = self.placement.config().anchor_link_weight;

        if let Some(id) = sim.store().find_by_label(&record.label) {
            let store = sim.store_mut();
            let mut links = self.wire_connections(id, &record.connections, store);
            if record.direct_link {
                if let Some(anchor) = self.anchor.filter(|&a| a != id) {
                    if !store.linked(id, anchor) && store.connect(id, anchor, anchor_weight) {
                        links.push(anchor);
                    }
                }
            }
            self.summary.merged += 1;
            self.summary.links += links.len();
            tracing::debug!(id, label = %record.label, new_links = links.len(), "Ingest: registro mesclado");
            return RecordOutcome::Merged {
                id,
                label: record.label,
                links,
            };
        }

        let center = self
            .anchor
            .and_then(|a| sim.store().node(a))
            .map_or(Vec2::ZERO, |node| node.pos);
        let raw_position = self.placement.place(
            &record.category,
            record.relevance,
            center,
            sim.visual().world_radius(),
        );
        let position = sim.clamp_to_world(raw_position);

        let mut spec = NodeSpec::labelled(record.label.clone())
            .with_category(record.category.clone())
            .with_relevance(record.relevance)
            .with_popularity(record.popularity)
            .entry(record.is_entry);
        spec.description = record.description.clone();

        let store = sim.store_mut();
        let Some(id) = store.insert_node(position, spec) else {
            self.summary.dropped += 1;
            tracing::debug!(index, label = %record.label, "Ingest: store cheio, registro descartado");
            return RecordOutcome::Dropped {
                index,
                label: record.label,
            };
        };

        let link_weight = self.placement.config().link_weight;
        let mut links = self.wire_connections(id, &record.connections, store);
        if self.placement.links_to_anchor(record.direct_link, record.relevance) {
            if let Some(anchor) = self.anchor.filter(|&a| a != id) {
                if store.connect(id, anchor, anchor_weight) {
                    links.push(anchor);
                }
            }
        }
        if let Some(waiting) = self.pending.remove(&label_key(&record.label)) {
            for source in waiting {
                if !store.linked(source, id) && store.connect(source, id, link_weight) {
                    links.push(source);
                }
            }
        }

        self.summary.created += 1;
        self.summary.links += links.len();
        tracing::debug!(
            id,
            label = %record.label,
            category = %record.category,
            links = links.len(),
            "Ingest: nó criado"
        );
        RecordOutcome::Created {
            id,
            label: record.label,
            category: record.category,
            links,
        }
    }

    /// Liga `id` a cada label conhecida ainda não ligada; labels desconhecidas
    /// ficam pendentes até chegarem.
    fn wire_connections(
        &mut self,
        id: NodeId,
        connections: &[String],
        store: &mut GraphStore,
    ) -> Vec<NodeId> {
        let weight = self.placement.config().link_weight;
        let mut links = Vec::new();
        for label in connections {
            match store.find_by_label(label) {
                Some(target) if target == id => {}
                Some(target) => {
                    if !store.linked(id, target) && store.connect(id, target, weight) {
                        links.push(target);
                    }
                }
                None => {
                    let waiting = self.pending.entry(label_key(label)).or_default();
                    if !waiting.contains(&id) {
                        waiting.push(id);
                    }
                }
            }
        }
        links
    }
}

/// Lado que pede a parada. Clonável; parar duas vezes é o mesmo que parar uma.
#[derive(Clone, Debug)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Lado que observa a parada.
#[derive(Clone, Debug)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completa quando a parada for pedida. Se todos os [`StopHandle`]
    /// forem descartados sem parar, nunca completa.
    pub async fn cancelled(&mut self) {
        let stopped = self.rx.wait_for(|stopped| *stopped).await.is_ok();
        if !stopped {
            std::future::pending::<()>().await;
        }
    }
}

/// Cria um par handle/sinal de cancelamento.
pub fn stop_pair() -> (StopHandle, StopSignal) {
    let (tx, rx) = watch::channel(false);
    (StopHandle { tx: Arc::new(tx) }, StopSignal { rx })
}

/// Como uma ingestão terminou sem erro.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngestStatus {
    /// A fonte se esgotou.
    Completed(IngestSummary),
    /// A parada foi pedida; os nós já inseridos ficam.
    Cancelled(IngestSummary),
}

impl IngestStatus {
    pub fn summary(&self) -> &IngestSummary {
        match self {
            IngestStatus::Completed(summary) | IngestStatus::Cancelled(summary) => summary,
        }
    }
}

enum Step<T> {
    Stop,
    Next(Option<T>),
}

/// Consome `source` até esgotar, falhar ou ser cancelado.
///
/// Cada chunk é aplicado sob o lock da simulação; os eventos são publicados
/// depois que o lock é solto.
///
/// # Erros
///
/// [`IngestError::Source`] se a fonte retornar erro. Os nós já inseridos
/// permanecem no grafo e o resumo parcial acompanha o erro.
pub async fn run_ingestion<S, T, E>(
    source: S,
    sim: Arc<Mutex<Simulation>>,
    mut session: IngestionSession,
    mut stop: StopSignal,
    events: Option<broadcast::Sender<GraphEvent>>,
) -> Result<IngestStatus, IngestError>
where
    S: Stream<Item = Result<T, E>>,
    T: AsRef<[u8]>,
    E: Display,
{
    let span = tracing::info_span!("ingestion");
    async move {
        let publish = |event: GraphEvent| {
            if let Some(tx) = &events {
                // Sem assinantes não é erro.
                let _ = tx.send(event);
            }
        };

        tracing::info!(anchor = ?session.anchor, "Ingestão iniciada");
        publish(GraphEvent::IngestionStarted);
        let mut source = std::pin::pin!(source);

        loop {
            let step = if stop.is_stopped() {
                Step::Stop
            } else {
                tokio::select! {
                    biased;
                    _ = stop.cancelled() => Step::Stop,
                    item = source.next() => Step::Next(item),
                }
            };

            match step {
                Step::Stop => {
                    let summary = session.summary().clone();
                    tracing::info!(
                        created = summary.created,
                        merged = summary.merged,
                        "Ingestão cancelada"
                    );
                    publish(GraphEvent::IngestionCancelled {
                        summary: summary.clone(),
                    });
                    return Ok(IngestStatus::Cancelled(summary));
                }
                Step::Next(Some(Ok(chunk))) => {
                    let outcomes = {
                        let mut guard = sim.lock();
                        session.feed(chunk.as_ref(), &mut guard)
                    };
                    for outcome in &outcomes {
                        for event in outcome.events() {
                            publish(event);
                        }
                    }
                }
                Step::Next(Some(Err(e))) => {
                    let message = e.to_string();
                    let summary = session.summary().clone();
                    tracing::warn!(error = %message, created = summary.created, "Fonte de chunks falhou");
                    publish(GraphEvent::IngestionFailed {
                        message: message.clone(),
                        summary: summary.clone(),
                    });
                    return Err(IngestError::Source { message, summary });
                }
                Step::Next(None) => {
                    if let Some(outcome) = session.finish() {
                        for event in outcome.events() {
                            publish(event);
                        }
                    }
                    let summary = session.summary().clone();
                    tracing::info!(
                        records = summary.records,
                        created = summary.created,
                        merged = summary.merged,
                        skipped = summary.skipped,
                        dropped = summary.dropped,
                        links = summary.links,
                        pending = session.pending_labels(),
                        "Ingestão completa"
                    );
                    publish(GraphEvent::IngestionFinished {
                        summary: summary.clone(),
                    });
                    return Ok(IngestStatus::Completed(summary));
                }
            }
        }
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{analyze, AnalyticsConfig, Selection};
    use crate::sim::{SimMode, SimParams, VisualParams};
    use futures_util::stream;
    use tokio_stream::wrappers::ReceiverStream;

    const TRIANGLE: &str = r#"[
        {"label": "A", "category": "x", "connections": ["B", "C"]},
        {"label": "B", "category": "x", "connections": ["C"]},
        {"label": "C", "category": "y"}
    ]"#;

    fn sim_with_anchor() -> (Simulation, NodeId) {
        let mut sim = Simulation::new(7, 100, SimParams::default(), VisualParams::default());
        sim.set_mode(SimMode::Query);
        let anchor = sim.add_anchor(Vec2::ZERO, Some("tema")).unwrap();
        (sim, anchor)
    }

    fn id_of(sim: &Simulation, label: &str) -> NodeId {
        sim.store().find_by_label(label).unwrap()
    }

    /// Triângulo A/B/C com âncora na origem: 3 nós ingeridos, todas as
    /// arestas do triângulo, betweenness zero em todos
    #[test]
    fn triangle_scenario() {
        let (mut sim, anchor) = sim_with_anchor();
        let mut session = IngestionSession::new(Some(anchor), PlacementConfig::default());
        session.feed(TRIANGLE.as_bytes(), &mut sim);

        assert_eq!(session.summary().created, 3);
        assert_eq!(sim.store().len(), 4);
        let (a, b, c) = (id_of(&sim, "A"), id_of(&sim, "B"), id_of(&sim, "C"));
        assert!(sim.store().linked(a, b));
        assert!(sim.store().linked(a, c));
        assert!(sim.store().linked(b, c));
        assert!(sim.store().node(anchor).unwrap().is_isolated());
        sim.store().check_invariants().unwrap();

        let scores = analyze(&sim.graph_view(), &Selection::All, &AnalyticsConfig::default());
        assert_eq!(scores.len(), 4);
        assert!(scores.iter().all(|s| s.betweenness == 0.0));
    }

    /// Referências para trás: A (entrada, sem conexões), B → [A], C → [A, B].
    /// Três arestas espelhadas, uma comunidade e betweenness zero em A, já
    /// que todo par de nós está ligado diretamente
    #[test]
    fn backward_references_close_the_triangle() {
        let mut sim = Simulation::new(42, 100, SimParams::default(), VisualParams::default());
        let anchor = sim.add_anchor(Vec2::ZERO, None).unwrap();
        let mut session = IngestionSession::new(Some(anchor), PlacementConfig::default());
        session.feed(
            br#"{"label":"A","isEntry":true,"connections":[]}
                {"label":"B","connections":["A"]}
                {"label":"C","connections":["A","B"]}"#,
            &mut sim,
        );

        assert_eq!(session.summary().created, 3);
        assert_eq!(session.pending_labels(), 0);
        let (a, b, c) = (id_of(&sim, "A"), id_of(&sim, "B"), id_of(&sim, "C"));
        let store = sim.store();
        assert!(store.node(a).unwrap().entry);
        for (x, y) in [(a, b), (a, c), (b, c)] {
            assert_eq!(store.link(x, y), store.link(y, x));
            assert!(store.linked(x, y));
        }
        assert_eq!(store.edges().len(), 3);
        store.check_invariants().unwrap();

        let view = sim.graph_view();
        let scores = analyze(&view, &Selection::All, &AnalyticsConfig::default());
        let score = |id: NodeId| scores.iter().find(|s| s.id == id).unwrap();
        assert_eq!(score(a).betweenness, 0.0);
        assert!(scores.iter().all(|s| s.betweenness == 0.0));
        assert_eq!(score(a).community, score(b).community);
        assert_eq!(score(b).community, score(c).community);
        assert_ne!(score(a).community, score(anchor).community);
    }

    /// O mesmo texto, inteiro ou byte a byte, gera o mesmo grafo
    #[test]
    fn chunking_does_not_change_the_graph() {
        let fingerprint = |sim: &Simulation| -> Vec<(NodeId, Option<String>, u64, u64, Vec<NodeId>)> {
            sim.store()
                .nodes()
                .map(|n| {
                    (
                        n.id,
                        n.label.clone(),
                        n.pos.x.to_bits(),
                        n.pos.y.to_bits(),
                        n.links().map(|(id, _)| id).collect(),
                    )
                })
                .collect()
        };

        let (mut whole, anchor) = sim_with_anchor();
        let mut session = IngestionSession::new(Some(anchor), PlacementConfig::default());
        session.feed(TRIANGLE.as_bytes(), &mut whole);

        let (mut sliced, anchor) = sim_with_anchor();
        let mut session = IngestionSession::new(Some(anchor), PlacementConfig::default());
        for byte in TRIANGLE.as_bytes() {
            session.feed(std::slice::from_ref(byte), &mut sliced);
        }

        assert_eq!(fingerprint(&whole), fingerprint(&sliced));
    }

    #[test]
    fn duplicate_labels_merge_new_connections() {
        let (mut sim, anchor) = sim_with_anchor();
        let mut session = IngestionSession::new(Some(anchor), PlacementConfig::default());
        let outcomes = session.feed(
            r#"{"label":"Rizoma"} {"label":"Platô"} {"label":" rizoma ","connections":["Platô"]}"#
                .as_bytes(),
            &mut sim,
        );
        assert_eq!(sim.store().len(), 3);
        assert!(matches!(&outcomes[2], RecordOutcome::Merged { links, .. } if links.len() == 1));
        assert!(sim.store().linked(id_of(&sim, "Rizoma"), id_of(&sim, "Platô")));
        assert_eq!(session.summary().merged, 1);
    }

    /// Uma segunda sessão continua os ranks da primeira em vez de reusar
    /// as mesmas posições
    #[test]
    fn second_session_does_not_stack_on_the_first() {
        let (mut sim, anchor) = sim_with_anchor();
        let mut first = IngestionSession::resume(Some(anchor), PlacementConfig::default(), sim.store());
        first.feed(br#"{"label":"um","category":"x"}"#, &mut sim);
        let mut second = IngestionSession::resume(Some(anchor), PlacementConfig::default(), sim.store());
        second.feed(br#"{"label":"dois","category":"x"}"#, &mut sim);

        let pos = |label: &str| sim.store().node(id_of(&sim, label)).unwrap().pos;
        assert!(pos("um").distance(pos("dois")) > 1.0);
    }

    #[test]
    fn anchor_link_only_for_direct_or_relevant() {
        let (mut sim, anchor) = sim_with_anchor();
        let mut session = IngestionSession::new(Some(anchor), PlacementConfig::default());
        session.feed(
            br#"{"label":"direto","directLink":true}
                {"label":"relevante","relevance":0.95}
                {"label":"comum","relevance":0.5}"#,
            &mut sim,
        );
        assert!(sim.store().linked(id_of(&sim, "direto"), anchor));
        assert!(sim.store().linked(id_of(&sim, "relevante"), anchor));
        assert!(!sim.store().linked(id_of(&sim, "comum"), anchor));
    }

    #[test]
    fn capacity_overflow_is_reported_not_failed() {
        let mut sim = Simulation::new(1, 2, SimParams::default(), VisualParams::default());
        let anchor = sim.add_anchor(Vec2::ZERO, None).unwrap();
        let mut session = IngestionSession::new(Some(anchor), PlacementConfig::default());
        let outcomes = session.feed(br#"{"label":"a"}{"label":"b"}"#, &mut sim);
        assert!(matches!(outcomes[0], RecordOutcome::Created { .. }));
        assert!(matches!(outcomes[1], RecordOutcome::Dropped { index: 1, .. }));
        assert_eq!(session.summary().dropped, 1);
    }

    #[tokio::test]
    async fn run_completes_and_publishes_events() {
        let (sim, anchor) = sim_with_anchor();
        let sim = Arc::new(Mutex::new(sim));
        let (tx, mut rx) = broadcast::channel(64);
        let (_handle, signal) = stop_pair();
        let chunks: Vec<Result<&[u8], String>> = TRIANGLE
            .as_bytes()
            .chunks(5)
            .map(Ok)
            .collect();

        let status = run_ingestion(
            stream::iter(chunks),
            sim.clone(),
            IngestionSession::new(Some(anchor), PlacementConfig::default()),
            signal,
            Some(tx),
        )
        .await
        .unwrap();

        assert!(matches!(&status, IngestStatus::Completed(s) if s.created == 3));
        assert_eq!(sim.lock().store().len(), 4);
        assert!(matches!(rx.recv().await.unwrap(), GraphEvent::IngestionStarted));
        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        assert!(matches!(last, Some(GraphEvent::IngestionFinished { .. })));
    }

    /// Erro da fonte é terminal, mas os nós já inseridos ficam
    #[tokio::test]
    async fn source_error_keeps_partial_results() {
        let (sim, anchor) = sim_with_anchor();
        let sim = Arc::new(Mutex::new(sim));
        let (_handle, signal) = stop_pair();
        let chunks: Vec<Result<&[u8], &str>> = vec![
            Ok(br#"{"label":"antes"}"#.as_slice()),
            Err("conexão caiu"),
            Ok(br#"{"label":"depois"}"#.as_slice()),
        ];

        let err = run_ingestion(
            stream::iter(chunks),
            sim.clone(),
            IngestionSession::new(Some(anchor), PlacementConfig::default()),
            signal,
            None,
        )
        .await
        .unwrap_err();

        assert_eq!(err.summary().created, 1);
        let sim = sim.lock();
        assert!(sim.store().find_by_label("antes").is_some());
        assert!(sim.store().find_by_label("depois").is_none());
    }

    #[tokio::test]
    async fn cancellation_is_idempotent_and_keeps_nodes() {
        let (sim, anchor) = sim_with_anchor();
        let sim = Arc::new(Mutex::new(sim));
        let (handle, signal) = stop_pair();
        let (chunk_tx, chunk_rx) = tokio::sync::mpsc::channel::<Result<Vec<u8>, String>>(4);

        let task = tokio::spawn(run_ingestion(
            ReceiverStream::new(chunk_rx),
            sim.clone(),
            IngestionSession::new(Some(anchor), PlacementConfig::default()),
            signal,
            None,
        ));

        chunk_tx.send(Ok(br#"{"label":"primeiro"}"#.to_vec())).await.unwrap();
        for _ in 0..1000 {
            if sim.lock().store().len() > 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        handle.stop();
        handle.stop();
        assert!(handle.is_stopped());

        let status = task.await.unwrap().unwrap();
        assert!(matches!(status, IngestStatus::Cancelled(ref s) if s.created == 1));
        assert!(sim.lock().store().find_by_label("primeiro").is_some());
        drop(chunk_tx);
    }

    #[tokio::test]
    async fn stopped_before_start_inserts_nothing() {
        let (sim, anchor) = sim_with_anchor();
        let sim = Arc::new(Mutex::new(sim));
        let (handle, signal) = stop_pair();
        handle.stop();
        let chunks: Vec<Result<&[u8], String>> = vec![Ok(TRIANGLE.as_bytes())];
        let status = run_ingestion(
            stream::iter(chunks),
            sim.clone(),
            IngestionSession::new(Some(anchor), PlacementConfig::default()),
            signal,
            None,
        )
        .await
        .unwrap();
        assert!(matches!(status, IngestStatus::Cancelled(_)));
        assert_eq!(sim.lock().store().len(), 1);
    }
}
