//! # Handlers HTTP — Os Endpoints do Motor
//!
//! Cada função pública é um handler Axum, mapeado a uma rota em
//! [`super::create_router()`]. Todas respondem JSON, exceto `/events` (SSE).
//!
//! | Handler | Método | Rota | Retorno |
//! |---------|--------|------|---------|
//! | `status` | GET | `/status` | contadores, modo, parâmetros |
//! | `graph` | GET | `/graph` | [`RenderFrame`] |
//! | `analytics` | GET | `/analytics` | scores ordenados + caminho semântico |
//! | `sse_events` | GET | `/events` | stream de [`GraphEvent`] |
//! | `update_params` | POST | `/params` | parâmetros após a atualização |
//! | `set_mode` | POST | `/mode` | modo atual |
//! | `place_node` | POST | `/nodes` | id do nó criado |
//! | `ingest` | POST | `/ingest` | resumo da ingestão (corpo em streaming) |
//! | `cancel_ingest` | POST | `/ingest/cancel` | se havia algo a cancelar |
//! | `save_snapshot` | POST | `/snapshot` | caminho e tamanho do snapshot |
//!
//! ## Lock da Simulação
//!
//! Os handlers pegam o lock, copiam o que precisam e soltam. Trabalho caro
//! (análises, escrita em disco) roda fora do lock em `spawn_blocking`.

use std::convert::Infallible;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::stream::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_stream::wrappers::BroadcastStream;

use rizoma::analytics::{analyze, rank, semantic_path, Selection};
use rizoma::core::{NodeId, NodeSpec, RenderFrame, Vec2};
use rizoma::ingest::{run_ingestion, stop_pair, IngestStatus, IngestionSession};
use rizoma::sim::{ParamUpdate, SimMode, SimParams};
use rizoma::GraphEvent;

use super::state::{primary_anchor, ActiveIngestion, AppState};

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// Resposta do endpoint `/status`.
#[derive(Serialize)]
pub struct StatusResponse {
    pub nodes: usize,
    pub edges: usize,
    pub max_nodes: usize,
    pub ticks: u64,
    pub elapsed: f64,
    pub seed: u64,
    pub mode: SimMode,
    pub params: SimParams,
    pub ingesting: bool,
}

/// GET `/status` — Contadores e configuração corrente da simulação.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let ingesting = state.is_ingesting();
    let sim = state.sim.lock();
    Json(StatusResponse {
        nodes: sim.store().len(),
        edges: sim.store().edge_count(),
        max_nodes: sim.store().max_nodes(),
        ticks: sim.ticks(),
        elapsed: sim.elapsed(),
        seed: sim.seed(),
        mode: sim.mode(),
        params: sim.params(),
        ingesting,
    })
}

/// GET `/graph` — Foto do grafo para o renderizador.
pub async fn graph(State(state): State<AppState>) -> Json<RenderFrame> {
    Json(state.sim.lock().render_frame())
}

/// Parâmetros de `/analytics`.
///
/// `nodes` é uma lista separada por vírgulas; sem ela, todos os nós.
/// `from` e `to` juntos pedem também o caminho semântico entre eles.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub nodes: Option<String>,
    pub limit: Option<usize>,
    pub from: Option<NodeId>,
    pub to: Option<NodeId>,
}

impl AnalyticsQuery {
    fn selection(&self) -> Result<Selection, String> {
        let Some(raw) = self.nodes.as_deref().filter(|raw| !raw.trim().is_empty()) else {
            return Ok(Selection::All);
        };
        raw.split(',')
            .map(|part| {
                part.trim()
                    .parse::<NodeId>()
                    .map_err(|_| format!("id inválido: {:?}", part.trim()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Selection::Nodes)
    }
}

/// GET `/analytics` — Scores de todos (ou de alguns) nós, do maior score
/// composto para o menor.
pub async fn analytics(State(state): State<AppState>, Query(query): Query<AnalyticsQuery>) -> Response {
    let selection = match query.selection() {
        Ok(selection) => selection,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };
    let view = state.sim.lock().graph_view();
    let config = state.config.analytics;

    let job = tokio::task::spawn_blocking(move || {
        let mut scores = rank(analyze(&view, &selection, &config));
        if let Some(limit) = query.limit {
            scores.truncate(limit);
        }
        let path = match (query.from, query.to) {
            (Some(from), Some(to)) => Some(semantic_path(&view, from, to, config.epsilon)),
            _ => None,
        };
        (scores, path)
    });

    match job.await {
        Ok((scores, path)) => Json(json!({ "scores": scores, "path": path.flatten() })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Falha na tarefa de análise");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "falha na análise")
        }
    }
}

/// GET `/events` — Stream SSE do feed de atividade.
///
/// Envia keep-alive a cada 15s. Assinantes atrasados perdem eventos
/// silenciosamente.
pub async fn sse_events(
    State(state): State<AppState>,
) -> Sse<impl futures_util::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = state.events_tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => {
                let data = serde_json::to_string(&event).ok()?;
                Some(Ok(SseEvent::default().data(data)))
            }
            Err(_) => None,
        }
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// POST `/params` — Atualização parcial; vale a partir do próximo tick.
pub async fn update_params(State(state): State<AppState>, Json(update): Json<ParamUpdate>) -> Json<SimParams> {
    let params = state.sim.lock().update_params(&update);
    tracing::info!(?params, "Parâmetros atualizados");
    Json(params)
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: SimMode,
}

/// POST `/mode` — Alterna entre `organic` e `query`.
pub async fn set_mode(State(state): State<AppState>, Json(request): Json<ModeRequest>) -> Json<serde_json::Value> {
    state.sim.lock().set_mode(request.mode);
    tracing::info!(mode = ?request.mode, "Modo alterado");
    Json(json!({ "mode": request.mode }))
}

/// Nó colocado pelo usuário.
#[derive(Debug, Deserialize)]
pub struct PlaceRequest {
    pub x: f64,
    pub y: f64,
    pub label: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub relevance: Option<f64>,
}

impl PlaceRequest {
    fn spec(&self) -> NodeSpec {
        let mut spec = NodeSpec::anonymous();
        spec.label = self.label.clone();
        spec.category = self.category.clone();
        spec.description = self.description.clone();
        if let Some(relevance) = self.relevance {
            spec.relevance = relevance;
        }
        spec
    }
}

/// POST `/nodes` — Insere um nó na posição pedida.
///
/// `409` se o grafo está cheio ou o label já existe.
pub async fn place_node(State(state): State<AppState>, Json(request): Json<PlaceRequest>) -> Response {
    let placed = state
        .sim
        .lock()
        .place_user_node(Vec2::new(request.x, request.y), request.spec());
    match placed {
        Some(id) => (StatusCode::CREATED, Json(json!({ "id": id }))).into_response(),
        None => error_response(StatusCode::CONFLICT, "grafo cheio ou label duplicado"),
    }
}

#[derive(Serialize)]
struct IngestResponse<'a> {
    status: &'a str,
    summary: &'a rizoma::ingest::IngestSummary,
}

/// POST `/ingest` — O corpo da requisição é a fonte de chunks.
///
/// Os registros são aplicados enquanto o corpo chega; a resposta sai
/// quando o corpo termina ou a ingestão é cancelada. Só uma ingestão por
/// vez: uma segunda recebe `409`.
pub async fn ingest(State(state): State<AppState>, body: Body) -> Response {
    let (handle, signal) = stop_pair();
    let Some(_active) = ActiveIngestion::acquire(&state, handle) else {
        return error_response(StatusCode::CONFLICT, "já existe uma ingestão em andamento");
    };

    let session = {
        let sim = state.sim.lock();
        let store = sim.store();
        IngestionSession::resume(primary_anchor(store), state.config.placement, store)
    };
    let result = run_ingestion(
        body.into_data_stream(),
        state.sim.clone(),
        session,
        signal,
        Some(state.events_tx.clone()),
    )
    .await;

    match result {
        Ok(IngestStatus::Completed(summary)) => Json(IngestResponse {
            status: "completed",
            summary: &summary,
        })
        .into_response(),
        Ok(IngestStatus::Cancelled(summary)) => Json(IngestResponse {
            status: "cancelled",
            summary: &summary,
        })
        .into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": e.to_string(), "summary": e.summary() })),
        )
            .into_response(),
    }
}

/// POST `/ingest/cancel` — Pede a parada da ingestão ativa. Idempotente.
pub async fn cancel_ingest(State(state): State<AppState>) -> Json<serde_json::Value> {
    let cancelled = match state.ingestion.lock().as_ref() {
        Some(handle) => {
            handle.stop();
            true
        }
        None => false,
    };
    if cancelled {
        tracing::info!("Cancelamento de ingestão pedido");
    }
    Json(json!({ "cancelled": cancelled }))
}

/// POST `/snapshot` — Salva a simulação no caminho configurado.
pub async fn save_snapshot(State(state): State<AppState>) -> Response {
    let snapshot = state.sim.lock().snapshot();
    let path = state.config.snapshot_path.clone();
    let nodes = snapshot.nodes.len();

    let job = tokio::task::spawn_blocking(move || rizoma::persistence::save_snapshot(&snapshot, &path).map(|()| path));
    match job.await {
        Ok(Ok(path)) => Json(json!({ "path": path.display().to_string(), "nodes": nodes })).into_response(),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Falha ao salvar snapshot");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
        }
        Err(e) => {
            tracing::error!(error = %e, "Falha na tarefa de snapshot");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "falha ao salvar snapshot")
        }
    }
}

/// Repassa ao feed os nós removidos por um tick.
pub fn publish_pruned(state: &AppState, removed: Vec<NodeId>) {
    if !removed.is_empty() {
        state.publish(GraphEvent::NodesPruned { ids: removed });
    }
}
