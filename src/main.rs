//! # Rizoma — Servidor
//!
//! **Ponto de entrada** do motor: sobe a simulação, o loop de ticks e a
//! API HTTP.
//!
//! ## Fluxo de Inicialização
//!
//! ```text
//! main()
//!   ├── Configura tracing/logging
//!   ├── Carrega EngineConfig (RIZOMA_CONFIG ou rizoma.toml)
//!   ├── Restaura o snapshot do disco (ou cria simulação nova)
//!   ├── Garante uma âncora no centro do mundo
//!   ├── Monta AppState e Router
//!   ├── Spawn: loop de ticks (tick_hz, atrasos pulados)
//!   ├── Serve até Ctrl+C
//!   └── Salva o snapshot final
//! ```
//!
//! ## Exemplo de Uso
//!
//! ```bash
//! # Executar com logs padrão (info)
//! cargo run
//!
//! # Logs detalhados do simulador
//! RUST_LOG=rizoma=trace cargo run
//!
//! # Outro arquivo de configuração
//! RIZOMA_CONFIG=demo.toml cargo run
//! ```

mod web;

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

use rizoma::core::Vec2;
use rizoma::persistence;
use rizoma::{EngineConfig, Simulation};

use crate::web::state::{primary_anchor, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG configura o nível; padrão info.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("🌱 Rizoma — Starting...");

    let config = EngineConfig::load().context("Falha ao carregar configuração")?;
    let mut sim = restore_or_create(&config);

    if primary_anchor(sim.store()).is_none() {
        sim.add_anchor(Vec2::ZERO, None);
    }
    tracing::info!(
        nodes = sim.store().len(),
        edges = sim.store().edge_count(),
        seed = sim.seed(),
        "Simulação pronta"
    );

    let state = AppState::new(sim, config);
    let app = web::create_router(state.clone());

    tokio::spawn(tick_loop(state.clone()));

    let addr = state.config.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Falha ao fazer bind em {addr}"))?;
    tracing::info!("🚀 Server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Servidor axum falhou")?;

    let snapshot = state.sim.lock().snapshot();
    persistence::save_snapshot(&snapshot, &state.config.snapshot_path)?;
    tracing::info!("Até logo");
    Ok(())
}

/// Snapshot do disco se houver um válido; senão, simulação nova.
///
/// Um snapshot corrompido não impede a subida: é registrado e ignorado.
fn restore_or_create(config: &EngineConfig) -> Simulation {
    match persistence::load_simulation(&config.snapshot_path) {
        Ok(Some(sim)) => sim,
        Ok(None) => config.build_simulation(),
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "Falha ao restaurar snapshot, iniciando vazio");
            config.build_simulation()
        }
    }
}

/// Avança a simulação a `tick_hz` com Δt de relógio real.
///
/// Ticks atrasados são pulados, não acumulados; o simulador ainda limita
/// cada Δt a 33 ms.
async fn tick_loop(state: AppState) {
    let period = Duration::from_secs_f64(1.0 / state.config.tick_hz);
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last = Instant::now();

    loop {
        interval.tick().await;
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f64();
        last = now;

        let report = state.sim.lock().tick(dt);
        tracing::trace!(
            dt = report.dt,
            spawned = report.spawned.len(),
            grown = report.grown.len(),
            flights = report.flights,
            pruned_edges = report.pruned_edges,
            "Tick"
        );
        web::handlers::publish_pruned(&state, report.removed);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Falha ao escutar Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Encerrando...");
}
