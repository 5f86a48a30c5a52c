//! # Persistência — Snapshot da Simulação em Disco
//!
//! Serializa um [`SimulationSnapshot`] como JSON pretty-printed. O snapshot
//! carrega o grafo inteiro, os parâmetros, os timers e o estado do RNG:
//! restaurar e continuar dá exatamente os mesmos ticks que não ter parado.
//!
//! ## Atomicidade
//!
//! A escrita vai para `<arquivo>.tmp` e só então é renomeada por cima do
//! destino. Um crash no meio deixa o snapshot anterior intacto.
//!
//! ## Quando o Snapshot é Salvo?
//!
//! - `POST /snapshot`
//! - no encerramento do servidor (Ctrl+C)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::sim::snapshot::SimulationSnapshot;
use crate::sim::Simulation;

/// Salva o snapshot em `path`, criando o diretório pai se preciso.
pub fn save_snapshot(snapshot: &SimulationSnapshot, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Falha ao criar diretório {}", parent.display()))?;
    }
    let json = snapshot.to_json().context("Falha ao serializar snapshot")?;
    let tmp = tmp_path(path);
    std::fs::write(&tmp, json).with_context(|| format!("Falha ao escrever {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("Falha ao mover snapshot para {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        nodes = snapshot.nodes.len(),
        "Snapshot salvo"
    );
    Ok(())
}

/// Carrega um snapshot, ou `None` se o arquivo não existe.
///
/// # Erros
///
/// Arquivo ilegível, JSON inválido ou versão não suportada.
pub fn load_snapshot(path: &Path) -> Result<Option<SimulationSnapshot>> {
    if !path.exists() {
        tracing::info!("Nenhum {} encontrado", path.display());
        return Ok(None);
    }
    let json = std::fs::read_to_string(path).with_context(|| format!("Falha ao ler {}", path.display()))?;
    let snapshot = SimulationSnapshot::from_json(&json)
        .with_context(|| format!("Falha ao desserializar {}", path.display()))?;
    Ok(Some(snapshot))
}

/// Restaura a simulação salva em `path`, se houver.
///
/// O invariante de espelhamento das arestas é verificado na restauração:
/// um snapshot editado à mão e inconsistente é recusado.
pub fn load_simulation(path: &Path) -> Result<Option<Simulation>> {
    let Some(snapshot) = load_snapshot(path)? else {
        return Ok(None);
    };
    let sim = Simulation::restore(snapshot).with_context(|| format!("Snapshot inválido em {}", path.display()))?;
    tracing::debug!(path = %path.display(), "Snapshot carregado");
    Ok(Some(sim))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}
