//! # Configuração do Motor
//!
//! Um único arquivo TOML descreve a simulação inteira. Tudo tem padrão:
//! um arquivo vazio (ou ausente) sobe o motor com os valores abaixo.
//!
//! ```toml
//! seed = 42
//! max_nodes = 1500
//! tick_hz = 60.0
//! bind_addr = "0.0.0.0:3000"
//! snapshot_path = "data/rizoma.json"
//!
//! [params]
//! growth = 0.3
//! forgetting = 0.2
//!
//! [visual]
//! world_width = 1600.0
//!
//! [placement]
//! sectors = 8
//!
//! [analytics]
//! hub_threshold = 0.6
//! ```
//!
//! ## Onde o Arquivo é Procurado
//!
//! | Fonte | Prioridade |
//! |-------|------------|
//! | `RIZOMA_CONFIG` (variável de ambiente) | 1 |
//! | `rizoma.toml` no diretório atual | 2 |
//! | padrões embutidos | 3 |

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::analytics::AnalyticsConfig;
use crate::ingest::PlacementConfig;
use crate::sim::params::{SimParams, VisualParams};
use crate::sim::Simulation;

/// Variável de ambiente com o caminho do arquivo de configuração.
pub const CONFIG_ENV: &str = "RIZOMA_CONFIG";

/// Arquivo procurado quando `RIZOMA_CONFIG` não está definida.
pub const DEFAULT_CONFIG_FILE: &str = "rizoma.toml";

/// Configuração completa do motor e do servidor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Semente do RNG da simulação.
    pub seed: u64,
    /// Capacidade do grafo.
    pub max_nodes: usize,
    /// Frequência do loop de ticks (Hz).
    pub tick_hz: f64,
    pub bind_addr: String,
    /// Onde o snapshot é salvo e de onde é restaurado.
    pub snapshot_path: PathBuf,
    pub params: SimParams,
    pub visual: VisualParams,
    pub placement: PlacementConfig,
    pub analytics: AnalyticsConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_nodes: 1500,
            tick_hz: 60.0,
            bind_addr: "0.0.0.0:3000".to_string(),
            snapshot_path: PathBuf::from("data/rizoma.json"),
            params: SimParams::default(),
            visual: VisualParams::default(),
            placement: PlacementConfig::default(),
            analytics: AnalyticsConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Lê a configuração de uma string TOML. Campos ausentes ficam no padrão.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml).context("Falha ao interpretar configuração TOML")?;
        Ok(config.sanitized())
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Falha ao ler {}", path.display()))?;
        Self::from_toml_str(&contents).with_context(|| format!("Configuração inválida em {}", path.display()))
    }

    /// Procura a configuração em `RIZOMA_CONFIG` ou `rizoma.toml`.
    ///
    /// Um `rizoma.toml` ausente não é erro: sobe com os padrões. Já um
    /// caminho explícito em `RIZOMA_CONFIG` precisa existir.
    pub fn load() -> Result<Self> {
        if let Ok(path) = env::var(CONFIG_ENV) {
            tracing::info!(path = %path, "Carregando configuração de {}", CONFIG_ENV);
            return Self::from_file(path);
        }
        let path = Path::new(DEFAULT_CONFIG_FILE);
        if !path.exists() {
            tracing::info!("Nenhum {} encontrado, usando padrões", DEFAULT_CONFIG_FILE);
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Falha ao serializar configuração")
    }

    /// Simulação nova com a semente, capacidade e parâmetros desta configuração.
    pub fn build_simulation(&self) -> Simulation {
        Simulation::new(self.seed, self.max_nodes, self.params, self.visual)
    }

    fn sanitized(mut self) -> Self {
        self.params = self.params.clamped();
        self.visual = self.visual.clamped();
        if !(self.tick_hz.is_finite() && self.tick_hz > 0.0) {
            tracing::warn!(tick_hz = self.tick_hz, "tick_hz inválido, usando 60");
            self.tick_hz = 60.0;
        }
        self.tick_hz = self.tick_hz.min(240.0);
        self
    }
}
