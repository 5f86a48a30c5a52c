//! # Parâmetros da Simulação
//!
//! Dois grupos de parâmetros controlam o simulador:
//!
//! | Grupo | Tipo | Faixa | Quando muda |
//! |-------|------|-------|-------------|
//! | Comportamento | [`SimParams`] | `[0, 1]` | a qualquer momento (sliders) |
//! | Mundo/visual | [`VisualParams`] | positivos | na configuração |
//!
//! Toda alteração vale a partir do **próximo tick**. Não há invariantes além
//! do clamping de faixa.

use serde::{Deserialize, Serialize};

use crate::core::node::clamp_unit;

/// Os sete escalares de comportamento, todos em `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Taxa de crescimento orgânico (filhos em torno de pais).
    pub growth: f64,
    /// Taxa de nós de entrada espontâneos.
    pub entry_rate: f64,
    /// Propensão a linhas de fuga (arestas longas e fracas).
    pub flight: f64,
    /// Força de atração em direção à âncora mais próxima.
    pub attraction: f64,
    /// Força do agrupamento local por categoria.
    pub clustering: f64,
    /// Viés de formação de hubs no crescimento.
    pub hub_bias: f64,
    /// Taxa de esquecimento (decaimento de arestas).
    pub forgetting: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            growth: 0.3,
            entry_rate: 0.2,
            flight: 0.2,
            attraction: 0.5,
            clustering: 0.5,
            hub_bias: 0.3,
            forgetting: 0.2,
        }
    }
}

impl SimParams {
    /// Cópia com todos os campos limitados a `[0, 1]` (NaN vira `0`).
    pub fn clamped(self) -> Self {
        Self {
            growth: clamp_unit(self.growth),
            entry_rate: clamp_unit(self.entry_rate),
            flight: clamp_unit(self.flight),
            attraction: clamp_unit(self.attraction),
            clustering: clamp_unit(self.clustering),
            hub_bias: clamp_unit(self.hub_bias),
            forgetting: clamp_unit(self.forgetting),
        }
    }
}

/// Atualização parcial de [`SimParams`]: campos ausentes ficam como estão.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct ParamUpdate {
    pub growth: Option<f64>,
    pub entry_rate: Option<f64>,
    pub flight: Option<f64>,
    pub attraction: Option<f64>,
    pub clustering: Option<f64>,
    pub hub_bias: Option<f64>,
    pub forgetting: Option<f64>,
}

impl ParamUpdate {
    /// Aplica a atualização e retorna os parâmetros já limitados.
    pub fn apply(&self, base: SimParams) -> SimParams {
        SimParams {
            growth: self.growth.unwrap_or(base.growth),
            entry_rate: self.entry_rate.unwrap_or(base.entry_rate),
            flight: self.flight.unwrap_or(base.flight),
            attraction: self.attraction.unwrap_or(base.attraction),
            clustering: self.clustering.unwrap_or(base.clustering),
            hub_bias: self.hub_bias.unwrap_or(base.hub_bias),
            forgetting: self.forgetting.unwrap_or(base.forgetting),
        }
        .clamped()
    }
}

/// Parâmetros do mundo: limites, amortecimento, velocidade máxima, calor.
///
/// O mundo é um retângulo centrado na origem, de `world_width × world_height`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualParams {
    pub world_width: f64,
    pub world_height: f64,
    /// Fator de amortecimento de velocidade por frame de referência.
    pub damping: f64,
    /// Velocidade máxima (unidades por frame de referência).
    pub max_speed: f64,
    /// Amplitude base da deriva estocástica.
    pub drift: f64,
    /// Fator de esfriamento do calor por frame de referência.
    pub heat_decay: f64,
    /// Multiplicador global das molas.
    pub spring_strength: f64,
    /// Multiplicador global da repulsão.
    pub repulsion: f64,
}

impl Default for VisualParams {
    fn default() -> Self {
        Self {
            world_width: 1600.0,
            world_height: 1000.0,
            damping: 0.9,
            max_speed: 6.0,
            drift: 0.05,
            heat_decay: 0.99,
            spring_strength: 1.0,
            repulsion: 1.0,
        }
    }
}

impl VisualParams {
    /// Cópia com cada campo levado a uma faixa utilizável.
    ///
    /// Valores não finitos voltam ao padrão.
    pub fn clamped(self) -> Self {
        let defaults = Self::default();
        let pick = |value: f64, fallback: f64, lo: f64, hi: f64| {
            if value.is_finite() {
                value.clamp(lo, hi)
            } else {
                fallback
            }
        };
        Self {
            world_width: pick(self.world_width, defaults.world_width, 100.0, 100_000.0),
            world_height: pick(self.world_height, defaults.world_height, 100.0, 100_000.0),
            damping: pick(self.damping, defaults.damping, 0.0, 1.0),
            max_speed: pick(self.max_speed, defaults.max_speed, 0.1, 1_000.0),
            drift: pick(self.drift, defaults.drift, 0.0, 10.0),
            heat_decay: pick(self.heat_decay, defaults.heat_decay, 0.0, 1.0),
            spring_strength: pick(self.spring_strength, defaults.spring_strength, 0.0, 10.0),
            repulsion: pick(self.repulsion, defaults.repulsion, 0.0, 10.0),
        }
    }

    /// Meia-largura e meia-altura do mundo.
    pub fn half_extent(&self) -> (f64, f64) {
        (self.world_width / 2.0, self.world_height / 2.0)
    }

    /// Raio do maior círculo inscrito no mundo.
    pub fn world_radius(&self) -> f64 {
        self.world_width.min(self.world_height) / 2.0
    }
}

/// Modo da simulação.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimMode {
    /// Crescimento, entradas, captura e reagrupamento ativos.
    #[default]
    Organic,
    /// Só a estrutura ingerida define o grafo: sem crescimento, entradas,
    /// captura ou novas arestas de reagrupamento.
    Query,
}
