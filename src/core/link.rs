//! # Link — Meia-Aresta Espelhada
//!
//! Uma aresta do grafo não é uma entidade separada: ela existe como **duas
//! entradas espelhadas**, uma em cada nó (`A → B` e `B → A`), sempre com o
//! mesmo [`Link`]. Só o [`GraphStore`](super::GraphStore) cria ou remove
//! essas entradas, garantindo que o espelho nunca diverge.
//!
//! ## Tipos de Filamento ([`LinkKind`])
//!
//! | Tipo | Descrição | Mola |
//! |------|-----------|------|
//! | `Local` | Estrutura local (crescimento, ingestão, captura) | curta e rígida |
//! | `Bridge` | Linha de fuga entre regiões distantes | longa e macia |

use serde::{Deserialize, Serialize};

/// Peso mínimo de uma aresta. Abaixo disso o decaimento a remove.
pub const WEIGHT_FLOOR: f64 = 0.02;

/// Tipo estrutural de uma aresta.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// Aresta estrutural comum.
    #[default]
    Local,
    /// Linha de fuga: ligação fraca e de longo alcance.
    Bridge,
}

impl LinkKind {
    /// Nome curto usado no feed de eventos e no JSON do renderizador.
    pub fn label(&self) -> &'static str {
        match self {
            LinkKind::Local => "local",
            LinkKind::Bridge => "bridge",
        }
    }
}

/// Uma das duas metades de uma aresta: peso em `(0, 1]` e tipo.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Força da ligação. Sempre em `(0, 1]`.
    pub weight: f64,
    /// Tipo estrutural (mola local ou linha de fuga).
    pub kind: LinkKind,
}

impl Link {
    /// Cria um link, limitando o peso a no máximo `1.0`.
    ///
    /// O chamador garante `weight > 0` (o store rejeita o resto).
    pub fn new(weight: f64, kind: LinkKind) -> Self {
        Self {
            weight: weight.min(1.0),
            kind,
        }
    }

    /// `true` se o peso ainda está acima do piso de decaimento.
    pub fn is_alive(&self) -> bool {
        self.weight >= WEIGHT_FLOOR
    }
}
