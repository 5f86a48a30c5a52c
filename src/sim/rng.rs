//! # SimRng — A Única Fonte de Acaso
//!
//! Todo sorteio do simulador passa por um único [`SimRng`], que pertence ao
//! contexto da simulação. Nada usa gerador global ou `thread_rng`.
//!
//! O gerador interno é um `ChaCha8Rng`: rápido, portável entre plataformas e
//! **serializável** (feature `serde1`), o que permite salvar o estado exato
//! no snapshot e retomar a trajetória bit a bit.
//!
//! Cada helper consome um número **fixo** de sorteios, para que a sequência
//! dependa só da ordem das chamadas.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimRng {
    seed: u64,
    inner: ChaCha8Rng,
}

impl SimRng {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed,
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Semente original (o estado atual fica em `inner`).
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniforme em `[0, 1)`. Um sorteio.
    pub fn unit(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// Uniforme em `[-1, 1)`. Um sorteio.
    pub fn signed(&mut self) -> f64 {
        self.unit() * 2.0 - 1.0
    }

    /// `true` com probabilidade `p`. Um sorteio.
    pub fn chance(&mut self, p: f64) -> bool {
        self.unit() < p
    }

    /// Inteiro uniforme em `[0, n)`; `0` se `n == 0`. Um sorteio.
    pub fn below(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        ((self.unit() * n as f64) as usize).min(n - 1)
    }

    /// Uniforme em `[lo, hi)`. Um sorteio.
    pub fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.unit()
    }

    /// Normal padrão via Box–Muller. Dois sorteios.
    pub fn gaussian(&mut self) -> f64 {
        let u1 = 1.0 - self.unit();
        let u2 = self.unit();
        (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }

    /// Índice sorteado proporcionalmente a `weights`. Um sorteio.
    ///
    /// Pesos negativos ou não finitos contam como zero; `None` se a soma é zero.
    pub fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        let weight_of = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
        let total: f64 = weights.iter().map(|&w| weight_of(w)).sum();
        if total <= 0.0 {
            return None;
        }
        let mut target = self.unit() * total;
        let mut last = None;
        for (index, &w) in weights.iter().enumerate() {
            let w = weight_of(w);
            if w <= 0.0 {
                continue;
            }
            if target < w {
                return Some(index);
            }
            target -= w;
            last = Some(index);
        }
        last
    }
}
