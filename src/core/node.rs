//! # Node — Ponto do Rizoma
//!
//! Um [`Node`] é a unidade espacial e semântica do grafo. Ele carrega:
//!
//! - **Identidade**: `id` inteiro, atribuído em ordem crescente e nunca reutilizado
//! - **Física**: `pos`, `vel` (coordenadas de mundo, origem no centro)
//! - **Vitalidade**: `heat` em `[0, 1]`, que esfria a cada tick, e `age` em segundos
//! - **Papéis**: `entry` (semente), `anchor` (fixo, nunca podado), `user_placed`
//! - **Semântica** (opcional): label, descrição, categoria, relevância, popularidade
//! - **Vizinhança**: mapa `vizinho → Link`, mantido espelhado pelo [`GraphStore`](super::GraphStore)
//!
//! ## Ciclo de Vida
//!
//! ```text
//! ingestão / usuário / entrada / crescimento
//!        │
//!        ▼
//!   🔥 heat = 1.0 ──(esfria a cada tick)──▶ 🌑 heat → 0
//!        │
//!        └── sem arestas + não âncora + não do usuário ──▶ ✂️ podado
//! ```

use std::ops::{Add, AddAssign, Mul, MulAssign, Sub, SubAssign};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::link::Link;

/// Identificador estável de um nó. Nunca reutilizado dentro de um grafo.
pub type NodeId = u64;

/// Índice de uma categoria no interner do [`GraphStore`](super::GraphStore).
pub type CategoryId = u16;

/// Vetor 2D em coordenadas de mundo.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Ponto a `radius` da origem no ângulo `angle` (radianos).
    pub fn from_angle(angle: f64, radius: f64) -> Self {
        Self {
            x: angle.cos() * radius,
            y: angle.sin() * radius,
        }
    }

    pub fn length_sq(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(self) -> f64 {
        self.length_sq().sqrt()
    }

    pub fn distance(self, other: Vec2) -> f64 {
        (other - self).length()
    }

    /// Vetor unitário na mesma direção, ou zero se o comprimento for desprezível.
    pub fn normalized_or_zero(self) -> Vec2 {
        let len = self.length();
        if len > 1e-9 {
            self * (1.0 / len)
        } else {
            Vec2::ZERO
        }
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl MulAssign<f64> for Vec2 {
    fn mul_assign(&mut self, rhs: f64) {
        self.x *= rhs;
        self.y *= rhs;
    }
}

/// Descrição de um nó a ser inserido via [`GraphStore::insert_node`](super::GraphStore::insert_node).
///
/// Campos omitidos assumem os padrões do contrato de ingestão:
/// relevância e popularidade `0.5`, calor inicial `1.0`.
#[derive(Clone, Debug)]
pub struct NodeSpec {
    pub label: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub relevance: f64,
    pub popularity: f64,
    pub entry: bool,
    pub anchor: bool,
    pub user_placed: bool,
    pub heat: f64,
}

impl Default for NodeSpec {
    fn default() -> Self {
        Self {
            label: None,
            description: None,
            category: None,
            relevance: 0.5,
            popularity: 0.5,
            entry: false,
            anchor: false,
            user_placed: false,
            heat: 1.0,
        }
    }
}

impl NodeSpec {
    /// Nó anônimo (crescimento orgânico, entradas espontâneas).
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Nó com label, a chave de deduplicação do grafo.
    pub fn labelled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_relevance(mut self, relevance: f64) -> Self {
        self.relevance = relevance;
        self
    }

    pub fn with_popularity(mut self, popularity: f64) -> Self {
        self.popularity = popularity;
        self
    }

    pub fn entry(mut self, entry: bool) -> Self {
        self.entry = entry;
        self
    }

    pub fn anchor(mut self) -> Self {
        self.anchor = true;
        self
    }

    pub fn user_placed(mut self) -> Self {
        self.user_placed = true;
        self
    }
}

/// Nó do grafo vivo.
///
/// A vizinhança (`links`) é privada ao crate: só o
/// [`GraphStore`](super::GraphStore) a altera, sempre dos dois lados.
#[derive(Clone, Debug)]
pub struct Node {
    /// Identificador estável.
    pub id: NodeId,
    /// Posição em coordenadas de mundo.
    pub pos: Vec2,
    /// Velocidade em unidades de mundo por frame de referência (1/60 s).
    pub vel: Vec2,
    /// Sinal visual de recência, em `[0, 1]`.
    pub heat: f64,
    /// Nó semente (entrada espontânea ou marcado `isEntry` na ingestão).
    pub entry: bool,
    /// Nó fixo: não se move e nunca é podado.
    pub anchor: bool,
    /// Colocado pelo usuário: nunca é podado.
    pub user_placed: bool,
    /// Segundos de simulação desde a criação.
    pub age: f64,
    pub label: Option<String>,
    pub description: Option<String>,
    pub category: Option<CategoryId>,
    /// Relevância externa, em `[0, 1]`.
    pub relevance: f64,
    /// Popularidade externa, em `[0, 1]`.
    pub popularity: f64,
    pub(crate) links: IndexMap<NodeId, Link>,
}

impl Node {
    pub(crate) fn new(id: NodeId, pos: Vec2, spec: NodeSpec, category: Option<CategoryId>) -> Self {
        Self {
            id,
            pos,
            vel: Vec2::ZERO,
            heat: spec.heat.clamp(0.0, 1.0),
            entry: spec.entry,
            anchor: spec.anchor,
            user_placed: spec.user_placed,
            age: 0.0,
            label: spec.label,
            description: spec.description,
            category,
            relevance: clamp_unit(spec.relevance),
            popularity: clamp_unit(spec.popularity),
            links: IndexMap::new(),
        }
    }

    /// Número de vizinhos.
    pub fn degree(&self) -> usize {
        self.links.len()
    }

    pub fn is_isolated(&self) -> bool {
        self.links.is_empty()
    }

    /// Centro de atração local: âncoras e nós de entrada.
    pub fn is_home(&self) -> bool {
        self.anchor || self.entry
    }

    /// Link para `other`, se a aresta existir.
    pub fn link_to(&self, other: NodeId) -> Option<&Link> {
        self.links.get(&other)
    }

    /// Vizinhos na ordem de criação das arestas.
    pub fn links(&self) -> impl Iterator<Item = (NodeId, &Link)> + '_ {
        self.links.iter().map(|(id, link)| (*id, link))
    }

    /// `true` se ambos têm categoria e ela é a mesma.
    pub fn shares_category(&self, other: &Node) -> bool {
        matches!((self.category, other.category), (Some(a), Some(b)) if a == b)
    }
}

/// Limita a `[0, 1]`, tratando NaN como zero.
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
