//! # GraphStore — A Arena do Grafo Vivo
//!
//! O [`GraphStore`] é o **dono canônico** de todos os nós e arestas. Toda
//! mutação estrutural passa por aqui, e as invariantes são garantidas num
//! único lugar:
//!
//! - **Espelho**: `A` tem `B` com peso `w` ⇔ `B` tem `A` com peso `w` (igualdade exata)
//! - **Sem laços**: nenhum nó aparece na própria vizinhança
//! - **Peso**: sempre em `(0, 1]`
//! - **Sem referências pendentes**: remover um nó limpa as duas metades de cada aresta
//! - **Labels únicos**: o índice de labels usa a chave normalizada de [`label_key`]
//!
//! ## Armazenamento
//!
//! - **Nós**: `IndexMap<NodeId, Node>` — busca O(1) por id e ordem de
//!   iteração determinística (essencial para a reprodutibilidade do simulador)
//! - **Categorias**: `IndexSet<String>` — interner; nós guardam só o índice
//! - **Labels**: `HashMap<String, NodeId>` — só consulta, nunca iterado
//!
//! ## Violações Benignas
//!
//! Conectar um nó a si mesmo ou a um id inexistente é tratado como **no-op**
//! (retorna `false`), nunca como erro: durante o streaming, referências por
//! label podem apontar para nós que já foram podados.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use unicode_normalization::UnicodeNormalization;

use super::link::{Link, LinkKind, WEIGHT_FLOOR};
use super::node::{clamp_unit, CategoryId, Node, NodeId, NodeSpec, Vec2};

/// Chave de deduplicação de labels: NFC, sem espaços nas pontas, minúsculas.
///
/// "Café", "café " e "Cafe\u{301}" produzem a mesma chave.
pub fn label_key(label: &str) -> String {
    label.trim().nfc().collect::<String>().to_lowercase()
}

/// Aresta reportada uma única vez (`source < target`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeView {
    pub source: NodeId,
    pub target: NodeId,
    pub weight: f64,
    pub kind: LinkKind,
}

/// Arena de nós com arestas espelhadas.
#[derive(Clone, Debug)]
pub struct GraphStore {
    nodes: IndexMap<NodeId, Node>,
    next_id: NodeId,
    max_nodes: usize,
    categories: IndexSet<String>,
    labels: HashMap<String, NodeId>,
}

impl GraphStore {
    /// Cria um store vazio com capacidade máxima de `max_nodes` nós.
    pub fn new(max_nodes: usize) -> Self {
        Self {
            nodes: IndexMap::new(),
            next_id: 0,
            max_nodes,
            categories: IndexSet::new(),
            labels: HashMap::new(),
        }
    }

    /// Reconstrói um store a partir de partes serializadas.
    ///
    /// Valida ids, categorias, labels e o espelho das arestas.
    pub(crate) fn from_parts(
        max_nodes: usize,
        next_id: NodeId,
        categories: Vec<String>,
        nodes: Vec<Node>,
    ) -> Result<Self, String> {
        let mut store = Self::new(max_nodes);
        store.next_id = next_id;
        store.categories = categories.into_iter().collect();
        for node in nodes {
            if node.id >= next_id {
                return Err(format!("node {} is not below next_id {}", node.id, next_id));
            }
            if let Some(category) = node.category {
                if usize::from(category) >= store.categories.len() {
                    return Err(format!("node {} has unknown category {}", node.id, category));
                }
            }
            let id = node.id;
            if store.nodes.insert(id, node).is_some() {
                return Err(format!("duplicate node id {id}"));
            }
        }
        store.rebuild_label_index()?;
        store.check_invariants()?;
        Ok(store)
    }

    /// Reconstrói o índice de labels a partir dos nós.
    ///
    /// Chamado após restaurar um snapshot (o índice não é serializado).
    fn rebuild_label_index(&mut self) -> Result<(), String> {
        self.labels.clear();
        for node in self.nodes.values() {
            if let Some(label) = &node.label {
                if self.labels.insert(label_key(label), node.id).is_some() {
                    return Err(format!("duplicate label {label:?}"));
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    pub fn set_max_nodes(&mut self, max_nodes: usize) {
        self.max_nodes = max_nodes;
    }

    /// `true` quando novas inserções seriam descartadas.
    pub fn is_full(&self) -> bool {
        self.nodes.len() >= self.max_nodes
    }

    /// Próximo id a ser atribuído.
    pub fn next_id(&self) -> NodeId {
        self.next_id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Acesso mutável a posição, velocidade e atributos (não à vizinhança).
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.values()
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> + '_ {
        self.nodes.values_mut()
    }

    /// Nó na posição `index` da ordem de iteração.
    pub fn node_at(&self, index: usize) -> Option<&Node> {
        self.nodes.get_index(index).map(|(_, node)| node)
    }

    pub(crate) fn node_at_mut(&mut self, index: usize) -> Option<&mut Node> {
        self.nodes.get_index_mut(index).map(|(_, node)| node)
    }

    /// Posição de `id` na ordem de iteração.
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.nodes.get_index_of(&id)
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Busca por label, usando a chave normalizada.
    pub fn find_by_label(&self, label: &str) -> Option<NodeId> {
        self.labels.get(&label_key(label)).copied()
    }

    /// Nome de uma categoria interna.
    pub fn category_name(&self, category: CategoryId) -> Option<&str> {
        self.categories
            .get_index(usize::from(category))
            .map(String::as_str)
    }

    /// Categorias na ordem em que apareceram.
    pub fn categories(&self) -> impl Iterator<Item = &str> + '_ {
        self.categories.iter().map(String::as_str)
    }

    /// Índice de `name`, internando se for nova. `None` se o interner já
    /// esgotou o espaço de [`CategoryId`].
    fn intern_category(&mut self, name: &str) -> Option<CategoryId> {
        if let Some(index) = self.categories.get_index_of(name) {
            return CategoryId::try_from(index).ok();
        }
        let id = CategoryId::try_from(self.categories.len()).ok()?;
        self.categories.insert(name.to_owned());
        Some(id)
    }

    /// Insere um nó e retorna seu id.
    ///
    /// Retorna `None` (sem erro) quando:
    /// - a capacidade máxima foi atingida (orçamento visual, não falha)
    /// - o label já existe (a deduplicação é responsabilidade do chamador)
    /// - o label é vazio após normalização
    /// - a categoria é nova e não cabe mais no interner
    pub fn insert_node(&mut self, position: Vec2, spec: NodeSpec) -> Option<NodeId> {
        if self.is_full() {
            tracing::debug!(max = self.max_nodes, "Store cheio, inserção descartada");
            return None;
        }
        let key = match spec.label.as_deref() {
            Some(label) => {
                let key = label_key(label);
                if key.is_empty() || self.labels.contains_key(&key) {
                    tracing::debug!(label = %label, "Label vazio ou duplicado, inserção descartada");
                    return None;
                }
                Some(key)
            }
            None => None,
        };
        let category = match spec.category.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => match self.intern_category(name) {
                Some(category) => Some(category),
                None => {
                    tracing::warn!(category = %name, "Interner de categorias cheio, inserção descartada");
                    return None;
                }
            },
            _ => None,
        };
        let position = if position.x.is_finite() && position.y.is_finite() {
            position
        } else {
            Vec2::ZERO
        };

        let id = self.next_id;
        self.next_id += 1;
        if let Some(key) = key {
            self.labels.insert(key, id);
        }
        let node = Node::new(id, position, spec, category);
        tracing::debug!(id, label = ?node.label, "Store: nó inserido");
        self.nodes.insert(id, node);
        Some(id)
    }

    /// Link de `a` para `b`, se a aresta existir.
    pub fn link(&self, a: NodeId, b: NodeId) -> Option<&Link> {
        self.nodes.get(&a).and_then(|node| node.links.get(&b))
    }

    pub fn linked(&self, a: NodeId, b: NodeId) -> bool {
        self.link(a, b).is_some()
    }

    /// Conecta `a` e `b` com peso `weight`.
    ///
    /// Idempotente: se a aresta já existe, só o peso é substituído (o tipo
    /// é preservado). Novas arestas são [`LinkKind::Local`].
    pub fn connect(&mut self, a: NodeId, b: NodeId, weight: f64) -> bool {
        let kind = self.link(a, b).map(|link| link.kind).unwrap_or_default();
        self.connect_with_kind(a, b, weight, kind)
    }

    /// Conecta `a` e `b` com peso e tipo explícitos.
    ///
    /// No-op (retorna `false`) para laços, ids inexistentes ou peso `≤ 0`.
    pub fn connect_with_kind(&mut self, a: NodeId, b: NodeId, weight: f64, kind: LinkKind) -> bool {
        if a == b || !(weight > 0.0) || !self.contains(a) || !self.contains(b) {
            tracing::debug!(a, b, weight, "Store: conexão inválida ignorada");
            return false;
        }
        let link = Link::new(weight, kind);
        if let Some(node) = self.nodes.get_mut(&a) {
            node.links.insert(b, link);
        }
        if let Some(node) = self.nodes.get_mut(&b) {
            node.links.insert(a, link);
        }
        true
    }

    /// Soma `delta` ao peso de uma aresta existente, limitando a `1.0`.
    ///
    /// Se o resultado cair abaixo de [`WEIGHT_FLOOR`], a aresta é removida.
    /// Retorna `false` se a aresta não existe.
    pub fn strengthen(&mut self, a: NodeId, b: NodeId, delta: f64) -> bool {
        let Some(current) = self.link(a, b).copied() else {
            return false;
        };
        let weight = (current.weight + delta).min(1.0);
        if !(weight >= WEIGHT_FLOOR) {
            return self.disconnect(a, b);
        }
        self.connect_with_kind(a, b, weight, current.kind)
    }

    /// Remove a aresta `a–b` dos dois lados.
    pub fn disconnect(&mut self, a: NodeId, b: NodeId) -> bool {
        let removed = self
            .nodes
            .get_mut(&a)
            .and_then(|node| node.links.swap_remove(&b))
            .is_some();
        if let Some(node) = self.nodes.get_mut(&b) {
            node.links.swap_remove(&a);
        }
        removed
    }

    /// Multiplica todo peso por `(1 - rate)` e remove arestas abaixo do piso.
    ///
    /// O(arestas). As duas metades sofrem a mesma operação em ponto
    /// flutuante, então o espelho continua exato. Retorna quantas arestas
    /// foram removidas.
    pub fn decay_all(&mut self, rate: f64) -> usize {
        let factor = 1.0 - clamp_unit(rate);
        let mut removed_halves = 0;
        for node in self.nodes.values_mut() {
            let before = node.links.len();
            node.links.retain(|_, link| {
                link.weight *= factor;
                link.is_alive()
            });
            removed_halves += before - node.links.len();
        }
        removed_halves / 2
    }

    /// Remove um nó e todas as referências espelhadas a ele.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let node = self.nodes.swap_remove(&id)?;
        for neighbor in node.links.keys() {
            if let Some(other) = self.nodes.get_mut(neighbor) {
                other.links.swap_remove(&id);
            }
        }
        if let Some(label) = &node.label {
            let key = label_key(label);
            if self.labels.get(&key) == Some(&id) {
                self.labels.remove(&key);
            }
        }
        tracing::debug!(id, label = ?node.label, "Store: nó removido");
        Some(node)
    }

    /// Remove até `max_per_tick` candidatos que estejam isolados, não sejam
    /// âncoras e não tenham sido colocados pelo usuário.
    ///
    /// O limite por tick evita que muitos nós "estourem" de uma vez na tela.
    pub fn remove_if_isolated(&mut self, candidates: &[NodeId], max_per_tick: usize) -> Vec<NodeId> {
        let mut removed = Vec::new();
        for &id in candidates {
            if removed.len() >= max_per_tick {
                break;
            }
            let removable = self
                .nodes
                .get(&id)
                .is_some_and(|node| node.is_isolated() && !node.anchor && !node.user_placed);
            if removable && self.remove_node(id).is_some() {
                removed.push(id);
            }
        }
        removed
    }

    /// Número de arestas (cada aresta contada uma vez).
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(Node::degree).sum::<usize>() / 2
    }

    /// Lista deduplicada de arestas: cada uma reportada uma vez, com `source < target`.
    pub fn edges(&self) -> Vec<EdgeView> {
        let mut edges = Vec::with_capacity(self.edge_count());
        for node in self.nodes.values() {
            for (&other, link) in &node.links {
                if node.id < other {
                    edges.push(EdgeView {
                        source: node.id,
                        target: other,
                        weight: link.weight,
                        kind: link.kind,
                    });
                }
            }
        }
        edges
    }

    /// Verifica todas as invariantes estruturais.
    ///
    /// Usado na restauração de snapshots e nos testes.
    pub fn check_invariants(&self) -> Result<(), String> {
        for node in self.nodes.values() {
            for (&other, link) in &node.links {
                if other == node.id {
                    return Err(format!("self-loop on node {}", node.id));
                }
                if !(link.weight > 0.0 && link.weight <= 1.0) {
                    return Err(format!("weight {} out of range on {}–{}", link.weight, node.id, other));
                }
                let Some(peer) = self.nodes.get(&other) else {
                    return Err(format!("node {} references missing node {}", node.id, other));
                };
                if peer.links.get(&node.id) != Some(link) {
                    return Err(format!("edge {}–{} is not mirrored", node.id, other));
                }
            }
        }
        for (key, id) in &self.labels {
            let matches = self
                .nodes
                .get(id)
                .and_then(|node| node.label.as_deref())
                .is_some_and(|label| label_key(label) == *key);
            if !matches {
                return Err(format!("label index entry {key:?} is stale"));
            }
        }
        Ok(())
    }
}
