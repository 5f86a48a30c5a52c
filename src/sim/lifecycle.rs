//! Eventos de ciclo de vida: entradas, crescimento, captura, linhas de fuga,
//! reagrupamento e poda.
//!
//! | Evento | Gatilho | Cria | Remove |
//! |--------|---------|------|--------|
//! | entrada | timer | 1–3 nós + 1–3 arestas cada (no mínimo uma, se houver com quem) | — |
//! | crescimento | timer | lote de filhos | — |
//! | captura | todo tick | aresta local | — |
//! | linha de fuga | todo tick, raro | aresta `Bridge` | — |
//! | reagrupamento | timer | aresta intra-categoria | — |
//! | poda | timer | — | arestas fracas, nós isolados |

use crate::core::{LinkKind, NodeId, NodeSpec, Vec2};

use super::{SimMode, Simulation};

const ENTRY_CANDIDATES: usize = 8;
/// Fração dos limites do mundo onde entradas podem nascer.
const ENTRY_AREA: f64 = 0.8;
const WALK_STEPS: usize = 12;
const WALK_STOP: f64 = 0.35;

const GROWTH_SPREAD: f64 = 90.0;
const CHILD_WEIGHT: f64 = 0.6;
const SECOND_LINK_CHANCE: f64 = 0.35;
const SECOND_LINK_SAMPLES: usize = 6;
const SECOND_LINK_RADIUS: f64 = 140.0;
const SECOND_LINK_WEIGHT: f64 = 0.3;

const CAPTURE_SAMPLES: usize = 3;
const CAPTURE_RADIUS: f64 = 80.0;
const CAPTURE_CHANCE: f64 = 0.05;
const CAPTURE_SAME_CATEGORY: f64 = 3.0;
const CAPTURE_CROSS_CATEGORY: f64 = 0.4;
const CAPTURE_WEIGHT: f64 = 0.3;

const FLIGHT_CHANCE: f64 = 0.01;
const FLIGHT_CANDIDATES: usize = 6;
const FLIGHT_MIN_DISTANCE: f64 = 300.0;
const FLIGHT_WEIGHT: f64 = 0.12;
const FLIGHT_IMPULSE: f64 = 1.2;

const RECLUSTER_SAMPLES: usize = 12;
const RECLUSTER_CANDIDATES: usize = 6;
const RECLUSTER_NEAREST: usize = 2;
const RECLUSTER_RADIUS: f64 = 130.0;
const RECLUSTER_BOOST: f64 = 0.04;
const RECLUSTER_CREATE: f64 = 0.3;
const RECLUSTER_WEIGHT: f64 = 0.25;

/// Escala do esquecimento: taxa de decaimento = `forgetting · DECAY_SCALE`.
const DECAY_SCALE: f64 = 0.12;
/// Nós mais novos que isso (segundos) não são podados.
const PRUNE_GRACE: f64 = 4.0;
const PRUNE_PER_CYCLE: usize = 3;

impl Simulation {
    /// Passo 2: 1–3 nós de entrada em posições abertas.
    pub(super) fn spawn_entries(&mut self) -> Vec<NodeId> {
        let count = 1 + self.rng.below(3);
        let mut spawned = Vec::with_capacity(count);
        for _ in 0..count {
            if self.store.is_full() {
                break;
            }
            let position = self.open_position();
            let had_nodes = !self.store.is_empty();
            let Some(id) = self.store.insert_node(position, NodeSpec::anonymous().entry(true)) else {
                break;
            };
            if had_nodes {
                let links = 1 + self.rng.below(3);
                for _ in 0..links {
                    if let Some(target) = self.relevance_walk(id) {
                        let weight = self.rng.range(0.3, 0.6);
                        self.store.connect(id, target, weight);
                    }
                }
                // Passeios sem alvo: a entrada nunca nasce solta.
                if self.store.node(id).is_some_and(|node| node.is_isolated()) {
                    if let Some(target) = self.nearest_within(position, f64::INFINITY, id) {
                        let weight = self.rng.range(0.3, 0.6);
                        self.store.connect(id, target, weight);
                    }
                }
            }
            tracing::debug!(id, "Entrada criada");
            spawned.push(id);
        }
        spawned
    }

    /// Melhor de `ENTRY_CANDIDATES` posições: maximiza a distância mínima às casas.
    fn open_position(&mut self) -> Vec2 {
        let (hw, hh) = self.visual.half_extent();
        let homes: Vec<Vec2> = self
            .store
            .nodes()
            .filter(|n| n.is_home())
            .map(|n| n.pos)
            .collect();
        let mut best = Vec2::ZERO;
        let mut best_score = f64::NEG_INFINITY;
        for _ in 0..ENTRY_CANDIDATES {
            let candidate = Vec2::new(
                self.rng.signed() * hw * ENTRY_AREA,
                self.rng.signed() * hh * ENTRY_AREA,
            );
            let score = homes
                .iter()
                .map(|h| h.distance(candidate))
                .fold(f64::INFINITY, f64::min);
            if score > best_score {
                best_score = score;
                best = candidate;
            }
        }
        best
    }

    /// Passeio aleatório ponderado por `peso · relevância` a partir de um nó sorteado.
    ///
    /// Retorna um alvo diferente de `from` e ainda não ligado a ele.
    fn relevance_walk(&mut self, from: NodeId) -> Option<NodeId> {
        let n = self.store.len();
        if n < 2 {
            return None;
        }
        let mut current = self.store.node_at(self.rng.below(n))?.id;
        for _ in 0..WALK_STEPS {
            if current != from && self.rng.chance(WALK_STOP) {
                break;
            }
            let node = self.store.node(current)?;
            let (ids, weights): (Vec<NodeId>, Vec<f64>) = node
                .links()
                .filter(|(id, _)| *id != from)
                .filter_map(|(id, link)| {
                    self.store
                        .node(id)
                        .map(|next| (id, link.weight * (0.1 + next.relevance)))
                })
                .unzip();
            match self.rng.weighted_index(&weights) {
                Some(i) => current = ids[i],
                None => break,
            }
        }
        (current != from && !self.store.linked(from, current)).then_some(current)
    }

    /// Passo 3: lote de filhos em torno de pais.
    pub(super) fn grow(&mut self) -> Vec<NodeId> {
        let batch = 1 + (self.params.growth * 3.0).floor() as usize;
        let spread = GROWTH_SPREAD * (1.0 - 0.75 * self.params.clustering);
        let mut grown = Vec::with_capacity(batch);
        for _ in 0..batch {
            if self.store.is_full() {
                break;
            }
            let Some(parent) = self.pick_parent() else {
                break;
            };
            let Some(parent_node) = self.store.node(parent) else {
                break;
            };
            let parent_pos = parent_node.pos;
            let category = parent_node
                .category
                .and_then(|c| self.store.category_name(c))
                .map(str::to_owned);

            let offset = Vec2::new(self.rng.gaussian(), self.rng.gaussian()) * spread;
            let position = self.clamp_to_world(parent_pos + offset);
            let mut spec = NodeSpec::anonymous();
            spec.category = category;
            let Some(child) = self.store.insert_node(position, spec) else {
                break;
            };
            self.store.connect(child, parent, CHILD_WEIGHT);
            if self.rng.chance(SECOND_LINK_CHANCE) {
                if let Some(near) = self.nearest_sampled(child, SECOND_LINK_SAMPLES, SECOND_LINK_RADIUS) {
                    self.store.connect(child, near, SECOND_LINK_WEIGHT);
                }
            }
            grown.push(child);
        }
        if !grown.is_empty() {
            tracing::debug!(count = grown.len(), "Crescimento");
        }
        grown
    }

    /// Pai uniforme, ou com viés de hub: sorteia `m` candidatos e escolhe
    /// proporcionalmente a `(grau + 1)^(1 + 3·viés)`.
    fn pick_parent(&mut self) -> Option<NodeId> {
        let n = self.store.len();
        if n == 0 {
            return None;
        }
        let bias = self.params.hub_bias;
        if bias <= 0.0 {
            return self.store.node_at(self.rng.below(n)).map(|node| node.id);
        }
        let m = 2 + (bias * 4.0).round() as usize;
        let exponent = 1.0 + 3.0 * bias;
        let mut candidates = Vec::with_capacity(m);
        let mut weights = Vec::with_capacity(m);
        for _ in 0..m {
            if let Some(node) = self.store.node_at(self.rng.below(n)) {
                candidates.push(node.id);
                weights.push((node.degree() as f64 + 1.0).powf(exponent));
            }
        }
        self.rng.weighted_index(&weights).map(|i| candidates[i])
    }

    /// O mais próximo de `samples` nós sorteados dentro de `radius`, não ligado a `of`.
    fn nearest_sampled(&mut self, of: NodeId, samples: usize, radius: f64) -> Option<NodeId> {
        let n = self.store.len();
        let origin = self.store.node(of)?.pos;
        let mut best: Option<(NodeId, f64)> = None;
        for _ in 0..samples {
            let Some(node) = self.store.node_at(self.rng.below(n)) else {
                continue;
            };
            if node.id == of || self.store.linked(of, node.id) {
                continue;
            }
            let d = node.pos.distance(origin);
            if d < radius && best.map_or(true, |(_, bd)| d < bd) {
                best = Some((node.id, d));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Passo 5: nós isolados sorteados podem se ligar ao vizinho mais próximo.
    pub(super) fn capture(&mut self, k: f64) -> usize {
        if self.mode == SimMode::Query {
            return 0;
        }
        let isolated: Vec<NodeId> = self
            .store
            .nodes()
            .filter(|n| n.is_isolated() && !n.anchor)
            .map(|n| n.id)
            .collect();
        if isolated.is_empty() {
            return 0;
        }
        let mut captured = 0;
        for _ in 0..CAPTURE_SAMPLES {
            let id = isolated[self.rng.below(isolated.len())];
            let Some(node) = self.store.node(id) else {
                continue;
            };
            if !node.is_isolated() {
                continue;
            }
            let Some(target) = self.nearest_within(node.pos, CAPTURE_RADIUS, id) else {
                continue;
            };
            let same = self
                .store
                .node(target)
                .is_some_and(|t| t.shares_category(node));
            let boost = if same { CAPTURE_SAME_CATEGORY } else { CAPTURE_CROSS_CATEGORY };
            if self.rng.chance(CAPTURE_CHANCE * k * boost) {
                self.store.connect(id, target, CAPTURE_WEIGHT);
                tracing::debug!(id, target, "Captura");
                captured += 1;
            }
        }
        captured
    }

    /// Passo 6: aresta longa e fraca entre nós distantes, com impulso para fora.
    pub(super) fn lines_of_flight(&mut self, k: f64) -> usize {
        let n = self.store.len();
        if n < 2 || !self.rng.chance(self.params.flight * FLIGHT_CHANCE * k) {
            return 0;
        }
        let Some(origin) = self.store.node_at(self.rng.below(n)) else {
            return 0;
        };
        let (a, a_pos) = (origin.id, origin.pos);
        let query = self.mode == SimMode::Query;

        let mut best: Option<(NodeId, f64)> = None;
        for _ in 0..FLIGHT_CANDIDATES {
            let Some(candidate) = self.store.node_at(self.rng.below(n)) else {
                continue;
            };
            if candidate.id == a {
                continue;
            }
            if query && self.store.node(a).is_some_and(|o| o.shares_category(candidate)) {
                continue;
            }
            let d = candidate.pos.distance(a_pos);
            if best.map_or(true, |(_, bd)| d > bd) {
                best = Some((candidate.id, d));
            }
        }
        let Some((b, distance)) = best else {
            return 0;
        };
        if distance <= FLIGHT_MIN_DISTANCE || self.store.linked(a, b) {
            return 0;
        }
        if !self.store.connect_with_kind(a, b, FLIGHT_WEIGHT, LinkKind::Bridge) {
            return 0;
        }
        let b_pos = self.store.node(b).map_or(a_pos, |node| node.pos);
        let dir = (b_pos - a_pos).normalized_or_zero();
        if let Some(node) = self.store.node_mut(a) {
            if !node.anchor {
                node.vel -= dir * FLIGHT_IMPULSE;
            }
        }
        if let Some(node) = self.store.node_mut(b) {
            if !node.anchor {
                node.vel += dir * FLIGHT_IMPULSE;
            }
        }
        tracing::debug!(a, b, distance, "Linha de fuga");
        1
    }

    /// Passo 7: reforça arestas próximas; no modo orgânico, cria arestas
    /// intra-categoria com probabilidade proporcional ao agrupamento.
    pub(super) fn recluster(&mut self) -> usize {
        let n = self.store.len();
        if n < 2 {
            return 0;
        }
        let organic = self.mode == SimMode::Organic;
        let create_chance = RECLUSTER_CREATE * self.params.clustering;
        let mut touched = 0;
        for _ in 0..RECLUSTER_SAMPLES {
            let Some(node) = self.store.node_at(self.rng.below(n)) else {
                continue;
            };
            let (a, a_pos) = (node.id, node.pos);
            let mut near: Vec<(NodeId, f64)> = Vec::with_capacity(RECLUSTER_CANDIDATES);
            for _ in 0..RECLUSTER_CANDIDATES {
                let Some(candidate) = self.store.node_at(self.rng.below(n)) else {
                    continue;
                };
                let d = candidate.pos.distance(a_pos);
                if candidate.id != a && d < RECLUSTER_RADIUS && !near.iter().any(|(id, _)| *id == candidate.id) {
                    near.push((candidate.id, d));
                }
            }
            near.sort_by(|x, y| x.1.total_cmp(&y.1));
            for &(b, _) in near.iter().take(RECLUSTER_NEAREST) {
                if self.store.linked(a, b) {
                    self.store.strengthen(a, b, RECLUSTER_BOOST);
                    touched += 1;
                } else if organic {
                    let same = match (self.store.node(a), self.store.node(b)) {
                        (Some(x), Some(y)) => x.shares_category(y),
                        _ => false,
                    };
                    if same && self.rng.chance(create_chance) {
                        self.store.connect(a, b, RECLUSTER_WEIGHT);
                        touched += 1;
                    }
                }
            }
        }
        touched
    }

    /// Passo 8: decaimento de todas as arestas e poda limitada de isolados.
    ///
    /// Retorna `(arestas removidas, nós removidos)`.
    pub(super) fn decay_prune(&mut self) -> (usize, Vec<NodeId>) {
        let rate = self.params.forgetting * DECAY_SCALE;
        let pruned_edges = if rate > 0.0 { self.store.decay_all(rate) } else { 0 };
        let candidates: Vec<NodeId> = self
            .store
            .nodes()
            .filter(|n| n.is_isolated() && !n.anchor && !n.user_placed && n.age >= PRUNE_GRACE)
            .map(|n| n.id)
            .collect();
        let removed = self.store.remove_if_isolated(&candidates, PRUNE_PER_CYCLE);
        if pruned_edges > 0 || !removed.is_empty() {
            tracing::debug!(pruned_edges, removed = removed.len(), "Decaimento");
        }
        (pruned_edges, removed)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::{LinkKind, NodeSpec, Vec2};
    use crate::sim::{SimMode, SimParams, Simulation, VisualParams};

    fn sim_with(params: SimParams) -> Simulation {
        Simulation::new(21, 200, params, VisualParams::default())
    }

    #[test]
    fn growth_children_inherit_parent_category() {
        let mut sim = sim_with(SimParams {
            growth: 1.0,
            ..SimParams::default()
        });
        let parent = sim
            .store_mut()
            .insert_node(Vec2::ZERO, NodeSpec::labelled("raiz").with_category("bio"))
            .unwrap();
        let grown = sim.grow();
        assert_eq!(grown.len(), 4);
        let store = sim.store();
        for id in grown {
            let child = store.node(id).unwrap();
            assert_eq!(child.category, store.node(parent).unwrap().category);
            assert!(child.degree() >= 1);
        }
        store.check_invariants().unwrap();
    }

    #[test]
    fn entries_are_marked_and_wired() {
        let mut sim = sim_with(SimParams::default());
        let a = sim.store_mut().insert_node(Vec2::ZERO, NodeSpec::anonymous()).unwrap();
        let b = sim
            .store_mut()
            .insert_node(Vec2::new(10.0, 0.0), NodeSpec::anonymous())
            .unwrap();
        sim.store_mut().connect(a, b, 0.5);
        let spawned = sim.spawn_entries();
        assert!((1..=3).contains(&spawned.len()));
        for id in spawned {
            assert!(sim.store().node(id).unwrap().entry);
        }
        sim.store().check_invariants().unwrap();
    }

    /// Mesmo quando o passeio não acha alvo, toda entrada nasce ligada
    #[test]
    fn entries_never_spawn_isolated() {
        for seed in 0..64 {
            let mut sim = Simulation::new(seed, 50, SimParams::default(), VisualParams::default());
            sim.store_mut().insert_node(Vec2::ZERO, NodeSpec::anonymous()).unwrap();
            for id in sim.spawn_entries() {
                assert!(!sim.store().node(id).unwrap().is_isolated(), "seed {seed}: entrada {id} solta");
            }
            sim.store().check_invariants().unwrap();
        }
    }

    fn hub_picks(hub_bias: f64) -> usize {
        let mut sim = sim_with(SimParams {
            hub_bias,
            ..SimParams::default()
        });
        let hub = sim.store_mut().insert_node(Vec2::ZERO, NodeSpec::anonymous()).unwrap();
        for i in 0..10 {
            let leaf = sim
                .store_mut()
                .insert_node(Vec2::new(10.0 * f64::from(i), 50.0), NodeSpec::anonymous())
                .unwrap();
            sim.store_mut().connect(hub, leaf, 0.5);
        }
        (0..2000).filter(|_| sim.pick_parent() == Some(hub)).count()
    }

    /// Viés de hub alto favorece pais de grau alto; sem viés o sorteio é uniforme
    #[test]
    fn hub_bias_favours_high_degree_parents() {
        let uniform = hub_picks(0.0);
        let biased = hub_picks(1.0);
        assert!(uniform > 100 && uniform < 300, "uniforme: {uniform}");
        assert!(biased > 2 * uniform, "com viés: {biased}, uniforme: {uniform}");
    }

    fn capture_sim(seed: u64, left: &str, right: &str) -> Simulation {
        let mut sim = Simulation::new(seed, 10, SimParams::default(), VisualParams::default());
        sim.store_mut()
            .insert_node(Vec2::ZERO, NodeSpec::labelled("a").with_category(left))
            .unwrap();
        sim.store_mut()
            .insert_node(Vec2::new(40.0, 0.0), NodeSpec::labelled("b").with_category(right))
            .unwrap();
        sim
    }

    /// Um isolado perto de outro nó acaba capturado por ele
    #[test]
    fn nearby_isolated_node_gets_captured() {
        let mut sim = capture_sim(3, "x", "y");
        let mut captured = 0;
        for _ in 0..500 {
            captured += sim.capture(1.0);
            if captured > 0 {
                break;
            }
        }
        assert_eq!(captured, 1);
        let store = sim.store();
        let (a, b) = (store.find_by_label("a").unwrap(), store.find_by_label("b").unwrap());
        assert!(store.linked(a, b));
        assert_eq!(store.edges()[0].kind, LinkKind::Local);
    }

    #[test]
    fn capture_is_likelier_within_a_category() {
        let captured_in_one_call = |left: &str, right: &str| {
            (0..300u64)
                .filter(|&seed| capture_sim(seed, left, right).capture(1.0) > 0)
                .count()
        };
        let same = captured_in_one_call("x", "x");
        let cross = captured_in_one_call("x", "y");
        assert!(same > 3 * cross, "mesma categoria: {same}, cruzada: {cross}");
    }

    /// Longe demais (além do raio de captura) nada acontece
    #[test]
    fn distant_isolated_nodes_are_not_captured() {
        let mut sim = Simulation::new(3, 10, SimParams::default(), VisualParams::default());
        sim.store_mut().insert_node(Vec2::ZERO, NodeSpec::anonymous()).unwrap();
        sim.store_mut()
            .insert_node(Vec2::new(200.0, 0.0), NodeSpec::anonymous())
            .unwrap();
        for _ in 0..500 {
            assert_eq!(sim.capture(1.0), 0);
        }
    }

    /// Com propensão máxima e nós distantes, uma linha de fuga acaba surgindo
    #[test]
    fn flights_create_bridge_edges() {
        let mut sim = sim_with(SimParams {
            flight: 1.0,
            ..SimParams::default()
        });
        sim.store_mut()
            .insert_node(Vec2::new(-700.0, 0.0), NodeSpec::anonymous())
            .unwrap();
        sim.store_mut()
            .insert_node(Vec2::new(700.0, 0.0), NodeSpec::anonymous())
            .unwrap();
        let mut created = 0;
        for _ in 0..2000 {
            created += sim.lines_of_flight(2.0);
            if created > 0 {
                break;
            }
        }
        assert_eq!(created, 1);
        let edges = sim.store().edges();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].kind, LinkKind::Bridge);
    }

    #[test]
    fn query_mode_flights_need_different_categories() {
        let mut sim = sim_with(SimParams {
            flight: 1.0,
            ..SimParams::default()
        });
        sim.set_mode(SimMode::Query);
        sim.store_mut()
            .insert_node(Vec2::new(-700.0, 0.0), NodeSpec::labelled("a").with_category("x"))
            .unwrap();
        sim.store_mut()
            .insert_node(Vec2::new(700.0, 0.0), NodeSpec::labelled("b").with_category("x"))
            .unwrap();
        for _ in 0..2000 {
            assert_eq!(sim.lines_of_flight(2.0), 0);
        }
    }

    #[test]
    fn decay_respects_grace_period() {
        let mut sim = sim_with(SimParams {
            forgetting: 1.0,
            ..SimParams::default()
        });
        let young = sim.store_mut().insert_node(Vec2::ZERO, NodeSpec::anonymous()).unwrap();
        let (_, removed) = sim.decay_prune();
        assert!(removed.is_empty());
        sim.store_mut().node_mut(young).unwrap().age = 10.0;
        let (_, removed) = sim.decay_prune();
        assert_eq!(removed, vec![young]);
    }

    #[test]
    fn recluster_strengthens_close_edges() {
        let mut sim = sim_with(SimParams::default());
        let a = sim.store_mut().insert_node(Vec2::ZERO, NodeSpec::anonymous()).unwrap();
        let b = sim
            .store_mut()
            .insert_node(Vec2::new(20.0, 0.0), NodeSpec::anonymous())
            .unwrap();
        sim.store_mut().connect(a, b, 0.5);
        let touched = sim.recluster();
        assert!(touched > 0);
        assert!(sim.store().link(a, b).unwrap().weight > 0.5);
    }
}
