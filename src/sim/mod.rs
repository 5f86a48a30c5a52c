//! # Módulo Sim — O Simulador de Forças
//!
//! O [`Simulation`] é o **contexto explícito** da simulação: é dono do
//! [`GraphStore`], do único gerador aleatório ([`SimRng`]), dos parâmetros,
//! dos timers e dos buffers de trabalho. Não existe estado global.
//!
//! ## Um Tick
//!
//! ```text
//! Δt (limitado a 33 ms, k = Δt·60)
//!  │
//!  ├─ 1. timers ─────────── entrada / crescimento / decaimento / reagrupamento
//!  ├─ 2. entradas ───────── 1–3 nós em posições abertas + passeio por relevância
//!  ├─ 3. crescimento ────── filhos gaussianos em torno de pais (viés de hub)
//!  ├─ 4. forças ─────────── amortecimento, deriva, molas, atração, repulsão
//!  ├─ 5. captura ────────── nós isolados podem se ligar a um vizinho próximo
//!  ├─ 6. linhas de fuga ─── arestas Bridge longas e fracas + impulso
//!  ├─ 7. reagrupamento ──── reforça arestas próximas / cria intra-categoria
//!  ├─ 8. decaimento ─────── pesos × (1 − taxa), poda de isolados
//!  └─ 9. integração ─────── velocidade → posição, limites, calor
//! ```
//!
//! ## Determinismo
//!
//! Mesma semente + mesma sequência de `(Δt, parâmetros)` ⇒ trajetória
//! **bit a bit idêntica**. Para isso:
//! - todo sorteio passa por `self.rng`, sempre na mesma ordem
//! - toda iteração sobre nós/arestas segue a ordem de um `IndexMap`
//! - nenhum `HashMap` é iterado num caminho do simulador
//!
//! ## Submódulos
//!
//! | Arquivo | Conteúdo |
//! |---------|----------|
//! | `params.rs` | [`SimParams`], [`VisualParams`], [`SimMode`] |
//! | `rng.rs` | [`SimRng`] |
//! | `forces.rs` | passo 4 e integração (passo 9) |
//! | `lifecycle.rs` | passos 2, 3, 5, 6, 7 e 8 |
//! | `snapshot.rs` | [`SimulationSnapshot`] — salvar e retomar |

pub mod params;
pub mod rng;
pub mod snapshot;

mod forces;
mod lifecycle;

use serde::{Deserialize, Serialize};

use crate::analytics::GraphView;
use crate::core::{GraphStore, NodeId, NodeSpec, RenderFrame, Vec2};

pub use params::{ParamUpdate, SimMode, SimParams, VisualParams};
pub use rng::SimRng;
pub use snapshot::{LinkEntry, NodeSnapshot, SimulationSnapshot};

/// Maior Δt aceito por tick (segundos).
pub const MAX_DT: f64 = 0.033;

/// Frames de referência por segundo: `k = Δt · REFERENCE_FPS`.
const REFERENCE_FPS: f64 = 60.0;

const DECAY_PERIOD: f64 = 2.5;
const RECLUSTER_PERIOD: f64 = 1.5;

/// Raio em que um nó colocado pelo usuário procura um vizinho.
const USER_LINK_RADIUS: f64 = 160.0;
const USER_LINK_WEIGHT: f64 = 0.5;

/// Acumuladores dos quatro eventos periódicos (segundos).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Timers {
    pub entry: f64,
    pub growth: f64,
    pub decay: f64,
    pub recluster: f64,
}

#[derive(Clone, Copy, Debug, Default)]
struct Fired {
    entry: bool,
    growth: bool,
    decay: bool,
    recluster: bool,
}

/// Resumo do que aconteceu em um tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    /// Δt efetivamente usado (após o limite).
    pub dt: f64,
    pub spawned: Vec<NodeId>,
    pub grown: Vec<NodeId>,
    pub captured: usize,
    pub flights: usize,
    pub reclustered: usize,
    pub pruned_edges: usize,
    pub removed: Vec<NodeId>,
}

/// Contexto da simulação: store, RNG, parâmetros, timers e buffers.
#[derive(Clone, Debug)]
pub struct Simulation {
    store: GraphStore,
    params: SimParams,
    visual: VisualParams,
    mode: SimMode,
    rng: SimRng,
    timers: Timers,
    elapsed: f64,
    ticks: u64,
    /// Buffer de acelerações, reutilizado entre ticks.
    accel: Vec<Vec2>,
}

impl Simulation {
    pub fn new(seed: u64, max_nodes: usize, params: SimParams, visual: VisualParams) -> Self {
        Self {
            store: GraphStore::new(max_nodes),
            params: params.clamped(),
            visual: visual.clamped(),
            mode: SimMode::Organic,
            rng: SimRng::seeded(seed),
            timers: Timers::default(),
            elapsed: 0.0,
            ticks: 0,
            accel: Vec::new(),
        }
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut GraphStore {
        &mut self.store
    }

    pub fn params(&self) -> SimParams {
        self.params
    }

    /// Substitui os parâmetros (limitados a `[0, 1]`). Vale no próximo tick.
    pub fn set_params(&mut self, params: SimParams) {
        self.params = params.clamped();
        tracing::debug!(params = ?self.params, "Parâmetros atualizados");
    }

    /// Aplica uma atualização parcial e retorna os parâmetros resultantes.
    pub fn update_params(&mut self, update: &ParamUpdate) -> SimParams {
        self.set_params(update.apply(self.params));
        self.params
    }

    pub fn visual(&self) -> VisualParams {
        self.visual
    }

    pub fn set_visual(&mut self, visual: VisualParams) {
        self.visual = visual.clamped();
    }

    pub fn mode(&self) -> SimMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SimMode) {
        if self.mode != mode {
            tracing::info!(?mode, "Modo da simulação alterado");
        }
        self.mode = mode;
    }

    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Segundos de simulação acumulados.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn timers(&self) -> Timers {
        self.timers
    }

    /// Cria uma âncora: nó fixo, centro de atração, nunca podado.
    pub fn add_anchor(&mut self, position: Vec2, label: Option<&str>) -> Option<NodeId> {
        let mut spec = NodeSpec::anonymous().anchor();
        spec.label = label.map(str::to_owned);
        let id = self.store.insert_node(self.clamp_to_world(position), spec)?;
        tracing::info!(id, label = ?label, "Âncora criada");
        Some(id)
    }

    /// Insere um nó colocado pelo usuário e o liga ao vizinho mais próximo
    /// dentro de um raio fixo, se houver.
    pub fn place_user_node(&mut self, position: Vec2, spec: NodeSpec) -> Option<NodeId> {
        let position = self.clamp_to_world(position);
        let id = self.store.insert_node(position, spec.user_placed())?;
        if let Some(near) = self.nearest_within(position, USER_LINK_RADIUS, id) {
            self.store.connect(id, near, USER_LINK_WEIGHT);
        }
        tracing::debug!(id, "Nó do usuário colocado");
        Some(id)
    }

    /// Visão somente leitura para as análises.
    pub fn graph_view(&self) -> GraphView {
        GraphView::from_store(&self.store)
    }

    pub fn render_frame(&self) -> RenderFrame {
        RenderFrame::capture(&self.store)
    }

    /// Avança a simulação em `dt` segundos.
    ///
    /// `dt` é limitado a [`MAX_DT`]; valores negativos ou não finitos viram zero.
    pub fn tick(&mut self, dt: f64) -> TickReport {
        let dt = if dt.is_finite() { dt.clamp(0.0, MAX_DT) } else { 0.0 };
        let k = dt * REFERENCE_FPS;
        let mut report = TickReport {
            dt,
            ..TickReport::default()
        };
        self.ticks += 1;
        self.elapsed += dt;

        let fired = self.advance_timers(dt);
        if fired.entry {
            report.spawned = self.spawn_entries();
        }
        if fired.growth {
            report.grown = self.grow();
        }
        self.apply_forces(k);
        report.captured = self.capture(k);
        report.flights = self.lines_of_flight(k);
        if fired.recluster {
            report.reclustered = self.recluster();
        }
        if fired.decay {
            let (pruned_edges, removed) = self.decay_prune();
            report.pruned_edges = pruned_edges;
            report.removed = removed;
        }
        self.integrate(dt, k);

        tracing::trace!(
            tick = self.ticks,
            nodes = self.store.len(),
            spawned = report.spawned.len(),
            grown = report.grown.len(),
            captured = report.captured,
            flights = report.flights,
            removed = report.removed.len(),
            "Tick"
        );
        report
    }

    /// Período do timer de entradas; `None` desativa.
    fn entry_period(&self) -> Option<f64> {
        let rate = self.params.entry_rate;
        (self.mode == SimMode::Organic && rate > 0.0).then(|| 4.0 + 26.0 * (1.0 - rate))
    }

    /// Período do timer de crescimento; `None` desativa.
    fn growth_period(&self) -> Option<f64> {
        let growth = self.params.growth;
        (self.mode == SimMode::Organic && growth > 0.0).then(|| 0.25 + 2.75 * (1.0 - growth))
    }

    fn advance_timers(&mut self, dt: f64) -> Fired {
        fn step(acc: &mut f64, dt: f64, period: Option<f64>) -> bool {
            let Some(period) = period else {
                *acc = 0.0;
                return false;
            };
            *acc += dt;
            if *acc >= period {
                *acc = 0.0;
                true
            } else {
                false
            }
        }
        let entry_period = self.entry_period();
        let growth_period = self.growth_period();
        Fired {
            entry: step(&mut self.timers.entry, dt, entry_period),
            growth: step(&mut self.timers.growth, dt, growth_period),
            decay: step(&mut self.timers.decay, dt, Some(DECAY_PERIOD)),
            recluster: step(&mut self.timers.recluster, dt, Some(RECLUSTER_PERIOD)),
        }
    }

    /// Leva um ponto para dentro dos limites do mundo.
    pub(crate) fn clamp_to_world(&self, position: Vec2) -> Vec2 {
        let (hw, hh) = self.visual.half_extent();
        let x = if position.x.is_finite() { position.x.clamp(-hw, hw) } else { 0.0 };
        let y = if position.y.is_finite() { position.y.clamp(-hh, hh) } else { 0.0 };
        Vec2::new(x, y)
    }

    /// Nó mais próximo de `position` a menos de `radius`, ignorando `except`.
    fn nearest_within(&self, position: Vec2, radius: f64, except: NodeId) -> Option<NodeId> {
        let mut best: Option<(NodeId, f64)> = None;
        for node in self.store.nodes() {
            if node.id == except {
                continue;
            }
            let d = node.pos.distance(position);
            if d < radius && best.map_or(true, |(_, bd)| d < bd) {
                best = Some((node.id, d));
            }
        }
        best.map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn busy_params() -> SimParams {
        SimParams {
            growth: 0.9,
            entry_rate: 0.9,
            flight: 1.0,
            attraction: 0.6,
            clustering: 0.7,
            hub_bias: 0.5,
            forgetting: 0.4,
        }
    }

    fn seeded_sim(seed: u64) -> Simulation {
        let mut sim = Simulation::new(seed, 300, busy_params(), VisualParams::default());
        sim.add_anchor(Vec2::ZERO, Some("origem")).unwrap();
        sim
    }

    fn fingerprint(sim: &Simulation) -> Vec<(NodeId, u64, u64, Vec<(NodeId, u64)>)> {
        sim.store()
            .nodes()
            .map(|n| {
                (
                    n.id,
                    n.pos.x.to_bits(),
                    n.pos.y.to_bits(),
                    n.links().map(|(id, l)| (id, l.weight.to_bits())).collect(),
                )
            })
            .collect()
    }

    /// Mesma semente + mesma sequência de Δt ⇒ trajetória idêntica bit a bit
    #[test]
    fn same_seed_is_bit_identical() {
        let mut a = seeded_sim(11);
        let mut b = seeded_sim(11);
        for i in 0..600 {
            let dt = if i % 7 == 0 { 0.05 } else { 1.0 / 60.0 };
            a.tick(dt);
            b.tick(dt);
            if i == 300 {
                a.update_params(&ParamUpdate {
                    clustering: Some(0.1),
                    ..ParamUpdate::default()
                });
                b.update_params(&ParamUpdate {
                    clustering: Some(0.1),
                    ..ParamUpdate::default()
                });
            }
        }
        assert!(a.store().len() > 1);
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn invariants_hold_through_a_long_run() {
        let mut sim = seeded_sim(5);
        for _ in 0..1200 {
            sim.tick(1.0 / 30.0);
            sim.store().check_invariants().unwrap();
        }
        let (hw, hh) = sim.visual().half_extent();
        for node in sim.store().nodes() {
            assert!(node.pos.x.abs() <= hw + 1e-9 && node.pos.y.abs() <= hh + 1e-9);
            assert!((0.0..=1.0).contains(&node.heat));
        }
    }

    #[test]
    fn dt_is_clamped() {
        let mut sim = seeded_sim(1);
        assert_eq!(sim.tick(1.0).dt, MAX_DT);
        assert_eq!(sim.tick(f64::NAN).dt, 0.0);
        assert_eq!(sim.tick(-0.5).dt, 0.0);
    }

    #[test]
    fn anchors_stay_pinned() {
        let mut sim = seeded_sim(9);
        for _ in 0..400 {
            sim.tick(1.0 / 60.0);
        }
        let anchor = sim.store().nodes().find(|n| n.anchor).unwrap();
        assert_eq!(anchor.pos, Vec2::ZERO);
    }

    /// No modo de consulta não há crescimento nem entradas espontâneas
    #[test]
    fn query_mode_freezes_organic_growth() {
        let mut sim = seeded_sim(3);
        sim.set_mode(SimMode::Query);
        for _ in 0..600 {
            let report = sim.tick(1.0 / 30.0);
            assert!(report.spawned.is_empty());
            assert!(report.grown.is_empty());
            assert_eq!(report.captured, 0);
        }
        assert_eq!(sim.store().len(), 1);
    }

    #[test]
    fn user_node_hooks_up_to_a_neighbour() {
        let mut sim = Simulation::new(1, 10, SimParams::default(), VisualParams::default());
        let anchor = sim.add_anchor(Vec2::ZERO, None).unwrap();
        let user = sim
            .place_user_node(Vec2::new(30.0, 0.0), NodeSpec::labelled("meu"))
            .unwrap();
        assert!(sim.store().linked(anchor, user));
        assert!(sim.store().node(user).unwrap().user_placed);
    }

    #[test]
    fn user_nodes_and_anchors_survive_pruning() {
        let params = SimParams {
            forgetting: 1.0,
            growth: 0.0,
            entry_rate: 0.0,
            flight: 0.0,
            ..SimParams::default()
        };
        let mut sim = Simulation::new(2, 10, params, VisualParams::default());
        sim.set_mode(SimMode::Query);
        let anchor = sim.add_anchor(Vec2::ZERO, None).unwrap();
        let user = sim
            .place_user_node(Vec2::new(700.0, 400.0), NodeSpec::anonymous())
            .unwrap();
        let loose = sim
            .store_mut()
            .insert_node(Vec2::new(-700.0, 400.0), NodeSpec::anonymous())
            .unwrap();
        for _ in 0..600 {
            sim.tick(1.0 / 30.0);
        }
        assert!(sim.store().contains(anchor));
        assert!(sim.store().contains(user));
        assert!(!sim.store().contains(loose));
    }
}
