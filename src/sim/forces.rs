//! Forças por nó (passo 4) e integração (passo 9).
//!
//! Todas as forças acumulam em `self.accel`; a velocidade só muda no fim de
//! [`Simulation::apply_forces`], depois que todos os termos foram somados.

use crate::core::{CategoryId, LinkKind, Vec2};

use super::Simulation;

/// Multiplicador da deriva para nós sem arestas.
const DRIFT_ISOLATED: f64 = 3.0;
/// Multiplicador da deriva para nós com uma aresta.
const DRIFT_LEAF: f64 = 1.8;

const SAME_CATEGORY_REST: f64 = 35.0;
const SAME_CATEGORY_STIFFNESS: f64 = 0.05;
const CROSS_CATEGORY_REST: f64 = 120.0;
const CROSS_CATEGORY_STIFFNESS: f64 = 0.02;
const BRIDGE_REST: f64 = 280.0;
const BRIDGE_STIFFNESS: f64 = 0.006;

/// Abaixo desta distância a atração para a âncora é desligada.
const ATTRACTION_NEAR: f64 = 50.0;
/// Acima desta distância a atração para a âncora é desligada.
const ATTRACTION_FAR: f64 = 650.0;
const ATTRACTION_GAIN: f64 = 0.05;

const HOME_REPULSION_RADIUS: f64 = 260.0;
const HOME_REPULSION_GAIN: f64 = 0.8;

const REPULSION_SAMPLES: usize = 8;
const REPULSION_RADIUS: f64 = 60.0;
const SAME_CATEGORY_REPULSION_RADIUS: f64 = 30.0;
const REPULSION_GAIN: f64 = 0.5;

/// Fator de velocidade após bater numa borda.
const BOUNCE: f64 = 0.5;

/// Cópia do que as forças precisam ler de cada nó.
#[derive(Clone, Copy)]
struct Body {
    pos: Vec2,
    category: Option<CategoryId>,
    degree: usize,
    anchor: bool,
    home: bool,
}

fn same_category(a: &Body, b: &Body) -> bool {
    matches!((a.category, b.category), (Some(x), Some(y)) if x == y)
}

impl Simulation {
    pub(super) fn apply_forces(&mut self, k: f64) {
        let n = self.store.len();
        if n == 0 || k <= 0.0 {
            return;
        }
        let bodies: Vec<Body> = self
            .store
            .nodes()
            .map(|node| Body {
                pos: node.pos,
                category: node.category,
                degree: node.degree(),
                anchor: node.anchor,
                home: node.is_home(),
            })
            .collect();
        self.accel.clear();
        self.accel.resize(n, Vec2::ZERO);

        let damping = self.visual.damping.powf(k);
        for node in self.store.nodes_mut() {
            node.vel *= damping;
        }

        self.drift(&bodies);
        self.springs(&bodies);
        self.anchor_attraction(&bodies);
        self.home_repulsion(&bodies);
        self.sampled_repulsion(&bodies);

        for (index, body) in bodies.iter().enumerate() {
            let accel = self.accel[index];
            if let Some(node) = self.store.node_at_mut(index) {
                if body.anchor {
                    node.vel = Vec2::ZERO;
                } else {
                    node.vel += accel * k;
                }
            }
        }
    }

    /// Deriva estocástica: dois sorteios por nó não âncora.
    fn drift(&mut self, bodies: &[Body]) {
        let base = self.visual.drift;
        for (index, body) in bodies.iter().enumerate() {
            if body.anchor {
                continue;
            }
            let amp = match body.degree {
                0 => base * DRIFT_ISOLATED,
                1 => base * DRIFT_LEAF,
                _ => base,
            };
            let jitter = Vec2::new(self.rng.signed(), self.rng.signed());
            self.accel[index] += jitter * amp;
        }
    }

    /// Molas ao longo de cada aresta, processada uma vez (`id_a < id_b`).
    fn springs(&mut self, bodies: &[Body]) {
        let clustering = self.params.clustering;
        let strength = self.visual.spring_strength;
        let same_rest = SAME_CATEGORY_REST + SAME_CATEGORY_REST * (1.0 - clustering);
        for (i, node) in self.store.nodes().enumerate() {
            for (other, link) in node.links() {
                if other <= node.id {
                    continue;
                }
                let Some(j) = self.store.index_of(other) else {
                    continue;
                };
                let (a, b) = (&bodies[i], &bodies[j]);
                let (rest, stiffness) = match link.kind {
                    LinkKind::Bridge => (BRIDGE_REST, BRIDGE_STIFFNESS),
                    LinkKind::Local if same_category(a, b) => (same_rest, SAME_CATEGORY_STIFFNESS),
                    LinkKind::Local => (CROSS_CATEGORY_REST, CROSS_CATEGORY_STIFFNESS),
                };
                let delta = b.pos - a.pos;
                let distance = delta.length();
                let dir = delta.normalized_or_zero();
                let force = dir * (stiffness * (distance - rest) * link.weight * strength);
                self.accel[i] += force;
                self.accel[j] -= force;
            }
        }
    }

    /// Atração (de magnitude constante) para a casa mais próxima, numa faixa de distância.
    fn anchor_attraction(&mut self, bodies: &[Body]) {
        let gain = self.params.attraction * ATTRACTION_GAIN;
        if gain <= 0.0 {
            return;
        }
        let homes: Vec<Vec2> = bodies.iter().filter(|b| b.home).map(|b| b.pos).collect();
        if homes.is_empty() {
            return;
        }
        for (index, body) in bodies.iter().enumerate() {
            if body.home {
                continue;
            }
            let nearest = homes
                .iter()
                .map(|&home| (home, home.distance(body.pos)))
                .min_by(|a, b| a.1.total_cmp(&b.1));
            if let Some((home, distance)) = nearest {
                if distance > ATTRACTION_NEAR && distance < ATTRACTION_FAR {
                    self.accel[index] += (home - body.pos).normalized_or_zero() * gain;
                }
            }
        }
    }

    /// Repulsão entre casas (âncoras e entradas) dentro de um raio fixo.
    fn home_repulsion(&mut self, bodies: &[Body]) {
        let gain = HOME_REPULSION_GAIN * self.visual.repulsion;
        let homes: Vec<usize> = (0..bodies.len()).filter(|&i| bodies[i].home).collect();
        for (offset, &i) in homes.iter().enumerate() {
            for &j in &homes[offset + 1..] {
                let delta = bodies[j].pos - bodies[i].pos;
                let distance = delta.length();
                if distance >= HOME_REPULSION_RADIUS {
                    continue;
                }
                let push = delta.normalized_or_zero() * (gain * (1.0 - distance / HOME_REPULSION_RADIUS));
                self.accel[i] -= push;
                self.accel[j] += push;
            }
        }
    }

    /// Repulsão geral amostrada: `REPULSION_SAMPLES` sorteios por nó, O(n·k).
    fn sampled_repulsion(&mut self, bodies: &[Body]) {
        let n = bodies.len();
        if n < 2 {
            return;
        }
        let gain = REPULSION_GAIN * self.visual.repulsion;
        for i in 0..n {
            for _ in 0..REPULSION_SAMPLES {
                let j = self.rng.below(n);
                if j == i {
                    continue;
                }
                let (a, b) = (&bodies[i], &bodies[j]);
                let radius = if same_category(a, b) {
                    SAME_CATEGORY_REPULSION_RADIUS
                } else {
                    REPULSION_RADIUS
                };
                let delta = a.pos - b.pos;
                let distance = delta.length();
                if distance >= radius {
                    continue;
                }
                // Nós sobrepostos: direção fixa pela ordem dos índices.
                let dir = if distance > 1e-9 {
                    delta * (1.0 / distance)
                } else if i < j {
                    Vec2::new(-1.0, 0.0)
                } else {
                    Vec2::new(1.0, 0.0)
                };
                self.accel[i] += dir * (gain * (1.0 - distance / radius));
            }
        }
    }

    /// Velocidade → posição, limite de velocidade, bordas macias, calor e idade.
    pub(super) fn integrate(&mut self, dt: f64, k: f64) {
        let max_speed = self.visual.max_speed;
        let cooling = self.visual.heat_decay.powf(k);
        let (hw, hh) = self.visual.half_extent();
        for node in self.store.nodes_mut() {
            if node.anchor {
                node.vel = Vec2::ZERO;
            } else {
                let speed = node.vel.length();
                if speed > max_speed {
                    node.vel *= max_speed / speed;
                }
                node.pos += node.vel * k;
                if node.pos.x > hw || node.pos.x < -hw {
                    node.pos.x = node.pos.x.clamp(-hw, hw);
                    node.vel.x = -node.vel.x * BOUNCE;
                }
                if node.pos.y > hh || node.pos.y < -hh {
                    node.pos.y = node.pos.y.clamp(-hh, hh);
                    node.vel.y = -node.vel.y * BOUNCE;
                }
                if !(node.pos.x.is_finite() && node.pos.y.is_finite()) {
                    node.pos = Vec2::ZERO;
                    node.vel = Vec2::ZERO;
                }
            }
            node.heat = (node.heat * cooling).clamp(0.0, 1.0);
            node.age += dt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Body;
    use crate::core::{NodeSpec, Vec2};
    use crate::sim::{SimMode, SimParams, Simulation, VisualParams};

    fn body(x: f64, y: f64) -> Body {
        Body {
            pos: Vec2::new(x, y),
            category: None,
            degree: 0,
            anchor: false,
            home: false,
        }
    }

    fn home(x: f64, y: f64) -> Body {
        Body {
            anchor: true,
            home: true,
            ..body(x, y)
        }
    }

    /// Acelerações de um único termo de força sobre `bodies`.
    fn accel_of(sim: &mut Simulation, bodies: &[Body], term: fn(&mut Simulation, &[Body])) -> Vec<Vec2> {
        sim.accel.clear();
        sim.accel.resize(bodies.len(), Vec2::ZERO);
        term(sim, bodies);
        sim.accel.clone()
    }

    fn quiet_sim() -> Simulation {
        let params = SimParams {
            growth: 0.0,
            entry_rate: 0.0,
            flight: 0.0,
            forgetting: 0.0,
            ..SimParams::default()
        };
        let visual = VisualParams {
            drift: 0.0,
            ..VisualParams::default()
        };
        let mut sim = Simulation::new(4, 16, params, visual);
        sim.set_mode(SimMode::Query);
        sim
    }

    /// Uma mola esticada aproxima os dois extremos
    #[test]
    fn stretched_spring_pulls_together() {
        let mut sim = quiet_sim();
        let store = sim.store_mut();
        let a = store.insert_node(Vec2::new(-200.0, 0.0), NodeSpec::anonymous()).unwrap();
        let b = store.insert_node(Vec2::new(200.0, 0.0), NodeSpec::anonymous()).unwrap();
        store.connect(a, b, 1.0);
        let before = 400.0;
        for _ in 0..60 {
            sim.tick(1.0 / 60.0);
        }
        let store = sim.store();
        let after = store.node(a).unwrap().pos.distance(store.node(b).unwrap().pos);
        assert!(after < before);
    }

    /// Vários passes para que a amostragem sorteie o par.
    fn repeated_repulsion(sim: &mut Simulation, bodies: &[Body]) {
        for _ in 0..8 {
            sim.sampled_repulsion(bodies);
        }
    }

    /// Atração só age entre 50 e 650 unidades da casa mais próxima
    #[test]
    fn attraction_only_acts_in_its_band() {
        let mut sim = quiet_sim();
        let bodies = [home(0.0, 0.0), body(30.0, 0.0), body(200.0, 0.0), body(700.0, 0.0)];
        let accel = accel_of(&mut sim, &bodies, Simulation::anchor_attraction);
        assert_eq!(accel[0], Vec2::ZERO);
        assert_eq!(accel[1], Vec2::ZERO);
        assert!(accel[2].x < 0.0 && accel[2].y.abs() < 1e-12);
        assert_eq!(accel[3], Vec2::ZERO);
    }

    #[test]
    fn attraction_follows_the_nearest_home() {
        let mut sim = quiet_sim();
        let bodies = [home(-400.0, 0.0), home(400.0, 0.0), body(300.0, 0.0)];
        let accel = accel_of(&mut sim, &bodies, Simulation::anchor_attraction);
        assert!(accel[2].x > 0.0);
    }

    /// Casas a menos de 260 se afastam; além disso, ou entre nós comuns, nada
    #[test]
    fn homes_repel_within_their_radius() {
        let mut sim = quiet_sim();
        let near = accel_of(&mut sim, &[home(0.0, 0.0), home(200.0, 0.0)], Simulation::home_repulsion);
        assert!(near[0].x < 0.0 && near[1].x > 0.0);
        assert!((near[0].x + near[1].x).abs() < 1e-12);

        let far = accel_of(&mut sim, &[home(0.0, 0.0), home(300.0, 0.0)], Simulation::home_repulsion);
        assert_eq!(far, vec![Vec2::ZERO, Vec2::ZERO]);

        let plain = accel_of(&mut sim, &[body(0.0, 0.0), body(100.0, 0.0)], Simulation::home_repulsion);
        assert_eq!(plain, vec![Vec2::ZERO, Vec2::ZERO]);
    }

    /// Mesma categoria só se repele abaixo de 30; categorias diferentes, abaixo de 60
    #[test]
    fn same_category_repulsion_radius_is_shorter() {
        let mut sim = quiet_sim();
        let pair = |a: Option<u16>, b: Option<u16>, gap: f64| {
            [
                Body { category: a, ..body(0.0, 0.0) },
                Body { category: b, ..body(gap, 0.0) },
            ]
        };
        let same_far = accel_of(&mut sim, &pair(Some(0), Some(0), 45.0), repeated_repulsion);
        assert_eq!(same_far, vec![Vec2::ZERO, Vec2::ZERO]);

        let cross_far = accel_of(&mut sim, &pair(Some(0), Some(1), 45.0), repeated_repulsion);
        assert!(cross_far[0].x < 0.0 && cross_far[1].x > 0.0);

        let same_near = accel_of(&mut sim, &pair(Some(0), Some(0), 20.0), repeated_repulsion);
        assert!(same_near[0].x < 0.0 && same_near[1].x > 0.0);

        let cross_beyond = accel_of(&mut sim, &pair(Some(0), Some(1), 70.0), repeated_repulsion);
        assert_eq!(cross_beyond, vec![Vec2::ZERO, Vec2::ZERO]);
    }

    #[test]
    fn heat_cools_every_tick() {
        let mut sim = quiet_sim();
        let id = sim.store_mut().insert_node(Vec2::ZERO, NodeSpec::anonymous()).unwrap();
        sim.tick(1.0 / 60.0);
        let heat = sim.store().node(id).unwrap().heat;
        assert!(heat < 1.0 && heat > 0.0);
    }

    #[test]
    fn nodes_stay_inside_the_world() {
        let mut sim = quiet_sim();
        let id = sim
            .store_mut()
            .insert_node(Vec2::new(799.0, 0.0), NodeSpec::anonymous())
            .unwrap();
        sim.store_mut().node_mut(id).unwrap().vel = Vec2::new(6.0, 0.0);
        for _ in 0..10 {
            sim.tick(1.0 / 60.0);
        }
        let node = sim.store().node(id).unwrap();
        assert!(node.pos.x <= 800.0);
    }
}
