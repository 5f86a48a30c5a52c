//! # Placement — Onde Cada Registro Nasce
//!
//! Posição inicial de um nó ingerido, em coordenadas polares em torno da
//! âncora:
//!
//! - **Setor**: cada categoria, na ordem em que aparece, reivindica o
//!   próximo setor angular (`2π / setores` de largura). Categorias além do
//!   número de setores reaproveitam setores em ordem circular.
//! - **Ângulo**: dentro do setor, o deslocamento é `largura · frac(rank / φ)`,
//!   a sequência de baixa discrepância da razão áurea. Dois ranks
//!   consecutivos ficam separados por `0.382` ou `0.618` da largura, nunca
//!   vizinhos, e o setor é preenchido sem repetir ângulos.
//! - **Raio**: cresce com `√(rank / (rank + esperado))` entre um anel mínimo
//!   e um máximo. Nunca satura, então ranks altos continuam se afastando.
//!   Relevância alta puxa o nó levemente para dentro.
//!
//! Uma nova sessão de ingestão retoma setores e ranks do grafo existente
//! ([`Placement::resume`]), para não empilhar registros nas posições de uma
//! sessão anterior.
//!
//! ```text
//!            setor 1
//!         ·  ·  ·  ·
//!   setor 2  · ⚓ ·  setor 0
//!         ·  ·  ·  ·
//!            setor 3
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::{GraphStore, Vec2};

/// Inverso da razão áurea: `(√5 − 1) / 2`.
pub const GOLDEN_FRACTION: f64 = 0.618_033_988_749_894_9;

/// Parâmetros de posicionamento e de ligação à âncora.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Número de setores angulares.
    pub sectors: usize,
    /// Anel mínimo, como fração do raio do mundo.
    pub min_ring: f64,
    /// Anel máximo, como fração do raio do mundo.
    pub max_ring: f64,
    /// Rank em que o nó chega à metade (em área) do caminho entre os anéis.
    pub expected_per_sector: usize,
    /// Fração do raio removida para relevância `1.0`.
    pub relevance_pull: f64,
    /// Relevância acima da qual o nó é ligado à âncora.
    pub anchor_link_threshold: f64,
    /// Peso das arestas criadas por conexões de label.
    pub link_weight: f64,
    /// Peso da aresta nó–âncora.
    pub anchor_link_weight: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            sectors: 8,
            min_ring: 0.12,
            max_ring: 0.85,
            expected_per_sector: 12,
            relevance_pull: 0.2,
            anchor_link_threshold: 0.8,
            link_weight: 0.6,
            anchor_link_weight: 0.45,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Sector {
    index: usize,
    placed: usize,
}

/// Estado de posicionamento de uma sessão de ingestão.
#[derive(Clone, Debug, Default)]
pub struct Placement {
    config: PlacementConfig,
    sectors: IndexMap<String, Sector>,
}

impl Placement {
    pub fn new(config: PlacementConfig) -> Self {
        Self {
            config,
            sectors: IndexMap::new(),
        }
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    /// Setor já reivindicado por `category`, se houver.
    pub fn sector_of(&self, category: &str) -> Option<usize> {
        self.sectors.get(category).map(|s| s.index)
    }

    /// Retoma o posicionamento de um grafo já povoado: cada categoria
    /// conhecida mantém o setor na ordem do interner e o rank continua da
    /// contagem de nós dela.
    pub fn resume(config: PlacementConfig, store: &GraphStore) -> Self {
        let sector_count = config.sectors.max(1);
        let mut counts = vec![0usize; store.categories().count()];
        for category in store.nodes().filter_map(|node| node.category) {
            if let Some(count) = counts.get_mut(usize::from(category)) {
                *count += 1;
            }
        }
        let sectors = store
            .categories()
            .zip(counts)
            .enumerate()
            .map(|(claimed, (name, placed))| {
                let sector = Sector {
                    index: claimed % sector_count,
                    placed,
                };
                (name.to_owned(), sector)
            })
            .collect();
        Self { config, sectors }
    }

    /// Registros já posicionados em `category`.
    pub fn placed_in(&self, category: &str) -> usize {
        self.sectors.get(category.trim()).map_or(0, |s| s.placed)
    }

    /// Próxima posição para um registro de `category` com `relevance`.
    pub fn place(&mut self, category: &str, relevance: f64, center: Vec2, world_radius: f64) -> Vec2 {
        let config = self.config;
        let sector_count = config.sectors.max(1);
        let claimed = self.sectors.len();
        let sector = self
            .sectors
            .entry(category.trim().to_owned())
            .or_insert(Sector {
                index: claimed % sector_count,
                placed: 0,
            });
        let rank = sector.placed;
        sector.placed += 1;

        let width = std::f64::consts::TAU / sector_count as f64;
        let angle = (sector.index as f64 + (rank as f64 * GOLDEN_FRACTION).fract()) * width;

        let expected = config.expected_per_sector.max(1) as f64;
        let filled = rank as f64 + 0.5;
        let t = (filled / (filled + expected)).sqrt();
        let ring = config.min_ring + (config.max_ring - config.min_ring) * t;
        let radius = world_radius * ring * (1.0 - config.relevance_pull * relevance);

        center + Vec2::from_angle(angle, radius)
    }

    /// Um registro é ligado à âncora se pedir (`directLink`) ou se a
    /// relevância passar do limiar.
    pub fn links_to_anchor(&self, direct_link: bool, relevance: f64) -> bool {
        direct_link || relevance > self.config.anchor_link_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    fn angle_of(p: Vec2) -> f64 {
        p.y.atan2(p.x).rem_euclid(TAU)
    }

    #[test]
    fn categories_claim_sectors_in_order() {
        let mut placement = Placement::new(PlacementConfig::default());
        placement.place("a", 0.5, Vec2::ZERO, 500.0);
        placement.place("b", 0.5, Vec2::ZERO, 500.0);
        placement.place("a", 0.5, Vec2::ZERO, 500.0);
        assert_eq!(placement.sector_of("a"), Some(0));
        assert_eq!(placement.sector_of("b"), Some(1));
        assert_eq!(placement.sector_of("c"), None);
    }

    /// Todos os nós de uma categoria ficam dentro do setor dela
    #[test]
    fn positions_stay_inside_their_sector() {
        let mut placement = Placement::new(PlacementConfig::default());
        let width = TAU / 8.0;
        placement.place("primeira", 0.5, Vec2::ZERO, 500.0);
        for _ in 0..30 {
            let p = placement.place("segunda", 0.5, Vec2::ZERO, 500.0);
            let angle = angle_of(p);
            assert!(angle >= width - 1e-9 && angle < 2.0 * width + 1e-9);
        }
    }

    #[test]
    fn radius_grows_with_rank_between_rings() {
        let config = PlacementConfig {
            relevance_pull: 0.0,
            ..PlacementConfig::default()
        };
        let mut placement = Placement::new(config);
        let radii: Vec<f64> = (0..20)
            .map(|_| placement.place("x", 0.5, Vec2::ZERO, 100.0).length())
            .collect();
        for pair in radii.windows(2) {
            assert!(pair[1] >= pair[0] - 1e-9);
        }
        assert!(radii[0] >= 12.0 - 1e-9);
        assert!(radii[19] <= 85.0 + 1e-9);
    }

    /// Ranks consecutivos nunca caem lado a lado no setor
    #[test]
    fn consecutive_ranks_are_not_angular_neighbours() {
        let mut placement = Placement::new(PlacementConfig::default());
        let width = TAU / 8.0;
        let angles: Vec<f64> = (0..40)
            .map(|_| angle_of(placement.place("default", 0.5, Vec2::ZERO, 500.0)))
            .collect();
        for pair in angles.windows(2) {
            assert!((pair[1] - pair[0]).abs() >= 0.38 * width - 1e-9);
        }
    }

    #[test]
    fn same_category_records_keep_their_distance() {
        let mut placement = Placement::new(PlacementConfig::default());
        let points: Vec<Vec2> = (0..40)
            .map(|_| placement.place("default", 0.5, Vec2::ZERO, 500.0))
            .collect();
        for (i, a) in points.iter().enumerate() {
            for b in &points[i + 1..] {
                assert!(a.distance(*b) > 10.0, "{a:?} e {b:?} quase sobrepostos");
            }
        }
    }

    /// Depois do rank esperado o raio continua crescendo, sem colar no anel máximo
    #[test]
    fn radius_does_not_saturate() {
        let config = PlacementConfig {
            relevance_pull: 0.0,
            ..PlacementConfig::default()
        };
        let mut placement = Placement::new(config);
        let radii: Vec<f64> = (0..60)
            .map(|_| placement.place("x", 0.5, Vec2::ZERO, 100.0).length())
            .collect();
        assert!(radii[59] > radii[30] + 1e-6);
        assert!(radii[59] < 85.0);
    }

    #[test]
    fn resume_continues_sectors_and_ranks_from_the_store() {
        use crate::core::NodeSpec;

        let mut store = GraphStore::new(100);
        for (label, category) in [("a", "x"), ("b", "y"), ("c", "x")] {
            store
                .insert_node(Vec2::ZERO, NodeSpec::labelled(label).with_category(category))
                .unwrap();
        }
        let mut fresh = Placement::new(PlacementConfig::default());
        let first = fresh.place("x", 0.5, Vec2::ZERO, 500.0);

        let mut resumed = Placement::resume(PlacementConfig::default(), &store);
        assert_eq!(resumed.sector_of("x"), Some(0));
        assert_eq!(resumed.sector_of("y"), Some(1));
        assert_eq!(resumed.placed_in("x"), 2);
        let next = resumed.place("x", 0.5, Vec2::ZERO, 500.0);
        assert!(next.distance(first) > 1.0);
        resumed.place("z", 0.5, Vec2::ZERO, 500.0);
        assert_eq!(resumed.sector_of("z"), Some(2));
    }

    #[test]
    fn relevance_pulls_inward() {
        let mut low = Placement::new(PlacementConfig::default());
        let mut high = Placement::new(PlacementConfig::default());
        let far = low.place("x", 0.0, Vec2::ZERO, 500.0).length();
        let near = high.place("x", 1.0, Vec2::ZERO, 500.0).length();
        assert!(near < far);
    }

    #[test]
    fn anchor_link_rule() {
        let placement = Placement::new(PlacementConfig::default());
        assert!(placement.links_to_anchor(true, 0.0));
        assert!(placement.links_to_anchor(false, 0.95));
        assert!(!placement.links_to_anchor(false, 0.5));
    }
}
