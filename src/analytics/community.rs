//! Comunidades por propagação de rótulos ponderada.
//!
//! Cada nó começa com o próprio rótulo e, passe a passe, adota o rótulo de
//! maior peso somado entre seus vizinhos. Para assim que um passe não muda
//! nada, ou após `max_passes`.
//!
//! É uma heurística **best-effort**: não maximiza modularidade, mas é
//! barata e estável o suficiente para colorir o grafo e detectar pontes.
//!
//! ## Determinismo
//!
//! - nós visitados sempre na ordem dos índices
//! - empate: mantém o rótulo atual se ele está entre os melhores, senão
//!   fica com o menor rótulo empatado
//! - rótulos finais compactados para `0..k` na ordem de primeira aparição

use std::collections::BTreeMap;

use super::GraphView;

/// Tolerância relativa para empates de peso.
const TIE_TOLERANCE: f64 = 1e-12;

/// Rótulo de comunidade de cada nó, em `0..k`.
pub fn label_propagation(view: &GraphView, max_passes: usize) -> Vec<usize> {
    let n = view.len();
    let mut labels: Vec<usize> = (0..n).collect();

    for pass in 0..max_passes {
        let mut changed = false;
        for i in 0..n {
            let neighbors = &view.adjacency[i];
            if neighbors.is_empty() {
                continue;
            }
            let mut tally: BTreeMap<usize, f64> = BTreeMap::new();
            for &(j, weight) in neighbors {
                *tally.entry(labels[j]).or_insert(0.0) += weight;
            }
            let best = tally.values().copied().fold(f64::NEG_INFINITY, f64::max);
            let is_best = |w: f64| w >= best - best.abs() * TIE_TOLERANCE;

            let current = labels[i];
            let keep = tally.get(&current).is_some_and(|&w| is_best(w));
            if keep {
                continue;
            }
            if let Some((&label, _)) = tally.iter().find(|entry| is_best(*entry.1)) {
                labels[i] = label;
                changed = true;
            }
        }
        if !changed {
            tracing::trace!(passes = pass + 1, "Propagação de rótulos convergiu");
            break;
        }
    }

    compact(&labels)
}

fn compact(labels: &[usize]) -> Vec<usize> {
    let mut remap: BTreeMap<usize, usize> = BTreeMap::new();
    let mut next = 0;
    labels
        .iter()
        .map(|label| {
            *remap.entry(*label).or_insert_with(|| {
                let id = next;
                next += 1;
                id
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::tests::barbell;

    #[test]
    fn barbell_splits_in_two() {
        let labels = label_propagation(&barbell(), 10);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[4], labels[5]);
        assert_eq!(labels[5], labels[6]);
        assert_ne!(labels[2], labels[4]);
    }

    #[test]
    fn isolated_nodes_keep_their_own_community() {
        let view = GraphView::from_edges(&[1, 2, 3], &[(1, 2, 1.0)]);
        let labels = label_propagation(&view, 10);
        assert_eq!(labels[0], labels[1]);
        assert_ne!(labels[2], labels[0]);
    }

    #[test]
    fn labels_are_compact() {
        let view = GraphView::from_edges(&[1, 2, 3, 4], &[]);
        assert_eq!(label_propagation(&view, 10), vec![0, 1, 2, 3]);
        assert!(label_propagation(&GraphView::default(), 10).is_empty());
    }

    #[test]
    fn zero_passes_leaves_singletons() {
        let labels = label_propagation(&barbell(), 0);
        assert_eq!(labels, (0..7).collect::<Vec<_>>());
    }
}
