//! # Módulo Core — O Grafo Vivo
//!
//! Este módulo agrupa os **tipos fundamentais** sobre os quais todo o motor
//! trabalha. O simulador, a ingestão em streaming e as análises leem e
//! escrevem apenas através destes tipos:
//!
//! - [`Vec2`] — posição/velocidade 2D em coordenadas de mundo
//! - [`Node`] — nó do grafo com posição, calor, idade e vizinhança
//! - [`NodeSpec`] — descrição de um nó a ser inserido
//! - [`Link`] / [`LinkKind`] — meia-aresta espelhada (peso + tipo)
//! - [`GraphStore`] — arena de nós com as invariantes centralizadas
//! - [`RenderFrame`] — visão deduplicada para o renderizador
//!
//! ## Analogia: O Rizoma
//!
//! Não há raiz nem tronco: cada [`Node`] é um ponto do rizoma e cada
//! [`Link`] é um filamento que pode engrossar (reforço), afinar (decaimento)
//! ou se romper (poda). Nós sem filamentos acabam esquecidos.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use rizoma::core::{GraphStore, NodeSpec, Vec2};
//!
//! let mut store = GraphStore::new(100);
//! let a = store.insert_node(Vec2::ZERO, NodeSpec::labelled("Rizoma")).unwrap();
//! let b = store.insert_node(Vec2::new(40.0, 0.0), NodeSpec::labelled("Platô")).unwrap();
//! assert!(store.connect(a, b, 0.5));
//! assert_eq!(store.find_by_label("rizoma"), Some(a));
//! ```

/// Sub-módulo com [`Node`], [`NodeSpec`] e [`Vec2`].
pub mod node;

/// Sub-módulo com [`Link`] e [`LinkKind`].
pub mod link;

/// Sub-módulo com a arena [`GraphStore`].
pub mod graph_store;

/// Sub-módulo com a visão de renderização [`RenderFrame`].
pub mod frame;

pub use frame::{RenderEdge, RenderFrame, RenderNode};
pub use graph_store::{label_key, EdgeView, GraphStore};
pub use link::{Link, LinkKind, WEIGHT_FLOOR};
pub use node::{CategoryId, Node, NodeId, NodeSpec, Vec2};
