//! # Registro de Nó — Parse Estrito, Depois Validação
//!
//! Cada span JSON candidato passa por duas etapas:
//!
//! 1. **Parse** para [`RawRecord`]: tudo opcional, campos desconhecidos
//!    ignorados, campos com tipo errado tratados como ausentes
//! 2. **Validação** para [`NodeRecord`] — label obrigatório, padrões aplicados,
//!    faixas limitadas, conexões limpas
//!
//! Qualquer falha vira uma [`RecordRejection`], que é reportada e pulada,
//! nunca propagada.
//!
//! ## Esquema Consumido
//!
//! | Campo | Tipo | Padrão |
//! |-------|------|--------|
//! | `label` | string não vazia | **obrigatório** |
//! | `description` | string | — |
//! | `category` | string | `"default"` |
//! | `isEntry` | bool | `false` |
//! | `connections` | string[] (labels) | `[]` |
//! | `relevance` | número em `[0, 1]` | `0.5` |
//! | `popularity` | número em `[0, 1]` | `0.5` |
//! | `directLink` | bool | `false` |

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::label_key;
use crate::core::node::clamp_unit;

/// Categoria atribuída a registros sem `category`.
pub const DEFAULT_CATEGORY: &str = "default";

/// Motivo pelo qual um span candidato não virou registro.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RecordRejection {
    #[error("JSON inválido: {0}")]
    Json(String),

    #[error("registro sem label")]
    MissingLabel,

    #[error("span excede {0} bytes")]
    Oversized(usize),

    #[error("span incompleto no fim do stream")]
    Truncated,
}

/// Forma bruta, tolerante, do JSON do gerador.
///
/// Os campos ficam como [`Value`]: um `"relevance": "0.9"` vira o padrão em
/// vez de derrubar o registro inteiro.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecord {
    label: Option<Value>,
    description: Option<Value>,
    category: Option<Value>,
    is_entry: Option<Value>,
    /// Esperado um array; valores que não são strings são ignorados.
    connections: Option<Value>,
    relevance: Option<Value>,
    popularity: Option<Value>,
    direct_link: Option<Value>,
}

fn text(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

fn flag(value: Option<Value>) -> bool {
    value.and_then(|v| v.as_bool()).unwrap_or(false)
}

fn unit_or_default(value: Option<Value>) -> f64 {
    clamp_unit(value.and_then(|v| v.as_f64()).unwrap_or(0.5))
}

/// Registro validado, pronto para ser aplicado ao grafo.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeRecord {
    pub label: String,
    pub description: Option<String>,
    pub category: String,
    pub is_entry: bool,
    /// Labels de outros nós, sem vazios, sem o próprio label, sem repetições.
    pub connections: Vec<String>,
    pub relevance: f64,
    pub popularity: f64,
    pub direct_link: bool,
}

impl NodeRecord {
    /// Parse + validação de um span JSON completo.
    pub fn parse(span: &[u8]) -> Result<Self, RecordRejection> {
        let raw: RawRecord =
            serde_json::from_slice(span).map_err(|e| RecordRejection::Json(e.to_string()))?;
        Self::validate(raw)
    }

    fn validate(raw: RawRecord) -> Result<Self, RecordRejection> {
        let label = text(raw.label)
            .map(|l| l.trim().to_owned())
            .filter(|l| !l.is_empty())
            .ok_or(RecordRejection::MissingLabel)?;

        let category = text(raw.category)
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_owned());

        let own_key = label_key(&label);
        let mut seen = vec![own_key];
        let mut connections = Vec::new();
        let listed = match raw.connections {
            Some(Value::Array(values)) => values,
            _ => Vec::new(),
        };
        for value in listed {
            let Some(text) = value.as_str() else {
                continue;
            };
            let text = text.trim();
            let key = label_key(text);
            if key.is_empty() || seen.contains(&key) {
                continue;
            }
            seen.push(key);
            connections.push(text.to_owned());
        }

        Ok(Self {
            label,
            description: text(raw.description).filter(|d| !d.trim().is_empty()),
            category,
            is_entry: flag(raw.is_entry),
            connections,
            relevance: unit_or_default(raw.relevance),
            popularity: unit_or_default(raw.popularity),
            direct_link: flag(raw.direct_link),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied() {
        let record = NodeRecord::parse(br#"{"label": "Rizoma"}"#).unwrap();
        assert_eq!(record.category, DEFAULT_CATEGORY);
        assert_eq!(record.relevance, 0.5);
        assert_eq!(record.popularity, 0.5);
        assert!(!record.is_entry);
        assert!(!record.direct_link);
        assert!(record.connections.is_empty());
    }

    #[test]
    fn camel_case_fields_and_unknown_fields() {
        let record = NodeRecord::parse(
            br#"{"label":"A","isEntry":true,"directLink":true,"relevance":1.7,"extra":{"x":1}}"#,
        )
        .unwrap();
        assert!(record.is_entry);
        assert!(record.direct_link);
        assert_eq!(record.relevance, 1.0);
    }

    /// Campo opcional com tipo errado cai no padrão, sem rejeitar o registro
    #[test]
    fn wrongly_typed_optionals_fall_back_to_defaults() {
        let record = NodeRecord::parse(
            br#"{"label":"A","relevance":"0.9","popularity":[1],"category":7,"isEntry":"sim","directLink":1,"description":false}"#,
        )
        .unwrap();
        assert_eq!(record.relevance, 0.5);
        assert_eq!(record.popularity, 0.5);
        assert_eq!(record.category, DEFAULT_CATEGORY);
        assert!(!record.is_entry);
        assert!(!record.direct_link);
        assert_eq!(record.description, None);

        let record =
            NodeRecord::parse(br#"{"label":"B","relevance":null,"popularity":0.25,"connections":"A"}"#)
                .unwrap();
        assert!(record.connections.is_empty());
        assert_eq!(record.relevance, 0.5);
        assert_eq!(record.popularity, 0.25);
    }

    #[test]
    fn missing_or_blank_label_is_rejected() {
        assert_eq!(
            NodeRecord::parse(br#"{"description": "sem nome"}"#),
            Err(RecordRejection::MissingLabel)
        );
        assert_eq!(
            NodeRecord::parse(br#"{"label": "   "}"#),
            Err(RecordRejection::MissingLabel)
        );
        assert_eq!(
            NodeRecord::parse(br#"{"label": 42}"#),
            Err(RecordRejection::MissingLabel)
        );
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(
            NodeRecord::parse(br#"{"label": "A",}"#),
            Err(RecordRejection::Json(_))
        ));
    }

    /// Conexões repetidas, vazias, não textuais ou para si mesmo são descartadas
    #[test]
    fn connections_are_cleaned() {
        let record = NodeRecord::parse(
            br#"{"label":"A","connections":["B"," b ","", 3, "a", "C"]}"#,
        )
        .unwrap();
        assert_eq!(record.connections, vec!["B".to_owned(), "C".to_owned()]);
    }
}
