//! # Erros da Biblioteca
//!
//! Só duas coisas podem **falhar** de fato no núcleo:
//!
//! | Erro | Quando |
//! |------|--------|
//! | [`IngestError`] | a fonte de chunks retornou erro (rede, timeout...) |
//! | [`SnapshotError`] | JSON inválido ou snapshot inconsistente |
//!
//! Todo o resto é tratado localmente: registros malformados são pulados,
//! violações de invariante no store são no-ops e inserções além da
//! capacidade retornam `None`.

use thiserror::Error;

use crate::ingest::IngestSummary;

/// Falha terminal da ingestão.
///
/// Os nós já inseridos permanecem no grafo; o resumo parcial acompanha o erro.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("fonte de chunks falhou após {} registros: {message}", summary.records)]
    Source {
        message: String,
        summary: IngestSummary,
    },
}

impl IngestError {
    /// Resumo do que foi aplicado antes da falha.
    pub fn summary(&self) -> &IngestSummary {
        match self {
            IngestError::Source { summary, .. } => summary,
        }
    }
}

/// Falha ao (des)serializar ou validar um snapshot.
///
/// E/S de arquivo fica em [`persistence`](crate::persistence), com contexto
/// `anyhow` indicando o caminho.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("JSON de snapshot inválido: {0}")]
    Json(#[from] serde_json::Error),

    #[error("versão de snapshot não suportada: {0}")]
    UnsupportedVersion(u32),

    #[error("snapshot corrompido: {0}")]
    Corrupt(String),
}
