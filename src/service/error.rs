//! Tipos de erro do cliente do serviço remoto de relatórios.
//!
//! [`ServiceError`] cobre respostas HTTP de erro, payloads rejeitados e
//! falhas de transporte. A cadeia de `source` de cada variante é o que o
//! guard registra como mensagens internas.

use thiserror::Error;

/// Erros que podem ocorrer ao chamar o serviço de relatórios.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Resposta HTTP fora da faixa 2xx, com o corpo retornado pelo serviço.
    #[error("service returned status {status}: {message}")]
    Api { status: u16, message: String },

    /// Resposta 2xx cujo conteúdo não é utilizável.
    #[error("service rejected the request: {0}")]
    Rejected(String),

    /// Falha de rede subjacente (DNS, conexão recusada, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}
