use thiserror::Error;

use axentia_core::DomainError;

/// Errors surfaced by the client layer.
///
/// Load paths never return `Transport`/`Status`: those degrade to
/// [`crate::Fetched::Failed`]. Only `Authentication` crosses every boundary.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("authentication required: {0}")]
    Authentication(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error(transparent)]
    Validation(#[from] DomainError),
}

impl ClientError {
    pub fn is_authentication(&self) -> bool {
        matches!(self, ClientError::Authentication(_))
    }

    /// Message suitable for an inline error region.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Status { message, .. } => message.clone(),
            ClientError::Validation(err) => err.to_string(),
            ClientError::Authentication(_) => "Sessione scaduta. Effettua di nuovo l'accesso.".to_string(),
            ClientError::Transport(_) => "Errore di connessione.".to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
