use thiserror::Error;

/// Failures while obtaining an access token.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token request rejected (status {status}): {error}: {description}")]
    Rejected {
        status: u16,
        error: String,
        description: String,
    },

    #[error("Token endpoint unreachable: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    #[error("Unsupported token type: {0}")]
    UnsupportedTokenType(String),
}
