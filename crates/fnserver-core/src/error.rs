use thiserror::Error;

/// Error type server functions return. Anything implementing
/// `std::error::Error` converts into it with `?`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("cannot decode {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no function with name {name:?}")]
    UnknownFunction { name: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("error while running server function {name:?}: {source}")]
    Handler {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("cannot encode {what}: {source}")]
    Encode {
        what: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ServerError {
    pub(crate) fn decode(what: impl Into<String>, source: serde_json::Error) -> Self {
        ServerError::Decode {
            what: what.into(),
            source,
        }
    }

    pub(crate) fn encode(what: impl Into<String>, source: serde_json::Error) -> Self {
        ServerError::Encode {
            what: what.into(),
            source,
        }
    }

    /// Whether this error reports a missing function or staged resource.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ServerError::NotFound(_) | ServerError::UnknownFunction { .. }
        )
    }

    /// Whether this error reports a malformed or invalid document.
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            ServerError::Decode { .. } | ServerError::InvalidInput(_)
        )
    }
}

/// Reports whether `err`, or any error in its source chain, is a not-found
/// [`ServerError`].
pub fn is_not_found(err: &(dyn std::error::Error + 'static)) -> bool {
    std::iter::successors(Some(err), |e| e.source()).any(|e| {
        e.downcast_ref::<ServerError>()
            .is_some_and(ServerError::is_not_found)
    })
}
