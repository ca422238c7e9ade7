use thiserror::Error;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("invalid YAML fixture: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON fixture: {0}")]
    Json(#[from] serde_json::Error),

    #[error("fixture is not an object")]
    NotAnObject,

    #[error("resource has no {0} annotation")]
    MissingName(&'static str),
}
