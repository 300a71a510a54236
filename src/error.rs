use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuleError>;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("path {0:?} does not resolve to a group")]
    InvalidGroupPath(Vec<usize>),
    #[error("path {0:?} does not resolve to a condition")]
    InvalidConditionPath(Vec<usize>),
    #[error("path {0:?} does not resolve to a node")]
    InvalidPath(Vec<usize>),
    #[error("expression group at {0:?} has no children")]
    EmptyGroup(Vec<usize>),
    #[error("condition at {path:?} is incomplete: missing `{field}`")]
    IncompleteCondition { path: Vec<usize>, field: &'static str },
    #[error("action is incomplete: missing `{0}`")]
    IncompleteAction(&'static str),
    #[error("rule node name must not be empty")]
    MissingName,
    #[error("malformed rule config: {0}")]
    MalformedConfig(String),
    #[error("editor is closed")]
    EditorClosed,
    #[error("platform api returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
