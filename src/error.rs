use thiserror::Error;

use crate::gl::ShaderStage;

/// Failures raised while binding a context or building the shader program.
///
/// Every variant is terminal for the worker session that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GlError {
    #[error("graphics context unavailable: {0}")]
    ContextUnavailable(String),
    #[error("{stage} shader failed to compile: {log}")]
    ShaderCompile { stage: ShaderStage, log: String },
    #[error("shader program failed to link: {0}")]
    ProgramLink(String),
    #[error("failed to create {0}")]
    ResourceCreation(&'static str),
}

/// Failures on the host side of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("canvas control was already transferred")]
    AlreadyTransferred,
    #[error("failed to transfer canvas control: {0}")]
    Transfer(String),
    #[error("failed to spawn render worker: {0}")]
    WorkerSpawn(String),
    #[error("failed to post message to render worker: {0}")]
    Post(String),
    #[error("failed to detach {what}: {reason}")]
    Detach { what: &'static str, reason: String },
    #[error("a session for widget {0} is still draining")]
    SessionBusy(String),
}

/// Failures while decoding messages, props or effect names.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown effect `{0}`")]
    UnknownEffect(String),
    #[error("`init` arrived without a surface")]
    MissingSurface,
    #[error("prop `{name}` has an unsupported value: {reason}")]
    InvalidProp { name: String, reason: String },
}
