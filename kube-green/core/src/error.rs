use thiserror::Error;

/// Errors surfaced by the reconciliation engine. Transport-level failures
/// (talking to the API server) are distinguished from semantic ones (a
/// malformed author patch, a stale sidecar write) so the reconciler can
/// decide requeue policy per variant (spec.md's Error Handling Design).
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid schedule: {0}")]
    Schedule(#[from] kube_green_schedule::ScheduleError),

    #[error("failed to list {kind} in namespace {namespace}")]
    ListFailed {
        kind: String,
        namespace: String,
        #[source]
        source: kube::Error,
    },

    #[error("failed to write {kind}/{name} in namespace {namespace}")]
    WriteFailed {
        kind: String,
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("author patch for {kind}/{name} is malformed: {reason}")]
    MalformedPatch {
        kind: String,
        name: String,
        reason: String,
    },

    #[error("sidecar secret {name} was modified concurrently, requeue")]
    Conflict { name: String },

    #[error(transparent)]
    Kube(#[from] kube::Error),

    #[error("(de)serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
