use thiserror::Error;

/// Failure of a single resource-construction call.
///
/// None of these are recovered from inside a factory. The caller decides whether to abort or to
/// retry the whole construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// A weakly referenced allocator was torn down before the call.
    #[error("{collaborator} no longer exists")]
    ExpiredCollaborator { collaborator: &'static str },

    #[error("render device is not available")]
    MissingDevice,

    #[error("a command recorder is required to build this resource")]
    MissingCommandRecorder,

    /// An allocator produced no backing native resource.
    #[error("allocation failed: {0}")]
    AllocationFailed(String),

    #[error("invalid resource descriptor: {0}")]
    InvalidDescriptor(String),

    /// Reported by the device or backend itself.
    #[error("backend error: {0}")]
    Backend(String),
}

impl ResourceError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidDescriptor(msg.into())
    }

    pub(crate) fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ResourceError>;
