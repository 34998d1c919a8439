use thiserror::Error;

pub type LoadResult<T> = Result<T, LoadError>;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid GLB container: {0}")]
    InvalidContainer(String),

    #[error("invalid glTF content: {0}")]
    InvalidGlb(String),

    #[error("missing {kind} reference: {index}")]
    MissingReference { kind: &'static str, index: usize },

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("vertex index {index} is out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("the load was cancelled")]
    Cancelled,

    #[error("the frame scheduler was closed before the job could run")]
    FrameSchedulerClosed,

    #[error("background task failed: {0}")]
    TaskFailed(String),

    #[error("render host error: {0}")]
    Host(String),

    #[error("the task tracker has already been awaited")]
    AlreadyAwaited,
}

impl LoadError {
    pub fn missing(kind: &'static str, index: usize) -> Self {
        Self::MissingReference { kind, index }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
