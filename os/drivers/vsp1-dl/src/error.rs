use crate::config::DL_MAX_BODIES;

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DlError {
    #[error("out of DMA memory")]
    OutOfMemory,
    #[error("fragments and chains need a display list header")]
    HeaderlessList,
    #[error("a display list header describes at most {max} bodies", max = DL_MAX_BODIES)]
    TooManyBodies,
    #[error("display list belongs to another manager")]
    ForeignList,
}

/// An operation that takes ownership refused its argument.
///
/// The argument is handed back so pooled lists and DMA memory are never lost
/// on an error path.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct Rejected<T> {
    #[source]
    pub error: DlError,
    pub value: T,
}

impl<T> Rejected<T> {
    pub(crate) const fn new(error: DlError, value: T) -> Self {
        Self { error, value }
    }

    #[must_use]
    pub fn into_inner(self) -> T {
        self.value
    }
}
