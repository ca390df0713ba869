/// Failure of an underlying document-store call. Network loss and backend
/// unavailability all surface here; the coordinators report these to the
/// caller without retrying.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("document codec error: {0}")]
    Codec(String),
}
