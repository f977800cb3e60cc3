use punch_types::RecordId;

/// Errors from collection operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A record with this identifier is already present.
    #[error("duplicate record: id {id} already exists")]
    DuplicateRecord { id: RecordId },

    /// No record with this identifier is present.
    #[error("missing record: id {id} not found")]
    MissingRecord { id: RecordId },

    /// Every identifier up to `u64::MAX` has been handed out.
    #[error("identifiers exhausted: no id left to mint")]
    IdentifiersExhausted,
}

/// Result alias for collection operations.
pub type StoreResult<T> = Result<T, StoreError>;
