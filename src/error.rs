use thiserror::Error;

pub type PlumeResult<T, E = PlumeError> = Result<T, E>;

#[derive(Debug, Error)]
pub enum PlumeError {
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    /// Reopening an index file whose meta page does not match the
    /// constructor arguments.
    #[error("Bad index info: {0}")]
    BadIndexInfo(String),

    /// Scan operators outside {GT, GTE} x {LT, LTE}.
    #[error("Bad scan opcodes")]
    BadOpcodes,

    /// Scan range with low value above high value.
    #[error("Bad scan range")]
    BadScanrange,

    /// No key in the tree satisfies the scan criteria.
    #[error("No such key found")]
    NoSuchKeyFound,

    /// Scan operation issued without an active scan.
    #[error("Scan not initialized")]
    ScanNotInitialized,

    /// The active scan has run past its high bound or the leaf chain.
    #[error("Index scan completed")]
    IndexScanCompleted,
}
