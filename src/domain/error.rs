//! Domain error types.

/// Top-level error type for stockcard.
#[derive(Debug, thiserror::Error)]
pub enum StockCardError {
    #[error("invalid quantity for {field}: {value:?}")]
    InvalidQuantity { field: String, value: String },

    #[error("invalid date {value:?} (expected YYYY-MM-DD)")]
    InvalidDate { value: String },

    #[error("missing required field: {field}")]
    MissingField { field: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    #[error("persistence error: {reason}")]
    Persistence { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("export error: {reason}")]
    Export { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StockCardError {
    pub fn card_not_found(id: &str) -> Self {
        StockCardError::NotFound {
            kind: "stock card".into(),
            id: id.into(),
        }
    }

    pub fn transaction_not_found(id: &str) -> Self {
        StockCardError::NotFound {
            kind: "transaction".into(),
            id: id.into(),
        }
    }

    /// True for errors raised by the persistence collaborator rather than
    /// by ledger or record validation.
    pub fn is_persistence(&self) -> bool {
        matches!(self, StockCardError::Persistence { .. })
    }
}

impl From<&StockCardError> for std::process::ExitCode {
    fn from(err: &StockCardError) -> Self {
        let code: u8 = match err {
            StockCardError::Io(_) | StockCardError::Export { .. } => 1,
            StockCardError::ConfigParse { .. }
            | StockCardError::ConfigMissing { .. }
            | StockCardError::ConfigInvalid { .. } => 2,
            StockCardError::Persistence { .. } => 3,
            StockCardError::InvalidQuantity { .. }
            | StockCardError::InvalidDate { .. }
            | StockCardError::MissingField { .. } => 4,
            StockCardError::NotFound { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
