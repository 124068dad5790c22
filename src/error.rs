use thiserror::Error;

/// A required column is absent from the input header row. Fatal to the
/// whole run; the file has to be corrected and re-exported.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("missing required column `{column}`")]
pub struct SchemaError {
    pub column: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("csv read failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("could not read input: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("json encode failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not write artifact: {0}")]
    Io(#[from] std::io::Error),
}
