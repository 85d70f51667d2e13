use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("malformed value path for {table}.{argument}: {reason}")]
    MalformedValuePath {
        table: String,
        argument: String,
        reason: String,
    },

    #[error("invalid canonical form {0:?}: more than one '#' separator")]
    InvalidCanonical(String),

    #[error("table name {0:?} is reserved for a section of the output")]
    ReservedTableName(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Model(e.to_string())
    }
}

#[cfg(feature = "transformers")]
impl From<rust_bert::RustBertError> for Error {
    fn from(e: rust_bert::RustBertError) -> Self {
        Error::Model(e.to_string())
    }
}

#[cfg(feature = "transformers")]
impl From<tch::TchError> for Error {
    fn from(e: tch::TchError) -> Self {
        Error::Model(e.to_string())
    }
}

#[cfg(feature = "transformers")]
impl From<rust_tokenizers::error::TokenizerError> for Error {
    fn from(e: rust_tokenizers::error::TokenizerError) -> Self {
        Error::Model(e.to_string())
    }
}
