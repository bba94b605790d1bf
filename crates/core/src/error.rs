use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("invalid data type: {0}")]
    InvalidType(String),
    #[error("invalid entry id: {0}")]
    InvalidId(#[from] plantao_types::IdError),
    #[error("invalid source filename/id {id:?} in {dir}", dir = dir.display())]
    InvalidSourceFilename { id: String, dir: PathBuf },
    #[error("failed to create data directory {dir}: {source}", dir = dir.display())]
    DirCreation {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to list data directory {dir}: {source}", dir = dir.display())]
    DirRead {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read data file {path}: {source}", path = path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write data file {path}: {source}", path = path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to delete source entry {path}: {source}", path = path.display())]
    FileDelete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}", path = path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize data: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("malformed entry {collection}.{id}: {source}")]
    MalformedEntry {
        collection: &'static str,
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type DataResult<T> = std::result::Result<T, DataError>;
