use std::path::PathBuf;

use thiserror::Error;

/// Identifier of a node in the graph (dense, zero based)
pub type NodeId = u64;

/// Importance rank of a node; higher means more important
pub type Rank = u64;

/// A directed edge
pub type Edge = (NodeId, NodeId);

/// A source node together with its sorted neighbor list
pub type Edges = (NodeId, Vec<NodeId>);

#[derive(Error, Debug)]
pub enum Error {
    #[error("corrupted file {path}: {detail}")]
    Corruption { path: PathBuf, detail: String },

    #[error("codec error: {detail}")]
    Codec { detail: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn corruption(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Error::Corruption {
            path: path.into(),
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Marks object that have a length
pub trait Len {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
