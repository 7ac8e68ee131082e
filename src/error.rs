use std::path::PathBuf;

use thiserror::Error;

use crate::ir::NodeId;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("invalid org tree: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate node id '{0}'")]
    DuplicateId(NodeId),
    #[error("unknown node id '{0}'")]
    UnknownNode(NodeId),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ImageLoadError {
    #[error("failed to read avatar '{path}': {reason}")]
    Io { path: PathBuf, reason: String },
    #[error("person has no avatar reference")]
    NoReference,
    #[error("avatar data is empty")]
    Empty,
    #[error("unsupported avatar format")]
    Unsupported,
    #[error("avatar load failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to parse chart svg: {0}")]
    Parse(String),
    #[error("failed to allocate a {width}x{height} pixmap")]
    Allocation { width: u32, height: u32 },
    #[error("failed to encode image: {0}")]
    Encode(String),
    #[error("failed to convert chart to pdf: {0}")]
    Pdf(String),
    #[error("export format '{0}' is not enabled in this build")]
    Disabled(&'static str),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
