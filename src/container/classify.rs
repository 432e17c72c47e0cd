use std::path::{Path, PathBuf};

use crate::core::ContainerType;
use crate::metadata::{DOCUMENT_METADATA_FILE, MAIN_METADATA_FILE};

/// What a folder is, decided solely by which metadata file it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Documentation,
    NotAContainer,
}

impl NodeKind {
    pub fn metadata_file_name(&self) -> Option<&'static str> {
        match self {
            NodeKind::Document => Some(DOCUMENT_METADATA_FILE),
            NodeKind::Documentation => Some(MAIN_METADATA_FILE),
            NodeKind::NotAContainer => None,
        }
    }

    pub fn container_type(&self) -> ContainerType {
        match self {
            NodeKind::Document => ContainerType::DocumentContainer,
            NodeKind::Documentation => ContainerType::DocumentationContainer,
            NodeKind::NotAContainer => ContainerType::Unknown,
        }
    }

    pub fn is_container(&self) -> bool {
        *self != NodeKind::NotAContainer
    }
}

/// Classify a folder. The main metadata file is checked first.
pub fn classify(folder: &Path) -> NodeKind {
    if folder.join(MAIN_METADATA_FILE).is_file() {
        NodeKind::Documentation
    } else if folder.join(DOCUMENT_METADATA_FILE).is_file() {
        NodeKind::Document
    } else {
        NodeKind::NotAContainer
    }
}

/// Both marker files present, which the container format does not allow.
pub fn has_both_markers(folder: &Path) -> bool {
    folder.join(MAIN_METADATA_FILE).is_file() && folder.join(DOCUMENT_METADATA_FILE).is_file()
}

/// Path of the metadata file deciding `kind`, if any.
pub fn metadata_path(folder: &Path, kind: NodeKind) -> Option<PathBuf> {
    kind.metadata_file_name().map(|name| folder.join(name))
}
