use pmo_lib::{gim::CreateGimError, pmo::LayoutError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CreatePmoError {
    #[error("vertex {vertex} in group {group:?} does not have the same attributes as the first vertex of its submesh")]
    InconsistentAttributes { group: String, vertex: u32 },

    #[error("submesh in group {group:?} is influenced by {count} bones but at most 8 are supported")]
    TooManyInfluences { group: String, count: usize },

    #[error("strip in group {group:?} references vertex {index} but the group has {count} vertices")]
    VertexIndexOutOfRange {
        group: String,
        index: u32,
        count: usize,
    },

    #[error("strip in group {group:?} has {length} indices but at most 65535 are supported")]
    StripTooLong { group: String, length: usize },

    #[error("error computing model layout")]
    Layout(#[from] LayoutError),
}

#[derive(Debug, Error)]
pub enum CreateSkeletonError {
    #[error("bone id {id} is used by more than one bone")]
    DuplicateBoneId { id: u32 },

    #[error("bone ids must be contiguous from 0 but no bone has id {id}")]
    MissingBoneId { id: u32 },

    #[error("bone {id} has parent {parent} which is not in the skeleton")]
    MissingParent { id: u32, parent: u32 },
}

#[derive(Debug, Error)]
pub enum CreateTextureError {
    #[error("image {name:?} has dimensions {width}x{height} but at most 65535x65535 are supported")]
    Dimensions { name: String, width: u32, height: u32 },

    #[error("expected {expected} pixels for image {name:?} but found {actual}")]
    PixelCount {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("error encoding image {name:?}")]
    Gim {
        name: String,
        #[source]
        source: CreateGimError,
    },
}

#[derive(Debug, Error)]
pub enum ExportPacError {
    #[error("error creating model")]
    Model(#[from] CreatePmoError),

    #[error("error creating skeleton")]
    Skeleton(#[from] CreateSkeletonError),

    #[error("error creating texture")]
    Texture(#[from] CreateTextureError),

    #[error("material image {name:?} was not provided")]
    MissingImage { name: String },

    #[error("error writing {entry} entry")]
    Write {
        entry: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
