/// Error types shared by the meshing, transform, and rendering layers
use thiserror::Error;

use crate::transform::TransformSlot;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("invalid mesh resolution {u}x{v}: both dimensions must be positive")]
    InvalidResolution { u: u32, v: u32 },
    #[error("mesh resolution {u}x{v} needs {vertices} vertices, 16-bit indices address at most {max}")]
    IndexOverflow {
        u: u32,
        v: u32,
        vertices: usize,
        max: usize,
    },
    #[error("{count} vertices have degenerate normals (first at vertex {first})")]
    DegenerateGeometry { count: usize, first: usize },
    #[error("{0} transform read before it was set")]
    UnsetTransform(TransformSlot),
    #[error("matrix is singular and cannot be inverted")]
    SingularMatrix,
    #[error("degenerate view: {0}")]
    DegenerateView(&'static str),
    #[error("invalid projection: {0}")]
    InvalidProjection(String),
    #[error("failed to create {resource}: {reason}")]
    ResourceCreation {
        resource: &'static str,
        reason: String,
    },
    #[error("unknown mesh id {0}")]
    UnknownMesh(usize),
    #[error("unknown material id {0}")]
    UnknownMaterial(usize),
    #[error("draw call failed: {0}")]
    Draw(String),
}

pub type Result<T> = std::result::Result<T, Error>;
