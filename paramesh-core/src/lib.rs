/// Paramesh Core Library - parametric meshing and transform caching
///
/// This library turns `(u, v) -> (x, y, z)` surface functions into indexed
/// meshes, caches the per-draw transform products, and drives a render loop
/// through a backend-agnostic buffer/draw interface.

pub mod error;
pub mod geometry;
pub mod math;
pub mod parametric;
pub mod projection;
pub mod render;
pub mod scene;
pub mod transform;

// Re-export commonly used types
pub use error::{Error, Result};
pub use geometry::{GpuVertex, Mesh, Triangle, Vertex};
pub use math::RotationState;
pub use parametric::{build_parametric_mesh, Shape};
pub use projection::Camera;
pub use render::{BufferHandle, DrawCall, DrawUniforms, FrameDriver, FrameStats, PipelineHandle, RenderBackend};
pub use scene::{Instance, InstanceUniforms, Material, Scene, SceneConfig, Shading};
pub use transform::{TransformCache, TransformSlot};
