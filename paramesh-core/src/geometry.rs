/// Geometry primitives for indexed meshes
use bytemuck::{Pod, Zeroable};
use nalgebra::{Point3, Vector2, Vector3};

use crate::error::{Error, Result};

/// Largest vertex count addressable by `u16` indices.
pub const MAX_VERTICES: usize = u16::MAX as usize + 1;

/// A mesh vertex with position, normal and optional texture coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
    pub uv: Option<Vector2<f32>>,
}

impl Vertex {
    pub fn new(position: Point3<f32>, normal: Vector3<f32>) -> Self {
        Self {
            position,
            normal,
            uv: None,
        }
    }

    pub fn with_uv(mut self, uv: Vector2<f32>) -> Self {
        self.uv = Some(uv);
        self
    }

    /// A normal is degenerate when estimation hit a zero-length tangent.
    pub fn has_degenerate_normal(&self) -> bool {
        !self.normal.iter().all(|c| c.is_finite())
    }
}

/// Interleaved vertex layout uploaded to the renderer: position, normal, uv.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl From<&Vertex> for GpuVertex {
    fn from(vertex: &Vertex) -> Self {
        let uv = vertex.uv.unwrap_or_else(Vector2::zeros);
        Self {
            position: vertex.position.coords.into(),
            normal: vertex.normal.into(),
            uv: uv.into(),
        }
    }
}

/// A triangle face resolved from a mesh's index buffer
#[derive(Debug, Clone, Copy)]
pub struct Triangle<'a> {
    pub indices: [u16; 3],
    pub vertices: [&'a Vertex; 3],
}

impl Triangle<'_> {
    /// Face normal from the winding order, `None` for zero-area faces
    pub fn calculate_normal(&self) -> Option<Vector3<f32>> {
        let v0 = self.vertices[0].position;
        let v1 = self.vertices[1].position;
        let v2 = self.vertices[2].position;

        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        edge1.cross(&edge2).try_normalize(f32::EPSILON)
    }
}

/// An indexed triangle mesh. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    indices: Vec<u16>,
}

impl Mesh {
    /// Assemble a mesh, checking that every index addresses a vertex.
    pub fn from_parts(vertices: Vec<Vertex>, indices: Vec<u16>) -> Result<Self> {
        if vertices.len() > MAX_VERTICES {
            return Err(Error::ResourceCreation {
                resource: "mesh",
                reason: format!(
                    "{} vertices exceed the {MAX_VERTICES} addressable by 16-bit indices",
                    vertices.len()
                ),
            });
        }
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(Error::ResourceCreation {
                resource: "mesh",
                reason: format!("index {bad} out of range for {} vertices", vertices.len()),
            });
        }
        Ok(Self { vertices, indices })
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn positions(&self) -> Vec<Point3<f32>> {
        self.vertices.iter().map(|v| v.position).collect()
    }

    pub fn normals(&self) -> Vec<Vector3<f32>> {
        self.vertices.iter().map(|v| v.normal).collect()
    }

    /// Texture coordinates, present only if every vertex carries one.
    pub fn uvs(&self) -> Option<Vec<Vector2<f32>>> {
        self.vertices.iter().map(|v| v.uv).collect()
    }

    pub fn triangles(&self) -> impl Iterator<Item = Triangle<'_>> + '_ {
        self.indices.chunks_exact(3).map(move |tri| Triangle {
            indices: [tri[0], tri[1], tri[2]],
            vertices: [
                &self.vertices[tri[0] as usize],
                &self.vertices[tri[1] as usize],
                &self.vertices[tri[2] as usize],
            ],
        })
    }

    /// Indices of vertices whose normal could not be estimated.
    pub fn degenerate_normals(&self) -> Vec<usize> {
        self.vertices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.has_degenerate_normal())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn validate_normals(&self) -> Result<()> {
        let degenerate = self.degenerate_normals();
        match degenerate.first() {
            None => Ok(()),
            Some(&first) => Err(Error::DegenerateGeometry {
                count: degenerate.len(),
                first,
            }),
        }
    }

    /// Axis-aligned bounds as `(min, max)`, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Point3<f32>, Point3<f32>)> {
        let first = self.vertices.first()?.position;
        Some(self.vertices.iter().fold((first, first), |(min, max), v| {
            (min.inf(&v.position), max.sup(&v.position))
        }))
    }

    /// Interleaved [`GpuVertex`] bytes for a vertex buffer upload
    pub fn vertex_bytes(&self) -> Vec<u8> {
        let packed: Vec<GpuVertex> = self.vertices.iter().map(GpuVertex::from).collect();
        bytemuck::cast_slice::<GpuVertex, u8>(&packed).to_vec()
    }

    /// Index bytes for an index buffer upload
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}
