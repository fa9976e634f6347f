/// Scene setup: uploaded meshes, materials and the instances that pair them.
///
/// Everything here is built once before the render loop starts and is only
/// read while frames are drawn.
use std::sync::Arc;

use log::debug;
use nalgebra::Matrix4;

use crate::error::{Error, Result};
use crate::geometry::Mesh;
use crate::math;
use crate::parametric::{self, build_parametric_mesh, Shape};
use crate::render::{BufferHandle, PipelineHandle, RenderBackend};

/// How a backend colours the fragments of an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shading {
    /// Lambert term against the frame's light direction, tinted by the instance colour
    Lit,
    /// Surface normal mapped to RGB
    Normals,
}

/// Pipeline description handed to [`RenderBackend::create_pipeline`]
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub label: String,
    pub shading: Shading,
}

impl Material {
    pub fn new(label: impl Into<String>, shading: Shading) -> Self {
        Self {
            label: label.into(),
            shading,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(usize);

/// Per-instance uniform block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceUniforms {
    pub model: Matrix4<f32>,
    pub color: [f32; 3],
}

impl InstanceUniforms {
    pub fn new(model: Matrix4<f32>, color: [f32; 3]) -> Self {
        Self { model, color }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instance {
    pub mesh: MeshId,
    pub material: MaterialId,
    pub uniforms: InstanceUniforms,
}

/// A mesh together with the buffers it was uploaded to
#[derive(Debug, Clone)]
pub struct GpuMesh {
    pub mesh: Arc<Mesh>,
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub index_count: u32,
}

#[derive(Debug, Clone)]
pub struct GpuMaterial {
    pub material: Material,
    pub pipeline: PipelineHandle,
}

#[derive(Debug, Default)]
pub struct Scene {
    meshes: Vec<GpuMesh>,
    materials: Vec<GpuMaterial>,
    instances: Vec<Instance>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload a mesh's vertex and index buffers. Instances refer to the
    /// returned id, so any number of them can share one upload.
    pub fn add_mesh<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        mesh: Arc<Mesh>,
    ) -> Result<MeshId> {
        let vertex_buffer = backend.upload_vertex_buffer(&mesh.vertex_bytes())?;
        let index_buffer = backend.upload_index_buffer(mesh.index_bytes())?;
        let index_count = mesh.index_count() as u32;

        let id = MeshId(self.meshes.len());
        debug!(
            "uploaded mesh {id:?}: {} vertices, {index_count} indices",
            mesh.vertex_count()
        );
        self.meshes.push(GpuMesh {
            mesh,
            vertex_buffer,
            index_buffer,
            index_count,
        });
        Ok(id)
    }

    pub fn add_material<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        material: Material,
    ) -> Result<MaterialId> {
        let pipeline = backend.create_pipeline(&material)?;
        let id = MaterialId(self.materials.len());
        debug!("created pipeline for material {:?}", material.label);
        self.materials.push(GpuMaterial { material, pipeline });
        Ok(id)
    }

    pub fn add_instance(
        &mut self,
        mesh: MeshId,
        material: MaterialId,
        uniforms: InstanceUniforms,
    ) -> Result<usize> {
        self.mesh(mesh)?;
        self.material(material)?;
        self.instances.push(Instance {
            mesh,
            material,
            uniforms,
        });
        Ok(self.instances.len() - 1)
    }

    pub fn mesh(&self, id: MeshId) -> Result<&GpuMesh> {
        self.meshes.get(id.0).ok_or(Error::UnknownMesh(id.0))
    }

    pub fn material(&self, id: MaterialId) -> Result<&GpuMaterial> {
        self.materials.get(id.0).ok_or(Error::UnknownMaterial(id.0))
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }
}

/// Largest [`SceneConfig::grid`] accepted by [`demo_scene`]
pub const MAX_GRID: u32 = 20;

/// Options for [`demo_scene`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneConfig {
    /// Grid cells per side for every parametric mesh
    pub resolution: u32,
    /// Spheres per axis in the instance grid
    pub grid: u32,
    pub shading: Shading,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            resolution: 24,
            grid: 6,
            shading: Shading::Lit,
        }
    }
}

/// Floor plane, a cube of small spheres, one big sphere above them and a torus.
pub fn demo_scene<B: RenderBackend + ?Sized>(
    backend: &mut B,
    config: &SceneConfig,
) -> Result<Scene> {
    if config.grid > MAX_GRID {
        return Err(Error::ResourceCreation {
            resource: "instance grid",
            reason: format!("{} spheres per axis exceeds the limit of {MAX_GRID}", config.grid),
        });
    }
    let mut scene = Scene::new();
    let material = scene.add_material(backend, Material::new("surface", config.shading))?;

    let plane = mesh_for(&mut scene, backend, &parametric::plane(), config.resolution)?;
    let sphere = mesh_for(&mut scene, backend, &parametric::sphere(), config.resolution)?;
    let torus = mesh_for(&mut scene, backend, &parametric::torus(10.0, 1.0), config.resolution)?;

    scene.add_instance(
        plane,
        material,
        InstanceUniforms::new(
            math::translate(0.0, -6.0, 0.0) * math::scale_matrix(50.0, 1.0, 50.0),
            [0.6, 0.6, 0.6],
        ),
    )?;

    let n = config.grid;
    let extent = n.saturating_sub(1) as f32;
    for iz in 0..n {
        for iy in 0..n {
            for ix in 0..n {
                let (x, y, z) = (
                    2.0 * ix as f32 - extent,
                    2.0 * iy as f32 - extent,
                    2.0 * iz as f32 - extent,
                );
                let color = grid_color(x, y, z, extent);
                scene.add_instance(sphere, material, InstanceUniforms::new(math::translate(x, y, z), color))?;
            }
        }
    }

    scene.add_instance(
        sphere,
        material,
        InstanceUniforms::new(
            math::translate(0.0, 10.0, 0.0) * math::scale_matrix(5.0, 5.0, 5.0),
            [0.9, 0.9, 1.0],
        ),
    )?;
    scene.add_instance(
        torus,
        material,
        InstanceUniforms::new(math::translate(0.0, 1.0, 0.0), [1.0, 0.6, 0.2]),
    )?;

    debug!(
        "demo scene: {} meshes, {} instances",
        scene.mesh_count(),
        scene.instances().len()
    );
    Ok(scene)
}

/// A single shape scaled up to fill the orbiting camera's view.
pub fn single_shape_scene<B: RenderBackend + ?Sized>(
    backend: &mut B,
    shape: &Shape,
    resolution: u32,
    shading: Shading,
) -> Result<Scene> {
    let mut scene = Scene::new();
    let material = scene.add_material(backend, Material::new(shape.name(), shading))?;
    let mesh = mesh_for(&mut scene, backend, shape, resolution)?;
    scene.add_instance(
        mesh,
        material,
        InstanceUniforms::new(math::scale_matrix(8.0, 8.0, 8.0), [0.9, 0.9, 0.9]),
    )?;
    Ok(scene)
}

fn mesh_for<B: RenderBackend + ?Sized>(
    scene: &mut Scene,
    backend: &mut B,
    shape: &Shape,
    resolution: u32,
) -> Result<MeshId> {
    let mesh = build_parametric_mesh(shape, resolution, resolution)?;
    scene.add_mesh(backend, Arc::new(mesh))
}

fn grid_color(x: f32, y: f32, z: f32, extent: f32) -> [f32; 3] {
    if extent == 0.0 {
        return [1.0, 1.0, 1.0];
    }
    let channel = |c: f32| 0.35 + 0.65 * (c + extent) / (2.0 * extent);
    [channel(x), channel(y), channel(z)]
}
