use std::collections::HashMap;
use std::sync::Arc;

use nalgebra::Vector4;
use paramesh_core::parametric::{self, build_parametric_mesh};
use paramesh_core::scene::{demo_scene, InstanceUniforms, Material, SceneConfig, Shading};
use paramesh_core::{
    math, BufferHandle, DrawCall, FrameDriver, GpuVertex, PipelineHandle, RenderBackend, Result,
    Scene,
};

/// Backend that decodes uploads the way a GPU would and checks every draw
#[derive(Default)]
struct DecodingBackend {
    vertex_buffers: HashMap<BufferHandle, Vec<GpuVertex>>,
    index_buffers: HashMap<BufferHandle, Vec<u16>>,
    next: u64,
    draws: usize,
    clip_points: Vec<Vector4<f32>>,
}

impl DecodingBackend {
    fn next_handle(&mut self) -> BufferHandle {
        self.next += 1;
        BufferHandle(self.next)
    }
}

impl RenderBackend for DecodingBackend {
    fn upload_vertex_buffer(&mut self, bytes: &[u8]) -> Result<BufferHandle> {
        let stride = std::mem::size_of::<GpuVertex>();
        assert_eq!(bytes.len() % stride, 0);
        let vertices = bytes
            .chunks_exact(stride)
            .map(bytemuck::pod_read_unaligned::<GpuVertex>)
            .collect();
        let handle = self.next_handle();
        self.vertex_buffers.insert(handle, vertices);
        Ok(handle)
    }

    fn upload_index_buffer(&mut self, bytes: &[u8]) -> Result<BufferHandle> {
        let indices = bytes
            .chunks_exact(2)
            .map(bytemuck::pod_read_unaligned::<u16>)
            .collect();
        let handle = self.next_handle();
        self.index_buffers.insert(handle, indices);
        Ok(handle)
    }

    fn create_pipeline(&mut self, _material: &Material) -> Result<PipelineHandle> {
        self.next += 1;
        Ok(PipelineHandle(self.next))
    }

    fn draw_indexed(&mut self, draw: &DrawCall) -> Result<()> {
        let vertices = &self.vertex_buffers[&draw.vertex_buffer];
        let indices = &self.index_buffers[&draw.index_buffer];
        assert_eq!(indices.len(), draw.index_count as usize);
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));

        let p = vertices[0].position;
        self.clip_points
            .push(draw.uniforms.model_view_projection * Vector4::new(p[0], p[1], p[2], 1.0));
        self.draws += 1;
        Ok(())
    }
}

#[test]
fn demo_scene_renders_several_frames() {
    let mut backend = DecodingBackend::default();
    let config = SceneConfig {
        resolution: 10,
        grid: 3,
        shading: Shading::Lit,
    };
    let scene = demo_scene(&mut backend, &config).unwrap();
    let instances = scene.instances().len();
    assert_eq!(instances, 1 + 27 + 1 + 1);

    let mut driver = FrameDriver::default();
    for frame in 0..5 {
        let stats = driver.render_frame(&scene, &mut backend).unwrap();
        assert_eq!(stats.frame, frame);
        assert_eq!(stats.draw_calls, instances);
    }
    assert_eq!(backend.draws, 5 * instances);
    assert!(backend.clip_points.iter().all(|c| c.iter().all(|x| x.is_finite())));
    assert!((driver.time() - 0.05).abs() < 1e-6);
}

#[test]
fn uploaded_plane_decodes_to_mesh_positions() {
    let mut backend = DecodingBackend::default();
    let mut scene = Scene::new();
    let mesh = Arc::new(build_parametric_mesh(&parametric::plane(), 2, 2).unwrap());
    let id = scene.add_mesh(&mut backend, Arc::clone(&mesh)).unwrap();

    let gpu = scene.mesh(id).unwrap();
    let decoded = &backend.vertex_buffers[&gpu.vertex_buffer];
    assert_eq!(decoded.len(), 9);
    for (vertex, original) in decoded.iter().zip(mesh.vertices()) {
        assert_eq!(vertex.position, <[f32; 3]>::from(original.position.coords));
        assert_eq!(vertex.normal, [0.0, 1.0, 0.0]);
    }
    assert_eq!(decoded[8].uv, [1.0, 1.0]);
    assert_eq!(backend.index_buffers[&gpu.index_buffer], mesh.indices());
}

#[test]
fn instance_in_front_of_camera_lands_inside_clip_volume() {
    let mut backend = DecodingBackend::default();
    let mut scene = Scene::new();
    let material = scene
        .add_material(&mut backend, Material::new("lit", Shading::Lit))
        .unwrap();
    let mesh = Arc::new(build_parametric_mesh(&parametric::sphere(), 8, 8).unwrap());
    let mesh = scene.add_mesh(&mut backend, mesh).unwrap();
    scene
        .add_instance(mesh, material, InstanceUniforms::new(math::translate(0.0, 0.0, 0.0), [1.0; 3]))
        .unwrap();

    let mut driver = FrameDriver::default();
    driver.render_frame(&scene, &mut backend).unwrap();

    // First vertex is the sphere's north pole at (0, 1, 0)
    let clip = backend.clip_points[0];
    assert!(clip.w > 0.0);
    let ndc = clip.xyz() / clip.w;
    assert!(ndc.iter().all(|c| (-1.0..=1.0).contains(c)));
}
