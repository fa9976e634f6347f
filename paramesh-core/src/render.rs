/// Render loop driver and the backend capability it draws through.
///
/// A frame builds a fresh [`TransformCache`], fills its view/projection from
/// the orbiting camera and then, per instance, swaps in the model matrix and
/// issues one indexed draw with the composed MVP.
use log::trace;
use nalgebra::{Matrix3, Matrix4, Point3, Vector3};

use crate::error::Result;
use crate::math::{self, RotationState};
use crate::projection::Camera;
use crate::scene::{Material, Scene};
use crate::transform::TransformCache;

/// Default time advance per frame
pub const DEFAULT_TIME_STEP: f32 = 0.01;

/// Handle to an uploaded vertex or index buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Handle to a backend pipeline created from a [`Material`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineHandle(pub u64);

/// Uniform values bound for one draw call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawUniforms {
    pub model: Matrix4<f32>,
    pub model_view_projection: Matrix4<f32>,
    /// Inverse-transpose of the model's linear part, for normals. Singular
    /// models get the cofactor matrix instead, which is unnormalized.
    pub normal_matrix: Matrix3<f32>,
    pub color: [f32; 3],
    pub time: f32,
    pub eye: Point3<f32>,
    /// Unit direction towards the light
    pub light: Vector3<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCall {
    pub pipeline: PipelineHandle,
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub index_count: u32,
    pub uniforms: DrawUniforms,
}

/// GPU-side capabilities consumed by the scene and the frame driver.
///
/// Vertex buffers hold packed [`GpuVertex`](crate::geometry::GpuVertex)
/// records and index buffers hold `u16` indices. Creation failures must be
/// reported as errors, never as half-initialised handles.
pub trait RenderBackend {
    fn upload_vertex_buffer(&mut self, bytes: &[u8]) -> Result<BufferHandle>;
    fn upload_index_buffer(&mut self, bytes: &[u8]) -> Result<BufferHandle>;
    fn create_pipeline(&mut self, material: &Material) -> Result<PipelineHandle>;
    fn draw_indexed(&mut self, draw: &DrawCall) -> Result<()>;
}

/// Summary of one rendered frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub frame: u64,
    /// Scene time the frame was rendered at
    pub time: f32,
    pub draw_calls: usize,
    pub indices: u64,
    pub matrix_products: usize,
}

/// Steps scene time and draws every instance of a [`Scene`] each frame
#[derive(Debug, Clone)]
pub struct FrameDriver {
    camera: Camera,
    rotation: RotationState,
    light: Vector3<f32>,
    time: f32,
    time_step: f32,
    frame: u64,
    paused: bool,
}

impl FrameDriver {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            rotation: RotationState::zero(),
            light: Vector3::new(0.4, 1.0, 0.6).normalize(),
            time: 0.0,
            time_step: DEFAULT_TIME_STEP,
            frame: 0,
            paused: false,
        }
    }

    pub fn with_time_step(mut self, time_step: f32) -> Self {
        self.time_step = time_step;
        self
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn time_step(&self) -> f32 {
        self.time_step
    }

    pub fn set_time_step(&mut self, time_step: f32) {
        self.time_step = time_step;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Whole-scene rotation applied before every instance's own model matrix
    pub fn rotation_mut(&mut self) -> &mut RotationState {
        &mut self.rotation
    }

    pub fn set_light(&mut self, light: Vector3<f32>) {
        self.light = math::normalize(&light);
    }

    /// Fill a fresh transform cache for the current time.
    pub fn frame_transforms(&mut self) -> Result<TransformCache> {
        self.camera.orbit(self.time);

        let mut transforms = TransformCache::new();
        transforms.set_view(self.camera.view_matrix()?);
        transforms.set_projection(self.camera.projection_matrix()?);
        transforms.set_time(self.time);
        transforms.set_eye(self.camera.position);
        transforms.set_light(self.light);
        Ok(transforms)
    }

    /// Draw every instance once, then advance the clock.
    ///
    /// The first backend error aborts the frame and the clock stays put.
    pub fn render_frame<B: RenderBackend + ?Sized>(
        &mut self,
        scene: &Scene,
        backend: &mut B,
    ) -> Result<FrameStats> {
        let mut transforms = self.frame_transforms()?;
        let root = math::rotation_matrix(&self.rotation);

        let mut indices = 0u64;
        for instance in scene.instances() {
            let mesh = scene.mesh(instance.mesh)?;
            let material = scene.material(instance.material)?;

            let model = root * instance.uniforms.model;
            transforms.set_model(model);
            let draw = DrawCall {
                pipeline: material.pipeline,
                vertex_buffer: mesh.vertex_buffer,
                index_buffer: mesh.index_buffer,
                index_count: mesh.index_count,
                uniforms: DrawUniforms {
                    model,
                    model_view_projection: transforms.model_view_projection()?,
                    normal_matrix: math::normal_matrix(&model)
                        .unwrap_or_else(|_| math::cofactor_matrix(&model)),
                    color: instance.uniforms.color,
                    time: self.time,
                    eye: self.camera.position,
                    light: self.light,
                },
            };
            backend.draw_indexed(&draw)?;
            indices += u64::from(mesh.index_count);
        }

        let stats = FrameStats {
            frame: self.frame,
            time: self.time,
            draw_calls: scene.instances().len(),
            indices,
            matrix_products: transforms.derived_computations(),
        };
        trace!(
            "frame {} at t={:.2}: {} draws, {} indices",
            stats.frame,
            stats.time,
            stats.draw_calls,
            stats.indices
        );

        self.frame += 1;
        if !self.paused {
            self.time += self.time_step;
        }
        Ok(stats)
    }
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::new(Camera::default())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::Error;

    /// Backend that keeps every upload and draw call for inspection
    #[derive(Debug, Default)]
    pub struct RecordingBackend {
        pub vertex_uploads: Vec<Vec<u8>>,
        pub index_uploads: Vec<Vec<u8>>,
        pub pipelines: Vec<Material>,
        pub draws: Vec<DrawCall>,
        pub fail_uploads: bool,
        pub fail_draw_after: Option<usize>,
        pub(crate) next_handle: u64,
    }

    impl RecordingBackend {
        fn handle(&mut self) -> u64 {
            self.next_handle += 1;
            self.next_handle
        }
    }

    impl RenderBackend for RecordingBackend {
        fn upload_vertex_buffer(&mut self, bytes: &[u8]) -> Result<BufferHandle> {
            if self.fail_uploads {
                return Err(Error::ResourceCreation {
                    resource: "vertex buffer",
                    reason: "out of memory".into(),
                });
            }
            self.vertex_uploads.push(bytes.to_vec());
            Ok(BufferHandle(self.handle()))
        }

        fn upload_index_buffer(&mut self, bytes: &[u8]) -> Result<BufferHandle> {
            self.index_uploads.push(bytes.to_vec());
            Ok(BufferHandle(self.handle()))
        }

        fn create_pipeline(&mut self, material: &Material) -> Result<PipelineHandle> {
            self.pipelines.push(material.clone());
            Ok(PipelineHandle(self.handle()))
        }

        fn draw_indexed(&mut self, draw: &DrawCall) -> Result<()> {
            if self.fail_draw_after == Some(self.draws.len()) {
                return Err(Error::Draw("device lost".into()));
            }
            self.draws.push(*draw);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingBackend;
    use super::*;
    use crate::error::Error;
    use crate::parametric::{self, build_parametric_mesh};
    use crate::scene::{demo_scene, InstanceUniforms, SceneConfig, Shading};
    use std::sync::Arc;

    fn small_scene(backend: &mut RecordingBackend) -> Scene {
        let config = SceneConfig {
            resolution: 3,
            grid: 2,
            ..Default::default()
        };
        demo_scene(backend, &config).unwrap()
    }

    #[test]
    fn test_one_draw_per_instance_with_composed_mvp() {
        let mut backend = RecordingBackend::default();
        let scene = small_scene(&mut backend);
        let mut driver = FrameDriver::default();

        let stats = driver.render_frame(&scene, &mut backend).unwrap();
        assert_eq!(stats.frame, 0);
        assert_eq!(stats.draw_calls, scene.instances().len());
        assert_eq!(backend.draws.len(), scene.instances().len());

        let camera = driver.camera();
        let vp = camera.projection_matrix().unwrap() * camera.view_matrix().unwrap();
        for (draw, instance) in backend.draws.iter().zip(scene.instances()) {
            let expected = vp * instance.uniforms.model;
            assert!((draw.uniforms.model_view_projection - expected).norm() < 1e-4);
            assert_eq!(draw.index_count, scene.mesh(instance.mesh).unwrap().index_count);
        }
    }

    #[test]
    fn test_view_projection_is_computed_once_per_frame() {
        let mut backend = RecordingBackend::default();
        let scene = small_scene(&mut backend);
        let mut driver = FrameDriver::default();

        let stats = driver.render_frame(&scene, &mut backend).unwrap();
        // one MVP per instance plus a single shared view-projection
        assert_eq!(stats.matrix_products, scene.instances().len() + 1);
    }

    #[test]
    fn test_time_advances_by_step() {
        let mut backend = RecordingBackend::default();
        let scene = small_scene(&mut backend);
        let mut driver = FrameDriver::default().with_time_step(0.25);

        driver.render_frame(&scene, &mut backend).unwrap();
        let stats = driver.render_frame(&scene, &mut backend).unwrap();
        assert_eq!(stats.frame, 1);
        assert_eq!(stats.time, 0.25);
        assert_eq!(driver.time(), 0.5);
        assert_eq!(driver.frame(), 2);
        assert_eq!(backend.draws.last().unwrap().uniforms.time, 0.25);
    }

    #[test]
    fn test_paused_clock_holds_time() {
        let mut backend = RecordingBackend::default();
        let scene = small_scene(&mut backend);
        let mut driver = FrameDriver::default();
        driver.toggle_pause();

        driver.render_frame(&scene, &mut backend).unwrap();
        assert_eq!(driver.time(), 0.0);
        assert_eq!(driver.frame(), 1);
    }

    #[test]
    fn test_backend_error_aborts_frame() {
        let mut backend = RecordingBackend::default();
        let scene = small_scene(&mut backend);
        backend.fail_draw_after = Some(2);
        let mut driver = FrameDriver::default();

        let result = driver.render_frame(&scene, &mut backend);
        assert_eq!(result, Err(Error::Draw("device lost".into())));
        assert_eq!(backend.draws.len(), 2);
        assert_eq!(driver.frame(), 0);
        assert_eq!(driver.time(), 0.0);
    }

    #[test]
    fn test_scene_rotation_applies_to_models() {
        let mut backend = RecordingBackend::default();
        let scene = small_scene(&mut backend);
        let mut driver = FrameDriver::default();
        driver.rotation_mut().rotate(0.0, 1.0, 0.0);

        driver.render_frame(&scene, &mut backend).unwrap();
        let root = math::rotation_matrix(&RotationState::new(0.0, 1.0, 0.0));
        let first = &backend.draws[0];
        assert!((first.uniforms.model - root * scene.instances()[0].uniforms.model).norm() < 1e-6);
    }

    #[test]
    fn test_degenerate_camera_is_reported() {
        let mut backend = RecordingBackend::default();
        let scene = small_scene(&mut backend);
        let mut driver = FrameDriver::default();
        driver.camera_mut().near = 0.0;

        assert!(matches!(
            driver.render_frame(&scene, &mut backend),
            Err(Error::InvalidProjection(_))
        ));
        assert!(backend.draws.is_empty());
    }

    #[test]
    fn test_flattened_instance_still_draws() {
        let mut backend = RecordingBackend::default();
        let mut scene = Scene::new();
        let material = scene
            .add_material(&mut backend, Material::new("lit", Shading::Lit))
            .unwrap();
        let mesh = build_parametric_mesh(&parametric::sphere(), 4, 4).unwrap();
        let mesh = scene.add_mesh(&mut backend, Arc::new(mesh)).unwrap();
        for model in [math::scale_matrix(1.0, 1.0, 1.0), math::scale_matrix(3.0, 0.0, 3.0)] {
            scene
                .add_instance(mesh, material, InstanceUniforms::new(model, [1.0; 3]))
                .unwrap();
        }

        let mut driver = FrameDriver::default();
        let stats = driver.render_frame(&scene, &mut backend).unwrap();
        assert_eq!(stats.draw_calls, 2);
        assert_eq!(backend.draws.len(), 2);
        assert_eq!(driver.frame(), 1);

        let flat = &backend.draws[1].uniforms;
        assert!(flat.normal_matrix.iter().all(|c| c.is_finite()));
        assert_eq!(
            flat.normal_matrix,
            math::cofactor_matrix(&math::scale_matrix(3.0, 0.0, 3.0))
        );
    }

    #[test]
    fn test_light_is_normalized_into_uniforms() {
        let mut backend = RecordingBackend::default();
        let scene = small_scene(&mut backend);
        let mut driver = FrameDriver::default();
        driver.set_light(Vector3::new(0.0, 4.0, 3.0));

        let transforms = driver.frame_transforms().unwrap();
        let light = transforms.light().unwrap();
        assert!((light - Vector3::new(0.0, 0.8, 0.6)).norm() < 1e-6);

        driver.render_frame(&scene, &mut backend).unwrap();
        assert!(backend
            .draws
            .iter()
            .all(|d| (d.uniforms.light - Vector3::new(0.0, 0.8, 0.6)).norm() < 1e-6));
    }
}
