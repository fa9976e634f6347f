/// Camera and projection utilities
use nalgebra::{Matrix4, Point3, Vector3, Vector4};

use crate::error::Result;
use crate::math;

/// Smallest clip-space `w` still treated as in front of the camera
const MIN_CLIP_W: f32 = 1e-6;

/// Camera configuration for 3D rendering
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view in degrees
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(aspect: f32) -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 5.0),
            target: Point3::origin(),
            up: Vector3::y(),
            fov: 90.0,
            aspect,
            near: 0.001,
            far: 100.0,
        }
    }

    /// Eye position on the orbit around the origin at time `t`.
    ///
    /// Circles the scene on a 25 x 10 ellipse while slowly bobbing between
    /// heights 0 and 20.
    pub fn orbit_position(t: f32) -> Point3<f32> {
        Point3::new(
            25.0 * t.cos(),
            10.0 * (1.0 - (t * 0.2).cos()),
            10.0 * t.sin(),
        )
    }

    /// Move the eye to its orbit position for time `t`, looking at the target
    pub fn orbit(&mut self, t: f32) {
        self.position = Self::orbit_position(t);
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Result<Matrix4<f32>> {
        math::look_at(&self.position, &self.target, &self.up)
    }

    /// Create the projection matrix
    pub fn projection_matrix(&self) -> Result<Matrix4<f32>> {
        math::perspective(self.fov, self.aspect, self.near, self.far)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Project a model-space point to screen space using a composed MVP.
///
/// Returns `(x, y, depth)` with `y` growing downwards and depth in NDC, or
/// `None` if the point lies behind the camera.
pub fn project_to_screen(
    mvp: &Matrix4<f32>,
    point: &Point3<f32>,
    width: u32,
    height: u32,
) -> Option<(f32, f32, f32)> {
    let clip = mvp * Vector4::new(point.x, point.y, point.z, 1.0);

    // Prevent division by near-zero or negative w
    if clip.w < MIN_CLIP_W {
        return None;
    }

    let ndc_x = clip.x / clip.w;
    let ndc_y = clip.y / clip.w;
    let depth = clip.z / clip.w;

    let screen_x = (ndc_x + 1.0) * 0.5 * width as f32;
    let screen_y = (1.0 - ndc_y) * 0.5 * height as f32;

    Some((screen_x, screen_y, depth))
}
