/// Parametric surfaces and the grid mesher that turns them into indexed meshes.
///
/// A [`Shape`] maps `(u, v) ∈ [0, 1]²` to a point in space. The mesher samples
/// it on a regular `(u + 1) × (v + 1)` grid, row-major by `v` then `u`, and
/// splits every grid cell into two triangles.
use std::f32::consts::PI;
use std::fmt;

use log::{debug, warn};
use nalgebra::{Point3, Vector2, Vector3};

use crate::error::{Error, Result};
use crate::geometry::{Mesh, Vertex, MAX_VERTICES};
use crate::math;

/// Parameter offset used by the central-difference normal estimate.
pub const NORMAL_EPSILON: f32 = 0.01;

/// Tangent cross products shorter than this fraction of the squared longer
/// tangent are treated as zero.
pub const DEGENERATE_TANGENT_RATIO: f32 = 1e-4;

/// `(u, v) -> position`
pub type PositionFn = Box<dyn Fn(f32, f32) -> Point3<f32> + Send + Sync>;
/// `(u, v) -> surface normal`, need not be unit length
pub type NormalFn = Box<dyn Fn(f32, f32) -> Vector3<f32> + Send + Sync>;
/// `(u, v) -> texture coordinate`
pub type UvFn = Box<dyn Fn(f32, f32) -> Vector2<f32> + Send + Sync>;

/// A parametric surface: a required position function plus optional
/// normal and texture-coordinate functions.
pub struct Shape {
    name: String,
    position: PositionFn,
    normal: Option<NormalFn>,
    uv: Option<UvFn>,
}

impl Shape {
    pub fn new(
        name: impl Into<String>,
        position: impl Fn(f32, f32) -> Point3<f32> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            position: Box::new(position),
            normal: None,
            uv: None,
        }
    }

    pub fn with_normal(
        mut self,
        normal: impl Fn(f32, f32) -> Vector3<f32> + Send + Sync + 'static,
    ) -> Self {
        self.normal = Some(Box::new(normal));
        self
    }

    pub fn with_uv(mut self, uv: impl Fn(f32, f32) -> Vector2<f32> + Send + Sync + 'static) -> Self {
        self.uv = Some(Box::new(uv));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self, u: f32, v: f32) -> Point3<f32> {
        (self.position)(u, v)
    }

    /// Surface normal at `(u, v)`: the explicit normal function if the shape
    /// has one, otherwise a finite-difference estimate.
    pub fn normal(&self, u: f32, v: f32) -> Vector3<f32> {
        match &self.normal {
            Some(normal) => math::normalize(&normal(u, v)),
            None => estimate_normal(&self.position, u, v),
        }
    }

    pub fn uv(&self, u: f32, v: f32) -> Option<Vector2<f32>> {
        self.uv.as_ref().map(|uv| uv(u, v))
    }

    pub fn has_normal_fn(&self) -> bool {
        self.normal.is_some()
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("name", &self.name)
            .field("normal", &self.normal.is_some())
            .field("uv", &self.uv.is_some())
            .finish()
    }
}

/// Normal from central differences of `position` around `(u, v)`.
///
/// Returns the normalized `∂f/∂u × ∂f/∂v`. At parametric singularities such
/// as the poles of a sphere one tangent vanishes and the result is NaN.
/// A tangent that only vanishes up to rounding counts as vanished: the cross
/// product is compared against the longer tangent, so the test does not
/// depend on the size of the shape.
pub fn estimate_normal(position: impl Fn(f32, f32) -> Point3<f32>, u: f32, v: f32) -> Vector3<f32> {
    let du = position(u + NORMAL_EPSILON, v) - position(u - NORMAL_EPSILON, v);
    let dv = position(u, v + NORMAL_EPSILON) - position(u, v - NORMAL_EPSILON);
    let normal = math::cross(&du, &dv);

    let longest = du.norm().max(dv.norm());
    if normal.norm() <= DEGENERATE_TANGENT_RATIO * longest * longest {
        return Vector3::repeat(f32::NAN);
    }
    math::normalize(&normal)
}

/// Sample `shape` on a `u × v` cell grid and triangulate it.
///
/// Produces `(u + 1) * (v + 1)` vertices and `6 * u * v` indices. Each cell
/// `(iu, iv)` is split along the diagonal from `(iu, iv + 1)` to `(iu + 1, iv)`
/// into two triangles wound counter-clockwise around the `∂u × ∂v` normal.
pub fn build_parametric_mesh(shape: &Shape, u: u32, v: u32) -> Result<Mesh> {
    if u == 0 || v == 0 {
        return Err(Error::InvalidResolution { u, v });
    }
    let columns = u as usize + 1;
    let rows = v as usize + 1;
    let vertex_count = columns
        .checked_mul(rows)
        .filter(|&count| count <= MAX_VERTICES)
        .ok_or(Error::IndexOverflow {
            u,
            v,
            vertices: columns.saturating_mul(rows),
            max: MAX_VERTICES,
        })?;

    let mut vertices = Vec::with_capacity(vertex_count);
    for iv in 0..rows {
        for iu in 0..columns {
            let s = iu as f32 / u as f32;
            let t = iv as f32 / v as f32;
            let mut vertex = Vertex::new(shape.position(s, t), shape.normal(s, t));
            vertex.uv = shape.uv(s, t);
            vertices.push(vertex);
        }
    }

    let mut indices = Vec::with_capacity(6 * u as usize * v as usize);
    for iv in 0..v as usize {
        for iu in 0..u as usize {
            // Bounded by MAX_VERTICES above
            let i00 = (iv * columns + iu) as u16;
            let i10 = i00 + 1;
            let i01 = ((iv + 1) * columns + iu) as u16;
            let i11 = i01 + 1;
            indices.extend_from_slice(&[i00, i10, i01, i10, i11, i01]);
        }
    }

    let degenerate = vertices.iter().filter(|v| v.has_degenerate_normal()).count();
    if degenerate > 0 {
        warn!(
            "{}: {degenerate} of {vertex_count} normals are degenerate (parametric singularity)",
            shape.name
        );
    }
    debug!(
        "built {} mesh at {u}x{v}: {vertex_count} vertices, {} indices",
        shape.name,
        indices.len()
    );

    Mesh::from_parts(vertices, indices)
}

fn unit_uv(u: f32, v: f32) -> Vector2<f32> {
    Vector2::new(u, v)
}

/// Unit plane in XZ centred on the origin, facing `+Y`
pub fn plane() -> Shape {
    Shape::new("plane", |u, v| Point3::new(u - 0.5, 0.0, 0.5 - v))
        .with_normal(|_, _| Vector3::new(0.0, 1.0, 0.0))
        .with_uv(unit_uv)
}

/// Unit sphere with `v` running from the north pole to the south pole.
///
/// Normals are estimated, so the pole rows come out degenerate.
pub fn sphere() -> Shape {
    Shape::new("sphere", |u, v| {
        let au = 2.0 * PI * u;
        let av = PI * v;
        let s = av.sin();
        Point3::new(s * au.cos(), av.cos(), s * au.sin())
    })
    .with_uv(unit_uv)
}

/// Torus around the Y axis with ring radius `major` and tube radius `minor`.
///
/// The tube angle runs downward on the outer side so that `∂u × ∂v` points
/// out of the tube, matching the explicit normal.
pub fn torus(major: f32, minor: f32) -> Shape {
    Shape::new("torus", move |u, v| {
        let au = 2.0 * PI * u;
        let av = 2.0 * PI * v;
        let ring = major + minor * av.cos();
        Point3::new(ring * au.cos(), -minor * av.sin(), ring * au.sin())
    })
    .with_normal(|u, v| {
        let au = 2.0 * PI * u;
        let av = 2.0 * PI * v;
        Vector3::new(av.cos() * au.cos(), -av.sin(), av.cos() * au.sin())
    })
    .with_uv(unit_uv)
}
