/// Vector and 4x4 matrix helpers.
///
/// All matrices are column-major and act on column vectors, so
/// `multiply(a, b)` applies `b` first and `a` second. View space is
/// right-handed with the camera looking down `-Z`.
use nalgebra::{Matrix3, Matrix4, Point3, Vector3};

use crate::error::{Error, Result};

/// Below this length a vector is treated as zero by [`try_normalize`].
pub const NORMALIZE_EPSILON: f32 = 1e-12;

pub fn add(a: &Vector3<f32>, b: &Vector3<f32>) -> Vector3<f32> {
    a + b
}

pub fn sub(a: &Vector3<f32>, b: &Vector3<f32>) -> Vector3<f32> {
    a - b
}

pub fn scale(v: &Vector3<f32>, s: f32) -> Vector3<f32> {
    v * s
}

pub fn dot(a: &Vector3<f32>, b: &Vector3<f32>) -> f32 {
    a.dot(b)
}

pub fn cross(a: &Vector3<f32>, b: &Vector3<f32>) -> Vector3<f32> {
    a.cross(b)
}

/// Unit vector in the direction of `v`.
///
/// A zero-length input yields NaN components; use [`try_normalize`] when the
/// input may be degenerate.
pub fn normalize(v: &Vector3<f32>) -> Vector3<f32> {
    v.normalize()
}

pub fn try_normalize(v: &Vector3<f32>) -> Option<Vector3<f32>> {
    v.try_normalize(NORMALIZE_EPSILON)
}

pub fn multiply(a: &Matrix4<f32>, b: &Matrix4<f32>) -> Matrix4<f32> {
    a * b
}

pub fn transpose(m: &Matrix4<f32>) -> Matrix4<f32> {
    m.transpose()
}

pub fn determinant(m: &Matrix4<f32>) -> f32 {
    m.determinant()
}

/// Right-handed view matrix looking from `eye` towards `center`.
#[rustfmt::skip]
pub fn look_at(eye: &Point3<f32>, center: &Point3<f32>, up: &Vector3<f32>) -> Result<Matrix4<f32>> {
    let forward = try_normalize(&(center - eye))
        .ok_or(Error::DegenerateView("eye and center coincide"))?;
    let side = try_normalize(&forward.cross(up))
        .ok_or(Error::DegenerateView("up is parallel to the view direction"))?;
    let up = side.cross(&forward);

    let eye = eye.coords;
    Ok(Matrix4::new(
        side.x, side.y, side.z, -side.dot(&eye),
        up.x, up.y, up.z, -up.dot(&eye),
        -forward.x, -forward.y, -forward.z, forward.dot(&eye),
        0.0, 0.0, 0.0, 1.0,
    ))
}

/// Symmetric perspective frustum mapping view depth `[-near, -far]` to NDC `[-1, 1]`.
#[rustfmt::skip]
pub fn perspective(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Result<Matrix4<f32>> {
    if !(fov_degrees > 0.0 && fov_degrees < 180.0) {
        return Err(Error::InvalidProjection(format!(
            "field of view {fov_degrees} must be within (0, 180) degrees"
        )));
    }
    if !(aspect > 0.0) {
        return Err(Error::InvalidProjection(format!("aspect {aspect} must be positive")));
    }
    if !(near > 0.0) {
        return Err(Error::InvalidProjection(format!("near plane {near} must be positive")));
    }
    if near == far {
        return Err(Error::InvalidProjection(format!(
            "near and far planes coincide at {near}"
        )));
    }

    let f = 1.0 / (fov_degrees.to_radians() / 2.0).tan();
    let depth = near - far;
    Ok(Matrix4::new(
        f / aspect, 0.0, 0.0, 0.0,
        0.0, f, 0.0, 0.0,
        0.0, 0.0, (far + near) / depth, 2.0 * far * near / depth,
        0.0, 0.0, -1.0, 0.0,
    ))
}

pub fn translate(x: f32, y: f32, z: f32) -> Matrix4<f32> {
    Matrix4::new_translation(&Vector3::new(x, y, z))
}

pub fn scale_matrix(sx: f32, sy: f32, sz: f32) -> Matrix4<f32> {
    Matrix4::new_nonuniform_scaling(&Vector3::new(sx, sy, sz))
}

/// General 4x4 inverse.
pub fn invert(m: &Matrix4<f32>) -> Result<Matrix4<f32>> {
    m.try_inverse().ok_or(Error::SingularMatrix)
}

/// Inverse of a rotation + translation matrix.
///
/// Only valid when the upper 3x3 block is orthonormal and the bottom row is
/// `[0, 0, 0, 1]`, as for matrices built by [`look_at`]. Other inputs give a
/// wrong result; use [`invert`] for them.
pub fn invert_orthonormal(m: &Matrix4<f32>) -> Matrix4<f32> {
    let rotation_t: Matrix3<f32> = m.fixed_view::<3, 3>(0, 0).transpose();
    let translation = -(rotation_t * m.fixed_view::<3, 1>(0, 3));

    let mut inverse = rotation_t.to_homogeneous();
    inverse.fixed_view_mut::<3, 1>(0, 3).copy_from(&translation);
    inverse
}

/// Inverse-transpose of the model's upper 3x3, for transforming normals.
pub fn normal_matrix(model: &Matrix4<f32>) -> Result<Matrix3<f32>> {
    let linear: Matrix3<f32> = model.fixed_view::<3, 3>(0, 0).into_owned();
    linear
        .try_inverse()
        .map(|inverse| inverse.transpose())
        .ok_or(Error::SingularMatrix)
}

/// Cofactor matrix of the model's upper 3x3.
///
/// Equals `det * normal_matrix(model)`, so it orients normals the same way
/// for positive determinants and stays defined for singular models.
pub fn cofactor_matrix(model: &Matrix4<f32>) -> Matrix3<f32> {
    let linear: Matrix3<f32> = model.fixed_view::<3, 3>(0, 0).into_owned();
    let (c0, c1, c2) = (linear.column(0), linear.column(1), linear.column(2));
    Matrix3::from_columns(&[c1.cross(&c2), c2.cross(&c0), c0.cross(&c1)])
}

/// Rotation state around three axes (in radians)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationState {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl RotationState {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Rotate by delta amounts (in radians)
    pub fn rotate(&mut self, dx: f32, dy: f32, dz: f32) {
        self.x += dx;
        self.y += dy;
        self.z += dz;
    }
}

impl Default for RotationState {
    fn default() -> Self {
        Self::zero()
    }
}

/// Euler rotation applied X first, then Y, then Z.
pub fn rotation_matrix(rotation: &RotationState) -> Matrix4<f32> {
    let rx = Matrix4::new_rotation(Vector3::new(rotation.x, 0.0, 0.0));
    let ry = Matrix4::new_rotation(Vector3::new(0.0, rotation.y, 0.0));
    let rz = Matrix4::new_rotation(Vector3::new(0.0, 0.0, rotation.z));

    rz * ry * rx
}
