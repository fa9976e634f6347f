/// Per-frame transform uniforms with memoized matrix products
use std::cell::Cell;
use std::fmt;

use log::trace;
use nalgebra::{Matrix4, Point3, Vector3};

use crate::error::{Error, Result};

/// Identifies one of the six matrix slots of a [`TransformCache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformSlot {
    Model,
    View,
    Projection,
    ModelView,
    ViewProjection,
    ModelViewProjection,
}

impl TransformSlot {
    /// Primary slots are set by the caller; the rest are derived from them.
    pub fn is_primary(self) -> bool {
        matches!(self, Self::Model | Self::View | Self::Projection)
    }
}

impl fmt::Display for TransformSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Model => "model",
            Self::View => "view",
            Self::Projection => "projection",
            Self::ModelView => "modelview",
            Self::ViewProjection => "viewprojection",
            Self::ModelViewProjection => "modelviewprojection",
        };
        f.write_str(name)
    }
}

/// Model, view and projection matrices plus the products derived from them.
///
/// Derived products are computed on first read and cached until one of
/// their inputs is replaced. With column vectors the products are
/// `modelview = view * model`, `viewprojection = projection * view` and
/// `modelviewprojection = viewprojection * model`.
///
/// Reading a primary slot that was never set fails with
/// [`Error::UnsetTransform`]; there is no implicit identity.
#[derive(Debug, Default, Clone)]
pub struct TransformCache {
    model: Option<Matrix4<f32>>,
    view: Option<Matrix4<f32>>,
    projection: Option<Matrix4<f32>>,
    model_view: Cell<Option<Matrix4<f32>>>,
    view_projection: Cell<Option<Matrix4<f32>>>,
    model_view_projection: Cell<Option<Matrix4<f32>>>,
    computations: Cell<usize>,
    time: Option<f32>,
    eye: Option<Point3<f32>>,
    light: Option<Vector3<f32>>,
}

impl TransformCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_model(&mut self, model: Matrix4<f32>) {
        self.model = Some(model);
        self.model_view.set(None);
        self.model_view_projection.set(None);
    }

    pub fn set_view(&mut self, view: Matrix4<f32>) {
        self.view = Some(view);
        self.model_view.set(None);
        self.view_projection.set(None);
        self.model_view_projection.set(None);
    }

    pub fn set_projection(&mut self, projection: Matrix4<f32>) {
        self.projection = Some(projection);
        self.view_projection.set(None);
        self.model_view_projection.set(None);
    }

    pub fn model(&self) -> Result<Matrix4<f32>> {
        self.model.ok_or(Error::UnsetTransform(TransformSlot::Model))
    }

    pub fn view(&self) -> Result<Matrix4<f32>> {
        self.view.ok_or(Error::UnsetTransform(TransformSlot::View))
    }

    pub fn projection(&self) -> Result<Matrix4<f32>> {
        self.projection
            .ok_or(Error::UnsetTransform(TransformSlot::Projection))
    }

    pub fn model_view(&self) -> Result<Matrix4<f32>> {
        self.derive(&self.model_view, TransformSlot::ModelView, || {
            Ok(self.view()? * self.model()?)
        })
    }

    pub fn view_projection(&self) -> Result<Matrix4<f32>> {
        self.derive(&self.view_projection, TransformSlot::ViewProjection, || {
            Ok(self.projection()? * self.view()?)
        })
    }

    pub fn model_view_projection(&self) -> Result<Matrix4<f32>> {
        self.derive(
            &self.model_view_projection,
            TransformSlot::ModelViewProjection,
            || Ok(self.view_projection()? * self.model()?),
        )
    }

    /// Read any slot by identity.
    pub fn get(&self, slot: TransformSlot) -> Result<Matrix4<f32>> {
        match slot {
            TransformSlot::Model => self.model(),
            TransformSlot::View => self.view(),
            TransformSlot::Projection => self.projection(),
            TransformSlot::ModelView => self.model_view(),
            TransformSlot::ViewProjection => self.view_projection(),
            TransformSlot::ModelViewProjection => self.model_view_projection(),
        }
    }

    /// Whether a derived slot currently holds a memoized value.
    pub fn is_cached(&self, slot: TransformSlot) -> bool {
        match slot {
            TransformSlot::ModelView => self.model_view.get().is_some(),
            TransformSlot::ViewProjection => self.view_projection.get().is_some(),
            TransformSlot::ModelViewProjection => self.model_view_projection.get().is_some(),
            _ => false,
        }
    }

    /// Number of matrix products computed so far.
    pub fn derived_computations(&self) -> usize {
        self.computations.get()
    }

    pub fn set_time(&mut self, time: f32) {
        self.time = Some(time);
    }

    pub fn time(&self) -> Option<f32> {
        self.time
    }

    pub fn set_eye(&mut self, eye: Point3<f32>) {
        self.eye = Some(eye);
    }

    pub fn eye(&self) -> Option<Point3<f32>> {
        self.eye
    }

    pub fn set_light(&mut self, light: Vector3<f32>) {
        self.light = Some(light);
    }

    pub fn light(&self) -> Option<Vector3<f32>> {
        self.light
    }

    fn derive(
        &self,
        cell: &Cell<Option<Matrix4<f32>>>,
        slot: TransformSlot,
        compute: impl FnOnce() -> Result<Matrix4<f32>>,
    ) -> Result<Matrix4<f32>> {
        if let Some(cached) = cell.get() {
            return Ok(cached);
        }
        let value = compute()?;
        self.computations.set(self.computations.get() + 1);
        trace!("computed {slot}");
        cell.set(Some(value));
        Ok(value)
    }
}
