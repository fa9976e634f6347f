/// ASCII rasterizer for terminal rendering
use std::collections::HashMap;
use std::io::Write;

use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use log::{debug, trace};
use nalgebra::{Point3, Vector3};
use paramesh_core::projection::project_to_screen;
use paramesh_core::{
    BufferHandle, DrawCall, Error, GpuVertex, Material, PipelineHandle, RenderBackend, Result,
    Shading,
};

/// Character luminosity ramp for depth/shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Light that reaches faces turned away from the light direction
const AMBIENT: f32 = 0.15;

/// A rasterized cell: glyph, colour and NDC depth
#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    glyph: char,
    color: Color,
    depth: f32,
}

impl Cell {
    const EMPTY: Cell = Cell {
        glyph: ' ',
        color: Color::Reset,
        depth: f32::INFINITY,
    };
}

/// Screen-space vertex after projection
#[derive(Debug, Clone, Copy)]
struct ScreenVertex {
    x: f32,
    y: f32,
    depth: f32,
}

/// Software backend that rasterizes indexed triangles into a character grid
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    vertex_buffers: HashMap<BufferHandle, Vec<GpuVertex>>,
    index_buffers: HashMap<BufferHandle, Vec<u16>>,
    pipelines: HashMap<PipelineHandle, Shading>,
    shading_override: Option<Shading>,
    next_handle: u64,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::EMPTY; width * height],
            vertex_buffers: HashMap::new(),
            index_buffers: HashMap::new(),
            pipelines: HashMap::new(),
            shading_override: None,
            next_handle: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Width over height of the grid in pixels, with cells about twice as tall as wide
    pub fn aspect(&self) -> f32 {
        self.width as f32 / (self.height.max(1) as f32 * 2.0)
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        debug!("resizing ascii target to {width}x{height}");
        self.width = width;
        self.height = height;
        self.cells = vec![Cell::EMPTY; width * height];
    }

    pub fn clear(&mut self) {
        self.cells.fill(Cell::EMPTY);
    }

    /// Force every pipeline to one shading mode, `None` to use each material's own
    pub fn set_shading_override(&mut self, shading: Option<Shading>) {
        self.shading_override = shading;
    }

    pub fn shading_override(&self) -> Option<Shading> {
        self.shading_override
    }

    pub fn glyph_at(&self, x: usize, y: usize) -> Option<char> {
        (x < self.width && y < self.height).then(|| self.cells[y * self.width + x].glyph)
    }

    /// Number of cells covered by geometry since the last clear
    pub fn covered_cells(&self) -> usize {
        self.cells.iter().filter(|c| c.depth.is_finite()).count()
    }

    fn next_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn shade(&self, shading: Shading, normal: &Vector3<f32>, draw: &DrawCall) -> (char, Color) {
        let uniforms = &draw.uniforms;
        let brightness = AMBIENT + (1.0 - AMBIENT) * normal.dot(&uniforms.light).max(0.0);

        let char_index = (brightness * (LUMINOSITY_RAMP.len() - 1) as f32) as usize;
        let glyph = LUMINOSITY_RAMP[char_index.min(LUMINOSITY_RAMP.len() - 1)];

        let rgb = match shading {
            Shading::Lit => uniforms.color.map(|c| c * brightness),
            Shading::Normals => [normal.x, normal.y, normal.z].map(|c| c * 0.5 + 0.5),
        };
        let [r, g, b] = rgb.map(|c| (c.clamp(0.0, 1.0) * 255.0) as u8);
        (glyph, Color::Rgb { r, g, b })
    }

    fn render_triangle(&mut self, corners: [&GpuVertex; 3], draw: &DrawCall, shading: Shading) {
        let uniforms = &draw.uniforms;

        // Project vertices to screen space
        let mut screen = [ScreenVertex { x: 0.0, y: 0.0, depth: 0.0 }; 3];
        for (out, vertex) in screen.iter_mut().zip(corners) {
            let position = Point3::from(vertex.position);
            match project_to_screen(
                &uniforms.model_view_projection,
                &position,
                self.width as u32,
                self.height as u32,
            ) {
                Some((x, y, depth)) => *out = ScreenVertex { x, y, depth },
                None => return, // Triangle crosses behind the camera
            }
        }

        // Smooth normals averaged per face, falling back to the face normal
        // where estimation left NaNs
        let averaged: Vector3<f32> = corners
            .iter()
            .map(|v| uniforms.normal_matrix * Vector3::from(v.normal))
            .sum();
        let normal = averaged
            .try_normalize(f32::EPSILON)
            .filter(|n| n.iter().all(|c| c.is_finite()))
            .or_else(|| {
                let world = corners.map(|v| uniforms.model.transform_point(&Point3::from(v.position)));
                (world[1] - world[0])
                    .cross(&(world[2] - world[0]))
                    .try_normalize(f32::EPSILON)
            });
        let Some(normal) = normal else {
            return; // Zero-area face
        };

        let (glyph, color) = self.shade(shading, &normal, draw);
        self.rasterize_triangle(&screen, glyph, color);
    }

    fn rasterize_triangle(&mut self, coords: &[ScreenVertex; 3], glyph: char, color: Color) {
        let [v0, v1, v2] = *coords;
        if self.width == 0 || self.height == 0 {
            return;
        }

        // Bounding box
        let min_x = v0.x.min(v1.x).min(v2.x).floor().max(0.0) as usize;
        let max_x = v0.x.max(v1.x).max(v2.x).ceil().min(self.width as f32 - 1.0);
        let min_y = v0.y.min(v1.y).min(v2.y).floor().max(0.0) as usize;
        let max_y = v0.y.max(v1.y).max(v2.y).ceil().min(self.height as f32 - 1.0);
        if max_x < 0.0 || max_y < 0.0 {
            return;
        }
        let (max_x, max_y) = (max_x as usize, max_y as usize);

        // Scanline rasterization
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                // Barycentric coordinates
                let Some((w0, w1, w2)) =
                    barycentric((v0.x, v0.y), (v1.x, v1.y), (v2.x, v2.y), (px, py))
                else {
                    return; // Degenerate on screen
                };
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                // Interpolate depth, dropping fragments outside the near/far range
                let depth = w0 * v0.depth + w1 * v1.depth + w2 * v2.depth;
                if !(-1.0..=1.0).contains(&depth) {
                    continue;
                }

                let cell = &mut self.cells[y * self.width + x];
                if depth < cell.depth {
                    *cell = Cell { glyph, color, depth };
                }
            }
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut current = None;
        for (y, row) in self.cells.chunks(self.width.max(1)).enumerate() {
            if y > 0 {
                writer.queue(Print("\r\n"))?;
            }
            for cell in row {
                if current != Some(cell.color) {
                    writer.queue(SetForegroundColor(cell.color))?;
                    current = Some(cell.color);
                }
                writer.queue(Print(cell.glyph))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

impl RenderBackend for AsciiRenderer {
    fn upload_vertex_buffer(&mut self, bytes: &[u8]) -> Result<BufferHandle> {
        let stride = std::mem::size_of::<GpuVertex>();
        if bytes.len() % stride != 0 {
            return Err(Error::ResourceCreation {
                resource: "vertex buffer",
                reason: format!("{} bytes is not a multiple of the {stride}-byte vertex", bytes.len()),
            });
        }
        let vertices: Vec<GpuVertex> = bytes
            .chunks_exact(stride)
            .map(bytemuck::pod_read_unaligned)
            .collect();

        let handle = BufferHandle(self.next_handle());
        trace!("vertex buffer {handle:?}: {} vertices", vertices.len());
        self.vertex_buffers.insert(handle, vertices);
        Ok(handle)
    }

    fn upload_index_buffer(&mut self, bytes: &[u8]) -> Result<BufferHandle> {
        if bytes.len() % 2 != 0 {
            return Err(Error::ResourceCreation {
                resource: "index buffer",
                reason: format!("{} bytes is not a whole number of u16 indices", bytes.len()),
            });
        }
        let indices: Vec<u16> = bytes
            .chunks_exact(2)
            .map(bytemuck::pod_read_unaligned)
            .collect();

        let handle = BufferHandle(self.next_handle());
        trace!("index buffer {handle:?}: {} indices", indices.len());
        self.index_buffers.insert(handle, indices);
        Ok(handle)
    }

    fn create_pipeline(&mut self, material: &Material) -> Result<PipelineHandle> {
        let handle = PipelineHandle(self.next_handle());
        self.pipelines.insert(handle, material.shading);
        Ok(handle)
    }

    fn draw_indexed(&mut self, draw: &DrawCall) -> Result<()> {
        let shading = *self
            .pipelines
            .get(&draw.pipeline)
            .ok_or_else(|| Error::Draw(format!("unknown pipeline {:?}", draw.pipeline)))?;
        let shading = self.shading_override.unwrap_or(shading);

        // Buffers are taken out for the duration of the draw so the
        // rasterizer can borrow the frame mutably
        let vertices = self
            .vertex_buffers
            .remove(&draw.vertex_buffer)
            .ok_or_else(|| Error::Draw(format!("unknown vertex buffer {:?}", draw.vertex_buffer)))?;
        let Some(indices) = self.index_buffers.remove(&draw.index_buffer) else {
            self.vertex_buffers.insert(draw.vertex_buffer, vertices);
            return Err(Error::Draw(format!("unknown index buffer {:?}", draw.index_buffer)));
        };

        let count = (draw.index_count as usize).min(indices.len());
        let mut result = Ok(());
        for triangle in indices[..count].chunks_exact(3) {
            let corners = match [triangle[0], triangle[1], triangle[2]].map(|i| vertices.get(i as usize)) {
                [Some(a), Some(b), Some(c)] => [a, b, c],
                _ => {
                    result = Err(Error::Draw(format!(
                        "index out of range for {} vertices",
                        vertices.len()
                    )));
                    break;
                }
            };
            self.render_triangle(corners, draw, shading);
        }

        self.vertex_buffers.insert(draw.vertex_buffer, vertices);
        self.index_buffers.insert(draw.index_buffer, indices);
        result
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}
