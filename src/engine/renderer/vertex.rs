// Vertex emission seam between cosmetic geometry and the render backend

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4};

use crate::engine::assets::UvTransform;

/// Vertex for cosmetic cube rendering
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Position in model space
    pub position: [f32; 3],
    /// Texture coordinates (UV)
    pub tex_coords: [f32; 2],
    /// Vertex color (RGBA)
    pub color: [f32; 4],
}

impl Vertex {
    /// Create a new vertex
    pub fn new(position: Vec3, tex_coords: Vec2, color: Vec4) -> Self {
        Self {
            position: position.to_array(),
            tex_coords: tex_coords.to_array(),
            color: color.to_array(),
        }
    }
}

/// Anything that accepts emitted vertices (a GPU buffer writer, a test sink...)
pub trait VertexConsumer {
    fn vertex(&mut self, vertex: Vertex);
}

impl VertexConsumer for Vec<Vertex> {
    fn vertex(&mut self, vertex: Vertex) {
        self.push(vertex);
    }
}

/// Wraps a consumer and moves texture coordinates into atlas space
///
/// Lets existing emitters draw from a packed atlas without knowing about it.
pub struct AtlasVertexConsumer<'a, C: VertexConsumer + ?Sized> {
    inner: &'a mut C,
    transform: UvTransform,
}

impl<'a, C: VertexConsumer + ?Sized> AtlasVertexConsumer<'a, C> {
    pub fn new(inner: &'a mut C, transform: UvTransform) -> Self {
        Self { inner, transform }
    }
}

impl<C: VertexConsumer + ?Sized> VertexConsumer for AtlasVertexConsumer<'_, C> {
    fn vertex(&mut self, mut vertex: Vertex) {
        let uv = self.transform.apply(Vec2::from_array(vertex.tex_coords));
        vertex.tex_coords = uv.to_array();
        self.inner.vertex(vertex);
    }
}

/// Raw bytes of a vertex slice, ready for upload
pub fn vertex_bytes(vertices: &[Vertex]) -> &[u8] {
    bytemuck::cast_slice(vertices)
}
