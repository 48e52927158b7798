// Render-backend seam
//
// The core never issues draw calls; it only hands vertices to a consumer.

mod vertex;

pub use vertex::{vertex_bytes, AtlasVertexConsumer, Vertex, VertexConsumer};
