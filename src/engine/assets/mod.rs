// Texture atlas packing
//
// Computes packed layouts for same-purpose cosmetic textures and the UV
// remapping needed to draw them from a single atlas.

mod atlas;
mod packer;

pub use atlas::{compose, AtlasRegion, PackedAtlas, UvTransform};
pub use packer::{fits_canvas, pack, AtlasInput, PackerConfig, DEFAULT_PACKER_CONFIG};

/// Atlas packing errors
///
/// Callers fall back to binding each texture on its own.
#[derive(Debug, thiserror::Error)]
pub enum AtlasError {
    #[error("Texture {id} is {width}x{height}, larger than the {max}px atlas limit")]
    TextureTooLarge {
        id: String,
        width: u32,
        height: u32,
        max: u32,
    },

    #[error("{count} textures do not fit in a {max}x{max} atlas")]
    NoFit { count: usize, max: u32 },

    #[error("No source image for atlas region: {0}")]
    MissingSource(String),

    #[error("Source image {id} is {actual:?}, expected {expected:?}")]
    SizeMismatch {
        id: String,
        expected: (u32, u32),
        actual: (u32, u32),
    },
}
