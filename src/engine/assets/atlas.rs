// Packed texture atlas layout and UV remapping

use std::collections::HashMap;

use glam::Vec2;
use image::RgbaImage;

use super::AtlasError;

/// Affine UV remap from a source texture into atlas space: `uv' = uv * scale + offset`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvTransform {
    pub scale: Vec2,
    pub offset: Vec2,
}

impl UvTransform {
    /// The transform that leaves coordinates untouched
    pub const IDENTITY: Self = Self {
        scale: Vec2::ONE,
        offset: Vec2::ZERO,
    };

    /// Remap a normalized source UV into atlas space
    pub fn apply(&self, uv: Vec2) -> Vec2 {
        uv * self.scale + self.offset
    }
}

impl Default for UvTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A placed texture within a packed atlas
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasRegion {
    /// Id of the source texture
    pub id: String,

    /// Position in the atlas (pixels)
    pub x: u32,
    pub y: u32,

    /// Size of the region (pixels)
    pub width: u32,
    pub height: u32,

    /// UV coordinates (0.0 to 1.0)
    pub uv_min: Vec2,
    pub uv_max: Vec2,
}

impl AtlasRegion {
    /// Create a new atlas region with calculated UV coordinates
    pub fn new(
        id: impl Into<String>,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        atlas_width: u32,
        atlas_height: u32,
    ) -> Self {
        let uv_min = Vec2::new(
            x as f32 / atlas_width as f32,
            y as f32 / atlas_height as f32,
        );
        let uv_max = Vec2::new(
            (x + width) as f32 / atlas_width as f32,
            (y + height) as f32 / atlas_height as f32,
        );

        Self {
            id: id.into(),
            x,
            y,
            width,
            height,
            uv_min,
            uv_max,
        }
    }

    /// Transform mapping this texture's own UV space onto the region
    pub fn uv_transform(&self) -> UvTransform {
        UvTransform {
            scale: self.uv_max - self.uv_min,
            offset: self.uv_min,
        }
    }

    /// Check whether two regions share any pixel
    pub fn intersects(&self, other: &AtlasRegion) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// Result of a successful pack: canvas size plus one region per input texture
#[derive(Debug, Clone, PartialEq)]
pub struct PackedAtlas {
    /// Width of the atlas texture
    pub width: u32,

    /// Height of the atlas texture
    pub height: u32,

    /// All regions in this atlas, in input order
    regions: Vec<AtlasRegion>,
}

impl PackedAtlas {
    pub(crate) fn new(width: u32, height: u32, regions: Vec<AtlasRegion>) -> Self {
        Self {
            width,
            height,
            regions,
        }
    }

    /// Get a region by texture id
    pub fn get_region(&self, id: &str) -> Option<&AtlasRegion> {
        self.regions.iter().find(|r| r.id == id)
    }

    /// UV remap for a texture, if it was packed
    pub fn uv_transform(&self, id: &str) -> Option<UvTransform> {
        self.get_region(id).map(AtlasRegion::uv_transform)
    }

    /// Get all regions
    pub fn regions(&self) -> &[AtlasRegion] {
        &self.regions
    }

    /// Get the number of regions
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Fraction of the canvas covered by textures
    pub fn occupancy(&self) -> f32 {
        let canvas = self.width as f64 * self.height as f64;
        if canvas == 0.0 {
            return 0.0;
        }
        let used: f64 = self
            .regions
            .iter()
            .map(|r| r.width as f64 * r.height as f64)
            .sum();
        (used / canvas) as f32
    }
}

/// Copy every source image into its packed position
///
/// Each region must have a source image with exactly the packed dimensions.
pub fn compose(
    atlas: &PackedAtlas,
    sources: &HashMap<String, RgbaImage>,
) -> Result<RgbaImage, AtlasError> {
    let mut canvas = RgbaImage::new(atlas.width, atlas.height);

    for region in atlas.regions() {
        let source = sources
            .get(&region.id)
            .ok_or_else(|| AtlasError::MissingSource(region.id.clone()))?;

        if source.dimensions() != (region.width, region.height) {
            return Err(AtlasError::SizeMismatch {
                id: region.id.clone(),
                expected: (region.width, region.height),
                actual: source.dimensions(),
            });
        }

        image::imageops::replace(&mut canvas, source, region.x as i64, region.y as i64);
    }

    Ok(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_atlas_region_uv() {
        let region = AtlasRegion::new("test", 0, 0, 64, 64, 256, 256);

        assert_eq!(region.uv_min, Vec2::new(0.0, 0.0));
        assert_eq!(region.uv_max, Vec2::new(0.25, 0.25));
    }

    #[test]
    fn test_uv_transform_maps_corners() {
        let region = AtlasRegion::new("cape", 128, 64, 64, 32, 256, 128);
        let transform = region.uv_transform();

        assert_eq!(transform.apply(Vec2::ZERO), region.uv_min);
        assert_eq!(transform.apply(Vec2::ONE), region.uv_max);
        assert_eq!(transform.apply(Vec2::new(0.5, 0.5)), Vec2::new(0.625, 0.625));
    }

    #[test]
    fn test_region_lookup() {
        let atlas = PackedAtlas::new(
            256,
            256,
            vec![AtlasRegion::new("hat", 0, 0, 32, 32, 256, 256)],
        );

        assert_eq!(atlas.region_count(), 1);
        assert!(atlas.get_region("hat").is_some());
        assert!(atlas.get_region("nonexistent").is_none());
        assert!(atlas.uv_transform("nonexistent").is_none());
    }

    #[test]
    fn test_region_intersection() {
        let a = AtlasRegion::new("a", 0, 0, 32, 32, 64, 64);
        let b = AtlasRegion::new("b", 32, 0, 32, 32, 64, 64);
        let c = AtlasRegion::new("c", 16, 16, 32, 32, 64, 64);

        assert!(!a.intersects(&b));
        assert!(a.intersects(&c));
        assert!(b.intersects(&c));
    }

    #[test]
    fn test_compose_places_pixels() {
        let atlas = PackedAtlas::new(
            4,
            2,
            vec![
                AtlasRegion::new("red", 0, 0, 2, 2, 4, 2),
                AtlasRegion::new("blue", 2, 0, 2, 2, 4, 2),
            ],
        );
        let mut sources = HashMap::new();
        sources.insert(
            "red".to_string(),
            RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255])),
        );
        sources.insert(
            "blue".to_string(),
            RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 255])),
        );

        let image = compose(&atlas, &sources).unwrap();
        assert_eq!(image.dimensions(), (4, 2));
        assert_eq!(*image.get_pixel(1, 1), Rgba([255, 0, 0, 255]));
        assert_eq!(*image.get_pixel(3, 0), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_compose_missing_source() {
        let atlas = PackedAtlas::new(2, 2, vec![AtlasRegion::new("gone", 0, 0, 2, 2, 2, 2)]);
        let err = compose(&atlas, &HashMap::new()).unwrap_err();
        assert!(matches!(err, AtlasError::MissingSource(id) if id == "gone"));
    }

    #[test]
    fn test_compose_size_mismatch() {
        let atlas = PackedAtlas::new(4, 4, vec![AtlasRegion::new("wing", 0, 0, 2, 2, 4, 4)]);
        let mut sources = HashMap::new();
        sources.insert("wing".to_string(), RgbaImage::new(3, 2));

        let err = compose(&atlas, &sources).unwrap_err();
        assert!(matches!(err, AtlasError::SizeMismatch { .. }));
    }
}
