// Free-rectangle atlas packer with canvas size search
//
// Textures are placed without rotation. The smallest canvas is found by
// doubling a square until everything fits, then shrinking it pass by pass.

use log::{debug, warn};

use super::atlas::{AtlasRegion, PackedAtlas};
use super::AtlasError;

/// Packer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackerConfig {
    /// Square canvas size tried first (pixels)
    pub initial_size: u32,
    /// Largest canvas dimension the packer may produce (pixels)
    pub max_size: u32,
    /// Refinement stops once the search step drops below this (pixels)
    pub discard_threshold: u32,
}

/// Default packer limits
pub const DEFAULT_PACKER_CONFIG: PackerConfig = PackerConfig {
    initial_size: 512,
    max_size: 4096,
    discard_threshold: 16,
};

impl Default for PackerConfig {
    fn default() -> Self {
        DEFAULT_PACKER_CONFIG
    }
}

/// A texture to pack, identified by id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasInput {
    pub id: String,
    pub width: u32,
    pub height: u32,
}

impl AtlasInput {
    pub fn new(id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            width,
            height,
        }
    }

    /// Long, thin textures score highest and get placed first
    fn placement_cost(&self) -> f64 {
        let w = self.width as f64;
        let h = self.height as f64;
        let long = w.max(h);
        let short = w.min(h).max(1.0);
        w * h * long / short
    }
}

/// Free space on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FreeRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl FreeRect {
    fn fits(&self, width: u32, height: u32) -> bool {
        width <= self.width && height <= self.height
    }

    fn has_area(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Which canvas dimensions a refinement pass varies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Square,
    Width,
    Height,
}

/// A successful placement at a given canvas size
#[derive(Debug, Clone)]
struct Layout {
    width: u32,
    height: u32,
    /// Top-left corner per sorted texture
    positions: Vec<(u32, u32)>,
}

impl Layout {
    fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Canvas shrunk to the bounding box of the placed textures
    fn cropped(self, sorted: &[&AtlasInput]) -> Layout {
        let (width, height) = sorted.iter().zip(&self.positions).fold(
            (1, 1),
            |(width, height), (texture, &(x, y))| {
                (width.max(x + texture.width), height.max(y + texture.height))
            },
        );
        Layout {
            width: width.min(self.width),
            height: height.min(self.height),
            positions: self.positions,
        }
    }
}

/// Input indices by descending placement cost; equal costs keep their input order
fn placement_order(textures: &[AtlasInput]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..textures.len()).collect();
    order.sort_by(|&a, &b| {
        textures[b]
            .placement_cost()
            .total_cmp(&textures[a].placement_cost())
    });
    order
}

/// Pack textures into the smallest canvas the search finds
pub fn pack(textures: &[AtlasInput], config: &PackerConfig) -> Result<PackedAtlas, AtlasError> {
    if textures.is_empty() {
        return Ok(PackedAtlas::new(1, 1, Vec::new()));
    }

    if let Some(texture) = textures
        .iter()
        .find(|t| t.width > config.max_size || t.height > config.max_size)
    {
        warn!(
            "Texture {} ({}x{}) exceeds the {} px atlas limit",
            texture.id, texture.width, texture.height, config.max_size
        );
        return Err(AtlasError::TextureTooLarge {
            id: texture.id.clone(),
            width: texture.width,
            height: texture.height,
            max: config.max_size,
        });
    }

    let order = placement_order(textures);
    let sorted: Vec<&AtlasInput> = order.iter().map(|&i| &textures[i]).collect();

    let mut size = config.initial_size.clamp(1, config.max_size);
    let mut best = loop {
        if let Some(layout) = place_all(&sorted, size, size) {
            break layout;
        }
        if size >= config.max_size {
            warn!(
                "{} textures do not fit a {}x{} atlas",
                textures.len(),
                config.max_size,
                config.max_size
            );
            return Err(AtlasError::NoFit {
                count: textures.len(),
                max: config.max_size,
            });
        }
        size = (size * 2).min(config.max_size);
    };

    for pass in [Pass::Square, Pass::Width, Pass::Height, Pass::Square] {
        best = refine(&sorted, best, pass, config);
    }
    // The search stops within the discard threshold; trim to what is used
    let best = best.cropped(&sorted);

    debug!(
        "Packed {} textures into {}x{}",
        textures.len(),
        best.width,
        best.height
    );

    let mut regions: Vec<Option<AtlasRegion>> = vec![None; textures.len()];
    for (slot, &(x, y)) in order.iter().zip(&best.positions) {
        let texture = &textures[*slot];
        regions[*slot] = Some(AtlasRegion::new(
            texture.id.clone(),
            x,
            y,
            texture.width,
            texture.height,
            best.width,
            best.height,
        ));
    }

    Ok(PackedAtlas::new(
        best.width,
        best.height,
        regions.into_iter().flatten().collect(),
    ))
}

/// Binary search one or both canvas dimensions downward from `best`
fn refine(sorted: &[&AtlasInput], best: Layout, pass: Pass, config: &PackerConfig) -> Layout {
    let threshold = config.discard_threshold.max(1) as i64;
    let max = config.max_size as i64;
    let (base_width, base_height) = (best.width as i64, best.height as i64);
    let mut best = best;

    let start = match pass {
        Pass::Square | Pass::Width => base_width,
        Pass::Height => base_height,
    };
    let mut current = start;
    let mut step = -(start / 2);

    while step.abs() >= threshold {
        current = (current + step).clamp(1, max);
        let (width, height) = match pass {
            Pass::Square => {
                let delta = current - start;
                (
                    (base_width + delta).clamp(1, max) as u32,
                    (base_height + delta).clamp(1, max) as u32,
                )
            }
            Pass::Width => (current as u32, base_height as u32),
            Pass::Height => (base_width as u32, current as u32),
        };

        match place_all(sorted, width, height) {
            Some(layout) => {
                if layout.area() < best.area() {
                    best = layout;
                }
                step = -(step.abs() / 2);
            }
            None => step = step.abs() / 2,
        }
    }

    best
}

/// Place every texture on a `width` x `height` canvas, or fail
fn place_all(sorted: &[&AtlasInput], width: u32, height: u32) -> Option<Layout> {
    let mut free = vec![FreeRect {
        x: 0,
        y: 0,
        width,
        height,
    }];
    let mut positions = Vec::with_capacity(sorted.len());

    for texture in sorted {
        // Newest (usually smallest) rectangles first
        let index = free
            .iter()
            .rposition(|rect| rect.fits(texture.width, texture.height))?;
        let rect = free.swap_remove(index);
        positions.push((rect.x, rect.y));

        let right_width = rect.width - texture.width;
        let bottom_height = rect.height - texture.height;

        let (large, small) = if right_width > bottom_height {
            // Full-height strip on the right, leftover under the texture
            (
                FreeRect {
                    x: rect.x + texture.width,
                    y: rect.y,
                    width: right_width,
                    height: rect.height,
                },
                FreeRect {
                    x: rect.x,
                    y: rect.y + texture.height,
                    width: texture.width,
                    height: bottom_height,
                },
            )
        } else {
            // Full-width strip below, leftover beside the texture
            (
                FreeRect {
                    x: rect.x,
                    y: rect.y + texture.height,
                    width: rect.width,
                    height: bottom_height,
                },
                FreeRect {
                    x: rect.x + texture.width,
                    y: rect.y,
                    width: right_width,
                    height: texture.height,
                },
            )
        };

        if large.has_area() {
            free.push(large);
        }
        if small.has_area() {
            free.push(small);
        }
    }

    Some(Layout {
        width,
        height,
        positions,
    })
}

/// Check whether the textures fit a fixed canvas, without any size search
pub fn fits_canvas(textures: &[AtlasInput], width: u32, height: u32) -> bool {
    let sorted: Vec<&AtlasInput> = placement_order(textures)
        .into_iter()
        .map(|i| &textures[i])
        .collect();
    place_all(&sorted, width, height).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_valid(atlas: &PackedAtlas, inputs: &[AtlasInput]) {
        assert_eq!(atlas.region_count(), inputs.len());
        for (region, input) in atlas.regions().iter().zip(inputs) {
            assert_eq!(region.id, input.id);
            assert_eq!((region.width, region.height), (input.width, input.height));
            assert!(region.x + region.width <= atlas.width);
            assert!(region.y + region.height <= atlas.height);
        }
        for (i, a) in atlas.regions().iter().enumerate() {
            for b in &atlas.regions()[i + 1..] {
                assert!(!a.intersects(b), "{} overlaps {}", a.id, b.id);
            }
        }
    }

    fn mixed_inputs() -> Vec<AtlasInput> {
        // Deterministic spread of shapes, including long thin strips
        (0..40)
            .map(|i| {
                let w = 8 + (i * 37) % 120;
                let h = 8 + (i * 53) % 90;
                if i % 7 == 0 {
                    AtlasInput::new(format!("strip{i}"), 256, 8 + i % 5)
                } else {
                    AtlasInput::new(format!("tex{i}"), w, h)
                }
            })
            .collect()
    }

    #[test]
    fn test_empty_input() {
        let atlas = pack(&[], &PackerConfig::default()).unwrap();
        assert_eq!((atlas.width, atlas.height), (1, 1));
        assert_eq!(atlas.region_count(), 0);
    }

    #[test]
    fn test_single_texture_shrinks_canvas() {
        let inputs = vec![AtlasInput::new("hat", 64, 64)];
        let atlas = pack(&inputs, &PackerConfig::default()).unwrap();

        assert_valid(&atlas, &inputs);
        assert!(atlas.width < 512 && atlas.height < 512);
        assert!(atlas.width >= 64 && atlas.height >= 64);
    }

    #[test]
    fn test_no_overlap_and_in_bounds() {
        let inputs = mixed_inputs();
        let atlas = pack(&inputs, &PackerConfig::default()).unwrap();
        assert_valid(&atlas, &inputs);
    }

    #[test]
    fn test_deterministic() {
        let inputs = mixed_inputs();
        let first = pack(&inputs, &PackerConfig::default()).unwrap();
        let second = pack(&inputs, &PackerConfig::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_perfect_grid_fits() {
        let cases = [
            (4u32, 128u32),
            (9, 100),
            (16, 64),
            (7, 96),
            (4, 300),
            (9, 200),
            (16, 250),
            (3, 700),
        ];
        for (count, size) in cases {
            let inputs: Vec<AtlasInput> = (0..count)
                .map(|i| AtlasInput::new(format!("sq{i}"), size, size))
                .collect();
            let side = (count as f64).sqrt().ceil() as u32 * size;

            assert!(fits_canvas(&inputs, side, side), "{count} x {size}px");

            let atlas = pack(&inputs, &PackerConfig::default()).unwrap();
            assert_valid(&atlas, &inputs);
            assert!(
                atlas.width <= side && atlas.height <= side,
                "{count} x {size}px packed into {}x{}, grid is {side}",
                atlas.width,
                atlas.height
            );
        }
    }

    #[test]
    fn test_canvas_trimmed_to_used_area() {
        let inputs = vec![
            AtlasInput::new("wide", 200, 40),
            AtlasInput::new("tall", 40, 150),
        ];
        let atlas = pack(&inputs, &PackerConfig::default()).unwrap();
        assert_valid(&atlas, &inputs);

        let right = atlas.regions().iter().map(|r| r.x + r.width).max().unwrap();
        let bottom = atlas.regions().iter().map(|r| r.y + r.height).max().unwrap();
        assert_eq!((atlas.width, atlas.height), (right, bottom));
    }

    #[test]
    fn test_grows_past_initial_size() {
        let inputs: Vec<AtlasInput> = (0..6)
            .map(|i| AtlasInput::new(format!("big{i}"), 400, 400))
            .collect();
        let atlas = pack(&inputs, &PackerConfig::default()).unwrap();

        assert_valid(&atlas, &inputs);
        assert!(atlas.width > 512 || atlas.height > 512);
    }

    #[test]
    fn test_texture_larger_than_max_fails() {
        let inputs = vec![
            AtlasInput::new("ok", 32, 32),
            AtlasInput::new("huge", 5000, 5000),
        ];
        let err = pack(&inputs, &PackerConfig::default()).unwrap_err();
        assert!(matches!(err, AtlasError::TextureTooLarge { ref id, .. } if id == "huge"));
    }

    #[test]
    fn test_set_that_cannot_fit_fails() {
        let config = PackerConfig {
            initial_size: 64,
            max_size: 128,
            discard_threshold: 16,
        };
        let inputs: Vec<AtlasInput> = (0..5)
            .map(|i| AtlasInput::new(format!("t{i}"), 64, 64))
            .collect();

        let err = pack(&inputs, &config).unwrap_err();
        assert!(matches!(err, AtlasError::NoFit { count: 5, max: 128 }));
    }

    #[test]
    fn test_thin_textures_sorted_first() {
        let strip = AtlasInput::new("strip", 256, 4);
        let square = AtlasInput::new("square", 64, 64);
        assert!(strip.placement_cost() > square.placement_cost());
    }

    #[test]
    fn test_exact_fill() {
        let inputs = vec![
            AtlasInput::new("left", 32, 64),
            AtlasInput::new("right", 32, 64),
        ];
        assert!(fits_canvas(&inputs, 64, 64));
        assert!(!fits_canvas(&inputs, 63, 64));
    }
}
