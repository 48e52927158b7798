// Skin texture masks: which skin pixels a cosmetic covers, per body part

use std::collections::{BTreeMap, BTreeSet};

use image::{GrayImage, Luma};

use super::cosmetic::BodyPart;

/// Per-part opacity bitmaps in skin texture coordinates
///
/// A pixel is covered when its value is nonzero.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SkinMask {
    parts: BTreeMap<BodyPart, GrayImage>,
}

impl SkinMask {
    pub fn new(parts: BTreeMap<BodyPart, GrayImage>) -> Self {
        Self { parts }
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn part(&self, part: BodyPart) -> Option<&GrayImage> {
        self.parts.get(&part)
    }

    pub fn parts(&self) -> impl Iterator<Item = BodyPart> + '_ {
        self.parts.keys().copied()
    }

    /// Check whether the skin pixel at (`x`, `y`) of `part` is suppressed
    pub fn is_covered(&self, part: BodyPart, x: u32, y: u32) -> bool {
        self.parts
            .get(&part)
            .filter(|image| x < image.width() && y < image.height())
            .map_or(false, |image| image.get_pixel(x, y).0[0] > 0)
    }

    /// Copy of the mask without entries for `hidden` parts
    pub fn without_parts(&self, hidden: &BTreeSet<BodyPart>) -> SkinMask {
        Self {
            parts: self
                .parts
                .iter()
                .filter(|(part, _)| !hidden.contains(part))
                .map(|(part, image)| (*part, image.clone()))
                .collect(),
        }
    }

    /// Copy of the mask moved by whole pixels; pixels pushed off the bitmap are dropped
    pub fn shifted(&self, dx: i32, dy: i32) -> SkinMask {
        if dx == 0 && dy == 0 {
            return self.clone();
        }
        Self {
            parts: self
                .parts
                .iter()
                .map(|(part, image)| (*part, shift_image(image, dx, dy)))
                .collect(),
        }
    }

    /// Union of covered pixels, in place
    pub fn merge(&mut self, other: &SkinMask) {
        for (part, image) in &other.parts {
            match self.parts.get_mut(part) {
                Some(existing) => *existing = union_image(existing, image),
                None => {
                    self.parts.insert(*part, image.clone());
                }
            }
        }
    }
}

fn shift_image(image: &GrayImage, dx: i32, dy: i32) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut shifted = GrayImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels() {
        let nx = x as i64 + dx as i64;
        let ny = y as i64 + dy as i64;
        if nx >= 0 && ny >= 0 && nx < width as i64 && ny < height as i64 {
            shifted.put_pixel(nx as u32, ny as u32, *pixel);
        }
    }
    shifted
}

fn union_image(a: &GrayImage, b: &GrayImage) -> GrayImage {
    let width = a.width().max(b.width());
    let height = a.height().max(b.height());
    GrayImage::from_fn(width, height, |x, y| {
        let sample = |image: &GrayImage| {
            if x < image.width() && y < image.height() {
                image.get_pixel(x, y).0[0]
            } else {
                0
            }
        };
        Luma([sample(a).max(sample(b))])
    })
}
