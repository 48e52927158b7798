// Loaded cosmetic model: geometry, skin masks and animation data

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::animation::{AnimationClip, AnimationEvent};
use super::bone::{BoneModel, Side};
use super::skin_mask::SkinMask;

/// Flipbook animation baked into a cosmetic texture
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextureAnimation {
    pub frame_count: u32,
    pub fps: f32,
}

impl TextureAnimation {
    /// Seconds for one full pass over all frames
    pub fn cycle_length(&self) -> f32 {
        if self.fps <= 0.0 {
            return 0.0;
        }
        self.frame_count as f32 / self.fps
    }
}

/// Everything asset loading produces for one cosmetic
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CosmeticModel {
    pub bones: Arc<BoneModel>,
    /// Masks keyed by side; `None` is the side-agnostic mask
    pub skin_masks: BTreeMap<Option<Side>, SkinMask>,
    pub animations: Vec<AnimationClip>,
    pub events: Vec<AnimationEvent>,
    pub texture_animation: Option<TextureAnimation>,
}

impl CosmeticModel {
    pub fn new(bones: BoneModel) -> Self {
        Self {
            bones: Arc::new(bones),
            ..Default::default()
        }
    }

    pub fn with_skin_mask(mut self, side: Option<Side>, mask: SkinMask) -> Self {
        self.skin_masks.insert(side, mask);
        self
    }

    pub fn with_animation(mut self, clip: AnimationClip) -> Self {
        self.animations.push(clip);
        self
    }

    pub fn with_event(mut self, event: AnimationEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Mask for `side`, falling back to the side-agnostic mask, then the system default side
    pub fn skin_mask_for(&self, side: Side, default_side: Side) -> Option<&SkinMask> {
        self.skin_masks
            .get(&Some(side))
            .or_else(|| self.skin_masks.get(&None))
            .or_else(|| self.skin_masks.get(&Some(default_side)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::cosmetics::BodyPart;
    use image::GrayImage;

    fn mask(part: BodyPart) -> SkinMask {
        SkinMask::new(BTreeMap::from([(part, GrayImage::new(1, 1))]))
    }

    #[test]
    fn test_mask_fallback_order() {
        let model = CosmeticModel::default()
            .with_skin_mask(Some(Side::Left), mask(BodyPart::LeftArm))
            .with_skin_mask(None, mask(BodyPart::Body));

        let left = model.skin_mask_for(Side::Left, Side::Right).unwrap();
        assert!(left.part(BodyPart::LeftArm).is_some());

        let right = model.skin_mask_for(Side::Right, Side::Right).unwrap();
        assert!(right.part(BodyPart::Body).is_some());
    }

    #[test]
    fn test_mask_falls_back_to_default_side() {
        let model =
            CosmeticModel::default().with_skin_mask(Some(Side::Right), mask(BodyPart::RightArm));

        let mask = model.skin_mask_for(Side::Left, Side::Right).unwrap();
        assert!(mask.part(BodyPart::RightArm).is_some());
        assert!(model.skin_mask_for(Side::Left, Side::Left).is_none());
    }

    #[test]
    fn test_texture_cycle_length() {
        let anim = TextureAnimation { frame_count: 8, fps: 4.0 };
        assert_eq!(anim.cycle_length(), 2.0);
        assert_eq!(TextureAnimation { frame_count: 8, fps: 0.0 }.cycle_length(), 0.0);
    }
}
