// Cosmetic system
//
// This module contains everything that decides how equipped cosmetics look:
// - Catalog data, slots and user settings
// - Bone geometry and skin masks loaded per cosmetic
// - Equip-state derivation (hiding, clipping, masks, armor conflicts)
// - Animation scheduling and texture phase sync

pub mod animation;
pub mod bone;
pub mod cosmetic;
pub mod equip_state;
pub mod model;
pub mod skin_mask;
pub mod texture_phase;
pub mod visibility;

// Re-export commonly used types
pub use animation::{
    AnimationClip, AnimationEvent, AnimationScheduler, AnimationTarget, AnimationTrigger,
    BroadcastFn, ViewerContext,
};
pub use bone::{Bone, BoneModel, Cube, Side};
pub use cosmetic::{
    ArmorSlot, BodyPart, Cosmetic, CosmeticId, CosmeticProperty, CosmeticSettings, CosmeticType,
    EquippedCosmetic, ExclusionBox, SkinLayer, SkinType, Slot, Variant, DEFAULT_SIDE,
};
pub use equip_state::{derive, CosmeticsState};
pub use model::{CosmeticModel, TextureAnimation};
pub use skin_mask::SkinMask;
pub use texture_phase::{PhaseSyncConfig, TexturePhaseSync, DEFAULT_PHASE_SYNC_CONFIG};
