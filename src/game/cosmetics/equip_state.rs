// Equip-state engine
//
// Derives one immutable render state from everything the player has
// equipped. The state is rebuilt from scratch on every equipment change and
// never patched.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, OnceLock};

use log::debug;

use super::bone::{BoneModel, Side};
use super::cosmetic::{
    ArmorSlot, BodyPart, CosmeticId, CosmeticProperty, EquippedCosmetic, SkinLayer, SkinType, Slot,
    DEFAULT_SIDE,
};
use super::model::CosmeticModel;
use super::skin_mask::SkinMask;
use super::visibility;
use crate::core::math::Aabb;

/// Everything the renderer needs to draw the current set of cosmetics
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CosmeticsState {
    pub skin_type: SkinType,
    /// Skin layers a cosmetic replaces; the renderer skips them
    pub covered_skin_layers: BTreeSet<SkinLayer>,
    /// Body parts hidden per cosmetic, by rule or by armor
    pub hidden_parts: BTreeMap<CosmeticId, BTreeSet<BodyPart>>,
    /// Bone names hidden per cosmetic (own flag or wrong side)
    pub hidden_bones: BTreeMap<CosmeticId, BTreeSet<String>>,
    /// Bone trees after exclusion-zone clipping
    pub models: BTreeMap<CosmeticId, Arc<BoneModel>>,
    /// Merged skin pixels to suppress
    pub skin_mask: SkinMask,
    /// Armor slots that would visually collide with visible cosmetic geometry
    pub occupied_armor_slots: BTreeSet<ArmorSlot>,
    pub sides: BTreeMap<CosmeticId, Side>,
    pub variants: BTreeMap<CosmeticId, String>,
}

impl CosmeticsState {
    /// Shared state for a player wearing nothing
    pub fn empty() -> &'static CosmeticsState {
        static EMPTY: OnceLock<CosmeticsState> = OnceLock::new();
        EMPTY.get_or_init(CosmeticsState::default)
    }

    pub fn is_part_hidden(&self, cosmetic: &str, part: BodyPart) -> bool {
        self.hidden_parts
            .get(cosmetic)
            .map_or(false, |parts| parts.contains(&part))
    }

    pub fn is_bone_hidden(&self, cosmetic: &str, bone: &str) -> bool {
        self.hidden_bones
            .get(cosmetic)
            .map_or(false, |bones| bones.contains(bone))
    }

    pub fn is_layer_covered(&self, layer: SkinLayer) -> bool {
        self.covered_skin_layers.contains(&layer)
    }

    pub fn model(&self, cosmetic: &str) -> Option<&Arc<BoneModel>> {
        self.models.get(cosmetic)
    }

    /// Per-bone visibility of a cosmetic's clipped tree
    pub fn bone_visibility(&self, cosmetic: &str) -> Option<Vec<bool>> {
        let model = self.models.get(cosmetic)?;
        Some(visibility::propagate(
            model,
            self.hidden_bones.get(cosmetic).unwrap_or(&BTreeSet::new()),
            self.hidden_parts.get(cosmetic).unwrap_or(&BTreeSet::new()),
        ))
    }
}

/// Build the render state for the given equipment
///
/// Never fails: references that do not resolve simply have no effect.
pub fn derive(
    skin_type: SkinType,
    equipped: &BTreeMap<Slot, EquippedCosmetic>,
    models: &BTreeMap<CosmeticId, Arc<CosmeticModel>>,
    worn_armor: &BTreeSet<BodyPart>,
) -> CosmeticsState {
    let active: Vec<(Slot, &EquippedCosmetic)> = equipped
        .iter()
        .filter(|(_, cosmetic)| cosmetic.settings.enabled)
        .map(|(slot, cosmetic)| (*slot, cosmetic))
        .collect();

    let covered_skin_layers = covered_layers(&active);
    let hidden_parts = hidden_parts(&active, worn_armor);

    let mut state = CosmeticsState {
        skin_type,
        covered_skin_layers,
        hidden_parts,
        ..Default::default()
    };

    for (_, cosmetic) in &active {
        let id = cosmetic.id().to_string();
        state.sides.insert(id.clone(), cosmetic.resolved_side());
        if let Some(variant) = cosmetic.resolved_variant() {
            state.variants.insert(id, variant.name.clone());
        }
    }

    for &(slot, cosmetic) in &active {
        let Some(model) = models.get(cosmetic.id()) else {
            continue;
        };
        let id = cosmetic.id().to_string();
        let side = cosmetic.resolved_side();
        let no_parts = BTreeSet::new();
        let parts = state.hidden_parts.get(&id).unwrap_or(&no_parts);

        let zones = exclusion_zones(slot, cosmetic, &active);
        let clipped = if zones.is_empty() {
            Arc::clone(&model.bones)
        } else {
            Arc::new(model.bones.without_cubes_in(&zones))
        };

        let hidden_bones: BTreeSet<String> = clipped
            .bones()
            .filter(|bone| !bone.visible || bone.side.map_or(false, |s| s != side))
            .map(|bone| bone.name.clone())
            .collect();

        if let Some(mask) = model.skin_mask_for(side, DEFAULT_SIDE) {
            let offset = cosmetic.resolved_offset();
            // Whole pixels, truncated toward zero
            let mask = mask
                .without_parts(parts)
                .shifted(offset.x as i32, offset.y as i32);
            state.skin_mask.merge(&mask);
        }

        let visible = visibility::propagate(&clipped, &hidden_bones, parts);
        for part in visibility::parts_with_visible_cubes(&clipped, &visible) {
            state
                .occupied_armor_slots
                .extend(part.armor_slots().iter().copied());
        }

        if !hidden_bones.is_empty() {
            state.hidden_bones.insert(id.clone(), hidden_bones);
        }
        state.models.insert(id, clipped);
    }

    debug!(
        "Derived cosmetics state: {} equipped, {} layers covered, {} armor slots occupied",
        active.len(),
        state.covered_skin_layers.len(),
        state.occupied_armor_slots.len()
    );

    state
}

/// Fold every layer override in slot order; last writer wins per layer
fn covered_layers(active: &[(Slot, &EquippedCosmetic)]) -> BTreeSet<SkinLayer> {
    let mut resolved: BTreeMap<SkinLayer, bool> = BTreeMap::new();
    for (_, cosmetic) in active {
        for (layer, visible) in cosmetic.cosmetic.skin_layer_overrides() {
            resolved.insert(layer, visible);
        }
    }
    resolved
        .into_iter()
        .filter(|&(_, visible)| !visible)
        .map(|(layer, _)| layer)
        .collect()
}

/// Declared part hiding plus armor hiding, grouped by the affected cosmetic
fn hidden_parts(
    active: &[(Slot, &EquippedCosmetic)],
    worn_armor: &BTreeSet<BodyPart>,
) -> BTreeMap<CosmeticId, BTreeSet<BodyPart>> {
    let mut hidden: BTreeMap<CosmeticId, BTreeSet<BodyPart>> = BTreeMap::new();

    for (_, cosmetic) in active {
        for property in &cosmetic.cosmetic.properties {
            match property {
                CosmeticProperty::HideParts { target, parts } => {
                    let target = target.clone().unwrap_or_else(|| cosmetic.id().to_string());
                    hidden.entry(target).or_default().extend(parts.iter().copied());
                }
                CosmeticProperty::ArmorHiding { parts } => {
                    let covered: Vec<BodyPart> = parts
                        .iter()
                        .copied()
                        .filter(|part| worn_armor.contains(part))
                        .collect();
                    if !covered.is_empty() {
                        hidden
                            .entry(cosmetic.id().to_string())
                            .or_default()
                            .extend(covered);
                    }
                }
                _ => {}
            }
        }
    }

    hidden.retain(|_, parts| !parts.is_empty());
    hidden
}

/// Boxes from every other cosmetic whose slot excludes `slot`, in this cosmetic's space
fn exclusion_zones(
    slot: Slot,
    cosmetic: &EquippedCosmetic,
    active: &[(Slot, &EquippedCosmetic)],
) -> Vec<Aabb> {
    let own_offset = cosmetic.resolved_offset();

    active
        .iter()
        .filter(|(other_slot, other)| other.id() != cosmetic.id() && other_slot.excludes(slot))
        .flat_map(|(_, other)| {
            let side = other.resolved_side();
            let shift = other.resolved_offset() - own_offset;
            other
                .cosmetic
                .exclusion_boxes()
                .filter(move |zone| zone.applies_to(side))
                .map(move |zone| zone.bounds().translated(shift))
        })
        .collect()
}
