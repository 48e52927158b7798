// Cosmetic catalog data: slots, body parts, declared properties and user settings

use std::collections::BTreeSet;
use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::bone::Side;
use crate::core::math::Aabb;

/// Catalog id of a cosmetic
pub type CosmeticId = String;

/// Side used when neither the user nor the cosmetic picks one
pub const DEFAULT_SIDE: Side = Side::Right;

/// Attachment point on the player model, in registration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Hat,
    Face,
    Cape,
    Back,
    Wings,
    Shoulders,
    Arms,
    Top,
    Pants,
    Shoes,
    FullBody,
    Accessory,
    Emote,
}

impl Slot {
    /// Slots whose geometry this slot's exclusion zones clip
    pub fn excluded_slots(self) -> &'static [Slot] {
        match self {
            Self::Hat => &[Self::Face],
            Self::Back => &[Self::Cape],
            Self::Wings => &[Self::Cape, Self::Back],
            Self::Shoes => &[Self::Pants],
            _ => &[],
        }
    }

    pub fn excludes(self, other: Slot) -> bool {
        self.excluded_slots().contains(&other)
    }
}

/// Armor piece positions, numbered like the game's armor inventory
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmorSlot {
    Feet = 0,
    Legs = 1,
    Chest = 2,
    Head = 3,
}

impl ArmorSlot {
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Body parts an armor piece in this slot covers
    pub fn covered_parts(self) -> &'static [BodyPart] {
        match self {
            Self::Head => &[BodyPart::Head],
            Self::Chest => &[BodyPart::Body, BodyPart::LeftArm, BodyPart::RightArm],
            Self::Legs | Self::Feet => &[BodyPart::LeftLeg, BodyPart::RightLeg],
        }
    }

    /// Worn-armor part set for a collection of occupied armor slots
    pub fn parts_covered_by(slots: impl IntoIterator<Item = ArmorSlot>) -> BTreeSet<BodyPart> {
        slots
            .into_iter()
            .flat_map(|slot| slot.covered_parts().iter().copied())
            .collect()
    }
}

/// Coarse region of the player model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
    Head,
    Body,
    LeftArm,
    RightArm,
    LeftLeg,
    RightLeg,
    LeftShoulderEntity,
    RightShoulderEntity,
    Wings,
    Cape,
}

impl BodyPart {
    pub const ALL: [BodyPart; 10] = [
        Self::Head,
        Self::Body,
        Self::LeftArm,
        Self::RightArm,
        Self::LeftLeg,
        Self::RightLeg,
        Self::LeftShoulderEntity,
        Self::RightShoulderEntity,
        Self::Wings,
        Self::Cape,
    ];

    /// Name of the bone that roots this part in cosmetic geometry
    pub fn bone_name(self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Body => "body",
            Self::LeftArm => "left_arm",
            Self::RightArm => "right_arm",
            Self::LeftLeg => "left_leg",
            Self::RightLeg => "right_leg",
            Self::LeftShoulderEntity => "left_shoulder_entity",
            Self::RightShoulderEntity => "right_shoulder_entity",
            Self::Wings => "wings",
            Self::Cape => "cape",
        }
    }

    pub fn from_bone_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|part| part.bone_name() == name)
    }

    /// Armor slots whose rendered armor would collide with geometry on this part
    pub fn armor_slots(self) -> &'static [ArmorSlot] {
        match self {
            Self::Head => &[ArmorSlot::Head],
            Self::Body | Self::LeftArm | Self::RightArm | Self::Wings | Self::Cape => {
                &[ArmorSlot::Chest]
            }
            Self::LeftLeg | Self::RightLeg => &[ArmorSlot::Legs, ArmorSlot::Feet],
            Self::LeftShoulderEntity | Self::RightShoulderEntity => &[],
        }
    }
}

/// Toggleable outer layer of the player skin
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkinLayer {
    Hat,
    Jacket,
    LeftSleeve,
    RightSleeve,
    LeftPantsLeg,
    RightPantsLeg,
    Cape,
}

/// Player model arm width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkinType {
    #[default]
    Wide,
    Slim,
}

/// A selectable look of a cosmetic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    /// Packed RGB swatch shown in pickers
    #[serde(default)]
    pub color: u32,
}

/// Box used to clip another cosmetic's geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExclusionBox {
    pub origin: Vec3,
    pub size: Vec3,
    /// Only applies when the owner is worn on this side
    #[serde(default)]
    pub side: Option<Side>,
}

impl ExclusionBox {
    pub fn bounds(&self) -> Aabb {
        Aabb::from_origin_size(self.origin, self.size)
    }

    pub fn applies_to(&self, side: Side) -> bool {
        self.side.map_or(true, |s| s == side)
    }
}

/// One declared cosmetic property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CosmeticProperty {
    /// Hide parts of a cosmetic (another one, or the declaring one when `target` is absent)
    HideParts {
        #[serde(default)]
        target: Option<CosmeticId>,
        parts: BTreeSet<BodyPart>,
    },
    /// Hide parts of the declaring cosmetic while armor covers them
    ArmorHiding { parts: BTreeSet<BodyPart> },
    DefaultSide { side: Side },
    Variants { variants: Vec<Variant> },
    ExclusionZones { boxes: Vec<ExclusionBox> },
    /// Per-axis limits for the user's position offset
    PositionRange { min: Vec3, max: Vec3 },
    /// Cosmetic-level skin layer overrides, applied after the type's
    SkinLayerVisibility { layers: Vec<(SkinLayer, bool)> },
}

/// Category shared by several cosmetics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CosmeticType {
    pub id: String,
    pub slot: Slot,
    /// Type-level skin layer overrides
    #[serde(default)]
    pub skin_layers: Vec<(SkinLayer, bool)>,
}

/// Immutable catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cosmetic {
    pub id: CosmeticId,
    #[serde(rename = "type")]
    pub cosmetic_type: Arc<CosmeticType>,
    #[serde(default)]
    pub properties: Vec<CosmeticProperty>,
    /// Asset file names (geometry, animations, textures)
    #[serde(default)]
    pub files: Vec<String>,
}

impl Cosmetic {
    pub fn slot(&self) -> Slot {
        self.cosmetic_type.slot
    }

    pub fn default_side(&self) -> Option<Side> {
        self.properties.iter().find_map(|p| match p {
            CosmeticProperty::DefaultSide { side } => Some(*side),
            _ => None,
        })
    }

    pub fn variants(&self) -> &[Variant] {
        self.properties
            .iter()
            .find_map(|p| match p {
                CosmeticProperty::Variants { variants } => Some(variants.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn exclusion_boxes(&self) -> impl Iterator<Item = &ExclusionBox> {
        self.properties.iter().flat_map(|p| match p {
            CosmeticProperty::ExclusionZones { boxes } => boxes.as_slice(),
            _ => &[],
        })
    }

    pub fn position_range(&self) -> Option<(Vec3, Vec3)> {
        self.properties.iter().find_map(|p| match p {
            CosmeticProperty::PositionRange { min, max } => Some((*min, *max)),
            _ => None,
        })
    }

    /// Type-level then cosmetic-level layer overrides, in declaration order
    pub fn skin_layer_overrides(&self) -> impl Iterator<Item = (SkinLayer, bool)> + '_ {
        let own = self.properties.iter().flat_map(|p| match p {
            CosmeticProperty::SkinLayerVisibility { layers } => layers.as_slice(),
            _ => &[],
        });
        self.cosmetic_type
            .skin_layers
            .iter()
            .chain(own)
            .copied()
    }
}

/// User choices for one equipped cosmetic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CosmeticSettings {
    #[serde(default)]
    pub side: Option<Side>,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub position_offset: Vec3,
    /// Disabled cosmetics stay equipped but are not rendered
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for CosmeticSettings {
    fn default() -> Self {
        Self {
            side: None,
            variant: None,
            position_offset: Vec3::ZERO,
            enabled: true,
        }
    }
}

/// A cosmetic bound to its slot with the user's settings
///
/// Replaced wholesale when anything changes.
#[derive(Debug, Clone, PartialEq)]
pub struct EquippedCosmetic {
    pub cosmetic: Arc<Cosmetic>,
    pub settings: CosmeticSettings,
}

impl EquippedCosmetic {
    pub fn new(cosmetic: Arc<Cosmetic>, settings: CosmeticSettings) -> Self {
        Self { cosmetic, settings }
    }

    pub fn id(&self) -> &str {
        &self.cosmetic.id
    }

    /// User side, then the cosmetic's default, then the system default
    pub fn resolved_side(&self) -> Side {
        self.settings
            .side
            .or_else(|| self.cosmetic.default_side())
            .unwrap_or(DEFAULT_SIDE)
    }

    /// Chosen variant if declared, else the first declared variant
    pub fn resolved_variant(&self) -> Option<&Variant> {
        let variants = self.cosmetic.variants();
        self.settings
            .variant
            .as_deref()
            .and_then(|name| variants.iter().find(|v| v.name == name))
            .or_else(|| variants.first())
    }

    /// User offset clamped into the cosmetic's declared range
    pub fn resolved_offset(&self) -> Vec3 {
        let offset = self.settings.position_offset;
        match self.cosmetic.position_range() {
            Some((min, max)) => offset.clamp(min.min(max), max.max(min)),
            None => offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosmetic(properties: Vec<CosmeticProperty>) -> Arc<Cosmetic> {
        Arc::new(Cosmetic {
            id: "backpack".to_string(),
            cosmetic_type: Arc::new(CosmeticType {
                id: "backpacks".to_string(),
                slot: Slot::Back,
                skin_layers: vec![(SkinLayer::Jacket, false)],
            }),
            properties,
            files: Vec::new(),
        })
    }

    #[test]
    fn test_slot_exclusion_is_directional() {
        assert!(Slot::Back.excludes(Slot::Cape));
        assert!(!Slot::Cape.excludes(Slot::Back));
        assert!(!Slot::Emote.excludes(Slot::Hat));
    }

    #[test]
    fn test_body_part_bone_names() {
        for part in BodyPart::ALL {
            assert_eq!(BodyPart::from_bone_name(part.bone_name()), Some(part));
        }
        assert_eq!(BodyPart::from_bone_name("tail"), None);
    }

    #[test]
    fn test_armor_covered_parts() {
        let parts = ArmorSlot::parts_covered_by([ArmorSlot::Head, ArmorSlot::Feet]);
        assert!(parts.contains(&BodyPart::Head));
        assert!(parts.contains(&BodyPart::LeftLeg));
        assert!(!parts.contains(&BodyPart::Body));
        assert_eq!(ArmorSlot::Head.id(), 3);
    }

    #[test]
    fn test_side_resolution() {
        let plain = EquippedCosmetic::new(cosmetic(Vec::new()), CosmeticSettings::default());
        assert_eq!(plain.resolved_side(), DEFAULT_SIDE);

        let declared = EquippedCosmetic::new(
            cosmetic(vec![CosmeticProperty::DefaultSide { side: Side::Left }]),
            CosmeticSettings::default(),
        );
        assert_eq!(declared.resolved_side(), Side::Left);

        let chosen = EquippedCosmetic::new(
            cosmetic(vec![CosmeticProperty::DefaultSide { side: Side::Left }]),
            CosmeticSettings {
                side: Some(Side::Right),
                ..Default::default()
            },
        );
        assert_eq!(chosen.resolved_side(), Side::Right);
    }

    #[test]
    fn test_variant_resolution() {
        let variants = CosmeticProperty::Variants {
            variants: vec![
                Variant {
                    name: "red".to_string(),
                    color: 0xff0000,
                },
                Variant {
                    name: "blue".to_string(),
                    color: 0x0000ff,
                },
            ],
        };
        let blue = EquippedCosmetic::new(
            cosmetic(vec![variants.clone()]),
            CosmeticSettings {
                variant: Some("blue".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(blue.resolved_variant().unwrap().name, "blue");

        let unknown = EquippedCosmetic::new(
            cosmetic(vec![variants]),
            CosmeticSettings {
                variant: Some("green".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(unknown.resolved_variant().unwrap().name, "red");
    }

    #[test]
    fn test_offset_clamped_to_range() {
        let equipped = EquippedCosmetic::new(
            cosmetic(vec![CosmeticProperty::PositionRange {
                min: Vec3::splat(-2.0),
                max: Vec3::splat(2.0),
            }]),
            CosmeticSettings {
                position_offset: Vec3::new(5.0, -1.0, -9.0),
                ..Default::default()
            },
        );
        assert_eq!(equipped.resolved_offset(), Vec3::new(2.0, -1.0, -2.0));
    }

    #[test]
    fn test_layer_overrides_type_first() {
        let c = cosmetic(vec![CosmeticProperty::SkinLayerVisibility {
            layers: vec![(SkinLayer::Jacket, true)],
        }]);
        let overrides: Vec<_> = c.skin_layer_overrides().collect();
        assert_eq!(
            overrides,
            vec![(SkinLayer::Jacket, false), (SkinLayer::Jacket, true)]
        );
    }

    #[test]
    fn test_cosmetic_from_json() {
        let json = r#"{
            "id": "top_hat",
            "type": { "id": "hats", "slot": "hat", "skin_layers": [["hat", false]] },
            "properties": [
                { "type": "hide_parts", "target": "knight_suit", "parts": ["head"] },
                { "type": "armor_hiding", "parts": ["head"] },
                { "type": "exclusion_zones", "boxes": [
                    { "origin": [-5, 30, -5], "size": [10, 2, 10] }
                ] }
            ]
        }"#;
        let cosmetic: Cosmetic = serde_json::from_str(json).unwrap();

        assert_eq!(cosmetic.slot(), Slot::Hat);
        assert_eq!(cosmetic.properties.len(), 3);
        assert_eq!(cosmetic.exclusion_boxes().count(), 1);
        assert_eq!(
            cosmetic.skin_layer_overrides().collect::<Vec<_>>(),
            vec![(SkinLayer::Hat, false)]
        );
    }
}
