// Visibility propagation down a cosmetic's bone tree

use std::collections::BTreeSet;

use super::bone::BoneModel;
use super::cosmetic::BodyPart;

/// Per-bone visibility after hiding rules are applied
///
/// A bone is visible when its own flag is set, it is not in `hidden_bones`,
/// it does not root a hidden body part, and its parent is visible.
pub fn propagate(
    model: &BoneModel,
    hidden_bones: &BTreeSet<String>,
    hidden_parts: &BTreeSet<BodyPart>,
) -> Vec<bool> {
    let mut visible = vec![false; model.len()];

    for index in model.topological_order() {
        let Some(bone) = model.bone(index) else {
            continue;
        };
        let parent_visible = model.parent_of(index).map_or(true, |p| visible[p]);
        let part_hidden =
            BodyPart::from_bone_name(&bone.name).map_or(false, |part| hidden_parts.contains(&part));

        visible[index] =
            parent_visible && bone.visible && !part_hidden && !hidden_bones.contains(&bone.name);
    }

    visible
}

/// Body part each bone belongs to: the nearest ancestor (or itself) named after a part
pub fn body_parts(model: &BoneModel) -> Vec<Option<BodyPart>> {
    let mut parts = vec![None; model.len()];

    for index in model.topological_order() {
        let Some(bone) = model.bone(index) else {
            continue;
        };
        parts[index] = BodyPart::from_bone_name(&bone.name)
            .or_else(|| model.parent_of(index).and_then(|p| parts[p]));
    }

    parts
}

/// Body parts that still hold at least one visible cube
pub fn parts_with_visible_cubes(model: &BoneModel, visible: &[bool]) -> BTreeSet<BodyPart> {
    body_parts(model)
        .into_iter()
        .enumerate()
        .filter_map(|(index, part)| {
            let has_cubes = model.bone(index).map_or(false, |b| !b.cubes.is_empty());
            let shown = visible.get(index).copied().unwrap_or(false);
            part.filter(|_| has_cubes && shown)
        })
        .collect()
}
