use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use anyhow::{Context, Result};
use glam::{Vec2, Vec3, Vec4};
use image::{GrayImage, Luma, Rgba, RgbaImage};
use log::info;

use cosmetic_render::engine::assets::{compose, pack, AtlasInput, PackerConfig};
use cosmetic_render::engine::renderer::{vertex_bytes, AtlasVertexConsumer, Vertex, VertexConsumer};
use cosmetic_render::game::cosmetics::{
    derive, AnimationClip, AnimationEvent, AnimationScheduler, AnimationTrigger, ArmorSlot,
    BodyPart, Bone, BoneModel, Cosmetic, CosmeticModel, CosmeticSettings, CosmeticsState, Cube,
    EquippedCosmetic, Side, SkinMask, SkinType, Slot, TextureAnimation, TexturePhaseSync,
    ViewerContext,
};

const CATALOG: &str = include_str!("../demos/catalog.json");

/// Simulation tick for the animation demo (seconds)
const TICK: f32 = 0.05;

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Starting cosmetic render demo...");

    let catalog: Vec<Cosmetic> =
        serde_json::from_str(CATALOG).context("Failed to parse demos/catalog.json")?;
    let catalog: HashMap<String, Arc<Cosmetic>> = catalog
        .into_iter()
        .map(|cosmetic| (cosmetic.id.clone(), Arc::new(cosmetic)))
        .collect();
    info!("Loaded {} cosmetics from catalog", catalog.len());

    let models = demo_models();
    let equipped = equip(&catalog)?;

    // Equip-state, once bare and once with a helmet on
    let bare = derive(SkinType::Slim, &equipped, &models, &BTreeSet::new());
    report_state("bare", &bare);

    let helmet = ArmorSlot::parts_covered_by([ArmorSlot::Head]);
    let armored = derive(SkinType::Slim, &equipped, &models, &helmet);
    report_state("helmet", &armored);

    // Move the parrot to the other shoulder
    let mut flipped = equipped.clone();
    if let Some(parrot) = flipped.get_mut(&Slot::Shoulders) {
        let side = parrot.resolved_side().opposite();
        *parrot = EquippedCosmetic::new(
            Arc::clone(&parrot.cosmetic),
            CosmeticSettings {
                side: Some(side),
                ..parrot.settings.clone()
            },
        );
    }
    report_state("flipped", &derive(SkinType::Slim, &flipped, &models, &helmet));

    if let (Some(source), Some(clipped)) = (models.get("royal_cape"), bare.model("royal_cape")) {
        let shared = (0..clipped.len())
            .filter(|&i| clipped.shares_bone(&source.bones, i))
            .count();
        info!(
            "Clipped cape shares {shared} of {} bones with its source model",
            clipped.len()
        );
    }

    // Atlas packing for every cosmetic texture
    let inputs = vec![
        AtlasInput::new("top_hat.png", 64, 64),
        AtlasInput::new("explorer_backpack.png", 128, 64),
        AtlasInput::new("royal_cape.png", 64, 128),
        AtlasInput::new("parrot.png", 32, 32),
    ];
    let atlas = pack(&inputs, &PackerConfig::default())?;
    info!(
        "Packed {} textures into {}x{} ({:.0}% used)",
        atlas.region_count(),
        atlas.width,
        atlas.height,
        atlas.occupancy() * 100.0
    );

    let sources: HashMap<String, RgbaImage> = inputs
        .iter()
        .enumerate()
        .map(|(i, input)| {
            let shade = 60 + 40 * i as u8;
            let pixel = Rgba([shade, shade, 255, 255]);
            let image = RgbaImage::from_pixel(input.width, input.height, pixel);
            (input.id.clone(), image)
        })
        .collect();
    let atlas_image = compose(&atlas, &sources)?;
    info!("Composed atlas image {}x{}", atlas_image.width(), atlas_image.height());

    let transform = atlas
        .uv_transform("royal_cape.png")
        .context("Cape missing from atlas")?;
    let mut vertices: Vec<Vertex> = Vec::new();
    {
        let mut consumer = AtlasVertexConsumer::new(&mut vertices, transform);
        for (position, uv) in [
            (Vec3::new(-5.0, 24.0, 2.0), Vec2::new(0.0, 0.0)),
            (Vec3::new(5.0, 24.0, 2.0), Vec2::new(1.0, 0.0)),
            (Vec3::new(5.0, 4.0, 2.0), Vec2::new(1.0, 1.0)),
            (Vec3::new(-5.0, 4.0, 2.0), Vec2::new(0.0, 1.0)),
        ] {
            consumer.vertex(Vertex::new(position, uv, Vec4::ONE));
        }
    }
    info!(
        "Emitted {} cape vertices ({} bytes), first uv {:?}",
        vertices.len(),
        vertex_bytes(&vertices).len(),
        vertices.first().map(|v| v.tex_coords)
    );

    // Cape animation as seen by the wearer
    let cape = models
        .get("royal_cape")
        .context("Cape model missing")?;
    let mut scheduler = AnimationScheduler::with_seed(cape, ViewerContext::Wearer, 7);
    scheduler.on_broadcast(|animation| info!("Broadcasting animation {animation}"));

    scheduler.process_event(&AnimationTrigger::Idle);
    scheduler.process_event(&AnimationTrigger::Equip);
    let mut last_played = scheduler.active_animation().map(str::to_string);
    info!("Cape animation: {:?}", last_played);
    for _ in 0..100 {
        scheduler.update(TICK);
        let playing = scheduler.active_animation().map(str::to_string);
        if playing != last_played {
            info!(
                "t={:.2}s cape animation: {:?} -> {:?}",
                scheduler.lifetime(),
                last_played,
                playing
            );
            last_played = playing;
        }
    }

    // Texture phase: another viewer's copy restarted 0.3 s into our cycle
    if let Some(texture) = cape.texture_animation {
        let mut phase = TexturePhaseSync::new(texture);
        for restart in [0.3, 1.3, 2.3] {
            phase.record_cycle_start(restart);
        }
        let mut lifetime = 2.5;
        for _ in 0..40 {
            lifetime += TICK;
            phase.adjust(lifetime);
        }
        let adjusted = lifetime + phase.offset();
        info!(
            "Texture phase offset {:.3}s, error {:.3}s, frame {}",
            phase.offset(),
            phase.phase_error().unwrap_or(0.0),
            phase.frame_at(adjusted)
        );
    }

    info!("Demo finished");
    Ok(())
}

/// Bind catalog entries to slots with a few user settings
fn equip(catalog: &HashMap<String, Arc<Cosmetic>>) -> Result<BTreeMap<Slot, EquippedCosmetic>> {
    let settings = [
        (
            "top_hat",
            CosmeticSettings {
                variant: Some("crimson".to_string()),
                ..Default::default()
            },
        ),
        (
            "explorer_backpack",
            CosmeticSettings {
                position_offset: Vec3::new(0.0, 5.0, 0.5),
                ..Default::default()
            },
        ),
        ("royal_cape", CosmeticSettings::default()),
        ("parrot", CosmeticSettings::default()),
    ];

    let mut equipped = BTreeMap::new();
    for (id, settings) in settings {
        let cosmetic = catalog
            .get(id)
            .with_context(|| format!("Cosmetic {id} missing from catalog"))?;
        equipped.insert(
            cosmetic.slot(),
            EquippedCosmetic::new(Arc::clone(cosmetic), settings),
        );
    }
    Ok(equipped)
}

/// Geometry, masks and animations as asset loading would produce them
fn demo_models() -> BTreeMap<String, Arc<CosmeticModel>> {
    let mut hat_mask = GrayImage::new(8, 8);
    for x in 0..8 {
        hat_mask.put_pixel(x, 0, Luma([255]));
    }

    let top_hat = CosmeticModel::new(BoneModel::new(vec![
        Bone::new("head", None).with_cube(cube([-4.0, 32.0, -4.0], [8.0, 2.0, 8.0])),
        Bone::new("crown", Some("head")).with_cube(cube([-3.0, 34.0, -3.0], [6.0, 6.0, 6.0])),
    ]))
    .with_skin_mask(None, SkinMask::new(BTreeMap::from([(BodyPart::Head, hat_mask)])));

    let backpack = CosmeticModel::new(BoneModel::new(vec![
        Bone::new("body", None).with_cube(cube([-4.0, 14.0, 2.0], [8.0, 8.0, 4.0])),
    ]));

    let royal_cape = CosmeticModel::new(BoneModel::new(vec![
        Bone::new("cape", None).with_cube(cube([-5.0, 20.0, 2.5], [10.0, 4.0, 1.0])),
        Bone::new("hem", Some("cape")).with_cube(cube([-5.0, 4.0, 8.0], [10.0, 4.0, 1.0])),
    ]))
    .with_animation(AnimationClip::new("sway", 2.0))
    .with_animation(AnimationClip::new("flourish", 1.0))
    .with_animation(AnimationClip::new("settle", 0.5))
    .with_event(
        AnimationEvent::new("idle_sway", "sway", AnimationTrigger::Idle, 0)
            .with_loops(0),
    )
    .with_event(
        AnimationEvent::new("equip_flourish", "flourish", AnimationTrigger::Equip, 10)
            .with_loops(2)
            .then(AnimationEvent::new("equip_settle", "settle", AnimationTrigger::Equip, 5)),
    );
    let royal_cape = CosmeticModel {
        texture_animation: Some(TextureAnimation {
            frame_count: 16,
            fps: 16.0,
        }),
        ..royal_cape
    };

    let parrot = CosmeticModel::new(BoneModel::new(vec![
        Bone::new("left_shoulder_entity", None)
            .with_side(Side::Left)
            .with_cube(cube([4.0, 24.0, -1.0], [2.0, 4.0, 2.0])),
        Bone::new("right_shoulder_entity", None)
            .with_side(Side::Right)
            .with_cube(cube([-6.0, 24.0, -1.0], [2.0, 4.0, 2.0])),
    ]));

    BTreeMap::from([
        ("top_hat".to_string(), Arc::new(top_hat)),
        ("explorer_backpack".to_string(), Arc::new(backpack)),
        ("royal_cape".to_string(), Arc::new(royal_cape)),
        ("parrot".to_string(), Arc::new(parrot)),
    ])
}

fn cube(origin: [f32; 3], size: [f32; 3]) -> Cube {
    Cube::new(Vec3::from_array(origin), Vec3::from_array(size))
}

fn report_state(label: &str, state: &CosmeticsState) {
    info!(
        "[{label}] covered layers {:?}, occupied armor {:?}",
        state.covered_skin_layers, state.occupied_armor_slots
    );
    for (id, parts) in &state.hidden_parts {
        info!("[{label}] {id} hides {:?}", parts);
    }
    for (id, bones) in &state.hidden_bones {
        info!("[{label}] {id} hidden bones {:?}", bones);
    }
    for (id, model) in &state.models {
        let cubes: usize = model.bones().map(|bone| bone.cubes.len()).sum();
        info!(
            "[{label}] {id}: side {:?}, variant {:?}, {cubes} cubes after clipping",
            state.sides.get(id),
            state.variants.get(id)
        );
    }
    info!(
        "[{label}] skin mask parts {:?}",
        state.skin_mask.parts().collect::<Vec<_>>()
    );
}
