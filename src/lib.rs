// Cosmetic rendering core
//
// Turns a player's equipped cosmetics into render state, packs their
// textures into shared atlases and drives their animations.

pub mod core;
pub mod engine;
pub mod game;
