// Engine modules: atlas assets, vertex emission

pub mod assets;
pub mod renderer;
