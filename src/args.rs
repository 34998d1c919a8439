use std::path::PathBuf;

use crate::render::loader::LoadOptions;

#[derive(Debug, Clone)]
pub struct Args {
    pub glb: PathBuf,
    pub scene: Option<usize>,
    pub gpu: bool,
    pub generate_tangents: bool,
    pub frame_interval_ms: u64,
    pub max_frames: Option<u64>,
}

impl Args {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            scene: self.scene,
            generate_tangents: self.generate_tangents,
        }
    }
}
