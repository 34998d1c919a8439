use clap::Parser;

/// Loads a binary glTF (.glb) asset into a scene graph and reports what was uploaded
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the .glb file of the asset that will be loaded
    pub glb: String,

    /// Index of the scene to load instead of the asset's default scene
    #[arg(long)]
    pub scene: Option<usize>,

    /// Upload to a headless GPU device instead of keeping uploads in memory
    #[arg(long)]
    pub gpu: bool,

    /// Do not compute tangents for primitives that lack them
    #[arg(long)]
    pub no_tangents: bool,

    /// Time between two frame checkpoints, in milliseconds
    #[arg(long, default_value_t = 16)]
    pub frame_interval_ms: u64,

    /// Cancel the load if it has not finished after this many frames
    #[arg(long)]
    pub max_frames: Option<u64>,
}

impl From<Cli> for glb_loader::args::Args {
    fn from(value: Cli) -> Self {
        glb_loader::args::Args {
            glb: value.glb.into(),
            scene: value.scene,
            gpu: value.gpu,
            generate_tangents: !value.no_tangents,
            frame_interval_ms: value.frame_interval_ms,
            max_frames: value.max_frames,
        }
    }
}
