use std::time::Duration;

use crate::args::Args;
use crate::error::LoadResult;
use crate::render::gpu::WgpuRenderHost;
use crate::render::host::RenderHost;
use crate::render::loader::{GlbModelLoader, LoadedModel};
use crate::render::memory::MemoryRenderHost;
use crate::resource::glb::file::read_glb_file;
use crate::resource::glb::vertex::Vertex;
use crate::task::cancel::CancellationToken;
use crate::task::frame::FrameScheduler;

pub mod args;
pub mod data;
pub mod error;
pub mod render;
pub mod resource;
pub mod task;

pub fn run(args: Args) -> anyhow::Result<()> {
    env_logger::init();

    let data = read_glb_file(&args.glb)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let frames = FrameScheduler::new();
    let loader = GlbModelLoader::new(frames.clone()).with_options(args.load_options());
    let cancel = CancellationToken::new();

    let load = {
        let loader = loader.clone();
        let cancel = cancel.clone();
        runtime.spawn(async move { loader.load::<Vertex>(data, cancel).await })
    };

    let model = if args.gpu {
        let mut host = pollster::block_on(WgpuRenderHost::new_headless())?;
        let model = drive_frames(&runtime, &frames, &mut host, load, &args, &cancel);
        host.submit();

        let (meshes, textures, nodes) = host.resident_counts();
        log::debug!("GPU holds {meshes} meshes, {textures} textures and {nodes} nodes");
        model?
    } else {
        let mut host = MemoryRenderHost::default();
        let model = drive_frames(&runtime, &frames, &mut host, load, &args, &cancel)?;
        log::debug!("Kept {} bytes of uploads in memory", host.uploaded_bytes());
        model
    };

    frames.close();
    print_summary(&args, &model);

    Ok(())
}

/// Plays the render thread until the load finishes.
fn drive_frames(
    runtime: &tokio::runtime::Runtime,
    frames: &FrameScheduler,
    host: &mut dyn RenderHost,
    load: tokio::task::JoinHandle<LoadResult<LoadedModel>>,
    args: &Args,
    cancel: &CancellationToken,
) -> anyhow::Result<LoadedModel> {
    let frame_interval = Duration::from_millis(args.frame_interval_ms);

    while !load.is_finished() {
        let jobs = frames.run_frame(host);
        if jobs > 0 {
            log::trace!("Frame {} ran {jobs} load jobs", frames.frame_count());
        }

        if let Some(max_frames) = args.max_frames {
            if frames.frame_count() >= max_frames && !cancel.is_cancelled() {
                log::warn!("Cancelling the load after {max_frames} frames");
                cancel.cancel();
            }
        }

        std::thread::sleep(frame_interval);
    }

    Ok(runtime.block_on(load)??)
}

fn print_summary(args: &Args, model: &LoadedModel) {
    let stats = &model.stats;

    println!("{}", args.glb.display());
    println!("  nodes:      {}", stats.nodes);
    println!("  meshes:     {}", stats.meshes);
    println!("  primitives: {}", stats.primitives_uploaded);
    println!("  materials:  {}", stats.materials);
    println!("  textures:   {}", stats.textures_uploaded);
    println!("  vertices:   {}", stats.vertices);
    println!("  indices:    {}", stats.indices);
    println!("  tasks:      {}", stats.tasks);

    for (id, world_transform) in model.graph.world_transforms() {
        if let Some(object) = model.graph.node(id) {
            log::debug!(
                "Node {} - [{}] at {:?}",
                object.name.as_deref().unwrap_or("<UNNAMED>"),
                object.source_node,
                world_transform.w.truncate()
            );
        }
    }
}
