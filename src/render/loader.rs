use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::error::{LoadError, LoadResult};
use crate::render::node::SceneGraph;
use crate::render::scene::SceneBuilder;
use crate::resource::glb::buffer::NativeBufferStore;
use crate::resource::glb::container::parse_glb_with_store;
use crate::resource::glb::vertex::VertexLayout;
use crate::task::cancel::CancellationToken;
use crate::task::frame::FrameScheduler;
use crate::task::tracker::TaskTracker;

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Scene to load instead of the document's default scene.
    pub scene: Option<usize>,
    /// Compute tangents for primitives that have normals and UVs but no tangents.
    pub generate_tangents: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            scene: None,
            generate_tangents: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub nodes: usize,
    pub meshes: usize,
    pub primitives_uploaded: usize,
    pub materials: usize,
    pub textures_uploaded: usize,
    pub vertices: usize,
    pub indices: usize,
    pub tasks: usize,
}

impl LoadStats {
    fn from_graph(graph: &SceneGraph, tasks: usize) -> Self {
        let primitives = graph.meshes().iter().flat_map(|mesh| mesh.primitives.iter());

        let mut stats = Self {
            nodes: graph.node_count(),
            meshes: graph.meshes().len(),
            materials: graph.materials().len(),
            textures_uploaded: graph
                .textures()
                .iter()
                .filter(|texture| texture.gpu_texture.is_some())
                .count(),
            tasks,
            ..Self::default()
        };

        for primitive in primitives {
            if primitive.gpu_mesh.is_some() {
                stats.primitives_uploaded += 1;
            }
            stats.vertices += primitive.vertex_count;
            stats.indices += primitive.index_count;
        }

        stats
    }
}

#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub graph: SceneGraph,
    pub stats: LoadStats,
}

/// Loads GLB files into scene graphs, uploading through a frame scheduler.
///
/// `load` must run on a multi-threaded tokio runtime while some other thread keeps calling
/// `FrameScheduler::run_frame` on the scheduler given to `new`.
#[derive(Clone)]
pub struct GlbModelLoader {
    frames: FrameScheduler,
    store: NativeBufferStore,
    options: LoadOptions,
}

impl GlbModelLoader {
    pub fn new(frames: FrameScheduler) -> Self {
        Self {
            frames,
            store: NativeBufferStore::new(),
            options: LoadOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_buffer_store(mut self, store: NativeBufferStore) -> Self {
        self.store = store;
        self
    }

    pub fn buffer_store(&self) -> &NativeBufferStore {
        &self.store
    }

    /// Parses `data`, builds the active scene with `V` vertices and waits for every upload.
    ///
    /// On failure or cancellation all outstanding steps are stopped and awaited before returning, and every
    /// native buffer of the document has been released.
    pub async fn load<V: VertexLayout>(
        &self,
        data: Vec<u8>,
        cancel: CancellationToken,
    ) -> LoadResult<LoadedModel> {
        let started = Instant::now();
        cancel.check()?;

        let store = self.store.clone();
        let document = tokio::task::spawn_blocking(move || parse_glb_with_store(&data, &store))
            .await
            .map_err(|error| LoadError::TaskFailed(error.to_string()))??;
        let document = Arc::new(document);

        cancel.check()?;

        log::debug!(
            "Parsed GLB container with {} binary chunks",
            document.binary_chunks().len()
        );

        let build_cancel = cancel.child_token();
        let tracker = TaskTracker::new(build_cancel.clone());
        let graph = Arc::new(Mutex::new(SceneGraph::new()));

        let build_result = {
            let document = document.clone();
            let graph = graph.clone();
            let tracker = tracker.clone();
            let frames = self.frames.clone();
            let options = self.options.clone();

            tokio::task::spawn_blocking(move || {
                SceneBuilder::<V>::build(document, graph, tracker, frames, options)
            })
            .await
            .unwrap_or_else(|error| Err(LoadError::TaskFailed(error.to_string())))
        };

        if let Err(error) = build_result {
            log::debug!("Stopping outstanding load steps after a failed build: {error}");
            build_cancel.cancel();
            if let Err(task_error) = tracker.wait_all().await {
                log::debug!("Outstanding load step ended with: {task_error}");
            }
            return Err(error);
        }

        let summary = tracker.wait_all().await?;

        log::debug!(
            "Releasing {} native buffers of the GLB document",
            document.binary_chunks().len()
        );
        drop(document);

        let graph = match Arc::try_unwrap(graph) {
            Ok(graph) => graph.into_inner(),
            Err(shared) => shared.lock().clone(),
        };
        let stats = LoadStats::from_graph(&graph, summary.tasks);

        log::info!(
            "Loaded {} nodes, {} primitives and {} textures in {:?}",
            stats.nodes,
            stats.primitives_uploaded,
            stats.textures_uploaded,
            started.elapsed()
        );

        Ok(LoadedModel { graph, stats })
    }
}
