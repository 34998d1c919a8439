pub mod gpu;
pub mod host;
pub mod loader;
pub mod material;
pub mod memory;
pub mod mesh;
pub mod node;
pub mod sampler;
pub(crate) mod scene;
pub mod texture;
