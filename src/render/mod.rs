mod context;
mod pipeline;
pub mod shaders;

pub use context::GpuContext;
pub use pipeline::Renderer;
