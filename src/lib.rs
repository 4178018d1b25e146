//! A thin, opinionated object-oriented abstraction over a low-level
//! rasterization GPU API: a rendering-context state machine coordinating
//! textures, vertex data, shader programs, and render targets, minimizing
//! redundant driver state transitions through a cached shadow state.

pub mod context;
pub mod driver;
pub mod error;
pub mod render_target;
pub mod shader_program;
pub mod texture;
pub mod types;
pub mod vertex_data;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use context::{Context, TextureBinding};
pub use render_target::RenderTarget;
pub use shader_program::ShaderProgram;
pub use texture::Texture;
pub use vertex_data::{AttributeDescriptor, AttributeStream, IndexStream, VertexData};

pub use driver::{GlDriver, GpuDriver};
pub use error::GlslStageError;

pub use types::{
    AttachmentType, BindingType, BlendMode, CullMode, DataScalar, DepthMode, Filter, MipmapFilter,
    RenderMode, Stage, TextureFace, TextureFormat, TextureVariant, WrapMode, MAX_ATTRIBUTE_SLOTS,
    MAX_COLOR_ATTACHMENTS, MAX_SAMPLER_SLOTS,
};
