pub mod renderer;

pub use renderer::contexts::device_ctx::{CommandRecorder, NativeResource, RenderDevice};
pub use renderer::contexts::resource_ctx::allocator::{
    BufferAllocator, DescriptorAllocator, TextureAllocator,
};
pub use renderer::factories::ResourceFactory;
pub use renderer::resources::descriptor::{ResourceDesc, ResourceDescriptor};
pub use renderer::resources::format::Format;
pub use renderer::resources::record::ResourceRecord;
pub use renderer::resources::state::ResourceState;
pub use renderer::resources::texture::{ResourceFlags, TextureInfo, ViewDimension};
pub use renderer::{FactoryConfig, HeapConfig, RenderResourceContext, ResourceError, ResourceKind};
