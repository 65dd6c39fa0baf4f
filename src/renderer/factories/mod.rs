/// "Factories" turn a `ResourceDescriptor` into a `ResourceRecord`, one implementation per kind.
///
/// Every factory checks its collaborators before doing any work, performs every fallible step
/// before the first command is recorded, and hands allocations back through their RAII handles
/// when a step fails.

pub mod buffer;
pub mod constant;
pub mod depth_stencil;
pub mod index;
pub mod render_target;
pub mod rw_buffer;
pub mod rw_texture;
pub mod texture;
pub mod vertex;

mod staging;

use std::sync::{Arc, Weak};
use crate::renderer::contexts::device_ctx::command_recorder::CommandRecorder;
use crate::renderer::contexts::device_ctx::device::{NativeResource, RenderDevice};
use crate::renderer::contexts::resource_ctx::allocator::{BufferAllocation, TextureAllocation};
use crate::renderer::error::{ResourceError, Result};
use crate::renderer::resources::descriptor::ResourceDescriptor;
use crate::renderer::resources::record::ResourceRecord;
use crate::renderer::resources::ResourceKind;

pub use buffer::BufferFactory;
pub use constant::ConstantFactory;
pub use depth_stencil::DepthStencilFactory;
pub use index::IndexFactory;
pub use render_target::RenderTargetFactory;
pub use rw_buffer::RwBufferFactory;
pub use rw_texture::RwTextureFactory;
pub use texture::TextureFactory;
pub use vertex::VertexFactory;

/// Builds resources of one kind
pub trait ResourceFactory: Send + Sync {
    fn kind(&self) -> ResourceKind;

    /// Builds the resource described by `desc`, appending any copies and barriers to `recorder`
    fn create_resource(
        &self,
        recorder: Option<&mut dyn CommandRecorder>,
        desc: &ResourceDescriptor<'_>,
    ) -> Result<ResourceRecord>;
}

pub(crate) fn upgrade_device(device: &Weak<dyn RenderDevice>) -> Result<Arc<dyn RenderDevice>> {
    device.upgrade().ok_or(ResourceError::MissingDevice)
}

pub(crate) fn upgrade<T: ?Sized>(weak: &Weak<T>, collaborator: &'static str) -> Result<Arc<T>> {
    weak.upgrade()
        .ok_or(ResourceError::ExpiredCollaborator { collaborator })
}

pub(crate) fn kind_mismatch(expected: ResourceKind, desc: &ResourceDescriptor<'_>) -> ResourceError {
    ResourceError::invalid(format!(
        "{:?} factory cannot build '{}' described as {:?}",
        expected,
        desc.name,
        desc.kind(),
    ))
}

pub(crate) fn require_buffer(allocation: &BufferAllocation, name: &str) -> Result<NativeResource> {
    allocation.resource().ok_or_else(|| {
        ResourceError::AllocationFailed(format!("no backing buffer for '{name}'"))
    })
}

pub(crate) fn require_texture(allocation: &TextureAllocation, name: &str) -> Result<NativeResource> {
    allocation.resource().ok_or_else(|| {
        ResourceError::AllocationFailed(format!("no backing texture for '{name}'"))
    })
}

/// Views address at most 4 GiB
pub(crate) fn view_size(size: u64, name: &str) -> Result<u32> {
    u32::try_from(size).map_err(|_| {
        ResourceError::invalid(format!("'{name}' is too large for a view ({size} bytes)"))
    })
}
