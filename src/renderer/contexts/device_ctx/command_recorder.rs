use crate::renderer::contexts::device_ctx::device::{NativeResource, SubresourceFootprint};
use crate::renderer::resources::state::ResourceState;

/// One side of a texture copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureCopyLocation {
    /// A subresource of a texture
    Subresource {
        resource: NativeResource,
        index: u32,
    },
    /// A subresource laid out inside a linear buffer
    PlacedFootprint {
        resource: NativeResource,
        footprint: SubresourceFootprint,
    },
}

/// Whole-resource state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionBarrier {
    pub resource: NativeResource,
    pub before: ResourceState,
    pub after: ResourceState,
}

/// Appends GPU commands to a command list.
///
/// A recorder is owned by one thread while commands are appended to it.
pub trait CommandRecorder {
    fn copy_buffer_region(
        &mut self,
        dst: NativeResource,
        dst_offset: u64,
        src: NativeResource,
        src_offset: u64,
        size: u64,
    );

    fn copy_texture_region(&mut self, dst: TextureCopyLocation, src: TextureCopyLocation);

    fn resource_barrier(&mut self, barrier: &TransitionBarrier);
}
