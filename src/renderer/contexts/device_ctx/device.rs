use std::num::NonZeroU64;
use std::ptr::NonNull;
use gpu_allocator::MemoryLocation;
use smallvec::SmallVec;
use crate::renderer::error::Result;
use crate::renderer::resources::format::{ClearValue, Format};
use crate::renderer::resources::state::ResourceState;
use crate::renderer::resources::texture::{ResourceFlags, TextureInfo};
use crate::renderer::resources::view::{
    ConstantBufferViewDesc, DepthStencilViewDesc, RenderTargetViewDesc, ShaderResourceViewDesc,
    UnorderedAccessViewDesc,
};

/// Opaque handle to a buffer or texture owned by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeResource(NonZeroU64);

impl NativeResource {
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    pub fn as_raw(self) -> u64 {
        self.0.get()
    }
}

/// CPU-side handle of a descriptor-table slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CpuDescriptor(pub u64);

/// Shader-side handle of a descriptor-table slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpuDescriptor(pub u64);

/// Host address of mapped, host-visible memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedPtr(NonNull<u8>);

// Mapped memory stays valid for the lifetime of its resource and is only written through
// `BufferAllocation::write`, which requires exclusive access to the allocation.
unsafe impl Send for MappedPtr {}
unsafe impl Sync for MappedPtr {}

impl MappedPtr {
    pub fn new(ptr: NonNull<u8>) -> Self {
        Self(ptr)
    }

    pub fn as_non_null(&self) -> NonNull<u8> {
        self.0
    }
}

pub struct NativeBufferDesc<'a> {
    pub name: &'a str,
    pub size: u64,
    pub location: MemoryLocation,
    pub allow_unordered_access: bool,
    pub initial_state: ResourceState,
}

pub struct NativeTextureDesc<'a> {
    pub name: &'a str,
    pub info: &'a TextureInfo,
    pub flags: ResourceFlags,
    pub clear_value: Option<ClearValue>,
    pub initial_state: ResourceState,
}

/// Placement of one subresource inside a linear copy buffer
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SubresourceFootprint {
    pub offset: u64,
    pub format: Format,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    /// Stride between rows, padded to the device's pitch alignment
    pub row_pitch: u64,
    pub num_rows: u32,
    /// Bytes of real data in each row
    pub row_size: u64,
}

impl SubresourceFootprint {
    pub fn slice_pitch(&self) -> u64 {
        self.row_pitch * self.num_rows as u64
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CopyableFootprints {
    pub footprints: SmallVec<[SubresourceFootprint; 16]>,
    pub total_bytes: u64,
}

/// The device capability the factories build on.
///
/// Views are written into descriptor slots handed out by a `DescriptorAllocator`; creating a view
/// cannot fail once the slot exists.
pub trait RenderDevice: Send + Sync {
    fn create_buffer(&self, desc: &NativeBufferDesc<'_>) -> Result<NativeResource>;

    fn create_texture(&self, desc: &NativeTextureDesc<'_>) -> Result<NativeResource>;

    fn destroy_resource(&self, resource: NativeResource);

    /// Maps a host-visible buffer
    fn map(&self, resource: NativeResource) -> Result<MappedPtr>;

    fn gpu_address(&self, resource: NativeResource) -> u64;

    /// Layout of `num_subresources` subresources of `info`, starting at `first_subresource`, when
    /// copied through a linear buffer starting at `base_offset`
    fn copyable_footprints(
        &self,
        info: &TextureInfo,
        first_subresource: u32,
        num_subresources: u32,
        base_offset: u64,
    ) -> CopyableFootprints;

    fn create_shader_resource_view(
        &self,
        resource: Option<NativeResource>,
        desc: &ShaderResourceViewDesc,
        slot: CpuDescriptor,
    );

    fn create_unordered_access_view(
        &self,
        resource: Option<NativeResource>,
        counter: Option<NativeResource>,
        desc: &UnorderedAccessViewDesc,
        slot: CpuDescriptor,
    );

    fn create_constant_buffer_view(&self, desc: &ConstantBufferViewDesc, slot: CpuDescriptor);

    fn create_render_target_view(
        &self,
        resource: NativeResource,
        desc: &RenderTargetViewDesc,
        slot: CpuDescriptor,
    );

    fn create_depth_stencil_view(
        &self,
        resource: NativeResource,
        desc: &DepthStencilViewDesc,
        slot: CpuDescriptor,
    );
}
