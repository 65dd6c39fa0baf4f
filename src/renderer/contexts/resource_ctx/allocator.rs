use std::sync::Weak;
use gpu_allocator::MemoryLocation;
use crate::renderer::contexts::device_ctx::device::{
    CpuDescriptor, GpuDescriptor, MappedPtr, NativeResource, RenderDevice,
};
use crate::renderer::error::{ResourceError, Result};
use crate::renderer::resources::format::ClearValue;
use crate::renderer::resources::texture::{ResourceFlags, TextureInfo};

pub struct BufferAllocationDesc<'a> {
    pub name: &'a str,
    pub size: u64,
    pub alignment: u64,
    pub location: MemoryLocation,
}

pub struct TextureAllocationDesc<'a> {
    pub name: &'a str,
    pub flags: ResourceFlags,
    pub clear_value: Option<ClearValue>,
    pub info: &'a TextureInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorHeapKind {
    CbvSrvUav,
    Sampler,
    Rtv,
    Dsv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorAllocationDesc {
    pub count: u32,
    pub heap: DescriptorHeapKind,
    /// Shader-invisible slots are only reachable from the CPU, e.g. for clears
    pub shader_visible: bool,
}

/// Places buffers into device memory heaps.
///
/// Temporary allocations are host-visible and short-lived; the allocator reclaims them itself once
/// the commands that read them have executed, so they are returned without an owner.
pub trait BufferAllocator: Send + Sync {
    fn allocate(
        &self,
        device: &dyn RenderDevice,
        desc: &BufferAllocationDesc<'_>,
    ) -> Result<BufferAllocation>;

    fn allocate_temporary(
        &self,
        device: &dyn RenderDevice,
        desc: &BufferAllocationDesc<'_>,
    ) -> Result<BufferAllocation>;

    /// Allocates a buffer that can be bound for unordered access
    fn allocate_unordered_access(
        &self,
        device: &dyn RenderDevice,
        desc: &BufferAllocationDesc<'_>,
    ) -> Result<BufferAllocation>;

    fn free(&self, allocation: &BufferAllocation);
}

pub trait TextureAllocator: Send + Sync {
    fn allocate(
        &self,
        device: &dyn RenderDevice,
        desc: &TextureAllocationDesc<'_>,
    ) -> Result<TextureAllocation>;

    fn free(&self, allocation: &TextureAllocation);
}

pub trait DescriptorAllocator: Send + Sync {
    fn allocate(
        &self,
        device: &dyn RenderDevice,
        desc: &DescriptorAllocationDesc,
    ) -> Result<DescriptorAllocation>;

    fn free(&self, allocation: &DescriptorAllocation);
}

/// A buffer placed by a `BufferAllocator`.
///
/// Returns itself to its allocator when released or dropped. Adopted and temporary buffers have
/// no owner and are never freed from here.
pub struct BufferAllocation {
    resource: Option<NativeResource>,
    heap_offset: u64,
    size: u64,
    gpu_address: u64,
    location: MemoryLocation,
    mapped: Option<MappedPtr>,
    owner: Option<Weak<dyn BufferAllocator>>,
}

impl BufferAllocation {
    pub fn new(
        resource: NativeResource,
        heap_offset: u64,
        size: u64,
        gpu_address: u64,
        location: MemoryLocation,
        mapped: Option<MappedPtr>,
        owner: Option<Weak<dyn BufferAllocator>>,
    ) -> Self {
        Self {
            resource: Some(resource),
            heap_offset,
            size,
            gpu_address,
            location,
            mapped,
            owner,
        }
    }

    /// Wraps a buffer created elsewhere
    pub fn adopted(resource: NativeResource, size: u64, gpu_address: u64) -> Self {
        Self {
            resource: Some(resource),
            heap_offset: 0,
            size,
            gpu_address,
            location: MemoryLocation::Unknown,
            mapped: None,
            owner: None,
        }
    }

    pub fn resource(&self) -> Option<NativeResource> {
        self.resource
    }

    pub fn heap_offset(&self) -> u64 {
        self.heap_offset
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn gpu_address(&self) -> u64 {
        self.gpu_address
    }

    pub fn location(&self) -> MemoryLocation {
        self.location
    }

    pub fn mapped(&self) -> Option<MappedPtr> {
        self.mapped
    }

    pub fn is_owned(&self) -> bool {
        self.owner.is_some()
    }

    /// Copies `data` into the mapped memory of a host-visible buffer
    pub fn write(&mut self, data: &[u8], start_offset: usize) -> Result<presser::CopyRecord> {
        let mapped = self
            .mapped
            .ok_or_else(|| ResourceError::backend("Cannot write to buffer that is not mapped"))?;

        if (start_offset + data.len()) as u64 > self.size {
            return Err(ResourceError::backend(format!(
                "{} bytes at offset {} do not fit a {}-byte buffer",
                data.len(),
                start_offset,
                self.size,
            )));
        }

        let mut raw_allocation =
            presser::RawAllocation::from_raw_parts(mapped.as_non_null(), self.size as usize);
        let mut slab = unsafe { raw_allocation.borrow_as_slab() };
        presser::copy_from_slice_to_offset(data, &mut slab, start_offset)
            .map_err(|e| ResourceError::backend(format!("Staging write failed: {e:?}")))
    }

    /// Returns the buffer to its allocator and clears every handle. Safe to call repeatedly.
    pub fn release(&mut self) {
        if let Some(owner) = self.owner.take() {
            match owner.upgrade() {
                Some(allocator) => allocator.free(self),
                None => log::warn!(
                    "Buffer allocator expired before {:?} was released",
                    self.resource,
                ),
            }
        }

        self.resource = None;
        self.heap_offset = 0;
        self.size = 0;
        self.gpu_address = 0;
        self.mapped = None;
    }
}

impl Drop for BufferAllocation {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for BufferAllocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferAllocation")
            .field("resource", &self.resource)
            .field("heap_offset", &self.heap_offset)
            .field("size", &self.size)
            .field("gpu_address", &self.gpu_address)
            .field("location", &self.location)
            .field("owned", &self.is_owned())
            .finish()
    }
}

/// A texture created by a `TextureAllocator`
pub struct TextureAllocation {
    resource: Option<NativeResource>,
    owner: Option<Weak<dyn TextureAllocator>>,
}

impl TextureAllocation {
    pub fn new(resource: NativeResource, owner: Option<Weak<dyn TextureAllocator>>) -> Self {
        Self {
            resource: Some(resource),
            owner,
        }
    }

    pub fn adopted(resource: NativeResource) -> Self {
        Self::new(resource, None)
    }

    pub fn resource(&self) -> Option<NativeResource> {
        self.resource
    }

    pub fn is_owned(&self) -> bool {
        self.owner.is_some()
    }

    pub fn release(&mut self) {
        if let Some(owner) = self.owner.take() {
            match owner.upgrade() {
                Some(allocator) => allocator.free(self),
                None => log::warn!(
                    "Texture allocator expired before {:?} was released",
                    self.resource,
                ),
            }
        }

        self.resource = None;
    }
}

impl Drop for TextureAllocation {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for TextureAllocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureAllocation")
            .field("resource", &self.resource)
            .field("owned", &self.is_owned())
            .finish()
    }
}

/// A contiguous run of slots in one descriptor heap
pub struct DescriptorAllocation {
    heap: DescriptorHeapKind,
    shader_visible: bool,
    first_index: u32,
    count: u32,
    cpu_start: CpuDescriptor,
    gpu_start: Option<GpuDescriptor>,
    increment: u64,
    owner: Option<Weak<dyn DescriptorAllocator>>,
}

impl DescriptorAllocation {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        heap: DescriptorHeapKind,
        shader_visible: bool,
        first_index: u32,
        count: u32,
        cpu_start: CpuDescriptor,
        gpu_start: Option<GpuDescriptor>,
        increment: u64,
        owner: Option<Weak<dyn DescriptorAllocator>>,
    ) -> Self {
        Self {
            heap,
            shader_visible,
            first_index,
            count,
            cpu_start,
            gpu_start,
            increment,
            owner,
        }
    }

    pub fn heap(&self) -> DescriptorHeapKind {
        self.heap
    }

    pub fn is_shader_visible(&self) -> bool {
        self.shader_visible
    }

    pub fn first_index(&self) -> u32 {
        self.first_index
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn is_null(&self) -> bool {
        self.count == 0
    }

    pub fn cpu_handle(&self, offset: u32) -> CpuDescriptor {
        debug_assert!(offset < self.count, "descriptor offset {offset} out of range");
        CpuDescriptor(self.cpu_start.0 + offset as u64 * self.increment)
    }

    pub fn gpu_handle(&self, offset: u32) -> Option<GpuDescriptor> {
        self.gpu_start
            .map(|start| GpuDescriptor(start.0 + offset as u64 * self.increment))
    }

    pub fn release(&mut self) {
        if let Some(owner) = self.owner.take() {
            match owner.upgrade() {
                Some(allocator) => allocator.free(self),
                None => log::warn!(
                    "Descriptor allocator expired before {:?} slots {}..{} were released",
                    self.heap,
                    self.first_index,
                    self.first_index + self.count,
                ),
            }
        }

        self.first_index = 0;
        self.count = 0;
        self.cpu_start = CpuDescriptor(0);
        self.gpu_start = None;
    }
}

impl Drop for DescriptorAllocation {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for DescriptorAllocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptorAllocation")
            .field("heap", &self.heap)
            .field("shader_visible", &self.shader_visible)
            .field("first_index", &self.first_index)
            .field("count", &self.count)
            .field("cpu_start", &self.cpu_start)
            .field("gpu_start", &self.gpu_start)
            .finish()
    }
}
