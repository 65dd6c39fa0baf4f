/// "Internals" refers to low-level objects that are used to implement the collaborator traits.
/// They stand in for a GPU backend and should not be used directly outside tests and tools.

pub mod buffer_allocator;
pub mod command_list;
pub mod descriptor_allocator;
pub mod heap;
pub mod software_device;
pub mod texture_allocator;

use std::sync::Arc;
use crate::renderer::config::{FactoryConfig, HeapConfig};
use crate::renderer::contexts::device_ctx::device::RenderDevice;
use crate::renderer::contexts::resource_ctx::allocator::{
    BufferAllocator, DescriptorAllocator, TextureAllocator,
};
use crate::renderer::contexts::resource_ctx::RenderResourceContext;
use crate::renderer::error::Result;

pub use buffer_allocator::SoftwareBufferAllocator;
pub use command_list::{Command, SoftwareCommandList};
pub use descriptor_allocator::SoftwareDescriptorAllocator;
pub use heap::{HeapRegion, HeapRegions};
pub use software_device::{CreatedView, SoftwareDevice};
pub use texture_allocator::SoftwareTextureAllocator;

/// A software device together with its three allocators
pub struct SoftwareBackend {
    pub device: Arc<SoftwareDevice>,
    pub buffers: Arc<SoftwareBufferAllocator>,
    pub textures: Arc<SoftwareTextureAllocator>,
    pub descriptors: Arc<SoftwareDescriptorAllocator>,
}

impl SoftwareBackend {
    pub fn new(config: HeapConfig) -> Self {
        let device = Arc::new(SoftwareDevice::new());
        let render_device: Arc<dyn RenderDevice> = device.clone();

        Self {
            buffers: SoftwareBufferAllocator::new(&render_device, config),
            textures: SoftwareTextureAllocator::new(&render_device, config),
            descriptors: SoftwareDescriptorAllocator::new(config),
            device,
        }
    }

    /// Builds the factories over this backend. They only hold weak references to it.
    pub fn resource_context(&self, config: FactoryConfig) -> RenderResourceContext {
        let device: Arc<dyn RenderDevice> = self.device.clone();
        let buffers: Arc<dyn BufferAllocator> = self.buffers.clone();
        let textures: Arc<dyn TextureAllocator> = self.textures.clone();
        let descriptors: Arc<dyn DescriptorAllocator> = self.descriptors.clone();

        RenderResourceContext::new(&device, &buffers, &textures, &descriptors, config)
    }

    /// Runs `list` on the device, then reclaims the staging buffers it read from
    pub fn submit(&self, list: &SoftwareCommandList) -> Result<()> {
        self.device.execute(list)?;
        self.buffers.reset_temporaries()
    }
}
