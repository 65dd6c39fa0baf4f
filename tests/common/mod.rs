#![allow(dead_code)]

use std::sync::Arc;
use gpu_allocator::MemoryLocation;
use resource_forge::renderer::contexts::device_ctx::{NativeBufferDesc, NativeResource, RenderDevice};
use resource_forge::renderer::internals::{SoftwareBackend, SoftwareCommandList};
use resource_forge::renderer::Result;
use resource_forge::{
    FactoryConfig, HeapConfig, RenderResourceContext, ResourceDescriptor, ResourceRecord,
    ResourceState,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct Harness {
    pub backend: SoftwareBackend,
    pub resources: RenderResourceContext,
    pub list: SoftwareCommandList,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_heaps(HeapConfig::default())
    }

    pub fn with_heaps(heaps: HeapConfig) -> Self {
        init_logging();
        let backend = SoftwareBackend::new(heaps);
        let resources = backend.resource_context(FactoryConfig::default());

        Self {
            backend,
            resources,
            list: SoftwareCommandList::new(),
        }
    }

    pub fn create(&mut self, desc: &ResourceDescriptor<'_>) -> Result<ResourceRecord> {
        self.resources
            .create_resource(Some(&mut self.list), desc.kind(), desc)
    }

    /// Executes everything recorded so far and starts a new list
    pub fn submit(&mut self) {
        self.backend.submit(&self.list).unwrap();
        self.list.clear();
    }

    /// The state the device reached for the record's resource
    pub fn device_state(&self, record: &ResourceRecord) -> Option<ResourceState> {
        self.backend.device.state(record.native()?)
    }

    /// A buffer created directly on the device, outside any allocator
    pub fn external_buffer(&self, size: u64) -> NativeResource {
        self.backend
            .device
            .create_buffer(&NativeBufferDesc {
                name: "external",
                size,
                location: MemoryLocation::GpuOnly,
                allow_unordered_access: false,
                initial_state: ResourceState::Common,
            })
            .unwrap()
    }

    pub fn device(&self) -> Arc<dyn RenderDevice> {
        self.backend.device.clone()
    }
}
