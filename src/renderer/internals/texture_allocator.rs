use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use crate::renderer::config::HeapConfig;
use crate::renderer::contexts::device_ctx::device::{NativeResource, NativeTextureDesc, RenderDevice};
use crate::renderer::contexts::resource_ctx::allocator::{
    TextureAllocation, TextureAllocationDesc, TextureAllocator,
};
use crate::renderer::error::{ResourceError, Result};
use crate::renderer::internals::heap::{HeapRegion, HeapRegions};
use crate::renderer::internals::software_device::ADDRESS_ALIGNMENT;
use crate::renderer::resources::state::ResourceState;

struct TextureHeap {
    regions: HeapRegions,
    live: HashMap<NativeResource, HeapRegion>,
}

/// Places textures in a device-local heap of its own
pub struct SoftwareTextureAllocator {
    me: Weak<Self>,
    device: Weak<dyn RenderDevice>,
    heap: Mutex<TextureHeap>,
    allocation_calls: AtomicUsize,
    double_frees: AtomicUsize,
}

impl SoftwareTextureAllocator {
    pub fn new(device: &Arc<dyn RenderDevice>, config: HeapConfig) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            device: Arc::downgrade(device),
            heap: Mutex::new(TextureHeap {
                regions: HeapRegions::new(config.default_heap_size),
                live: HashMap::new(),
            }),
            allocation_calls: AtomicUsize::new(0),
            double_frees: AtomicUsize::new(0),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, TextureHeap>> {
        self.heap
            .lock()
            .map_err(|e| ResourceError::backend(e.to_string()))
    }

    pub fn allocation_calls(&self) -> usize {
        self.allocation_calls.load(Ordering::Relaxed)
    }

    pub fn double_frees(&self) -> usize {
        self.double_frees.load(Ordering::Relaxed)
    }

    pub fn live_allocations(&self) -> usize {
        self.lock().map(|heap| heap.live.len()).unwrap_or(0)
    }
}

impl TextureAllocator for SoftwareTextureAllocator {
    fn allocate(
        &self,
        device: &dyn RenderDevice,
        desc: &TextureAllocationDesc<'_>,
    ) -> Result<TextureAllocation> {
        self.allocation_calls.fetch_add(1, Ordering::Relaxed);
        let size = device
            .copyable_footprints(desc.info, 0, desc.info.subresource_count(), 0)
            .total_bytes;

        let mut heap = self.lock()?;
        let region = heap
            .regions
            .allocate(size, ADDRESS_ALIGNMENT)
            .ok_or_else(|| {
                ResourceError::AllocationFailed(format!(
                    "texture heap cannot fit {} bytes for '{}'",
                    size, desc.name,
                ))
            })?;

        let resource = match device.create_texture(&NativeTextureDesc {
            name: desc.name,
            info: desc.info,
            flags: desc.flags,
            clear_value: desc.clear_value,
            initial_state: ResourceState::Common,
        }) {
            Ok(resource) => resource,
            Err(e) => {
                heap.regions.deallocate(region);
                return Err(ResourceError::AllocationFailed(format!(
                    "device rejected '{}': {}",
                    desc.name, e
                )));
            }
        };
        heap.live.insert(resource, region);

        let owner: Weak<dyn TextureAllocator> = self.me.clone();
        Ok(TextureAllocation::new(resource, Some(owner)))
    }

    fn free(&self, allocation: &TextureAllocation) {
        let Some(resource) = allocation.resource() else {
            return;
        };
        let mut heap = match self.lock() {
            Ok(heap) => heap,
            Err(e) => {
                log::error!("Failed to free {:?}: {}", resource, e);
                return;
            }
        };

        let Some(region) = heap.live.remove(&resource) else {
            self.double_frees.fetch_add(1, Ordering::Relaxed);
            log::error!("Texture {:?} freed twice", resource);
            return;
        };
        heap.regions.deallocate(region);
        drop(heap);

        match self.device.upgrade() {
            Some(device) => device.destroy_resource(resource),
            None => log::warn!("Device expired before texture {:?} was destroyed", resource),
        }
    }
}
