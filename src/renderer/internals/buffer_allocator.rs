use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use gpu_allocator::MemoryLocation;
use crate::renderer::config::HeapConfig;
use crate::renderer::contexts::device_ctx::device::{NativeBufferDesc, NativeResource, RenderDevice};
use crate::renderer::contexts::resource_ctx::allocator::{
    BufferAllocation, BufferAllocationDesc, BufferAllocator,
};
use crate::renderer::error::{ResourceError, Result};
use crate::renderer::internals::heap::{HeapRegion, HeapRegions};
use crate::renderer::resources::state::ResourceState;

struct BufferHeaps {
    device_local: HeapRegions,
    upload: HeapRegions,
    live: HashMap<NativeResource, (MemoryLocation, HeapRegion)>,
    temporaries: Vec<(NativeResource, HeapRegion)>,
}

impl BufferHeaps {
    fn heap(&mut self, location: MemoryLocation) -> Result<&mut HeapRegions> {
        match location {
            MemoryLocation::GpuOnly => Ok(&mut self.device_local),
            MemoryLocation::CpuToGpu | MemoryLocation::GpuToCpu => Ok(&mut self.upload),
            MemoryLocation::Unknown => Err(ResourceError::invalid(
                "buffers cannot be placed in an unknown memory location",
            )),
        }
    }
}

/// Places buffers in one device-local and one host-visible heap.
///
/// Temporary buffers live in the host-visible heap until `reset_temporaries` is called, normally
/// once the command list that reads them has executed.
pub struct SoftwareBufferAllocator {
    me: Weak<Self>,
    device: Weak<dyn RenderDevice>,
    heaps: Mutex<BufferHeaps>,
    allocation_calls: AtomicUsize,
    double_frees: AtomicUsize,
}

impl SoftwareBufferAllocator {
    pub fn new(device: &Arc<dyn RenderDevice>, config: HeapConfig) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            device: Arc::downgrade(device),
            heaps: Mutex::new(BufferHeaps {
                device_local: HeapRegions::new(config.default_heap_size),
                upload: HeapRegions::new(config.upload_heap_size),
                live: HashMap::new(),
                temporaries: Vec::new(),
            }),
            allocation_calls: AtomicUsize::new(0),
            double_frees: AtomicUsize::new(0),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, BufferHeaps>> {
        self.heaps
            .lock()
            .map_err(|e| ResourceError::backend(e.to_string()))
    }

    /// Every allocate call so far, successful or not
    pub fn allocation_calls(&self) -> usize {
        self.allocation_calls.load(Ordering::Relaxed)
    }

    pub fn double_frees(&self) -> usize {
        self.double_frees.load(Ordering::Relaxed)
    }

    /// Owned allocations that have not been freed
    pub fn live_allocations(&self) -> usize {
        self.lock().map(|heaps| heaps.live.len()).unwrap_or(0)
    }

    pub fn live_in(&self, location: MemoryLocation) -> usize {
        self.lock()
            .map(|heaps| heaps.live.values().filter(|(l, _)| *l == location).count())
            .unwrap_or(0)
    }

    pub fn temporaries(&self) -> usize {
        self.lock().map(|heaps| heaps.temporaries.len()).unwrap_or(0)
    }

    pub fn free_bytes(&self, location: MemoryLocation) -> u64 {
        self.lock()
            .ok()
            .and_then(|mut heaps| heaps.heap(location).ok().map(|heap| heap.free_bytes()))
            .unwrap_or(0)
    }

    /// Destroys every temporary buffer and returns its memory to the host-visible heap
    pub fn reset_temporaries(&self) -> Result<()> {
        let device = self.device.upgrade().ok_or(ResourceError::MissingDevice)?;
        let mut heaps = self.lock()?;
        let temporaries = std::mem::take(&mut heaps.temporaries);
        log::trace!("Releasing {} temporary buffers", temporaries.len());

        for (resource, region) in temporaries {
            heaps.upload.deallocate(region);
            device.destroy_resource(resource);
        }
        Ok(())
    }

    fn place(
        &self,
        device: &dyn RenderDevice,
        desc: &BufferAllocationDesc<'_>,
        allow_unordered_access: bool,
        temporary: bool,
    ) -> Result<BufferAllocation> {
        self.allocation_calls.fetch_add(1, Ordering::Relaxed);
        let mut heaps = self.lock()?;

        let region = heaps
            .heap(desc.location)?
            .allocate(desc.size, desc.alignment)
            .ok_or_else(|| {
                ResourceError::AllocationFailed(format!(
                    "{:?} heap cannot fit {} bytes for '{}'",
                    desc.location, desc.size, desc.name,
                ))
            })?;

        let initial_state = match desc.location {
            MemoryLocation::GpuOnly => ResourceState::Common,
            _ => ResourceState::GenericRead,
        };
        let created = device
            .create_buffer(&NativeBufferDesc {
                name: desc.name,
                size: desc.size,
                location: desc.location,
                allow_unordered_access,
                initial_state,
            })
            .and_then(|resource| {
                let mapped = match desc.location {
                    MemoryLocation::GpuOnly => None,
                    _ => match device.map(resource) {
                        Ok(mapped) => Some(mapped),
                        Err(e) => {
                            device.destroy_resource(resource);
                            return Err(e);
                        }
                    },
                };
                Ok((resource, mapped))
            });
        let (resource, mapped) = match created {
            Ok(created) => created,
            Err(e) => {
                heaps.heap(desc.location)?.deallocate(region);
                return Err(ResourceError::AllocationFailed(format!(
                    "device rejected '{}': {}",
                    desc.name, e
                )));
            }
        };

        let owner: Option<Weak<dyn BufferAllocator>> = if temporary {
            heaps.temporaries.push((resource, region));
            None
        } else {
            heaps.live.insert(resource, (desc.location, region));
            Some(self.me.clone())
        };

        Ok(BufferAllocation::new(
            resource,
            region.offset,
            desc.size,
            device.gpu_address(resource),
            desc.location,
            mapped,
            owner,
        ))
    }
}

impl BufferAllocator for SoftwareBufferAllocator {
    fn allocate(
        &self,
        device: &dyn RenderDevice,
        desc: &BufferAllocationDesc<'_>,
    ) -> Result<BufferAllocation> {
        self.place(device, desc, false, false)
    }

    fn allocate_temporary(
        &self,
        device: &dyn RenderDevice,
        desc: &BufferAllocationDesc<'_>,
    ) -> Result<BufferAllocation> {
        if desc.location == MemoryLocation::GpuOnly {
            return Err(ResourceError::invalid(format!(
                "temporary buffer '{}' must be host visible",
                desc.name
            )));
        }
        self.place(device, desc, false, true)
    }

    fn allocate_unordered_access(
        &self,
        device: &dyn RenderDevice,
        desc: &BufferAllocationDesc<'_>,
    ) -> Result<BufferAllocation> {
        self.place(device, desc, true, false)
    }

    fn free(&self, allocation: &BufferAllocation) {
        let Some(resource) = allocation.resource() else {
            return;
        };
        let mut heaps = match self.lock() {
            Ok(heaps) => heaps,
            Err(e) => {
                log::error!("Failed to free {:?}: {}", resource, e);
                return;
            }
        };

        let Some((location, region)) = heaps.live.remove(&resource) else {
            self.double_frees.fetch_add(1, Ordering::Relaxed);
            log::error!("Buffer {:?} freed twice", resource);
            return;
        };
        if let Ok(heap) = heaps.heap(location) {
            heap.deallocate(region);
        }
        drop(heaps);

        match self.device.upgrade() {
            Some(device) => device.destroy_resource(resource),
            None => log::warn!("Device expired before buffer {:?} was destroyed", resource),
        }
    }
}
