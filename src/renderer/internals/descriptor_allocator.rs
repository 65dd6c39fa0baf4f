use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use crate::renderer::config::HeapConfig;
use crate::renderer::contexts::device_ctx::device::{CpuDescriptor, GpuDescriptor, RenderDevice};
use crate::renderer::contexts::resource_ctx::allocator::{
    DescriptorAllocation, DescriptorAllocationDesc, DescriptorAllocator, DescriptorHeapKind,
};
use crate::renderer::error::{ResourceError, Result};
use crate::renderer::internals::heap::{HeapRegion, HeapRegions};

/// Size of one descriptor slot
pub const DESCRIPTOR_INCREMENT: u64 = 32;

type HeapKey = (DescriptorHeapKind, bool);

fn heap_base(key: HeapKey) -> u64 {
    let kind = match key.0 {
        DescriptorHeapKind::CbvSrvUav => 1,
        DescriptorHeapKind::Sampler => 2,
        DescriptorHeapKind::Rtv => 3,
        DescriptorHeapKind::Dsv => 4,
    };
    (kind * 2 + key.1 as u64) << 32
}

struct DescriptorHeaps {
    heaps: HashMap<HeapKey, HeapRegions>,
    live: HashMap<(HeapKey, u32), u32>,
}

/// Hands out runs of slots from one heap per kind and visibility
pub struct SoftwareDescriptorAllocator {
    me: Weak<Self>,
    descriptors_per_heap: u32,
    heaps: Mutex<DescriptorHeaps>,
    allocation_calls: AtomicUsize,
    double_frees: AtomicUsize,
}

impl SoftwareDescriptorAllocator {
    pub fn new(config: HeapConfig) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            descriptors_per_heap: config.descriptors_per_heap,
            heaps: Mutex::new(DescriptorHeaps {
                heaps: HashMap::new(),
                live: HashMap::new(),
            }),
            allocation_calls: AtomicUsize::new(0),
            double_frees: AtomicUsize::new(0),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, DescriptorHeaps>> {
        self.heaps
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
        self.lock().map(|heaps| heaps.live.len()).unwrap_or(0)
    }

    /// Live slot runs in one heap
    pub fn live_in(&self, heap: DescriptorHeapKind, shader_visible: bool) -> usize {
        self.lock()
            .map(|heaps| {
                heaps
                    .live
                    .keys()
                    .filter(|(key, _)| *key == (heap, shader_visible))
                    .count()
            })
            .unwrap_or(0)
    }
}

impl DescriptorAllocator for SoftwareDescriptorAllocator {
    fn allocate(
        &self,
        _device: &dyn RenderDevice,
        desc: &DescriptorAllocationDesc,
    ) -> Result<DescriptorAllocation> {
        self.allocation_calls.fetch_add(1, Ordering::Relaxed);
        if desc.count == 0 {
            return Err(ResourceError::invalid("descriptor allocation of zero slots"));
        }
        if desc.shader_visible
            && matches!(desc.heap, DescriptorHeapKind::Rtv | DescriptorHeapKind::Dsv)
        {
            return Err(ResourceError::invalid(format!(
                "{:?} heaps cannot be shader visible",
                desc.heap
            )));
        }

        let key = (desc.heap, desc.shader_visible);
        let mut guard = self.lock()?;
        let capacity = self.descriptors_per_heap as u64;
        let region = guard
            .heaps
            .entry(key)
            .or_insert_with(|| HeapRegions::new(capacity))
            .allocate(desc.count as u64, 1)
            .ok_or_else(|| {
                ResourceError::AllocationFailed(format!(
                    "{:?} heap has no run of {} free slots",
                    desc.heap, desc.count,
                ))
            })?;
        let first_index = region.offset as u32;
        guard.live.insert((key, first_index), desc.count);

        let base = heap_base(key);
        let cpu_start = CpuDescriptor(base + first_index as u64 * DESCRIPTOR_INCREMENT);
        let gpu_start = desc
            .shader_visible
            .then(|| GpuDescriptor(base + first_index as u64 * DESCRIPTOR_INCREMENT));
        let owner: Weak<dyn DescriptorAllocator> = self.me.clone();

        Ok(DescriptorAllocation::new(
            desc.heap,
            desc.shader_visible,
            first_index,
            desc.count,
            cpu_start,
            gpu_start,
            DESCRIPTOR_INCREMENT,
            Some(owner),
        ))
    }

    fn free(&self, allocation: &DescriptorAllocation) {
        if allocation.is_null() {
            return;
        }
        let key = (allocation.heap(), allocation.is_shader_visible());
        let mut guard = match self.lock() {
            Ok(guard) => guard,
            Err(e) => {
                log::error!("Failed to free {:?}: {}", allocation, e);
                return;
            }
        };

        let Some(count) = guard.live.remove(&(key, allocation.first_index())) else {
            self.double_frees.fetch_add(1, Ordering::Relaxed);
            log::error!(
                "{:?} slots {}..{} freed twice",
                allocation.heap(),
                allocation.first_index(),
                allocation.first_index() + allocation.count(),
            );
            return;
        };
        if let Some(heap) = guard.heaps.get_mut(&key) {
            heap.deallocate(HeapRegion {
                offset: allocation.first_index() as u64,
                size: count as u64,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::internals::software_device::SoftwareDevice;

    fn visible(count: u32) -> DescriptorAllocationDesc {
        DescriptorAllocationDesc {
            count,
            heap: DescriptorHeapKind::CbvSrvUav,
            shader_visible: true,
        }
    }

    #[test]
    fn handles_are_unique_across_heaps() {
        let device = SoftwareDevice::new();
        let allocator = SoftwareDescriptorAllocator::new(HeapConfig::default());

        let a = allocator.allocate(&device, &visible(2)).unwrap();
        let invisible = allocator
            .allocate(
                &device,
                &DescriptorAllocationDesc {
                    count: 1,
                    heap: DescriptorHeapKind::CbvSrvUav,
                    shader_visible: false,
                },
            )
            .unwrap();

        assert_eq!(a.first_index(), 0);
        assert_eq!(invisible.first_index(), 0);
        assert_ne!(a.cpu_handle(0), invisible.cpu_handle(0));
        assert_eq!(a.cpu_handle(1).0 - a.cpu_handle(0).0, DESCRIPTOR_INCREMENT);
        assert!(a.gpu_handle(0).is_some());
        assert!(invisible.gpu_handle(0).is_none());
    }

    #[test]
    fn released_slots_are_reused_and_never_freed_twice() {
        let device = SoftwareDevice::new();
        let allocator = SoftwareDescriptorAllocator::new(HeapConfig::default());

        let mut first = allocator.allocate(&device, &visible(1)).unwrap();
        first.release();
        first.release();
        assert_eq!(allocator.live_allocations(), 0);
        assert_eq!(allocator.double_frees(), 0);

        let again = allocator.allocate(&device, &visible(1)).unwrap();
        assert_eq!(again.first_index(), 0);
    }

    #[test]
    fn exhausted_heap_fails() {
        let device = SoftwareDevice::new();
        let allocator = SoftwareDescriptorAllocator::new(HeapConfig {
            descriptors_per_heap: 2,
            ..HeapConfig::default()
        });

        let _held = allocator.allocate(&device, &visible(2)).unwrap();
        assert!(matches!(
            allocator.allocate(&device, &visible(1)),
            Err(ResourceError::AllocationFailed(_))
        ));
    }

    #[test]
    fn target_heaps_are_cpu_only() {
        let device = SoftwareDevice::new();
        let allocator = SoftwareDescriptorAllocator::new(HeapConfig::default());
        let desc = DescriptorAllocationDesc {
            count: 1,
            heap: DescriptorHeapKind::Rtv,
            shader_visible: true,
        };
        assert!(matches!(
            allocator.allocate(&device, &desc),
            Err(ResourceError::InvalidDescriptor(_))
        ));
    }
}
