use crate::renderer::config::align_up;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapRegion {
    pub offset: u64,
    pub size: u64,
}

impl HeapRegion {
    fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// First-fit placement of regions inside a fixed-size heap.
///
/// Free regions are kept sorted by offset and merged with their neighbours on deallocation.
#[derive(Debug)]
pub struct HeapRegions {
    capacity: u64,
    free_regions: Vec<HeapRegion>,
}

impl HeapRegions {
    pub fn new(capacity: u64) -> Self {
        let free_regions = if capacity > 0 {
            vec![HeapRegion {
                offset: 0,
                size: capacity,
            }]
        } else {
            Vec::new()
        };

        Self {
            capacity,
            free_regions,
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn free_bytes(&self) -> u64 {
        self.free_regions.iter().map(|region| region.size).sum()
    }

    pub fn free_region_count(&self) -> usize {
        self.free_regions.len()
    }

    /// Places `size` bytes at an `alignment`-aligned offset.
    ///
    /// The size is rounded up to the alignment. Padding skipped in front of the placement stays
    /// free.
    pub fn allocate(&mut self, size: u64, alignment: u64) -> Option<HeapRegion> {
        let aligned_size = align_up(size.max(1), alignment);

        // Find the first free region that can fit the allocation
        let (index, offset) = self.free_regions.iter().enumerate().find_map(|(i, region)| {
            let offset = align_up(region.offset, alignment);
            let padding = offset - region.offset;
            (region.size >= padding + aligned_size).then_some((i, offset))
        })?;

        // Split the free region into the leading padding, the allocation and the remainder
        let free_region = self.free_regions.remove(index);
        let remainder = HeapRegion {
            offset: offset + aligned_size,
            size: free_region.end() - (offset + aligned_size),
        };
        if remainder.size > 0 {
            self.free_regions.insert(index, remainder);
        }
        if offset > free_region.offset {
            self.free_regions.insert(
                index,
                HeapRegion {
                    offset: free_region.offset,
                    size: offset - free_region.offset,
                },
            );
        }

        Some(HeapRegion {
            offset,
            size: aligned_size,
        })
    }

    pub fn deallocate(&mut self, region: HeapRegion) {
        let mut left_index = None; // Some if there is a free region to the left of the deallocated region
        let mut right_index = None; // Some if there is a free region to the right of the deallocated region

        for (i, free_region) in self.free_regions.iter().enumerate() {
            if free_region.end() == region.offset {
                left_index = Some(i);
            } else if region.end() == free_region.offset {
                right_index = Some(i);
            }
        }

        match (left_index, right_index) {
            (Some(left), Some(right)) => {
                self.free_regions[left].size += region.size + self.free_regions[right].size;
                self.free_regions.remove(right);
            }
            (Some(left), None) => {
                self.free_regions[left].size += region.size;
            }
            (None, Some(right)) => {
                self.free_regions[right].offset = region.offset;
                self.free_regions[right].size += region.size;
            }
            (None, None) => {
                self.free_regions.push(region);
                self.free_regions.sort_by_key(|r| r.offset);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocations_are_aligned_first_fit() {
        let mut heap = HeapRegions::new(1024);

        let a = heap.allocate(10, 256).unwrap();
        let b = heap.allocate(300, 256).unwrap();
        assert_eq!(a, HeapRegion { offset: 0, size: 256 });
        assert_eq!(b, HeapRegion { offset: 256, size: 512 });
        assert_eq!(heap.free_bytes(), 256);
        assert!(heap.allocate(257, 256).is_none());
    }

    #[test]
    fn padding_in_front_of_a_placement_stays_free() {
        let mut heap = HeapRegions::new(4096);

        heap.allocate(100, 1).unwrap();
        let aligned = heap.allocate(64, 1024).unwrap();
        assert_eq!(aligned.offset, 1024);
        assert_eq!(heap.free_bytes(), 4096 - 100 - 1024);

        // The gap between the two placements is reused
        let small = heap.allocate(200, 1).unwrap();
        assert_eq!(small.offset, 100);
    }

    #[test]
    fn deallocation_merges_both_neighbours() {
        let mut heap = HeapRegions::new(768);
        let a = heap.allocate(256, 256).unwrap();
        let b = heap.allocate(256, 256).unwrap();
        let c = heap.allocate(256, 256).unwrap();
        assert_eq!(heap.free_region_count(), 0);

        heap.deallocate(a);
        heap.deallocate(c);
        assert_eq!(heap.free_region_count(), 2);

        heap.deallocate(b);
        assert_eq!(heap.free_region_count(), 1);
        assert_eq!(heap.free_bytes(), heap.capacity());
        assert_eq!(heap.allocate(768, 256), Some(HeapRegion { offset: 0, size: 768 }));
    }

    #[test]
    fn empty_heap_places_nothing() {
        let mut heap = HeapRegions::new(0);
        assert!(heap.allocate(1, 1).is_none());
    }
}
