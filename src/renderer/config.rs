const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;

/// Alignment and sizing rules the factories apply to every resource they build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactoryConfig {
    /// Placement alignment for buffers in device-local heaps
    pub buffer_placement_alignment: u64,
    /// Constant buffer views must cover a multiple of this many bytes
    pub constant_buffer_alignment: u64,
    /// Size of the counter resource attached to structured read/write buffers
    pub counter_size: u64,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            buffer_placement_alignment: 64 * KIB,
            constant_buffer_alignment: 256,
            counter_size: 4,
        }
    }
}

/// Capacities of the heaps owned by the software allocators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
    pub default_heap_size: u64,
    pub upload_heap_size: u64,
    pub descriptors_per_heap: u32,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            default_heap_size: 256 * MIB,
            upload_heap_size: 64 * MIB,
            descriptors_per_heap: 4096,
        }
    }
}

pub(crate) fn align_up(value: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        return value;
    }
    value.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_rounds_to_the_next_multiple() {
        assert_eq!(align_up(0, 256), 0);
        assert_eq!(align_up(1, 256), 256);
        assert_eq!(align_up(256, 256), 256);
        assert_eq!(align_up(257, 256), 512);
        assert_eq!(align_up(13, 1), 13);
    }
}
