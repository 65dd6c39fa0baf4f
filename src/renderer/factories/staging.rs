use gpu_allocator::MemoryLocation;
use crate::renderer::config::FactoryConfig;
use crate::renderer::contexts::device_ctx::command_recorder::{CommandRecorder, TextureCopyLocation};
use crate::renderer::contexts::device_ctx::device::{CopyableFootprints, NativeResource, RenderDevice};
use crate::renderer::contexts::resource_ctx::allocator::{
    BufferAllocation, BufferAllocationDesc, BufferAllocator,
};
use crate::renderer::error::{ResourceError, Result};
use crate::renderer::factories::require_buffer;
use crate::renderer::resources::descriptor::ResourceDescriptor;
use crate::renderer::resources::state::{transition, ResourceState};
use crate::renderer::resources::texture::TextureInfo;

/// A device-local buffer paired with a host-visible staging copy of its payload
pub(crate) struct StagedBuffer {
    pub buffer: BufferAllocation,
    // Temporary allocations are reclaimed by the allocator, this handle only keeps the address.
    _staging: BufferAllocation,
    dst: NativeResource,
    src: NativeResource,
    size: u64,
}

impl StagedBuffer {
    pub fn allocate(
        device: &dyn RenderDevice,
        buffers: &dyn BufferAllocator,
        desc: &ResourceDescriptor<'_>,
        config: &FactoryConfig,
        unordered_access: bool,
    ) -> Result<Self> {
        let size = desc.require_buffer_size()?;
        let payload = desc.payload()?;

        let placement = BufferAllocationDesc {
            name: desc.name,
            size,
            alignment: config.buffer_placement_alignment,
            location: MemoryLocation::GpuOnly,
        };
        let buffer = if unordered_access {
            buffers.allocate_unordered_access(device, &placement)?
        } else {
            buffers.allocate(device, &placement)?
        };
        let dst = require_buffer(&buffer, desc.name)?;

        let mut staging = allocate_staging(device, buffers, desc.name, size, config)?;
        let src = require_buffer(&staging, desc.name)?;
        if let Some(data) = payload {
            staging.write(data, 0)?;
        }

        Ok(Self {
            buffer,
            _staging: staging,
            dst,
            src,
            size,
        })
    }

    pub fn resource(&self) -> NativeResource {
        self.dst
    }

    /// Moves the buffer into the copy destination state and copies the whole staging buffer in
    pub fn record_upload(&self, recorder: &mut dyn CommandRecorder) -> ResourceState {
        let state = transition(
            recorder,
            self.dst,
            ResourceState::Common,
            ResourceState::CopyDest,
        );
        log::trace!("Copy {} bytes {:?} -> {:?}", self.size, self.src, self.dst);
        recorder.copy_buffer_region(self.dst, 0, self.src, 0, self.size);
        state
    }

    pub fn into_buffer(self) -> BufferAllocation {
        self.buffer
    }
}

pub(crate) fn allocate_staging(
    device: &dyn RenderDevice,
    buffers: &dyn BufferAllocator,
    name: &str,
    size: u64,
    config: &FactoryConfig,
) -> Result<BufferAllocation> {
    buffers.allocate_temporary(
        device,
        &BufferAllocationDesc {
            name,
            size,
            alignment: config.buffer_placement_alignment,
            location: MemoryLocation::CpuToGpu,
        },
    )
}

/// Writes every subresource of a tightly packed `data` into `staging` at the device footprints.
///
/// Rows are read at the source pitch and written at the footprint's padded pitch; only the valid
/// bytes of each row are copied.
pub(crate) fn stage_subresources(
    staging: &mut BufferAllocation,
    info: &TextureInfo,
    layout: &CopyableFootprints,
    data: &[u8],
) -> Result<()> {
    let required = info.packed_size();
    if (data.len() as u64) < required {
        return Err(ResourceError::invalid(format!(
            "texture payload holds {} bytes but {} are needed for {} subresources",
            data.len(),
            required,
            info.subresource_count(),
        )));
    }

    let mut src_base = 0u64;
    for (index, footprint) in layout.footprints.iter().enumerate() {
        let (mip, _) = info.subresource_coords(index as u32);
        let source = info.source_layout(mip);
        let row_size = footprint.row_size.min(source.row_pitch) as usize;
        let num_rows = footprint.num_rows.min(source.num_rows);
        let depth = footprint.depth.min(source.depth);

        for z in 0..depth as u64 {
            for y in 0..num_rows as u64 {
                let src = (src_base + z * source.slice_pitch + y * source.row_pitch) as usize;
                let dst = footprint.offset + z * footprint.slice_pitch() + y * footprint.row_pitch;
                staging.write(&data[src..src + row_size], dst as usize)?;
            }
        }

        src_base += source.size();
    }

    Ok(())
}

/// One copy per subresource from its staged placement into the texture
pub(crate) fn record_subresource_copies(
    recorder: &mut dyn CommandRecorder,
    dst: NativeResource,
    src: NativeResource,
    layout: &CopyableFootprints,
) {
    for (index, footprint) in layout.footprints.iter().enumerate() {
        recorder.copy_texture_region(
            TextureCopyLocation::Subresource {
                resource: dst,
                index: index as u32,
            },
            TextureCopyLocation::PlacedFootprint {
                resource: src,
                footprint: *footprint,
            },
        );
    }
    log::trace!("Copied {} subresources into {:?}", layout.footprints.len(), dst);
}
