use std::sync::{Arc, Weak};
use crate::renderer::config::FactoryConfig;
use crate::renderer::contexts::device_ctx::command_recorder::CommandRecorder;
use crate::renderer::contexts::device_ctx::device::RenderDevice;
use crate::renderer::contexts::resource_ctx::allocator::{BufferAllocation, BufferAllocator};
use crate::renderer::error::{ResourceError, Result};
use crate::renderer::factories::staging::StagedBuffer;
use crate::renderer::factories::{kind_mismatch, upgrade, upgrade_device, view_size, ResourceFactory};
use crate::renderer::resources::descriptor::{ResourceDesc, ResourceDescriptor};
use crate::renderer::resources::format::Format;
use crate::renderer::resources::record::{Payload, ResourceRecord, ResourceViews};
use crate::renderer::resources::state::{transition, ResourceState};
use crate::renderer::resources::view::IndexBufferView;
use crate::renderer::resources::ResourceKind;

pub struct IndexFactory {
    device: Weak<dyn RenderDevice>,
    buffers: Weak<dyn BufferAllocator>,
    config: FactoryConfig,
}

impl IndexFactory {
    pub fn new(
        device: &Arc<dyn RenderDevice>,
        buffers: &Arc<dyn BufferAllocator>,
        config: FactoryConfig,
    ) -> Self {
        Self {
            device: Arc::downgrade(device),
            buffers: Arc::downgrade(buffers),
            config,
        }
    }
}

/// Index element format for a stride in bytes
pub fn index_format(stride: u32) -> Result<Format> {
    match stride {
        2 => Ok(Format::R16Uint),
        4 => Ok(Format::R32Uint),
        other => Err(ResourceError::invalid(format!(
            "index stride must be 2 or 4 bytes, got {other}"
        ))),
    }
}

impl ResourceFactory for IndexFactory {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Index
    }

    fn create_resource(
        &self,
        recorder: Option<&mut dyn CommandRecorder>,
        desc: &ResourceDescriptor<'_>,
    ) -> Result<ResourceRecord> {
        if desc.desc != ResourceDesc::Index {
            return Err(kind_mismatch(self.kind(), desc));
        }
        let device = upgrade_device(&self.device)?;
        let buffers = upgrade(&self.buffers, "buffer allocator")?;
        let recorder = recorder.ok_or(ResourceError::MissingCommandRecorder)?;

        let format = index_format(desc.data_stride)?;
        let size = desc.require_buffer_size()?;
        let size_in_bytes = view_size(size, desc.name)?;
        let indices_count = size_in_bytes / desc.data_stride;

        let (buffer, state) = match desc.prepared_resource {
            Some(prepared) => {
                let address = device.gpu_address(prepared);
                let state = transition(
                    recorder,
                    prepared,
                    ResourceState::Common,
                    ResourceState::IndexBuffer,
                );
                (BufferAllocation::adopted(prepared, size, address), state)
            }
            None => {
                let staged = StagedBuffer::allocate(
                    device.as_ref(),
                    buffers.as_ref(),
                    desc,
                    &self.config,
                    false,
                )?;
                let state = staged.record_upload(recorder);
                let state = transition(
                    recorder,
                    staged.resource(),
                    state,
                    ResourceState::IndexBuffer,
                );
                (staged.into_buffer(), state)
            }
        };

        let view = IndexBufferView {
            buffer_location: buffer.gpu_address(),
            size_in_bytes,
            format,
        };
        let mut record = ResourceRecord::new(self.kind(), Payload::Buffer(buffer), state);
        record.views = Some(ResourceViews::Index(view));
        record.indices_count = Some(indices_count);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_format_follows_stride() {
        assert_eq!(index_format(2), Ok(Format::R16Uint));
        assert_eq!(index_format(4), Ok(Format::R32Uint));
        assert!(matches!(index_format(0), Err(ResourceError::InvalidDescriptor(_))));
        assert!(matches!(index_format(3), Err(ResourceError::InvalidDescriptor(_))));
    }
}
