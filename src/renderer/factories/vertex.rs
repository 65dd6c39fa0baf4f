use std::sync::{Arc, Weak};
use gpu_allocator::MemoryLocation;
use crate::renderer::config::FactoryConfig;
use crate::renderer::contexts::device_ctx::command_recorder::CommandRecorder;
use crate::renderer::contexts::device_ctx::device::RenderDevice;
use crate::renderer::contexts::resource_ctx::allocator::{
    BufferAllocation, BufferAllocationDesc, BufferAllocator,
};
use crate::renderer::error::{ResourceError, Result};
use crate::renderer::factories::staging::StagedBuffer;
use crate::renderer::factories::{
    kind_mismatch, require_buffer, upgrade, upgrade_device, view_size, ResourceFactory,
};
use crate::renderer::resources::descriptor::{ResourceDesc, ResourceDescriptor};
use crate::renderer::resources::record::{Payload, ResourceRecord, ResourceViews};
use crate::renderer::resources::state::{transition, ResourceState};
use crate::renderer::resources::view::VertexBufferView;
use crate::renderer::resources::ResourceKind;

pub struct VertexFactory {
    device: Weak<dyn RenderDevice>,
    buffers: Weak<dyn BufferAllocator>,
    config: FactoryConfig,
}

impl VertexFactory {
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

impl ResourceFactory for VertexFactory {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Vertex
    }

    fn create_resource(
        &self,
        recorder: Option<&mut dyn CommandRecorder>,
        desc: &ResourceDescriptor<'_>,
    ) -> Result<ResourceRecord> {
        let ResourceDesc::Vertex { is_dynamic } = desc.desc else {
            return Err(kind_mismatch(self.kind(), desc));
        };
        let device = upgrade_device(&self.device)?;
        let buffers = upgrade(&self.buffers, "buffer allocator")?;
        let size = desc.require_buffer_size()?;
        let view_bytes = view_size(size, desc.name)?;

        let view = |buffer_location| {
            ResourceViews::Vertex(VertexBufferView {
                buffer_location,
                size_in_bytes: view_bytes,
                stride_in_bytes: desc.data_stride,
            })
        };

        // Adopted buffers were uploaded by someone else, only the state is ours to set
        if let Some(prepared) = desc.prepared_resource {
            let recorder = recorder.ok_or(ResourceError::MissingCommandRecorder)?;
            let address = device.gpu_address(prepared);
            let state = transition(
                recorder,
                prepared,
                ResourceState::Common,
                ResourceState::VertexAndConstantBuffer,
            );

            let mut record = ResourceRecord::new(
                self.kind(),
                Payload::Buffer(BufferAllocation::adopted(prepared, size, address)),
                state,
            );
            record.views = Some(view(address));
            return Ok(record);
        }

        if is_dynamic {
            let mut buffer = buffers.allocate(
                device.as_ref(),
                &BufferAllocationDesc {
                    name: desc.name,
                    size,
                    alignment: self.config.buffer_placement_alignment,
                    location: MemoryLocation::CpuToGpu,
                },
            )?;
            require_buffer(&buffer, desc.name)?;
            if let Some(data) = desc.payload()? {
                buffer.write(data, 0)?;
            }

            let address = buffer.gpu_address();
            let mut record = ResourceRecord::new(
                self.kind(),
                Payload::Buffer(buffer),
                ResourceState::GenericRead,
            );
            record.views = Some(view(address));
            return Ok(record);
        }

        let recorder = recorder.ok_or(ResourceError::MissingCommandRecorder)?;
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
            ResourceState::VertexAndConstantBuffer,
        );

        let buffer = staged.into_buffer();
        let address = buffer.gpu_address();
        let mut record = ResourceRecord::new(self.kind(), Payload::Buffer(buffer), state);
        record.views = Some(view(address));
        Ok(record)
    }
}
