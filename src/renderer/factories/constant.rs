use std::sync::{Arc, Weak};
use crate::renderer::config::{align_up, FactoryConfig};
use crate::renderer::contexts::device_ctx::command_recorder::CommandRecorder;
use crate::renderer::contexts::device_ctx::device::RenderDevice;
use crate::renderer::contexts::resource_ctx::allocator::{
    BufferAllocator, DescriptorAllocationDesc, DescriptorAllocator, DescriptorHeapKind,
};
use crate::renderer::error::{ResourceError, Result};
use crate::renderer::factories::staging::StagedBuffer;
use crate::renderer::factories::{kind_mismatch, upgrade, upgrade_device, view_size, ResourceFactory};
use crate::renderer::resources::descriptor::{ResourceDesc, ResourceDescriptor};
use crate::renderer::resources::record::{Payload, ResourceRecord, ResourceViews};
use crate::renderer::resources::state::{transition, ResourceState};
use crate::renderer::resources::view::ConstantBufferViewDesc;
use crate::renderer::resources::ResourceKind;

pub struct ConstantFactory {
    device: Weak<dyn RenderDevice>,
    buffers: Weak<dyn BufferAllocator>,
    descriptors: Weak<dyn DescriptorAllocator>,
    config: FactoryConfig,
}

impl ConstantFactory {
    pub fn new(
        device: &Arc<dyn RenderDevice>,
        buffers: &Arc<dyn BufferAllocator>,
        descriptors: &Arc<dyn DescriptorAllocator>,
        config: FactoryConfig,
    ) -> Self {
        Self {
            device: Arc::downgrade(device),
            buffers: Arc::downgrade(buffers),
            descriptors: Arc::downgrade(descriptors),
            config,
        }
    }
}

impl ResourceFactory for ConstantFactory {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Constant
    }

    fn create_resource(
        &self,
        recorder: Option<&mut dyn CommandRecorder>,
        desc: &ResourceDescriptor<'_>,
    ) -> Result<ResourceRecord> {
        if desc.desc != ResourceDesc::Constant {
            return Err(kind_mismatch(self.kind(), desc));
        }
        let device = upgrade_device(&self.device)?;
        let buffers = upgrade(&self.buffers, "buffer allocator")?;
        let descriptors = upgrade(&self.descriptors, "descriptor allocator")?;
        let recorder = recorder.ok_or(ResourceError::MissingCommandRecorder)?;

        let size = desc.require_buffer_size()?;
        // The view always covers whole constant-buffer blocks
        let view_bytes = view_size(
            align_up(size, self.config.constant_buffer_alignment),
            desc.name,
        )?;

        let staged = StagedBuffer::allocate(
            device.as_ref(),
            buffers.as_ref(),
            desc,
            &self.config,
            false,
        )?;
        let slot = descriptors.allocate(
            device.as_ref(),
            &DescriptorAllocationDesc {
                count: 1,
                heap: DescriptorHeapKind::CbvSrvUav,
                shader_visible: true,
            },
        )?;

        let state = staged.record_upload(recorder);
        let state = transition(
            recorder,
            staged.resource(),
            state,
            ResourceState::GenericRead,
        );

        let buffer = staged.into_buffer();
        let view = ConstantBufferViewDesc {
            buffer_location: buffer.gpu_address(),
            size_in_bytes: view_bytes,
        };
        device.create_constant_buffer_view(&view, slot.cpu_handle(0));

        let mut record = ResourceRecord::new(self.kind(), Payload::Buffer(buffer), state);
        record.views = Some(ResourceViews::Constant(view));
        record.slots.primary = Some(slot);
        Ok(record)
    }
}
