use std::sync::{Arc, Weak};
use gpu_allocator::MemoryLocation;
use crate::renderer::config::FactoryConfig;
use crate::renderer::contexts::device_ctx::command_recorder::CommandRecorder;
use crate::renderer::contexts::device_ctx::device::RenderDevice;
use crate::renderer::contexts::resource_ctx::allocator::{
    BufferAllocation, BufferAllocationDesc, BufferAllocator, DescriptorAllocationDesc,
    DescriptorAllocator, DescriptorHeapKind,
};
use crate::renderer::error::{ResourceError, Result};
use crate::renderer::factories::buffer::buffer_view_range;
use crate::renderer::factories::staging::StagedBuffer;
use crate::renderer::factories::{kind_mismatch, upgrade, upgrade_device, ResourceFactory};
use crate::renderer::resources::descriptor::{ResourceDesc, ResourceDescriptor};
use crate::renderer::resources::record::{Payload, ResourceRecord, ResourceViews};
use crate::renderer::resources::state::{transition, ResourceState};
use crate::renderer::resources::view::{
    ShaderResourceViewDesc, SrvDimension, UavDimension, UnorderedAccessViewDesc,
};
use crate::renderer::resources::ResourceKind;

pub struct RwBufferFactory {
    device: Weak<dyn RenderDevice>,
    buffers: Weak<dyn BufferAllocator>,
    descriptors: Weak<dyn DescriptorAllocator>,
    config: FactoryConfig,
}

impl RwBufferFactory {
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

    fn allocate_counter(
        &self,
        device: &dyn RenderDevice,
        buffers: &dyn BufferAllocator,
        name: &str,
    ) -> Result<BufferAllocation> {
        let counter = buffers
            .allocate_unordered_access(
                device,
                &BufferAllocationDesc {
                    name,
                    size: self.config.counter_size,
                    alignment: self.config.buffer_placement_alignment,
                    location: MemoryLocation::GpuOnly,
                },
            )
            .map_err(|e| {
                ResourceError::invalid(format!("counter resource for '{name}' failed: {e}"))
            })?;

        if counter.resource().is_none() {
            return Err(ResourceError::invalid(format!(
                "counter resource for '{name}' has no backing buffer"
            )));
        }
        Ok(counter)
    }
}

impl ResourceFactory for RwBufferFactory {
    fn kind(&self) -> ResourceKind {
        ResourceKind::RwBuffer
    }

    fn create_resource(
        &self,
        recorder: Option<&mut dyn CommandRecorder>,
        desc: &ResourceDescriptor<'_>,
    ) -> Result<ResourceRecord> {
        let ResourceDesc::RwBuffer {
            num_elements,
            format,
            add_counter,
        } = desc.desc
        else {
            return Err(kind_mismatch(self.kind(), desc));
        };
        let device = upgrade_device(&self.device)?;
        let buffers = upgrade(&self.buffers, "buffer allocator")?;
        let descriptors = upgrade(&self.descriptors, "descriptor allocator")?;
        let recorder = recorder.ok_or(ResourceError::MissingCommandRecorder)?;

        // Raw buffers keep their read/write view out of shader-visible tables, clears only
        let byte_addressable = desc.data_stride <= 1;

        let staged = StagedBuffer::allocate(
            device.as_ref(),
            buffers.as_ref(),
            desc,
            &self.config,
            true,
        )?;
        let counter = if !byte_addressable && add_counter {
            Some(self.allocate_counter(device.as_ref(), buffers.as_ref(), desc.name)?)
        } else {
            None
        };

        let primary = descriptors.allocate(
            device.as_ref(),
            &DescriptorAllocationDesc {
                count: if byte_addressable { 1 } else { 2 },
                heap: DescriptorHeapKind::CbvSrvUav,
                shader_visible: true,
            },
        )?;
        let shader_invisible = if byte_addressable {
            Some(descriptors.allocate(
                device.as_ref(),
                &DescriptorAllocationDesc {
                    count: 1,
                    heap: DescriptorHeapKind::CbvSrvUav,
                    shader_visible: false,
                },
            )?)
        } else {
            None
        };

        let resource = staged.resource();
        let state = staged.record_upload(recorder);
        let state = transition(recorder, resource, state, ResourceState::UnorderedAccess);

        let (view_format, range) =
            buffer_view_range(desc.data_size, desc.data_stride, num_elements, format);
        let srv = ShaderResourceViewDesc {
            format: view_format,
            dimension: SrvDimension::Buffer(range),
        };
        let uav = UnorderedAccessViewDesc {
            format: view_format,
            dimension: UavDimension::Buffer {
                range,
                counter_offset: 0,
            },
        };
        device.create_shader_resource_view(Some(resource), &srv, primary.cpu_handle(0));

        match &shader_invisible {
            Some(invisible) => device.create_unordered_access_view(
                Some(resource),
                None,
                &uav,
                invisible.cpu_handle(0),
            ),
            None => device.create_unordered_access_view(
                Some(resource),
                counter.as_ref().and_then(BufferAllocation::resource),
                &uav,
                primary.cpu_handle(1),
            ),
        }

        let mut record =
            ResourceRecord::new(self.kind(), Payload::Buffer(staged.into_buffer()), state);
        record.views = Some(ResourceViews::ReadWrite { srv, uav });
        record.counter = counter;
        record.slots.primary = Some(primary);
        record.slots.shader_invisible = shader_invisible;
        Ok(record)
    }
}
