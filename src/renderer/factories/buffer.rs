use std::sync::{Arc, Weak};
use crate::renderer::config::FactoryConfig;
use crate::renderer::contexts::device_ctx::command_recorder::CommandRecorder;
use crate::renderer::contexts::device_ctx::device::RenderDevice;
use crate::renderer::contexts::resource_ctx::allocator::{
    BufferAllocator, DescriptorAllocationDesc, DescriptorAllocator, DescriptorHeapKind,
};
use crate::renderer::error::{ResourceError, Result};
use crate::renderer::factories::staging::StagedBuffer;
use crate::renderer::factories::{kind_mismatch, upgrade, upgrade_device, ResourceFactory};
use crate::renderer::resources::descriptor::{ResourceDesc, ResourceDescriptor};
use crate::renderer::resources::format::Format;
use crate::renderer::resources::record::{Payload, ResourceRecord, ResourceViews};
use crate::renderer::resources::view::{
    BufferViewKind, BufferViewRange, ShaderResourceViewDesc, SrvDimension,
};
use crate::renderer::resources::ResourceKind;

pub struct BufferFactory {
    device: Weak<dyn RenderDevice>,
    buffers: Weak<dyn BufferAllocator>,
    descriptors: Weak<dyn DescriptorAllocator>,
    config: FactoryConfig,
}

impl BufferFactory {
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

/// View format and element range of a buffer.
///
/// A stride of 1 is byte-addressable and counted in 32-bit words, a stride of 0 is typed by
/// `format`, anything else is structured.
pub fn buffer_view_range(
    size: u64,
    stride: u32,
    num_elements: u32,
    format: Format,
) -> (Format, BufferViewRange) {
    match stride {
        0 => (
            format,
            BufferViewRange {
                first_element: 0,
                num_elements,
                kind: BufferViewKind::Typed,
            },
        ),
        1 => (
            Format::R32Typeless,
            BufferViewRange {
                first_element: 0,
                num_elements: (size / 4) as u32,
                kind: BufferViewKind::Raw,
            },
        ),
        structure_byte_stride => (
            Format::Unknown,
            BufferViewRange {
                first_element: 0,
                num_elements,
                kind: BufferViewKind::Structured {
                    structure_byte_stride,
                },
            },
        ),
    }
}

impl ResourceFactory for BufferFactory {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Buffer
    }

    fn create_resource(
        &self,
        recorder: Option<&mut dyn CommandRecorder>,
        desc: &ResourceDescriptor<'_>,
    ) -> Result<ResourceRecord> {
        let ResourceDesc::Buffer { num_elements, format } = desc.desc else {
            return Err(kind_mismatch(self.kind(), desc));
        };
        let device = upgrade_device(&self.device)?;
        let buffers = upgrade(&self.buffers, "buffer allocator")?;
        let descriptors = upgrade(&self.descriptors, "descriptor allocator")?;
        let recorder = recorder.ok_or(ResourceError::MissingCommandRecorder)?;

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

        // Left in the copy destination state, the caller transitions before first use
        let state = staged.record_upload(recorder);

        let (view_format, range) =
            buffer_view_range(desc.data_size, desc.data_stride, num_elements, format);
        let srv = ShaderResourceViewDesc {
            format: view_format,
            dimension: SrvDimension::Buffer(range),
        };
        device.create_shader_resource_view(Some(staged.resource()), &srv, slot.cpu_handle(0));

        let mut record =
            ResourceRecord::new(self.kind(), Payload::Buffer(staged.into_buffer()), state);
        record.views = Some(ResourceViews::ShaderResource(srv));
        record.slots.primary = Some(slot);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_selects_view_kind() {
        let (format, raw) = buffer_view_range(64, 1, 3, Format::R32Float);
        assert_eq!(format, Format::R32Typeless);
        assert_eq!(raw.kind, BufferViewKind::Raw);
        assert_eq!(raw.num_elements, 16);

        let (format, typed) = buffer_view_range(64, 0, 16, Format::R32Float);
        assert_eq!(format, Format::R32Float);
        assert_eq!(typed.kind, BufferViewKind::Typed);

        let (format, structured) = buffer_view_range(64, 16, 4, Format::R32Float);
        assert_eq!(format, Format::Unknown);
        assert_eq!(
            structured.kind,
            BufferViewKind::Structured {
                structure_byte_stride: 16
            }
        );
        assert_eq!(structured.num_elements, 4);
    }
}
