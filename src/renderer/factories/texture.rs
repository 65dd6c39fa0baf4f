use std::sync::{Arc, Weak};
use crate::renderer::config::FactoryConfig;
use crate::renderer::contexts::device_ctx::command_recorder::CommandRecorder;
use crate::renderer::contexts::device_ctx::device::RenderDevice;
use crate::renderer::contexts::resource_ctx::allocator::{
    BufferAllocator, DescriptorAllocationDesc, DescriptorAllocator, DescriptorHeapKind,
    TextureAllocation, TextureAllocationDesc, TextureAllocator,
};
use crate::renderer::error::{ResourceError, Result};
use crate::renderer::factories::staging::{
    allocate_staging, record_subresource_copies, stage_subresources,
};
use crate::renderer::factories::{
    kind_mismatch, require_buffer, require_texture, upgrade, upgrade_device, ResourceFactory,
};
use crate::renderer::resources::descriptor::{ResourceDesc, ResourceDescriptor};
use crate::renderer::resources::format::{ClearValue, Format};
use crate::renderer::resources::record::{Payload, ResourceRecord, ResourceViews};
use crate::renderer::resources::state::{transition, ResourceState};
use crate::renderer::resources::texture::{TextureInfo, ViewDimension};
use crate::renderer::resources::view::{ShaderResourceViewDesc, SrvDimension};
use crate::renderer::resources::ResourceKind;

pub struct TextureFactory {
    device: Weak<dyn RenderDevice>,
    buffers: Weak<dyn BufferAllocator>,
    textures: Weak<dyn TextureAllocator>,
    descriptors: Weak<dyn DescriptorAllocator>,
    config: FactoryConfig,
}

impl TextureFactory {
    pub fn new(
        device: &Arc<dyn RenderDevice>,
        buffers: &Arc<dyn BufferAllocator>,
        textures: &Arc<dyn TextureAllocator>,
        descriptors: &Arc<dyn DescriptorAllocator>,
        config: FactoryConfig,
    ) -> Self {
        Self {
            device: Arc::downgrade(device),
            buffers: Arc::downgrade(buffers),
            textures: Arc::downgrade(textures),
            descriptors: Arc::downgrade(descriptors),
            config,
        }
    }
}

/// Read-only view over every mip and array slice of a texture
pub fn texture_srv_desc(info: &TextureInfo, format: Format) -> ShaderResourceViewDesc {
    let mip_levels = info.mip_levels;
    let array_size = info.array_size();
    let dimension = match info.dimension {
        ViewDimension::Texture1D => SrvDimension::Texture1D {
            most_detailed_mip: 0,
            mip_levels,
        },
        ViewDimension::Texture1DArray => SrvDimension::Texture1DArray {
            most_detailed_mip: 0,
            mip_levels,
            first_array_slice: 0,
            array_size,
        },
        ViewDimension::Texture2D => SrvDimension::Texture2D {
            most_detailed_mip: 0,
            mip_levels,
        },
        ViewDimension::Texture2DArray => SrvDimension::Texture2DArray {
            most_detailed_mip: 0,
            mip_levels,
            first_array_slice: 0,
            array_size,
        },
        ViewDimension::TextureCube => SrvDimension::TextureCube {
            most_detailed_mip: 0,
            mip_levels,
        },
        ViewDimension::TextureCubeArray => SrvDimension::TextureCubeArray {
            most_detailed_mip: 0,
            mip_levels,
            first_2d_array_face: 0,
            num_cubes: array_size / 6,
        },
        ViewDimension::Texture3D => SrvDimension::Texture3D {
            most_detailed_mip: 0,
            mip_levels,
        },
    };

    ShaderResourceViewDesc { format, dimension }
}

impl ResourceFactory for TextureFactory {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Texture
    }

    fn create_resource(
        &self,
        recorder: Option<&mut dyn CommandRecorder>,
        desc: &ResourceDescriptor<'_>,
    ) -> Result<ResourceRecord> {
        let ResourceDesc::Texture { flags, info } = &desc.desc else {
            return Err(kind_mismatch(self.kind(), desc));
        };
        info.validate()?;
        let device = upgrade_device(&self.device)?;
        let descriptors = upgrade(&self.descriptors, "descriptor allocator")?;
        let srv = texture_srv_desc(info, info.format.shader_resource_format());
        let slot_desc = DescriptorAllocationDesc {
            count: 1,
            heap: DescriptorHeapKind::CbvSrvUav,
            shader_visible: true,
        };

        // An adopted texture is already resident and readable
        if let Some(prepared) = desc.prepared_resource {
            let slot = descriptors.allocate(device.as_ref(), &slot_desc)?;
            device.create_shader_resource_view(Some(prepared), &srv, slot.cpu_handle(0));

            let mut record = ResourceRecord::new(
                self.kind(),
                Payload::Texture(TextureAllocation::adopted(prepared)),
                ResourceState::Common,
            );
            record.views = Some(ResourceViews::ShaderResource(srv));
            record.slots.primary = Some(slot);
            record.texture_info = Some(info.clone());
            return Ok(record);
        }

        let buffers = upgrade(&self.buffers, "buffer allocator")?;
        let textures = upgrade(&self.textures, "texture allocator")?;
        let payload = desc.payload()?;
        let mut recorder = match payload {
            Some(_) => Some(recorder.ok_or(ResourceError::MissingCommandRecorder)?),
            None => None,
        };

        let texture = textures.allocate(
            device.as_ref(),
            &TextureAllocationDesc {
                name: desc.name,
                flags: *flags,
                clear_value: Some(ClearValue::for_format(info.format)),
                info,
            },
        )?;
        let resource = require_texture(&texture, desc.name)?;

        let upload = match payload {
            Some(data) => {
                let layout = device.copyable_footprints(info, 0, info.subresource_count(), 0);
                let mut staging = allocate_staging(
                    device.as_ref(),
                    buffers.as_ref(),
                    desc.name,
                    layout.total_bytes,
                    &self.config,
                )?;
                let src = require_buffer(&staging, desc.name)?;
                stage_subresources(&mut staging, info, &layout, data)?;
                Some((src, layout))
            }
            None => None,
        };
        let slot = descriptors.allocate(device.as_ref(), &slot_desc)?;

        let mut state = ResourceState::Common;
        if let (Some(recorder), Some((src, layout))) = (recorder.as_deref_mut(), &upload) {
            state = transition(recorder, resource, state, ResourceState::CopyDest);
            record_subresource_copies(recorder, resource, *src, layout);
            state = transition(recorder, resource, state, ResourceState::Common);
        }

        device.create_shader_resource_view(Some(resource), &srv, slot.cpu_handle(0));

        let mut record = ResourceRecord::new(self.kind(), Payload::Texture(texture), state);
        record.views = Some(ResourceViews::ShaderResource(srv));
        record.slots.primary = Some(slot);
        record.texture_info = Some(info.clone());
        Ok(record)
    }
}
