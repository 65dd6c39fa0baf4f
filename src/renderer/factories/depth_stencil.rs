use std::sync::{Arc, Weak};
use crate::renderer::contexts::device_ctx::command_recorder::CommandRecorder;
use crate::renderer::contexts::device_ctx::device::RenderDevice;
use crate::renderer::contexts::resource_ctx::allocator::{
    DescriptorAllocationDesc, DescriptorAllocator, DescriptorHeapKind, TextureAllocationDesc,
    TextureAllocator,
};
use crate::renderer::error::{ResourceError, Result};
use crate::renderer::factories::{
    kind_mismatch, require_texture, upgrade, upgrade_device, ResourceFactory,
};
use crate::renderer::resources::descriptor::{ResourceDesc, ResourceDescriptor};
use crate::renderer::resources::format::ClearValue;
use crate::renderer::resources::record::{Payload, ResourceRecord, ResourceViews};
use crate::renderer::resources::state::{transition, ResourceState};
use crate::renderer::resources::texture::ResourceFlags;
use crate::renderer::resources::view::{DepthStencilViewDesc, ShaderResourceViewDesc, SrvDimension};
use crate::renderer::resources::ResourceKind;

pub struct DepthStencilFactory {
    device: Weak<dyn RenderDevice>,
    textures: Weak<dyn TextureAllocator>,
    descriptors: Weak<dyn DescriptorAllocator>,
}

impl DepthStencilFactory {
    pub fn new(
        device: &Arc<dyn RenderDevice>,
        textures: &Arc<dyn TextureAllocator>,
        descriptors: &Arc<dyn DescriptorAllocator>,
    ) -> Self {
        Self {
            device: Arc::downgrade(device),
            textures: Arc::downgrade(textures),
            descriptors: Arc::downgrade(descriptors),
        }
    }
}

impl ResourceFactory for DepthStencilFactory {
    fn kind(&self) -> ResourceKind {
        ResourceKind::DepthStencil
    }

    fn create_resource(
        &self,
        recorder: Option<&mut dyn CommandRecorder>,
        desc: &ResourceDescriptor<'_>,
    ) -> Result<ResourceRecord> {
        let ResourceDesc::DepthStencil { info } = &desc.desc else {
            return Err(kind_mismatch(self.kind(), desc));
        };
        info.validate()?;
        if !info.format.is_depth() {
            return Err(ResourceError::invalid(format!(
                "depth-stencil '{}' needs a depth format, got {:?}",
                desc.name, info.format,
            )));
        }
        let device = upgrade_device(&self.device)?;
        let textures = upgrade(&self.textures, "texture allocator")?;
        let descriptors = upgrade(&self.descriptors, "descriptor allocator")?;
        let recorder = recorder.ok_or(ResourceError::MissingCommandRecorder)?;

        let texture = textures.allocate(
            device.as_ref(),
            &TextureAllocationDesc {
                name: desc.name,
                flags: ResourceFlags::ALLOW_DEPTH_STENCIL,
                clear_value: Some(ClearValue::for_format(info.format)),
                info,
            },
        )?;
        let resource = require_texture(&texture, desc.name)?;
        let primary = descriptors.allocate(
            device.as_ref(),
            &DescriptorAllocationDesc {
                count: 1,
                heap: DescriptorHeapKind::CbvSrvUav,
                shader_visible: true,
            },
        )?;
        let target = descriptors.allocate(
            device.as_ref(),
            &DescriptorAllocationDesc {
                count: 1,
                heap: DescriptorHeapKind::Dsv,
                shader_visible: false,
            },
        )?;

        let state = transition(
            recorder,
            resource,
            ResourceState::Common,
            ResourceState::DepthWrite,
        );

        // Depth formats are sampled through their color equivalent
        let srv = ShaderResourceViewDesc {
            format: info.format.shader_resource_format(),
            dimension: SrvDimension::Texture2D {
                most_detailed_mip: 0,
                mip_levels: info.mip_levels,
            },
        };
        let dsv = DepthStencilViewDesc {
            format: info.format,
            mip_slice: 0,
        };
        device.create_shader_resource_view(Some(resource), &srv, primary.cpu_handle(0));
        device.create_depth_stencil_view(resource, &dsv, target.cpu_handle(0));

        let mut record = ResourceRecord::new(self.kind(), Payload::Texture(texture), state);
        record.views = Some(ResourceViews::DepthStencil { srv, dsv });
        record.slots.primary = Some(primary);
        record.slots.target = Some(target);
        record.texture_info = Some(info.clone());
        Ok(record)
    }
}
