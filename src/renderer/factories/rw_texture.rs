use std::sync::{Arc, Weak};
use crate::renderer::contexts::device_ctx::command_recorder::CommandRecorder;
use crate::renderer::contexts::device_ctx::device::RenderDevice;
use crate::renderer::contexts::resource_ctx::allocator::{
    DescriptorAllocationDesc, DescriptorAllocator, DescriptorHeapKind, TextureAllocationDesc,
    TextureAllocator,
};
use crate::renderer::error::{ResourceError, Result};
use crate::renderer::factories::texture::texture_srv_desc;
use crate::renderer::factories::{
    kind_mismatch, require_texture, upgrade, upgrade_device, ResourceFactory,
};
use crate::renderer::resources::descriptor::{ResourceDesc, ResourceDescriptor};
use crate::renderer::resources::format::{ClearValue, Format};
use crate::renderer::resources::record::{Payload, ResourceRecord, ResourceViews};
use crate::renderer::resources::state::{transition, ResourceState};
use crate::renderer::resources::texture::{ResourceFlags, TextureInfo, ViewDimension};
use crate::renderer::resources::view::{UavDimension, UnorderedAccessViewDesc};
use crate::renderer::resources::ResourceKind;

pub struct RwTextureFactory {
    device: Weak<dyn RenderDevice>,
    textures: Weak<dyn TextureAllocator>,
    descriptors: Weak<dyn DescriptorAllocator>,
}

impl RwTextureFactory {
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

/// Read/write view of the most detailed mip across every slice
pub fn texture_uav_desc(info: &TextureInfo, format: Format) -> Result<UnorderedAccessViewDesc> {
    let dimension = match info.dimension {
        ViewDimension::Texture1D => UavDimension::Texture1D { mip_slice: 0 },
        ViewDimension::Texture1DArray => UavDimension::Texture1DArray {
            mip_slice: 0,
            first_array_slice: 0,
            array_size: info.array_size(),
        },
        ViewDimension::Texture2D => UavDimension::Texture2D {
            mip_slice: 0,
            plane_slice: 0,
        },
        ViewDimension::Texture2DArray => UavDimension::Texture2DArray {
            mip_slice: 0,
            first_array_slice: 0,
            array_size: info.array_size(),
            plane_slice: 0,
        },
        ViewDimension::Texture3D => UavDimension::Texture3D {
            mip_slice: 0,
            first_w_slice: 0,
            w_size: info.depth(),
        },
        cube @ (ViewDimension::TextureCube | ViewDimension::TextureCubeArray) => {
            return Err(ResourceError::invalid(format!(
                "{cube:?} textures have no read/write view"
            )));
        }
    };

    Ok(UnorderedAccessViewDesc { format, dimension })
}

impl ResourceFactory for RwTextureFactory {
    fn kind(&self) -> ResourceKind {
        ResourceKind::RwTexture
    }

    fn create_resource(
        &self,
        recorder: Option<&mut dyn CommandRecorder>,
        desc: &ResourceDescriptor<'_>,
    ) -> Result<ResourceRecord> {
        let ResourceDesc::RwTexture { info } = &desc.desc else {
            return Err(kind_mismatch(self.kind(), desc));
        };
        info.validate()?;
        let uav = texture_uav_desc(info, info.format)?;
        let srv = texture_srv_desc(info, info.format);

        let device = upgrade_device(&self.device)?;
        let textures = upgrade(&self.textures, "texture allocator")?;
        let descriptors = upgrade(&self.descriptors, "descriptor allocator")?;
        let recorder = recorder.ok_or(ResourceError::MissingCommandRecorder)?;

        let texture = textures.allocate(
            device.as_ref(),
            &TextureAllocationDesc {
                name: desc.name,
                flags: ResourceFlags::ALLOW_UNORDERED_ACCESS,
                clear_value: Some(ClearValue::for_format(info.format)),
                info,
            },
        )?;
        let resource = require_texture(&texture, desc.name)?;
        let primary = descriptors.allocate(
            device.as_ref(),
            &DescriptorAllocationDesc {
                count: 2,
                heap: DescriptorHeapKind::CbvSrvUav,
                shader_visible: true,
            },
        )?;
        let shader_invisible = descriptors.allocate(
            device.as_ref(),
            &DescriptorAllocationDesc {
                count: 1,
                heap: DescriptorHeapKind::CbvSrvUav,
                shader_visible: false,
            },
        )?;

        let state = transition(
            recorder,
            resource,
            ResourceState::Common,
            ResourceState::UnorderedAccess,
        );

        device.create_shader_resource_view(Some(resource), &srv, primary.cpu_handle(0));
        device.create_unordered_access_view(Some(resource), None, &uav, primary.cpu_handle(1));
        device.create_unordered_access_view(
            Some(resource),
            None,
            &uav,
            shader_invisible.cpu_handle(0),
        );

        let mut record = ResourceRecord::new(self.kind(), Payload::Texture(texture), state);
        record.views = Some(ResourceViews::ReadWrite { srv, uav });
        record.slots.primary = Some(primary);
        record.slots.shader_invisible = Some(shader_invisible);
        record.texture_info = Some(info.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_view_covers_every_slice() {
        let volume = TextureInfo::new_2d(Format::R32Float, 32, 32, 1)
            .with_dimension(ViewDimension::Texture3D, 8);
        let uav = texture_uav_desc(&volume, volume.format).unwrap();
        assert_eq!(
            uav.dimension,
            UavDimension::Texture3D {
                mip_slice: 0,
                first_w_slice: 0,
                w_size: 8,
            }
        );
    }

    #[test]
    fn cube_textures_are_rejected() {
        let cube = TextureInfo::new_2d(Format::R8G8B8A8Unorm, 16, 16, 1)
            .with_dimension(ViewDimension::TextureCube, 6);
        assert!(matches!(
            texture_uav_desc(&cube, cube.format),
            Err(ResourceError::InvalidDescriptor(_))
        ));
    }
}
