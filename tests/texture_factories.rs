mod common;

use std::sync::Arc;
use resource_forge::renderer::contexts::device_ctx::{NativeTextureDesc, TransitionBarrier};
use resource_forge::renderer::contexts::resource_ctx::allocator::DescriptorHeapKind;
use resource_forge::renderer::internals::{Command, CreatedView};
use resource_forge::renderer::resources::record::ResourceViews;
use resource_forge::renderer::resources::view::{
    DepthStencilViewDesc, RenderTargetViewDesc, SrvDimension, UavDimension,
};
use resource_forge::{
    Format, RenderDevice, ResourceDescriptor, ResourceError, ResourceFlags, ResourceKind,
    ResourceState, TextureInfo, ViewDimension,
};
use common::Harness;

fn pattern(len: u64) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 253) as u8).collect()
}

#[test]
fn mip_chain_is_copied_one_subresource_at_a_time() {
    let mut harness = Harness::new();
    // Odd width keeps the rows shorter than the device row pitch
    let info = Arc::new(TextureInfo::new_2d(Format::R8G8B8A8Unorm, 5, 3, 3));
    assert_eq!(info.packed_size(), 60 + 8 + 4);
    let texels = pattern(info.packed_size());

    let record = harness
        .create(
            &ResourceDescriptor::texture(Some(texels.as_slice()), info.clone(), ResourceFlags::empty())
                .named("albedo"),
        )
        .unwrap();

    let resource = record.native().unwrap();
    assert_eq!(record.current_state(), ResourceState::Common);
    assert_eq!(record.texture_info(), Some(&info));
    assert_eq!(harness.list.copy_count(), 3);

    let barriers = harness.list.barriers().copied().collect::<Vec<_>>();
    assert_eq!(
        barriers,
        [
            TransitionBarrier {
                resource,
                before: ResourceState::Common,
                after: ResourceState::CopyDest,
            },
            TransitionBarrier {
                resource,
                before: ResourceState::CopyDest,
                after: ResourceState::Common,
            },
        ]
    );
    assert!(matches!(harness.list.commands().first(), Some(Command::Barrier(_))));
    assert!(matches!(harness.list.commands().last(), Some(Command::Barrier(_))));

    harness.submit();
    let device = &harness.backend.device;
    assert_eq!(device.read_subresource(resource, 0).unwrap(), &texels[..60]);
    assert_eq!(device.read_subresource(resource, 1).unwrap(), &texels[60..68]);
    assert_eq!(device.read_subresource(resource, 2).unwrap(), &texels[68..72]);
    assert_eq!(harness.device_state(&record), Some(ResourceState::Common));
}

#[test]
fn array_slices_follow_subresource_order() {
    let mut harness = Harness::new();
    let info = Arc::new(
        TextureInfo::new_2d(Format::R8Unorm, 4, 4, 1).with_dimension(ViewDimension::Texture2DArray, 3),
    );
    let texels = pattern(info.packed_size());

    let record = harness
        .create(&ResourceDescriptor::texture(Some(texels.as_slice()), info.clone(), ResourceFlags::empty()))
        .unwrap();
    assert_eq!(harness.list.copy_count(), 3);
    assert!(matches!(
        record.views(),
        Some(ResourceViews::ShaderResource(srv)) if srv.dimension
            == SrvDimension::Texture2DArray {
                most_detailed_mip: 0,
                mip_levels: 1,
                first_array_slice: 0,
                array_size: 3,
            }
    ));

    harness.submit();
    let resource = record.native().unwrap();
    for slice in 0..3u32 {
        let index = info.subresource_index(0, slice) as usize;
        assert_eq!(
            harness.backend.device.read_subresource(resource, index as u32).unwrap(),
            &texels[index * 16..(index + 1) * 16]
        );
    }
}

#[test]
fn volume_texture_uploads_every_depth_slice() {
    let mut harness = Harness::new();
    let info = Arc::new(
        TextureInfo::new_2d(Format::R32Float, 4, 4, 1).with_dimension(ViewDimension::Texture3D, 2),
    );
    let texels = pattern(info.packed_size());
    assert_eq!(texels.len(), 128);

    let record = harness
        .create(&ResourceDescriptor::texture(Some(texels.as_slice()), info, ResourceFlags::empty()))
        .unwrap();
    assert_eq!(harness.list.copy_count(), 1);

    harness.submit();
    assert_eq!(
        harness.backend.device.read_subresource(record.native().unwrap(), 0).unwrap(),
        texels
    );
}

#[test]
fn short_payload_releases_the_texture() {
    let mut harness = Harness::new();
    let info = Arc::new(TextureInfo::new_2d(Format::R8G8B8A8Unorm, 8, 8, 1));
    let texels = pattern(info.packed_size() - 1);

    let result = harness.create(&ResourceDescriptor::texture(
        Some(texels.as_slice()),
        info,
        ResourceFlags::empty(),
    ));

    assert!(matches!(result, Err(ResourceError::InvalidDescriptor(_))));
    assert_eq!(harness.backend.textures.allocation_calls(), 1);
    assert_eq!(harness.backend.textures.live_allocations(), 0);
    assert_eq!(harness.backend.descriptors.live_allocations(), 0);
    assert!(harness.list.commands().is_empty());
}

#[test]
fn texture_without_data_skips_the_upload() {
    let harness = Harness::new();
    let info = Arc::new(TextureInfo::new_2d(Format::R16G16B16A16Float, 16, 16, 5));
    let desc = ResourceDescriptor::texture(None, info, ResourceFlags::empty());

    let record = harness
        .resources
        .create_resource(None, ResourceKind::Texture, &desc)
        .unwrap();

    assert_eq!(record.current_state(), ResourceState::Common);
    assert_eq!(harness.backend.buffers.allocation_calls(), 0);
    assert_eq!(harness.backend.textures.live_allocations(), 1);
}

#[test]
fn texture_upload_needs_a_recorder() {
    let harness = Harness::new();
    let info = Arc::new(TextureInfo::new_2d(Format::R8Unorm, 4, 4, 1));
    let texels = pattern(16);
    let desc = ResourceDescriptor::texture(Some(texels.as_slice()), info, ResourceFlags::empty());

    let result = harness.resources.create_resource(None, ResourceKind::Texture, &desc);
    assert_eq!(result.err(), Some(ResourceError::MissingCommandRecorder));
    assert_eq!(harness.backend.textures.allocation_calls(), 0);
}

#[test]
fn prepared_texture_only_gets_a_view() {
    let harness = Harness::new();
    let info = Arc::new(TextureInfo::new_2d(Format::D32Float, 64, 64, 1));
    let external = harness
        .backend
        .device
        .create_texture(&NativeTextureDesc {
            name: "shadow map",
            info: &info,
            flags: ResourceFlags::ALLOW_DEPTH_STENCIL,
            clear_value: None,
            initial_state: ResourceState::Common,
        })
        .unwrap();

    let desc = ResourceDescriptor::texture(None, info, ResourceFlags::empty()).prepared(external);
    let record = harness
        .resources
        .create_resource(None, ResourceKind::Texture, &desc)
        .unwrap();

    assert_eq!(harness.backend.textures.allocation_calls(), 0);
    assert_eq!(harness.backend.buffers.allocation_calls(), 0);
    assert_eq!(record.native(), Some(external));
    assert!(!record.texture().unwrap().is_owned());

    let Some(ResourceViews::ShaderResource(srv)) = record.views() else {
        panic!("expected a shader resource view");
    };
    assert_eq!(srv.format, Format::R32Float);

    drop(record);
    assert!(harness.backend.device.contains(external));
    assert_eq!(harness.backend.descriptors.live_allocations(), 0);
}

#[test]
fn rw_texture_has_visible_and_clear_slots() {
    let mut harness = Harness::new();
    let info = Arc::new(TextureInfo::new_2d(Format::R32Float, 128, 128, 1));

    let record = harness
        .create(&ResourceDescriptor::rw_texture(info).named("luminance"))
        .unwrap();

    assert_eq!(record.current_state(), ResourceState::UnorderedAccess);
    assert_eq!(harness.list.copy_count(), 0);

    let Some(ResourceViews::ReadWrite { srv, uav }) = record.views() else {
        panic!("expected read/write views");
    };
    assert_eq!(
        uav.dimension,
        UavDimension::Texture2D {
            mip_slice: 0,
            plane_slice: 0,
        }
    );

    let slots = record.slots();
    let primary = slots.primary.as_ref().unwrap();
    let invisible = slots.shader_invisible.as_ref().unwrap();
    assert_eq!(primary.count(), 2);
    assert!(!invisible.is_shader_visible());

    let device = &harness.backend.device;
    let resource = record.native();
    assert_eq!(
        device.view(primary.cpu_handle(0)),
        Some(CreatedView::ShaderResource { resource, desc: *srv })
    );
    let uav_view = Some(CreatedView::UnorderedAccess {
        resource,
        counter: None,
        desc: *uav,
    });
    assert_eq!(device.view(primary.cpu_handle(1)), uav_view);
    assert_eq!(device.view(invisible.cpu_handle(0)), uav_view);

    harness.submit();
    assert_eq!(harness.device_state(&record), Some(ResourceState::UnorderedAccess));
}

#[test]
fn rw_cube_texture_is_rejected() {
    let mut harness = Harness::new();
    let info = Arc::new(
        TextureInfo::new_2d(Format::R8G8B8A8Unorm, 32, 32, 1).with_dimension(ViewDimension::TextureCube, 6),
    );

    let result = harness.create(&ResourceDescriptor::rw_texture(info));
    assert!(matches!(result, Err(ResourceError::InvalidDescriptor(_))));
    assert_eq!(harness.backend.textures.allocation_calls(), 0);
}

#[test]
fn render_target_gets_an_rtv_slot() {
    let mut harness = Harness::new();
    let info = Arc::new(TextureInfo::new_2d(Format::R8G8B8A8Unorm, 320, 240, 1));

    let record = harness
        .create(&ResourceDescriptor::render_target(info).named("scene color"))
        .unwrap();

    assert_eq!(record.current_state(), ResourceState::RenderTarget);
    let target = record.slots().target.as_ref().unwrap();
    assert_eq!(target.heap(), DescriptorHeapKind::Rtv);
    assert!(!target.is_shader_visible());
    assert_eq!(target.gpu_handle(0), None);
    assert_eq!(
        harness.backend.device.view(target.cpu_handle(0)),
        Some(CreatedView::RenderTarget {
            resource: record.native().unwrap(),
            desc: RenderTargetViewDesc {
                format: Format::R8G8B8A8Unorm,
                mip_slice: 0,
            },
        })
    );
    assert!(record.slots().primary.as_ref().unwrap().is_shader_visible());

    harness.submit();
    assert_eq!(harness.device_state(&record), Some(ResourceState::RenderTarget));
}

#[test]
fn render_target_rejects_depth_formats() {
    let mut harness = Harness::new();
    let info = Arc::new(TextureInfo::new_2d(Format::D32Float, 64, 64, 1));

    let result = harness.create(&ResourceDescriptor::render_target(info));
    assert!(matches!(result, Err(ResourceError::InvalidDescriptor(_))));
    assert_eq!(harness.backend.textures.allocation_calls(), 0);
}

#[test]
fn depth_stencil_is_sampled_through_a_color_format() {
    let mut harness = Harness::new();
    let info = Arc::new(TextureInfo::new_2d(Format::D32Float, 640, 480, 1));

    let record = harness
        .create(&ResourceDescriptor::depth_stencil(info).named("scene depth"))
        .unwrap();

    assert_eq!(record.current_state(), ResourceState::DepthWrite);
    let Some(ResourceViews::DepthStencil { srv, dsv }) = record.views() else {
        panic!("expected depth-stencil views");
    };
    assert_eq!(srv.format, Format::R32Float);
    assert_eq!(
        *dsv,
        DepthStencilViewDesc {
            format: Format::D32Float,
            mip_slice: 0,
        }
    );

    let target = record.slots().target.as_ref().unwrap();
    assert_eq!(target.heap(), DescriptorHeapKind::Dsv);
    assert_eq!(
        harness.backend.device.view(target.cpu_handle(0)),
        Some(CreatedView::DepthStencil {
            resource: record.native().unwrap(),
            desc: *dsv,
        })
    );

    harness.submit();
    assert_eq!(harness.device_state(&record), Some(ResourceState::DepthWrite));
}

#[test]
fn depth_stencil_rejects_color_formats() {
    let mut harness = Harness::new();
    let info = Arc::new(TextureInfo::new_2d(Format::R8G8B8A8Unorm, 64, 64, 1));

    let result = harness.create(&ResourceDescriptor::depth_stencil(info));
    assert!(matches!(result, Err(ResourceError::InvalidDescriptor(_))));
}

#[test]
fn expired_texture_allocator_is_reported() {
    let mut harness = Harness::new();
    let info = Arc::new(TextureInfo::new_2d(Format::R8G8B8A8Unorm, 8, 8, 1));
    let backend = &mut harness.backend;
    backend.textures = resource_forge::renderer::internals::SoftwareTextureAllocator::new(
        &(backend.device.clone() as Arc<dyn RenderDevice>),
        Default::default(),
    );

    // The context still points at the allocator that was just replaced
    let result = harness.create(&ResourceDescriptor::render_target(info));
    assert_eq!(
        result.err(),
        Some(ResourceError::ExpiredCollaborator {
            collaborator: "texture allocator"
        })
    );
}
