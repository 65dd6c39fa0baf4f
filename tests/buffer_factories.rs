mod common;

use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use gpu_allocator::MemoryLocation;
use resource_forge::renderer::contexts::device_ctx::TransitionBarrier;
use resource_forge::renderer::internals::{
    Command, CreatedView, SoftwareBufferAllocator, SoftwareDescriptorAllocator, SoftwareDevice,
    SoftwareTextureAllocator,
};
use resource_forge::renderer::resources::record::ResourceViews;
use resource_forge::renderer::resources::view::{BufferViewKind, SrvDimension};
use resource_forge::{
    BufferAllocator, DescriptorAllocator, FactoryConfig, Format, HeapConfig, RenderDevice,
    RenderResourceContext, ResourceDescriptor, ResourceError, ResourceKind, ResourceState,
    TextureAllocator,
};
use common::Harness;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    color: [f32; 4],
}

fn triangle() -> [Vertex; 3] {
    [
        Vertex { position: [0.0, 1.0, 0.0], color: [1.0, 0.0, 0.0, 1.0] },
        Vertex { position: [-1.0, -1.0, 0.0], color: [0.0, 1.0, 0.0, 1.0] },
        Vertex { position: [1.0, -1.0, 0.0], color: [0.0, 0.0, 1.0, 1.0] },
    ]
}

#[test]
fn vertex_buffer_is_uploaded_through_staging() {
    let mut harness = Harness::new();
    let vertices = triangle();
    let bytes: &[u8] = bytemuck::cast_slice(&vertices);

    let record = harness
        .create(&ResourceDescriptor::vertices(bytes, size_of::<Vertex>() as u32).named("triangle"))
        .unwrap();

    assert_eq!(record.kind(), Some(ResourceKind::Vertex));
    assert_eq!(record.current_state(), ResourceState::VertexAndConstantBuffer);
    let Some(ResourceViews::Vertex(view)) = record.views() else {
        panic!("expected a vertex view, got {:?}", record.views());
    };
    assert_eq!(Some(view.buffer_location), record.gpu_address());
    assert_eq!(view.size_in_bytes as usize, bytes.len());
    assert_eq!(view.stride_in_bytes as usize, size_of::<Vertex>());
    assert_eq!(harness.list.copy_count(), 1);
    assert_eq!(harness.backend.buffers.temporaries(), 1);

    harness.submit();
    let native = record.native().unwrap();
    assert_eq!(harness.backend.device.read_buffer(native).unwrap(), bytes);
    assert_eq!(harness.device_state(&record), Some(ResourceState::VertexAndConstantBuffer));
    assert_eq!(harness.backend.device.location(native), Some(MemoryLocation::GpuOnly));
    assert_eq!(harness.backend.buffers.temporaries(), 0);
}

#[test]
fn dynamic_vertex_buffer_lives_in_host_visible_memory() {
    let harness = Harness::new();
    let vertices = triangle();
    let bytes: &[u8] = bytemuck::cast_slice(&vertices);
    let desc = ResourceDescriptor::vertices(bytes, size_of::<Vertex>() as u32).dynamic();

    // No commands are needed, so no recorder either
    let record = harness
        .resources
        .create_resource(None, ResourceKind::Vertex, &desc)
        .unwrap();

    assert_eq!(record.current_state(), ResourceState::GenericRead);
    assert_eq!(harness.backend.buffers.live_in(MemoryLocation::GpuOnly), 0);
    assert_eq!(harness.backend.buffers.live_in(MemoryLocation::CpuToGpu), 1);
    assert_eq!(harness.backend.buffers.temporaries(), 0);

    let buffer = record.buffer().unwrap();
    let Some(ResourceViews::Vertex(view)) = record.views() else {
        panic!("expected a vertex view");
    };
    assert_eq!(view.buffer_location, buffer.gpu_address());
    assert_eq!(buffer.location(), MemoryLocation::CpuToGpu);
    assert_eq!(harness.backend.device.read_buffer(buffer.resource().unwrap()).unwrap(), bytes);
}

#[test]
fn dynamic_vertex_buffer_records_no_copy() {
    let mut harness = Harness::new();
    let vertices = triangle();
    let desc = ResourceDescriptor::vertices(bytemuck::cast_slice(&vertices), 28).dynamic();

    let _record = harness.create(&desc).unwrap();
    assert!(harness.list.commands().is_empty());
}

#[test]
fn prepared_vertex_buffer_is_adopted() {
    let mut harness = Harness::new();
    let external = harness.external_buffer(84);
    let vertices = triangle();
    let desc = ResourceDescriptor::vertices(bytemuck::cast_slice(&vertices), 28).prepared(external);

    let record = harness.create(&desc).unwrap();

    assert_eq!(harness.backend.buffers.allocation_calls(), 0);
    assert_eq!(
        harness.list.commands(),
        &[Command::Barrier(TransitionBarrier {
            resource: external,
            before: ResourceState::Common,
            after: ResourceState::VertexAndConstantBuffer,
        })]
    );
    assert_eq!(record.native(), Some(external));
    assert_eq!(record.gpu_address(), Some(harness.backend.device.gpu_address(external)));
    assert!(!record.buffer().unwrap().is_owned());

    harness.submit();
    drop(record);
    assert!(harness.backend.device.contains(external));
}

#[test]
fn index_buffer_counts_its_indices() {
    let mut harness = Harness::new();
    let indices: [u32; 6] = [0, 1, 2, 2, 1, 3];

    let record = harness
        .create(&ResourceDescriptor::indices(bytemuck::cast_slice(&indices), 4).named("quad"))
        .unwrap();

    assert_eq!(record.indices_count(), Some(6));
    assert_eq!(record.current_state(), ResourceState::IndexBuffer);
    let Some(ResourceViews::Index(view)) = record.views() else {
        panic!("expected an index view");
    };
    assert_eq!(view.format, Format::R32Uint);
    assert_eq!(view.size_in_bytes, 24);
    assert_eq!(Some(view.buffer_location), record.gpu_address());

    harness.submit();
    assert_eq!(
        harness.backend.device.read_buffer(record.native().unwrap()).unwrap(),
        bytemuck::cast_slice::<u32, u8>(&indices)
    );
}

#[test]
fn sixteen_bit_indices() {
    let mut harness = Harness::new();
    let indices: [u16; 3] = [0, 1, 2];

    let record = harness
        .create(&ResourceDescriptor::indices(bytemuck::cast_slice(&indices), 2))
        .unwrap();

    assert_eq!(record.indices_count(), Some(3));
    assert!(matches!(
        record.views(),
        Some(ResourceViews::Index(view)) if view.format == Format::R16Uint
    ));
}

#[test]
fn prepared_index_buffer_is_adopted() {
    let mut harness = Harness::new();
    let external = harness.external_buffer(12);
    let indices: [u16; 6] = [0, 1, 2, 2, 1, 3];
    let desc = ResourceDescriptor::indices(bytemuck::cast_slice(&indices), 2).prepared(external);

    let record = harness.create(&desc).unwrap();

    assert_eq!(harness.backend.buffers.allocation_calls(), 0);
    assert_eq!(harness.list.copy_count(), 0);
    assert_eq!(harness.list.barriers().count(), 1);
    assert_eq!(record.current_state(), ResourceState::IndexBuffer);
    assert_eq!(record.indices_count(), Some(6));
}

#[test]
fn index_stride_must_be_two_or_four_bytes() {
    let mut harness = Harness::new();
    let data = [0u8; 9];

    let result = harness.create(&ResourceDescriptor::indices(&data, 3));
    assert!(matches!(result, Err(ResourceError::InvalidDescriptor(_))));
    assert_eq!(harness.backend.buffers.allocation_calls(), 0);
    assert!(harness.list.commands().is_empty());
}

#[test]
fn index_buffer_needs_a_recorder() {
    let harness = Harness::new();
    let indices: [u16; 3] = [0, 1, 2];
    let desc = ResourceDescriptor::indices(bytemuck::cast_slice(&indices), 2);

    let result = harness.resources.create_resource(None, ResourceKind::Index, &desc);
    assert_eq!(result.err(), Some(ResourceError::MissingCommandRecorder));
    assert_eq!(harness.backend.buffers.allocation_calls(), 0);
}

#[test]
fn constant_buffer_view_covers_whole_blocks() {
    let mut harness = Harness::new();
    let matrix = [[0.5f32; 4]; 4];
    let bytes: &[u8] = bytemuck::cast_slice(&matrix);

    let record = harness
        .create(&ResourceDescriptor::constants(bytes).named("camera"))
        .unwrap();

    assert_eq!(record.current_state(), ResourceState::GenericRead);
    let Some(ResourceViews::Constant(view)) = record.views() else {
        panic!("expected a constant buffer view");
    };
    assert_eq!(view.size_in_bytes, 256);
    assert_eq!(Some(view.buffer_location), record.gpu_address());

    let slot = record.slots().primary.as_ref().unwrap();
    assert!(slot.is_shader_visible());
    assert_eq!(
        harness.backend.device.view(slot.cpu_handle(0)),
        Some(CreatedView::ConstantBuffer(*view))
    );

    harness.submit();
    assert_eq!(harness.backend.device.read_buffer(record.native().unwrap()).unwrap(), bytes);
    assert_eq!(harness.device_state(&record), Some(ResourceState::GenericRead));
}

#[test]
fn generic_buffer_round_trips_and_stays_a_copy_destination() {
    let mut harness = Harness::new();
    let payload = (0..96u8).collect::<Vec<_>>();

    let record = harness
        .create(&ResourceDescriptor::buffer(&payload, 12, 8, Format::Unknown).named("instances"))
        .unwrap();

    assert_eq!(record.current_state(), ResourceState::CopyDest);
    let Some(ResourceViews::ShaderResource(srv)) = record.views() else {
        panic!("expected a shader resource view");
    };
    let SrvDimension::Buffer(range) = srv.dimension else {
        panic!("expected a buffer view, got {:?}", srv.dimension);
    };
    assert_eq!(range.num_elements, 8);
    assert_eq!(range.kind, BufferViewKind::Structured { structure_byte_stride: 12 });

    let slot = record.slots().primary.as_ref().unwrap();
    assert_eq!(
        harness.backend.device.view(slot.cpu_handle(0)),
        Some(CreatedView::ShaderResource {
            resource: record.native(),
            desc: *srv,
        })
    );

    harness.submit();
    assert_eq!(harness.backend.device.read_buffer(record.native().unwrap()).unwrap(), payload);
    assert_eq!(harness.device_state(&record), Some(ResourceState::CopyDest));
}

#[test]
fn raw_and_typed_buffer_views() {
    let mut harness = Harness::new();
    let payload = [7u8; 64];

    let raw = harness
        .create(&ResourceDescriptor::buffer(&payload, 1, 0, Format::Unknown))
        .unwrap();
    let typed = harness
        .create(&ResourceDescriptor::buffer(&payload, 0, 16, Format::R32Float))
        .unwrap();

    let Some(ResourceViews::ShaderResource(raw_view)) = raw.views() else {
        panic!("expected a shader resource view");
    };
    assert_eq!(raw_view.format, Format::R32Typeless);
    assert!(matches!(
        raw_view.dimension,
        SrvDimension::Buffer(range) if range.kind == BufferViewKind::Raw && range.num_elements == 16
    ));

    let Some(ResourceViews::ShaderResource(typed_view)) = typed.views() else {
        panic!("expected a shader resource view");
    };
    assert_eq!(typed_view.format, Format::R32Float);
    assert!(matches!(
        typed_view.dimension,
        SrvDimension::Buffer(range) if range.kind == BufferViewKind::Typed && range.num_elements == 16
    ));
}

#[test]
fn empty_buffers_are_rejected() {
    let mut harness = Harness::new();

    for desc in [
        ResourceDescriptor::vertices(&[], 12),
        ResourceDescriptor::constants(&[]),
        ResourceDescriptor::buffer(&[], 4, 0, Format::R32Float),
    ] {
        assert!(matches!(harness.create(&desc), Err(ResourceError::InvalidDescriptor(_))));
    }
    assert_eq!(harness.backend.buffers.allocation_calls(), 0);
}

#[test]
fn oversized_payload_is_rejected() {
    let mut harness = Harness::new();
    let data = [1u8; 32];
    let mut desc = ResourceDescriptor::constants(&data);
    desc.data_size = 16;

    assert!(matches!(harness.create(&desc), Err(ResourceError::InvalidDescriptor(_))));
}

#[test]
fn descriptor_kind_must_match_the_request() {
    let harness = Harness::new();
    let vertices = triangle();
    let desc = ResourceDescriptor::vertices(bytemuck::cast_slice(&vertices), 28);

    let result = harness.resources.create_resource(None, ResourceKind::Index, &desc);
    assert!(matches!(result, Err(ResourceError::InvalidDescriptor(_))));

    // Factories check the tag themselves too
    let factory = harness.resources.factory(ResourceKind::Constant).unwrap();
    assert!(matches!(
        factory.create_resource(None, &desc),
        Err(ResourceError::InvalidDescriptor(_))
    ));
}

#[test]
fn failed_staging_returns_the_persistent_buffer() {
    let mut harness = Harness::with_heaps(HeapConfig {
        upload_heap_size: 0,
        ..HeapConfig::default()
    });
    let vertices = triangle();

    let result = harness.create(&ResourceDescriptor::vertices(bytemuck::cast_slice(&vertices), 28));

    assert!(matches!(result, Err(ResourceError::AllocationFailed(_))));
    assert_eq!(harness.backend.buffers.allocation_calls(), 2);
    assert_eq!(harness.backend.buffers.live_allocations(), 0);
    assert_eq!(harness.backend.device.resource_count(), 0);
    assert!(harness.list.commands().is_empty());
}

#[test]
fn full_heap_fails_the_allocation() {
    let mut harness = Harness::with_heaps(HeapConfig {
        default_heap_size: 64 * 1024,
        ..HeapConfig::default()
    });
    let payload = [3u8; 16];

    let _first = harness.create(&ResourceDescriptor::constants(&payload)).unwrap();
    let commands = harness.list.commands().len();
    let second = harness.create(&ResourceDescriptor::constants(&payload));

    assert!(matches!(second, Err(ResourceError::AllocationFailed(_))));
    assert_eq!(harness.list.commands().len(), commands);
    assert_eq!(harness.backend.buffers.live_allocations(), 1);
    assert_eq!(harness.backend.descriptors.live_allocations(), 1);
}

#[test]
fn expired_buffer_allocator_is_reported() {
    common::init_logging();
    let device: Arc<dyn RenderDevice> = Arc::new(SoftwareDevice::new());
    let heaps = HeapConfig::default();
    let buffers: Arc<dyn BufferAllocator> = SoftwareBufferAllocator::new(&device, heaps);
    let textures: Arc<dyn TextureAllocator> = SoftwareTextureAllocator::new(&device, heaps);
    let descriptors: Arc<dyn DescriptorAllocator> = SoftwareDescriptorAllocator::new(heaps);
    let resources =
        RenderResourceContext::new(&device, &buffers, &textures, &descriptors, FactoryConfig::default());

    drop(buffers);
    let data = [0u8; 16];
    let result = resources.create_resource(
        None,
        ResourceKind::Vertex,
        &ResourceDescriptor::vertices(&data, 16).dynamic(),
    );
    assert_eq!(
        result.err(),
        Some(ResourceError::ExpiredCollaborator {
            collaborator: "buffer allocator"
        })
    );

    drop(descriptors);
    let result = resources.create_resource(None, ResourceKind::Constant, &ResourceDescriptor::constants(&data));
    assert!(matches!(result, Err(ResourceError::ExpiredCollaborator { .. })));
}

#[test]
fn missing_device_is_reported() {
    common::init_logging();
    let device: Arc<dyn RenderDevice> = Arc::new(SoftwareDevice::new());
    let heaps = HeapConfig::default();
    let buffers: Arc<dyn BufferAllocator> = SoftwareBufferAllocator::new(&device, heaps);
    let textures: Arc<dyn TextureAllocator> = SoftwareTextureAllocator::new(&device, heaps);
    let descriptors: Arc<dyn DescriptorAllocator> = SoftwareDescriptorAllocator::new(heaps);
    let resources =
        RenderResourceContext::new(&device, &buffers, &textures, &descriptors, FactoryConfig::default());

    drop(device);
    let data = [0u8; 16];
    for kind in [ResourceKind::Vertex, ResourceKind::Constant] {
        let desc = match kind {
            ResourceKind::Vertex => ResourceDescriptor::vertices(&data, 16),
            _ => ResourceDescriptor::constants(&data),
        };
        let result = resources.create_resource(None, kind, &desc);
        assert_eq!(result.err(), Some(ResourceError::MissingDevice));
    }
}
