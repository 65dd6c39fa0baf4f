use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use color_eyre::Result;
use resource_forge::renderer::internals::{SoftwareBackend, SoftwareCommandList};
use resource_forge::{
    FactoryConfig, Format, HeapConfig, ResourceDescriptor, ResourceFlags, ResourceKind,
    ResourceState, TextureInfo,
};

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    uv: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct Light {
    position: [f32; 3],
    radius: f32,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::init();

    let backend = SoftwareBackend::new(HeapConfig::default());
    let resources = backend.resource_context(FactoryConfig::default());
    let mut list = SoftwareCommandList::new();

    let vertices = [
        Vertex { position: [-0.5, -0.5, 0.0], uv: [0.0, 1.0] },
        Vertex { position: [0.5, -0.5, 0.0], uv: [1.0, 1.0] },
        Vertex { position: [0.0, 0.5, 0.0], uv: [0.5, 0.0] },
    ];
    let indices: [u16; 3] = [0, 1, 2];
    let view_projection: [[f32; 4]; 4] = [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ];
    let lights = [
        Light { position: [0.0, 4.0, 0.0], radius: 10.0 },
        Light { position: [3.0, 1.0, -2.0], radius: 2.5 },
    ];

    let albedo = Arc::new(TextureInfo::new_2d(Format::R8G8B8A8Unorm, 64, 64, 7));
    let texels = (0..albedo.packed_size())
        .map(|i| (i % 251) as u8)
        .collect::<Vec<u8>>();
    let extent = (1280, 720);

    let descriptors = [
        ResourceDescriptor::vertices(bytemuck::cast_slice(&vertices), size_of::<Vertex>() as u32)
            .named("triangle vertices"),
        ResourceDescriptor::indices(bytemuck::cast_slice(&indices), size_of::<u16>() as u32)
            .named("triangle indices"),
        ResourceDescriptor::constants(bytemuck::cast_slice(&view_projection))
            .named("view projection"),
        ResourceDescriptor::buffer(
            bytemuck::cast_slice(&lights),
            size_of::<Light>() as u32,
            lights.len() as u32,
            Format::Unknown,
        )
        .named("lights"),
        ResourceDescriptor::rw_buffer(None, 32 * 1024, 32, 1024, Format::Unknown)
            .with_counter()
            .named("particles"),
        ResourceDescriptor::texture(Some(texels.as_slice()), albedo.clone(), ResourceFlags::empty())
            .named("albedo"),
        ResourceDescriptor::rw_texture(Arc::new(TextureInfo::new_2d(Format::R32Float, 256, 256, 1)))
            .named("luminance"),
        ResourceDescriptor::render_target(Arc::new(TextureInfo::new_2d(
            Format::R8G8B8A8Unorm,
            extent.0,
            extent.1,
            1,
        )))
        .named("scene color"),
        ResourceDescriptor::depth_stencil(Arc::new(TextureInfo::new_2d(
            Format::D32Float,
            extent.0,
            extent.1,
            1,
        )))
        .named("scene depth"),
    ];

    let mut records = Vec::with_capacity(descriptors.len());
    for desc in &descriptors {
        records.push(resources.create_resource(Some(&mut list), desc.kind(), desc)?);
    }
    log::info!(
        "Recorded {} commands ({} copies) for {} resources",
        list.commands().len(),
        list.copy_count(),
        records.len(),
    );

    backend.submit(&list)?;

    for record in &records {
        log::info!(
            "{:?} {:?}: {:?} (device reports {:?})",
            record.kind(),
            record.native(),
            record.current_state(),
            record.native().and_then(|resource| backend.device.state(resource)),
        );
    }

    // The generic buffer is left as a copy destination; move it to a readable state
    let mut list = SoftwareCommandList::new();
    if let Some(lights) = records
        .iter_mut()
        .find(|record| record.kind() == Some(ResourceKind::Buffer))
    {
        lights.transition(&mut list, ResourceState::NonPixelShaderResource)?;
    }
    backend.submit(&list)?;

    Ok(())
}
