use ash::vk;
use crate::renderer::resources::format::Format;
use crate::renderer::resources::state::ResourceState;
use crate::renderer::resources::texture::{ResourceFlags, TextureInfo, ViewDimension};

pub fn to_vk_format(format: Format) -> vk::Format {
    match format {
        Format::Unknown => vk::Format::UNDEFINED,
        Format::R8Unorm => vk::Format::R8_UNORM,
        Format::R8G8Unorm => vk::Format::R8G8_UNORM,
        Format::R8G8B8A8Unorm => vk::Format::R8G8B8A8_UNORM,
        Format::R8G8B8A8UnormSrgb => vk::Format::R8G8B8A8_SRGB,
        Format::B8G8R8A8Unorm => vk::Format::B8G8R8A8_UNORM,
        Format::R16Unorm => vk::Format::R16_UNORM,
        Format::R16Uint => vk::Format::R16_UINT,
        Format::R16Float => vk::Format::R16_SFLOAT,
        Format::R16G16B16A16Float => vk::Format::R16G16B16A16_SFLOAT,
        // Vulkan has no typeless formats, raw views read 32-bit words
        Format::R32Typeless | Format::R32Uint => vk::Format::R32_UINT,
        Format::R32Float => vk::Format::R32_SFLOAT,
        Format::R32G32Float => vk::Format::R32G32_SFLOAT,
        Format::R32G32B32Float => vk::Format::R32G32B32_SFLOAT,
        Format::R32G32B32A32Float => vk::Format::R32G32B32A32_SFLOAT,
        Format::R32G32B32A32Uint => vk::Format::R32G32B32A32_UINT,
        Format::D16Unorm => vk::Format::D16_UNORM,
        Format::D32Float => vk::Format::D32_SFLOAT,
        Format::D24UnormS8Uint => vk::Format::D24_UNORM_S8_UINT,
        Format::R24UnormX8Typeless => vk::Format::X8_D24_UNORM_PACK32,
        Format::Bc1Unorm => vk::Format::BC1_RGBA_UNORM_BLOCK,
        Format::Bc3Unorm => vk::Format::BC3_UNORM_BLOCK,
        Format::Bc7Unorm => vk::Format::BC7_UNORM_BLOCK,
    }
}

pub fn image_type(dimension: ViewDimension) -> vk::ImageType {
    match dimension {
        ViewDimension::Texture1D | ViewDimension::Texture1DArray => vk::ImageType::TYPE_1D,
        ViewDimension::Texture3D => vk::ImageType::TYPE_3D,
        _ => vk::ImageType::TYPE_2D,
    }
}

pub fn image_view_type(dimension: ViewDimension) -> vk::ImageViewType {
    match dimension {
        ViewDimension::Texture1D => vk::ImageViewType::TYPE_1D,
        ViewDimension::Texture1DArray => vk::ImageViewType::TYPE_1D_ARRAY,
        ViewDimension::Texture2D => vk::ImageViewType::TYPE_2D,
        ViewDimension::Texture2DArray => vk::ImageViewType::TYPE_2D_ARRAY,
        ViewDimension::TextureCube => vk::ImageViewType::CUBE,
        ViewDimension::TextureCubeArray => vk::ImageViewType::CUBE_ARRAY,
        ViewDimension::Texture3D => vk::ImageViewType::TYPE_3D,
    }
}

pub fn image_usage(flags: ResourceFlags) -> vk::ImageUsageFlags {
    let mut usage = vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::TRANSFER_DST;
    if !flags.contains(ResourceFlags::DENY_SHADER_RESOURCE) {
        usage |= vk::ImageUsageFlags::SAMPLED;
    }
    if flags.contains(ResourceFlags::ALLOW_RENDER_TARGET) {
        usage |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
    }
    if flags.contains(ResourceFlags::ALLOW_DEPTH_STENCIL) {
        usage |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
    }
    if flags.contains(ResourceFlags::ALLOW_UNORDERED_ACCESS) {
        usage |= vk::ImageUsageFlags::STORAGE;
    }
    usage
}

pub fn image_aspect(format: Format) -> vk::ImageAspectFlags {
    match format {
        Format::D24UnormS8Uint => vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL,
        format if format.is_depth() => vk::ImageAspectFlags::DEPTH,
        _ => vk::ImageAspectFlags::COLOR,
    }
}

/// Layout, access mask and pipeline stages a tracked state maps to
pub fn state_scope(
    state: ResourceState,
) -> (vk::ImageLayout, vk::AccessFlags2, vk::PipelineStageFlags2) {
    match state {
        ResourceState::Common => (
            vk::ImageLayout::GENERAL,
            vk::AccessFlags2::MEMORY_READ | vk::AccessFlags2::MEMORY_WRITE,
            vk::PipelineStageFlags2::ALL_COMMANDS,
        ),
        ResourceState::VertexAndConstantBuffer => (
            vk::ImageLayout::READ_ONLY_OPTIMAL,
            vk::AccessFlags2::VERTEX_ATTRIBUTE_READ | vk::AccessFlags2::UNIFORM_READ,
            vk::PipelineStageFlags2::VERTEX_ATTRIBUTE_INPUT
                | vk::PipelineStageFlags2::VERTEX_SHADER
                | vk::PipelineStageFlags2::FRAGMENT_SHADER,
        ),
        ResourceState::IndexBuffer => (
            vk::ImageLayout::READ_ONLY_OPTIMAL,
            vk::AccessFlags2::INDEX_READ,
            vk::PipelineStageFlags2::INDEX_INPUT,
        ),
        ResourceState::RenderTarget => (
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            vk::AccessFlags2::COLOR_ATTACHMENT_READ | vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
            vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
        ),
        ResourceState::UnorderedAccess => (
            vk::ImageLayout::GENERAL,
            vk::AccessFlags2::SHADER_STORAGE_READ | vk::AccessFlags2::SHADER_STORAGE_WRITE,
            vk::PipelineStageFlags2::COMPUTE_SHADER | vk::PipelineStageFlags2::FRAGMENT_SHADER,
        ),
        ResourceState::DepthWrite => (
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ
                | vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE,
            vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS
                | vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS,
        ),
        ResourceState::DepthRead => (
            vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
            vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ,
            vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS
                | vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS,
        ),
        ResourceState::NonPixelShaderResource => (
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            vk::AccessFlags2::SHADER_SAMPLED_READ,
            vk::PipelineStageFlags2::VERTEX_SHADER | vk::PipelineStageFlags2::COMPUTE_SHADER,
        ),
        ResourceState::PixelShaderResource => (
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            vk::AccessFlags2::SHADER_SAMPLED_READ,
            vk::PipelineStageFlags2::FRAGMENT_SHADER,
        ),
        ResourceState::CopyDest => (
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::AccessFlags2::TRANSFER_WRITE,
            vk::PipelineStageFlags2::TRANSFER,
        ),
        ResourceState::CopySource => (
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            vk::AccessFlags2::TRANSFER_READ,
            vk::PipelineStageFlags2::TRANSFER,
        ),
        ResourceState::GenericRead => (
            vk::ImageLayout::READ_ONLY_OPTIMAL,
            vk::AccessFlags2::MEMORY_READ,
            vk::PipelineStageFlags2::ALL_COMMANDS,
        ),
    }
}

/// Barrier covering every subresource of `image`, or `None` when the states are identical
pub fn image_barrier(
    image: vk::Image,
    info: &TextureInfo,
    before: ResourceState,
    after: ResourceState,
) -> Option<vk::ImageMemoryBarrier2<'static>> {
    if before == after {
        return None;
    }

    let (old_layout, src_access_mask, src_stage_mask) = state_scope(before);
    let (new_layout, dst_access_mask, dst_stage_mask) = state_scope(after);

    Some(vk::ImageMemoryBarrier2 {
        src_stage_mask,
        src_access_mask,
        dst_stage_mask,
        dst_access_mask,
        old_layout,
        new_layout,
        subresource_range: vk::ImageSubresourceRange {
            aspect_mask: image_aspect(info.format),
            base_mip_level: 0,
            level_count: info.mip_levels,
            base_array_layer: 0,
            layer_count: info.array_size(),
        },
        image,
        ..Default::default()
    })
}

pub fn transition_image(
    cmd: vk::CommandBuffer,
    image: vk::Image,
    info: &TextureInfo,
    before: ResourceState,
    after: ResourceState,
    device: &ash::Device,
) {
    let Some(image_barrier) = image_barrier(image, info, before, after) else {
        return;
    };

    let dep_info = vk::DependencyInfo {
        image_memory_barrier_count: 1,
        p_image_memory_barriers: &image_barrier,
        ..Default::default()
    };

    unsafe {
        device.cmd_pipeline_barrier2(cmd, &dep_info);
    }
}
