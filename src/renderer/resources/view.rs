use crate::renderer::resources::format::Format;

/// Vertex buffer binding used directly by draw calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBufferView {
    pub buffer_location: u64,
    pub size_in_bytes: u32,
    pub stride_in_bytes: u32,
}

/// Index buffer binding used directly by draw calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexBufferView {
    pub buffer_location: u64,
    pub size_in_bytes: u32,
    pub format: Format,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantBufferViewDesc {
    pub buffer_location: u64,
    pub size_in_bytes: u32,
}

/// How a buffer view interprets its elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferViewKind {
    /// Byte-addressable, counted in 32-bit words
    Raw,
    /// Elements of the view's format
    Typed,
    /// Elements of `structure_byte_stride` bytes
    Structured { structure_byte_stride: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferViewRange {
    pub first_element: u64,
    pub num_elements: u32,
    pub kind: BufferViewKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SrvDimension {
    Buffer(BufferViewRange),
    Texture1D { most_detailed_mip: u32, mip_levels: u32 },
    Texture1DArray { most_detailed_mip: u32, mip_levels: u32, first_array_slice: u32, array_size: u32 },
    Texture2D { most_detailed_mip: u32, mip_levels: u32 },
    Texture2DArray { most_detailed_mip: u32, mip_levels: u32, first_array_slice: u32, array_size: u32 },
    TextureCube { most_detailed_mip: u32, mip_levels: u32 },
    TextureCubeArray { most_detailed_mip: u32, mip_levels: u32, first_2d_array_face: u32, num_cubes: u32 },
    Texture3D { most_detailed_mip: u32, mip_levels: u32 },
}

/// Read-only view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderResourceViewDesc {
    pub format: Format,
    pub dimension: SrvDimension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UavDimension {
    Buffer { range: BufferViewRange, counter_offset: u64 },
    Texture1D { mip_slice: u32 },
    Texture1DArray { mip_slice: u32, first_array_slice: u32, array_size: u32 },
    Texture2D { mip_slice: u32, plane_slice: u32 },
    Texture2DArray { mip_slice: u32, first_array_slice: u32, array_size: u32, plane_slice: u32 },
    Texture3D { mip_slice: u32, first_w_slice: u32, w_size: u32 },
}

/// Read/write view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnorderedAccessViewDesc {
    pub format: Format,
    pub dimension: UavDimension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTargetViewDesc {
    pub format: Format,
    pub mip_slice: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthStencilViewDesc {
    pub format: Format,
    pub mip_slice: u32,
}
