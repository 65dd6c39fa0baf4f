/// Texel and view formats understood by the factories
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    #[default]
    Unknown,
    R8Unorm,
    R8G8Unorm,
    R8G8B8A8Unorm,
    R8G8B8A8UnormSrgb,
    B8G8R8A8Unorm,
    R16Unorm,
    R16Uint,
    R16Float,
    R16G16B16A16Float,
    R32Typeless,
    R32Uint,
    R32Float,
    R32G32Float,
    R32G32B32Float,
    R32G32B32A32Float,
    R32G32B32A32Uint,
    D16Unorm,
    D32Float,
    D24UnormS8Uint,
    R24UnormX8Typeless,
    Bc1Unorm,
    Bc3Unorm,
    Bc7Unorm,
}

impl Format {
    pub fn is_depth(&self) -> bool {
        matches!(self, Self::D16Unorm | Self::D32Float | Self::D24UnormS8Uint)
    }

    pub fn is_block_compressed(&self) -> bool {
        matches!(self, Self::Bc1Unorm | Self::Bc3Unorm | Self::Bc7Unorm)
    }

    /// Bytes per texel, or per 4x4 block for block-compressed formats
    pub fn block_size(&self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::R8Unorm => 1,
            Self::R8G8Unorm
            | Self::R16Unorm
            | Self::R16Uint
            | Self::R16Float
            | Self::D16Unorm => 2,
            Self::R8G8B8A8Unorm
            | Self::R8G8B8A8UnormSrgb
            | Self::B8G8R8A8Unorm
            | Self::R32Typeless
            | Self::R32Uint
            | Self::R32Float
            | Self::D32Float
            | Self::D24UnormS8Uint
            | Self::R24UnormX8Typeless => 4,
            Self::R16G16B16A16Float | Self::R32G32Float | Self::Bc1Unorm => 8,
            Self::R32G32B32Float => 12,
            Self::R32G32B32A32Float
            | Self::R32G32B32A32Uint
            | Self::Bc3Unorm
            | Self::Bc7Unorm => 16,
        }
    }

    /// Byte size of one row and the number of rows of a `width` x `height` surface.
    ///
    /// Block-compressed rows hold a full row of 4x4 blocks.
    pub fn surface_info(&self, width: u32, height: u32) -> (u64, u32) {
        if self.is_block_compressed() {
            let blocks_wide = width.max(1).div_ceil(4) as u64;
            let blocks_high = height.max(1).div_ceil(4);
            (blocks_wide * self.block_size() as u64, blocks_high)
        } else {
            (width as u64 * self.block_size() as u64, height)
        }
    }

    /// Format a shader reads a depth/stencil surface through.
    ///
    /// Color formats are returned unchanged.
    pub fn shader_resource_format(&self) -> Format {
        match self {
            Self::D32Float => Self::R32Float,
            Self::D24UnormS8Uint => Self::R24UnormX8Typeless,
            Self::D16Unorm => Self::R16Unorm,
            other => *other,
        }
    }
}

/// Optimized clear value a render-target or depth-stencil capable texture is created with
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color { format: Format, rgba: [f32; 4] },
    DepthStencil { format: Format, depth: f32, stencil: u8 },
}

impl ClearValue {
    pub fn for_format(format: Format) -> Self {
        if format.is_depth() {
            Self::DepthStencil {
                format,
                depth: 1.0,
                stencil: 0,
            }
        } else {
            Self::Color {
                format,
                rgba: [0.0; 4],
            }
        }
    }

    pub fn format(&self) -> Format {
        match self {
            Self::Color { format, .. } | Self::DepthStencil { format, .. } => *format,
        }
    }
}
