use bitflags::bitflags;
use crate::renderer::error::{ResourceError, Result};
use crate::renderer::resources::format::Format;

bitflags! {
    /// Capabilities a texture is created with
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResourceFlags: u32 {
        const ALLOW_RENDER_TARGET = 1 << 0;
        const ALLOW_DEPTH_STENCIL = 1 << 1;
        const ALLOW_UNORDERED_ACCESS = 1 << 2;
        const DENY_SHADER_RESOURCE = 1 << 3;
    }
}

/// Shape a texture is viewed as by shaders
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewDimension {
    Texture1D,
    Texture1DArray,
    #[default]
    Texture2D,
    Texture2DArray,
    TextureCube,
    TextureCubeArray,
    Texture3D,
}

impl ViewDimension {
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            Self::Texture1DArray | Self::Texture2DArray | Self::TextureCubeArray
        )
    }

    pub fn is_cube(&self) -> bool {
        matches!(self, Self::TextureCube | Self::TextureCubeArray)
    }
}

/// Shape of a texture resource.
///
/// `depth_or_array_size` is the depth of a 3D texture and the array size of everything else;
/// cube textures count faces, so a single cube has an array size of 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureInfo {
    pub format: Format,
    pub width: u32,
    pub height: u32,
    pub depth_or_array_size: u32,
    pub mip_levels: u32,
    pub dimension: ViewDimension,
}

/// How one subresource is packed in a caller-supplied payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLayout {
    pub row_pitch: u64,
    pub num_rows: u32,
    pub slice_pitch: u64,
    pub depth: u32,
}

impl SourceLayout {
    pub fn size(&self) -> u64 {
        self.slice_pitch * self.depth as u64
    }
}

impl TextureInfo {
    pub fn new_2d(format: Format, width: u32, height: u32, mip_levels: u32) -> Self {
        Self {
            format,
            width,
            height,
            depth_or_array_size: 1,
            mip_levels,
            dimension: ViewDimension::Texture2D,
        }
    }

    pub fn with_dimension(mut self, dimension: ViewDimension, depth_or_array_size: u32) -> Self {
        self.dimension = dimension;
        self.depth_or_array_size = depth_or_array_size;
        self
    }

    pub fn array_size(&self) -> u32 {
        match self.dimension {
            ViewDimension::Texture3D => 1,
            _ => self.depth_or_array_size,
        }
    }

    pub fn depth(&self) -> u32 {
        match self.dimension {
            ViewDimension::Texture3D => self.depth_or_array_size,
            _ => 1,
        }
    }

    pub fn subresource_count(&self) -> u32 {
        self.array_size() * self.mip_levels
    }

    /// Subresources are ordered mip-major within each array slice
    pub fn subresource_index(&self, mip: u32, array_slice: u32) -> u32 {
        mip + array_slice * self.mip_levels
    }

    /// `(mip, array_slice)` of a subresource index
    pub fn subresource_coords(&self, index: u32) -> (u32, u32) {
        (index % self.mip_levels, index / self.mip_levels)
    }

    pub fn mip_extent(&self, mip: u32) -> (u32, u32, u32) {
        let height = match self.dimension {
            ViewDimension::Texture1D | ViewDimension::Texture1DArray => 1,
            _ => (self.height >> mip).max(1),
        };
        (
            (self.width >> mip).max(1),
            height,
            (self.depth() >> mip).max(1),
        )
    }

    pub fn source_layout(&self, mip: u32) -> SourceLayout {
        let (width, height, depth) = self.mip_extent(mip);
        let (row_pitch, num_rows) = self.format.surface_info(width, height);
        SourceLayout {
            row_pitch,
            num_rows,
            slice_pitch: row_pitch * num_rows as u64,
            depth,
        }
    }

    /// Total payload size when every subresource is tightly packed back to back
    pub fn packed_size(&self) -> u64 {
        (0..self.subresource_count())
            .map(|index| self.source_layout(self.subresource_coords(index).0).size())
            .sum()
    }

    pub fn validate(&self) -> Result<()> {
        if self.format == Format::Unknown {
            return Err(ResourceError::invalid("texture format is unknown"));
        }
        if self.width == 0 || self.height == 0 || self.depth_or_array_size == 0 {
            return Err(ResourceError::invalid(format!(
                "texture extent {}x{}x{} has a zero dimension",
                self.width, self.height, self.depth_or_array_size,
            )));
        }
        if self.mip_levels == 0 {
            return Err(ResourceError::invalid("texture has no mip levels"));
        }
        let largest = self.width.max(self.height).max(self.depth());
        if self.mip_levels > 32 - largest.leading_zeros() {
            return Err(ResourceError::invalid(format!(
                "{} mip levels exceed the chain of a {}-texel texture",
                self.mip_levels, largest,
            )));
        }
        if self.dimension.is_cube() && self.depth_or_array_size % 6 != 0 {
            return Err(ResourceError::invalid(format!(
                "cube texture array size {} is not a multiple of 6",
                self.depth_or_array_size,
            )));
        }
        Ok(())
    }
}
