use std::sync::Arc;
use crate::renderer::contexts::device_ctx::device::NativeResource;
use crate::renderer::error::{ResourceError, Result};
use crate::renderer::resources::format::Format;
use crate::renderer::resources::texture::{ResourceFlags, TextureInfo};
use crate::renderer::resources::ResourceKind;

/// Kind-specific part of a request. Only the fields meaningful for the kind exist.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceDesc {
    Vertex {
        /// Keep the payload in host-visible memory instead of copying it to the device
        is_dynamic: bool,
    },
    Index,
    Constant,
    Buffer {
        num_elements: u32,
        format: Format,
    },
    RwBuffer {
        num_elements: u32,
        format: Format,
        add_counter: bool,
    },
    Texture {
        flags: ResourceFlags,
        info: Arc<TextureInfo>,
    },
    RwTexture {
        info: Arc<TextureInfo>,
    },
    RenderTarget {
        info: Arc<TextureInfo>,
    },
    DepthStencil {
        info: Arc<TextureInfo>,
    },
}

impl ResourceDesc {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Vertex { .. } => ResourceKind::Vertex,
            Self::Index => ResourceKind::Index,
            Self::Constant => ResourceKind::Constant,
            Self::Buffer { .. } => ResourceKind::Buffer,
            Self::RwBuffer { .. } => ResourceKind::RwBuffer,
            Self::Texture { .. } => ResourceKind::Texture,
            Self::RwTexture { .. } => ResourceKind::RwTexture,
            Self::RenderTarget { .. } => ResourceKind::RenderTarget,
            Self::DepthStencil { .. } => ResourceKind::DepthStencil,
        }
    }

    pub fn texture_info(&self) -> Option<&Arc<TextureInfo>> {
        match self {
            Self::Texture { info, .. }
            | Self::RwTexture { info }
            | Self::RenderTarget { info }
            | Self::DepthStencil { info } => Some(info),
            _ => None,
        }
    }
}

/// Everything a factory needs to build one resource.
///
/// `data_stride` of 0 means untyped, 1 means byte-addressable.
#[derive(Debug, Clone)]
pub struct ResourceDescriptor<'a> {
    pub name: &'a str,
    pub data: Option<&'a [u8]>,
    pub data_size: u64,
    pub data_stride: u32,
    /// Existing resource to adopt instead of allocating and uploading
    pub prepared_resource: Option<NativeResource>,
    pub desc: ResourceDesc,
}

impl<'a> ResourceDescriptor<'a> {
    fn with_payload(data: Option<&'a [u8]>, data_size: u64, data_stride: u32, desc: ResourceDesc) -> Self {
        Self {
            name: "",
            data,
            data_size,
            data_stride,
            prepared_resource: None,
            desc,
        }
    }

    pub fn vertices(data: &'a [u8], stride: u32) -> Self {
        Self::with_payload(
            Some(data),
            data.len() as u64,
            stride,
            ResourceDesc::Vertex { is_dynamic: false },
        )
    }

    pub fn indices(data: &'a [u8], stride: u32) -> Self {
        Self::with_payload(Some(data), data.len() as u64, stride, ResourceDesc::Index)
    }

    pub fn constants(data: &'a [u8]) -> Self {
        Self::with_payload(Some(data), data.len() as u64, 0, ResourceDesc::Constant)
    }

    pub fn buffer(data: &'a [u8], stride: u32, num_elements: u32, format: Format) -> Self {
        Self::with_payload(
            Some(data),
            data.len() as u64,
            stride,
            ResourceDesc::Buffer {
                num_elements,
                format,
            },
        )
    }

    /// A read/write buffer of `size` bytes; `data` seeds its contents when present
    pub fn rw_buffer(
        data: Option<&'a [u8]>,
        size: u64,
        stride: u32,
        num_elements: u32,
        format: Format,
    ) -> Self {
        Self::with_payload(
            data,
            size,
            stride,
            ResourceDesc::RwBuffer {
                num_elements,
                format,
                add_counter: false,
            },
        )
    }

    pub fn texture(data: Option<&'a [u8]>, info: Arc<TextureInfo>, flags: ResourceFlags) -> Self {
        let data_size = data.map_or(0, |data| data.len() as u64);
        Self::with_payload(data, data_size, 0, ResourceDesc::Texture { flags, info })
    }

    pub fn rw_texture(info: Arc<TextureInfo>) -> Self {
        Self::with_payload(None, 0, 0, ResourceDesc::RwTexture { info })
    }

    pub fn render_target(info: Arc<TextureInfo>) -> Self {
        Self::with_payload(None, 0, 0, ResourceDesc::RenderTarget { info })
    }

    pub fn depth_stencil(info: Arc<TextureInfo>) -> Self {
        Self::with_payload(None, 0, 0, ResourceDesc::DepthStencil { info })
    }

    pub fn named(mut self, name: &'a str) -> Self {
        self.name = name;
        self
    }

    pub fn prepared(mut self, resource: NativeResource) -> Self {
        self.prepared_resource = Some(resource);
        self
    }

    /// Only meaningful for vertex buffers
    pub fn dynamic(mut self) -> Self {
        if let ResourceDesc::Vertex { is_dynamic } = &mut self.desc {
            *is_dynamic = true;
        }
        self
    }

    /// Only meaningful for read/write buffers with a stride above 1
    pub fn with_counter(mut self) -> Self {
        if let ResourceDesc::RwBuffer { add_counter, .. } = &mut self.desc {
            *add_counter = true;
        }
        self
    }

    pub fn kind(&self) -> ResourceKind {
        self.desc.kind()
    }

    /// The payload, checked against `data_size`
    pub(crate) fn payload(&self) -> Result<Option<&'a [u8]>> {
        match self.data {
            Some(data) if data.len() as u64 > self.data_size => {
                Err(ResourceError::invalid(format!(
                    "payload of {} bytes exceeds the declared size of {} bytes",
                    data.len(),
                    self.data_size,
                )))
            }
            data => Ok(data),
        }
    }

    /// Rejects empty buffers before anything is allocated
    pub(crate) fn require_buffer_size(&self) -> Result<u64> {
        if self.data_size == 0 {
            return Err(ResourceError::invalid(format!(
                "{:?} buffer '{}' has no size",
                self.kind(),
                self.name,
            )));
        }
        Ok(self.data_size)
    }
}
