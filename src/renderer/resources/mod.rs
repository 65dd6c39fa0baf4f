/// "Resources" refers to the values callers exchange with the factories.
/// They describe what to build and own what was built.

pub mod descriptor;
pub mod format;
pub mod record;
pub mod state;
pub mod texture;
pub mod view;

/// Kind of resource a factory builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Vertex,
    Index,
    Constant,
    Buffer,
    RwBuffer,
    Texture,
    RwTexture,
    RenderTarget,
    DepthStencil,
}

impl ResourceKind {
    pub const ALL: &'static [Self] = &[
        Self::Vertex,
        Self::Index,
        Self::Constant,
        Self::Buffer,
        Self::RwBuffer,
        Self::Texture,
        Self::RwTexture,
        Self::RenderTarget,
        Self::DepthStencil,
    ];

    pub fn is_texture(&self) -> bool {
        matches!(
            self,
            Self::Texture | Self::RwTexture | Self::RenderTarget | Self::DepthStencil
        )
    }
}
