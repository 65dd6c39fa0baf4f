use std::sync::Arc;
use crate::renderer::contexts::device_ctx::command_recorder::CommandRecorder;
use crate::renderer::contexts::device_ctx::device::NativeResource;
use crate::renderer::contexts::resource_ctx::allocator::{
    BufferAllocation, DescriptorAllocation, TextureAllocation,
};
use crate::renderer::error::{ResourceError, Result};
use crate::renderer::resources::state::{self, ResourceState};
use crate::renderer::resources::texture::TextureInfo;
use crate::renderer::resources::view::{
    ConstantBufferViewDesc, DepthStencilViewDesc, IndexBufferView, RenderTargetViewDesc,
    ShaderResourceViewDesc, UnorderedAccessViewDesc, VertexBufferView,
};
use crate::renderer::resources::ResourceKind;

/// The memory backing a record
#[derive(Debug)]
pub enum Payload {
    Buffer(BufferAllocation),
    Texture(TextureAllocation),
}

impl Payload {
    pub fn resource(&self) -> Option<NativeResource> {
        match self {
            Self::Buffer(buffer) => buffer.resource(),
            Self::Texture(texture) => texture.resource(),
        }
    }
}

/// Views created for a record, shaped by its kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceViews {
    Vertex(VertexBufferView),
    Index(IndexBufferView),
    Constant(ConstantBufferViewDesc),
    ShaderResource(ShaderResourceViewDesc),
    ReadWrite {
        srv: ShaderResourceViewDesc,
        uav: UnorderedAccessViewDesc,
    },
    RenderTarget {
        srv: ShaderResourceViewDesc,
        rtv: RenderTargetViewDesc,
    },
    DepthStencil {
        srv: ShaderResourceViewDesc,
        dsv: DepthStencilViewDesc,
    },
}

/// Descriptor-table slots owned by a record
#[derive(Debug, Default)]
pub struct DescriptorSlots {
    /// Shader-visible slots holding the record's views
    pub primary: Option<DescriptorAllocation>,
    /// CPU-only copy of the read/write view, used for clears
    pub shader_invisible: Option<DescriptorAllocation>,
    /// Render-target or depth-stencil slot
    pub target: Option<DescriptorAllocation>,
}

impl DescriptorSlots {
    fn release(&mut self) {
        for slot in [&mut self.primary, &mut self.shader_invisible, &mut self.target] {
            if let Some(mut allocation) = slot.take() {
                allocation.release();
            }
        }
    }
}

/// A fully constructed resource.
///
/// Owns its allocations and descriptor slots exclusively. `current_state` is the state every later
/// barrier has to start from.
#[derive(Debug, Default)]
pub struct ResourceRecord {
    pub(crate) kind: Option<ResourceKind>,
    pub(crate) payload: Option<Payload>,
    pub(crate) counter: Option<BufferAllocation>,
    pub(crate) views: Option<ResourceViews>,
    pub(crate) slots: DescriptorSlots,
    pub(crate) current_state: ResourceState,
    pub(crate) indices_count: Option<u32>,
    pub(crate) texture_info: Option<Arc<TextureInfo>>,
}

impl ResourceRecord {
    pub(crate) fn new(kind: ResourceKind, payload: Payload, state: ResourceState) -> Self {
        Self {
            kind: Some(kind),
            payload: Some(payload),
            counter: None,
            views: None,
            slots: DescriptorSlots::default(),
            current_state: state,
            indices_count: None,
            texture_info: None,
        }
    }

    pub fn kind(&self) -> Option<ResourceKind> {
        self.kind
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    pub fn native(&self) -> Option<NativeResource> {
        self.payload.as_ref().and_then(Payload::resource)
    }

    pub fn buffer(&self) -> Option<&BufferAllocation> {
        match &self.payload {
            Some(Payload::Buffer(buffer)) => Some(buffer),
            _ => None,
        }
    }

    pub fn texture(&self) -> Option<&TextureAllocation> {
        match &self.payload {
            Some(Payload::Texture(texture)) => Some(texture),
            _ => None,
        }
    }

    /// GPU virtual address of a buffer payload
    pub fn gpu_address(&self) -> Option<u64> {
        self.buffer().map(BufferAllocation::gpu_address)
    }

    pub fn counter(&self) -> Option<&BufferAllocation> {
        self.counter.as_ref()
    }

    pub fn views(&self) -> Option<&ResourceViews> {
        self.views.as_ref()
    }

    pub fn slots(&self) -> &DescriptorSlots {
        &self.slots
    }

    pub fn current_state(&self) -> ResourceState {
        self.current_state
    }

    pub fn indices_count(&self) -> Option<u32> {
        self.indices_count
    }

    pub fn texture_info(&self) -> Option<&Arc<TextureInfo>> {
        self.texture_info.as_ref()
    }

    pub fn is_released(&self) -> bool {
        self.payload.is_none()
            && self.counter.is_none()
            && self.slots.primary.is_none()
            && self.slots.shader_invisible.is_none()
            && self.slots.target.is_none()
    }

    /// Moves the resource to `after`, recording a barrier from the tracked state
    pub fn transition(
        &mut self,
        recorder: &mut dyn CommandRecorder,
        after: ResourceState,
    ) -> Result<()> {
        let resource = self.native().ok_or_else(|| {
            ResourceError::invalid("cannot transition a released resource record")
        })?;
        self.current_state = state::transition(recorder, resource, self.current_state, after);
        Ok(())
    }

    /// Returns every allocation and slot to its allocator and clears all handles.
    ///
    /// Calling this more than once, or on a record that was moved out of, does nothing.
    pub fn release(&mut self) {
        self.slots.release();
        if let Some(mut counter) = self.counter.take() {
            counter.release();
        }
        match self.payload.take() {
            Some(Payload::Buffer(mut buffer)) => buffer.release(),
            Some(Payload::Texture(mut texture)) => texture.release(),
            None => {}
        }

        self.views = None;
        self.indices_count = None;
        self.texture_info = None;
        self.current_state = ResourceState::Common;
    }
}

impl Drop for ResourceRecord {
    fn drop(&mut self) {
        self.release();
    }
}
