use std::collections::HashMap;
use std::ptr::NonNull;
use std::sync::{Mutex, MutexGuard};
use gpu_allocator::MemoryLocation;
use smallvec::SmallVec;
use crate::renderer::config::align_up;
use crate::renderer::contexts::device_ctx::command_recorder::TextureCopyLocation;
use crate::renderer::contexts::device_ctx::device::{
    CopyableFootprints, CpuDescriptor, MappedPtr, NativeBufferDesc, NativeResource,
    NativeTextureDesc, RenderDevice, SubresourceFootprint,
};
use crate::renderer::error::{ResourceError, Result};
use crate::renderer::internals::command_list::{Command, SoftwareCommandList};
use crate::renderer::resources::state::ResourceState;
use crate::renderer::resources::texture::{ResourceFlags, TextureInfo};
use crate::renderer::resources::view::{
    ConstantBufferViewDesc, DepthStencilViewDesc, RenderTargetViewDesc, ShaderResourceViewDesc,
    UnorderedAccessViewDesc,
};

pub const ROW_PITCH_ALIGNMENT: u64 = 256;
pub const PLACEMENT_ALIGNMENT: u64 = 512;
pub const ADDRESS_ALIGNMENT: u64 = 64 * 1024;

/// Zeroed host memory that keeps its address for its whole lifetime
struct HostMemory {
    ptr: NonNull<u8>,
    len: usize,
}

// The memory is uniquely owned; the device only touches it while holding its resource lock.
unsafe impl Send for HostMemory {}

impl HostMemory {
    fn zeroed(len: usize) -> Self {
        let boxed = vec![0u8; len].into_boxed_slice();
        let ptr = NonNull::new(Box::into_raw(boxed) as *mut u8).unwrap_or(NonNull::dangling());
        Self { ptr, len }
    }

    fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for HostMemory {
    fn drop(&mut self) {
        let slice = std::ptr::slice_from_raw_parts_mut(self.ptr.as_ptr(), self.len);
        drop(unsafe { Box::from_raw(slice) });
    }
}

enum ResourceShape {
    Buffer {
        location: MemoryLocation,
    },
    Texture {
        info: TextureInfo,
        layout: CopyableFootprints,
    },
}

struct SoftwareResource {
    name: String,
    shape: ResourceShape,
    memory: HostMemory,
    gpu_address: u64,
    state: ResourceState,
}

/// A view written into a descriptor slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatedView {
    ShaderResource {
        resource: Option<NativeResource>,
        desc: ShaderResourceViewDesc,
    },
    UnorderedAccess {
        resource: Option<NativeResource>,
        counter: Option<NativeResource>,
        desc: UnorderedAccessViewDesc,
    },
    ConstantBuffer(ConstantBufferViewDesc),
    RenderTarget {
        resource: NativeResource,
        desc: RenderTargetViewDesc,
    },
    DepthStencil {
        resource: NativeResource,
        desc: DepthStencilViewDesc,
    },
}

struct DeviceState {
    resources: HashMap<NativeResource, SoftwareResource>,
    views: HashMap<CpuDescriptor, CreatedView>,
    next_id: u64,
    next_address: u64,
}

/// A `RenderDevice` that keeps every resource in host memory.
///
/// Executing a `SoftwareCommandList` replays its copies and checks every barrier against the
/// tracked state, which makes it usable as a reference in tests.
pub struct SoftwareDevice {
    state: Mutex<DeviceState>,
}

impl Default for SoftwareDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareDevice {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DeviceState {
                resources: HashMap::new(),
                views: HashMap::new(),
                next_id: 1,
                next_address: ADDRESS_ALIGNMENT,
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, DeviceState>> {
        self.state
            .lock()
            .map_err(|e| ResourceError::backend(e.to_string()))
    }

    fn insert(
        &self,
        name: &str,
        shape: ResourceShape,
        size: u64,
        state: ResourceState,
    ) -> Result<NativeResource> {
        let len = usize::try_from(size)
            .map_err(|_| ResourceError::backend(format!("'{name}' is too large for host memory")))?;

        let mut guard = self.lock()?;
        let resource = NativeResource::from_raw(guard.next_id)
            .ok_or_else(|| ResourceError::backend("resource ids exhausted"))?;
        guard.next_id += 1;
        let gpu_address = guard.next_address;
        guard.next_address += align_up(size.max(1), ADDRESS_ALIGNMENT);

        log::trace!("Created {:?} '{}' ({} bytes) at {:#x}", resource, name, size, gpu_address);
        guard.resources.insert(
            resource,
            SoftwareResource {
                name: name.to_owned(),
                shape,
                memory: HostMemory::zeroed(len),
                gpu_address,
                state,
            },
        );

        Ok(resource)
    }

    pub fn contains(&self, resource: NativeResource) -> bool {
        self.lock()
            .map(|guard| guard.resources.contains_key(&resource))
            .unwrap_or(false)
    }

    pub fn resource_count(&self) -> usize {
        self.lock().map(|guard| guard.resources.len()).unwrap_or(0)
    }

    pub fn name(&self, resource: NativeResource) -> Option<String> {
        let guard = self.lock().ok()?;
        guard.resources.get(&resource).map(|r| r.name.clone())
    }

    /// State the device believes `resource` is in after the commands executed so far
    pub fn state(&self, resource: NativeResource) -> Option<ResourceState> {
        let guard = self.lock().ok()?;
        guard.resources.get(&resource).map(|r| r.state)
    }

    pub fn location(&self, resource: NativeResource) -> Option<MemoryLocation> {
        let guard = self.lock().ok()?;
        match guard.resources.get(&resource)?.shape {
            ResourceShape::Buffer { location } => Some(location),
            ResourceShape::Texture { .. } => None,
        }
    }

    /// The view last written into `slot`
    pub fn view(&self, slot: CpuDescriptor) -> Option<CreatedView> {
        let guard = self.lock().ok()?;
        guard.views.get(&slot).copied()
    }

    pub fn read_buffer(&self, resource: NativeResource) -> Result<Vec<u8>> {
        let guard = self.lock()?;
        let stored = get(&guard, resource)?;
        match stored.shape {
            ResourceShape::Buffer { .. } => Ok(stored.memory.as_slice().to_vec()),
            ResourceShape::Texture { .. } => Err(ResourceError::backend(format!(
                "{resource:?} is a texture, not a buffer"
            ))),
        }
    }

    /// Contents of one subresource with its rows packed back to back
    pub fn read_subresource(&self, resource: NativeResource, index: u32) -> Result<Vec<u8>> {
        let guard = self.lock()?;
        let stored = get(&guard, resource)?;
        let footprint = texture_footprint(stored, resource, index)?;

        let bytes = stored.memory.as_slice();
        let mut packed = Vec::with_capacity(
            (footprint.row_size * footprint.num_rows as u64 * footprint.depth as u64) as usize,
        );
        for_each_row(&footprint, |row| {
            let start = row as usize;
            packed.extend_from_slice(&bytes[start..start + footprint.row_size as usize]);
        });

        Ok(packed)
    }

    /// Replays `list` in order, stopping at the first invalid command
    pub fn execute(&self, list: &SoftwareCommandList) -> Result<()> {
        let mut guard = self.lock()?;
        for command in list.commands() {
            match *command {
                Command::Barrier(barrier) => {
                    let stored = get_mut(&mut guard, barrier.resource)?;
                    if stored.state != barrier.before {
                        return Err(ResourceError::backend(format!(
                            "barrier on '{}' expects {:?} but the resource is in {:?}",
                            stored.name, barrier.before, stored.state,
                        )));
                    }
                    stored.state = barrier.after;
                }
                Command::CopyBuffer {
                    dst,
                    dst_offset,
                    src,
                    src_offset,
                    size,
                } => {
                    let data = read_range(get(&guard, src)?, src_offset, size)?;
                    let stored = get_mut(&mut guard, dst)?;
                    require_copy_dest(stored)?;
                    write_range(stored, dst_offset, &data)?;
                }
                Command::CopyTexture { dst, src } => {
                    let (src_resource, src_footprint) = resolve(&guard, src)?;
                    let source = get(&guard, src_resource)?;
                    let mut rows = Vec::new();
                    for_each_row(&src_footprint, |row| rows.push(row));
                    let data = rows
                        .into_iter()
                        .map(|row| read_range(source, row, src_footprint.row_size))
                        .collect::<Result<Vec<_>>>()?;

                    let (dst_resource, dst_footprint) = resolve(&guard, dst)?;
                    if dst_footprint.row_size != src_footprint.row_size
                        || dst_footprint.num_rows != src_footprint.num_rows
                        || dst_footprint.depth != src_footprint.depth
                    {
                        return Err(ResourceError::backend(format!(
                            "texture copy footprints differ: {src_footprint:?} vs {dst_footprint:?}"
                        )));
                    }
                    let stored = get_mut(&mut guard, dst_resource)?;
                    require_copy_dest(stored)?;
                    let mut rows = Vec::new();
                    for_each_row(&dst_footprint, |row| rows.push(row));
                    for (row, bytes) in rows.into_iter().zip(&data) {
                        write_range(stored, row, bytes)?;
                    }
                }
            }
        }

        log::trace!("Executed {} commands", list.commands().len());
        Ok(())
    }
}

fn get(state: &DeviceState, resource: NativeResource) -> Result<&SoftwareResource> {
    state
        .resources
        .get(&resource)
        .ok_or_else(|| ResourceError::backend(format!("unknown resource {resource:?}")))
}

fn get_mut(state: &mut DeviceState, resource: NativeResource) -> Result<&mut SoftwareResource> {
    state
        .resources
        .get_mut(&resource)
        .ok_or_else(|| ResourceError::backend(format!("unknown resource {resource:?}")))
}

fn require_copy_dest(stored: &SoftwareResource) -> Result<()> {
    if stored.state != ResourceState::CopyDest {
        return Err(ResourceError::backend(format!(
            "copy into '{}' while it is in {:?}",
            stored.name, stored.state,
        )));
    }
    Ok(())
}

fn read_range(stored: &SoftwareResource, offset: u64, size: u64) -> Result<Vec<u8>> {
    let bytes = stored.memory.as_slice();
    let end = offset + size;
    if end > bytes.len() as u64 {
        return Err(ResourceError::backend(format!(
            "read of {offset}..{end} overruns '{}' ({} bytes)",
            stored.name,
            bytes.len(),
        )));
    }
    Ok(bytes[offset as usize..end as usize].to_vec())
}

fn write_range(stored: &mut SoftwareResource, offset: u64, data: &[u8]) -> Result<()> {
    let len = stored.memory.len as u64;
    let end = offset + data.len() as u64;
    if end > len {
        return Err(ResourceError::backend(format!(
            "write of {offset}..{end} overruns '{}' ({len} bytes)",
            stored.name,
        )));
    }
    stored.memory.as_mut_slice()[offset as usize..end as usize].copy_from_slice(data);
    Ok(())
}

fn texture_footprint(
    stored: &SoftwareResource,
    resource: NativeResource,
    index: u32,
) -> Result<SubresourceFootprint> {
    match &stored.shape {
        ResourceShape::Texture { layout, .. } => {
            layout.footprints.get(index as usize).copied().ok_or_else(|| {
                ResourceError::backend(format!("{resource:?} has no subresource {index}"))
            })
        }
        ResourceShape::Buffer { .. } => Err(ResourceError::backend(format!(
            "{resource:?} is a buffer, not a texture"
        ))),
    }
}

fn resolve(
    state: &DeviceState,
    location: TextureCopyLocation,
) -> Result<(NativeResource, SubresourceFootprint)> {
    match location {
        TextureCopyLocation::Subresource { resource, index } => {
            let footprint = texture_footprint(get(state, resource)?, resource, index)?;
            Ok((resource, footprint))
        }
        TextureCopyLocation::PlacedFootprint {
            resource,
            footprint,
        } => Ok((resource, footprint)),
    }
}

/// Start offset of every valid row of a footprint, slice by slice
fn for_each_row(footprint: &SubresourceFootprint, mut f: impl FnMut(u64)) {
    for z in 0..footprint.depth as u64 {
        for y in 0..footprint.num_rows as u64 {
            f(footprint.offset + z * footprint.slice_pitch() + y * footprint.row_pitch);
        }
    }
}

/// Layout of `num_subresources` subresources of `info` inside a linear buffer
pub fn footprints(
    info: &TextureInfo,
    first_subresource: u32,
    num_subresources: u32,
    base_offset: u64,
) -> CopyableFootprints {
    let mut footprints = SmallVec::new();
    let mut offset = base_offset;

    for index in first_subresource..first_subresource + num_subresources {
        let (mip, _) = info.subresource_coords(index);
        let (width, height, depth) = info.mip_extent(mip);
        let (row_size, num_rows) = info.format.surface_info(width, height);

        offset = align_up(offset, PLACEMENT_ALIGNMENT);
        let footprint = SubresourceFootprint {
            offset,
            format: info.format,
            width,
            height,
            depth,
            row_pitch: align_up(row_size, ROW_PITCH_ALIGNMENT),
            num_rows,
            row_size,
        };
        offset += footprint.slice_pitch() * depth as u64;
        footprints.push(footprint);
    }

    CopyableFootprints {
        footprints,
        total_bytes: offset - base_offset,
    }
}

impl RenderDevice for SoftwareDevice {
    fn create_buffer(&self, desc: &NativeBufferDesc<'_>) -> Result<NativeResource> {
        if desc.size == 0 {
            return Err(ResourceError::backend(format!("buffer '{}' has no size", desc.name)));
        }
        self.insert(
            desc.name,
            ResourceShape::Buffer {
                location: desc.location,
            },
            desc.size,
            desc.initial_state,
        )
    }

    fn create_texture(&self, desc: &NativeTextureDesc<'_>) -> Result<NativeResource> {
        desc.info.validate()?;
        if desc.flags.contains(ResourceFlags::ALLOW_DEPTH_STENCIL) && !desc.info.format.is_depth() {
            return Err(ResourceError::backend(format!(
                "depth-stencil texture '{}' has color format {:?} ({:?})",
                desc.name, desc.info.format, desc.flags,
            )));
        }
        if let Some(clear) = desc.clear_value {
            if clear.format() != desc.info.format {
                return Err(ResourceError::backend(format!(
                    "clear value for '{}' is {:?}, texture is {:?}",
                    desc.name,
                    clear.format(),
                    desc.info.format,
                )));
            }
        }
        let layout = footprints(desc.info, 0, desc.info.subresource_count(), 0);
        let size = layout.total_bytes;
        self.insert(
            desc.name,
            ResourceShape::Texture {
                info: *desc.info,
                layout,
            },
            size,
            desc.initial_state,
        )
    }

    fn destroy_resource(&self, resource: NativeResource) {
        match self.lock() {
            Ok(mut guard) => {
                if guard.resources.remove(&resource).is_none() {
                    log::warn!("Destroying unknown resource {:?}", resource);
                }
            }
            Err(e) => log::error!("Failed to destroy {:?}: {}", resource, e),
        }
    }

    fn map(&self, resource: NativeResource) -> Result<MappedPtr> {
        let guard = self.lock()?;
        let stored = get(&guard, resource)?;
        match stored.shape {
            ResourceShape::Buffer { location } if location != MemoryLocation::GpuOnly => {
                Ok(MappedPtr::new(stored.memory.ptr))
            }
            _ => Err(ResourceError::backend(format!(
                "'{}' is not host visible",
                stored.name
            ))),
        }
    }

    fn gpu_address(&self, resource: NativeResource) -> u64 {
        self.lock()
            .ok()
            .and_then(|guard| guard.resources.get(&resource).map(|r| r.gpu_address))
            .unwrap_or(0)
    }

    fn copyable_footprints(
        &self,
        info: &TextureInfo,
        first_subresource: u32,
        num_subresources: u32,
        base_offset: u64,
    ) -> CopyableFootprints {
        footprints(info, first_subresource, num_subresources, base_offset)
    }

    fn create_shader_resource_view(
        &self,
        resource: Option<NativeResource>,
        desc: &ShaderResourceViewDesc,
        slot: CpuDescriptor,
    ) {
        self.write_view(slot, CreatedView::ShaderResource { resource, desc: *desc });
    }

    fn create_unordered_access_view(
        &self,
        resource: Option<NativeResource>,
        counter: Option<NativeResource>,
        desc: &UnorderedAccessViewDesc,
        slot: CpuDescriptor,
    ) {
        self.write_view(
            slot,
            CreatedView::UnorderedAccess {
                resource,
                counter,
                desc: *desc,
            },
        );
    }

    fn create_constant_buffer_view(&self, desc: &ConstantBufferViewDesc, slot: CpuDescriptor) {
        self.write_view(slot, CreatedView::ConstantBuffer(*desc));
    }

    fn create_render_target_view(
        &self,
        resource: NativeResource,
        desc: &RenderTargetViewDesc,
        slot: CpuDescriptor,
    ) {
        self.write_view(slot, CreatedView::RenderTarget { resource, desc: *desc });
    }

    fn create_depth_stencil_view(
        &self,
        resource: NativeResource,
        desc: &DepthStencilViewDesc,
        slot: CpuDescriptor,
    ) {
        self.write_view(slot, CreatedView::DepthStencil { resource, desc: *desc });
    }
}

impl SoftwareDevice {
    fn write_view(&self, slot: CpuDescriptor, view: CreatedView) {
        match self.lock() {
            Ok(mut guard) => {
                guard.views.insert(slot, view);
            }
            Err(e) => log::error!("Failed to write view into {:?}: {}", slot, e),
        }
    }
}
