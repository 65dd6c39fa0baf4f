use crate::renderer::contexts::device_ctx::command_recorder::{
    CommandRecorder, TextureCopyLocation, TransitionBarrier,
};
use crate::renderer::contexts::device_ctx::device::NativeResource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    CopyBuffer {
        dst: NativeResource,
        dst_offset: u64,
        src: NativeResource,
        src_offset: u64,
        size: u64,
    },
    CopyTexture {
        dst: TextureCopyLocation,
        src: TextureCopyLocation,
    },
    Barrier(TransitionBarrier),
}

/// Command list that only records, replayed later by `SoftwareDevice::execute`
#[derive(Debug, Default, Clone)]
pub struct SoftwareCommandList {
    commands: Vec<Command>,
}

impl SoftwareCommandList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn barriers(&self) -> impl Iterator<Item = &TransitionBarrier> {
        self.commands.iter().filter_map(|command| match command {
            Command::Barrier(barrier) => Some(barrier),
            _ => None,
        })
    }

    /// Number of buffer and texture copies
    pub fn copy_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| !matches!(command, Command::Barrier(_)))
            .count()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl CommandRecorder for SoftwareCommandList {
    fn copy_buffer_region(
        &mut self,
        dst: NativeResource,
        dst_offset: u64,
        src: NativeResource,
        src_offset: u64,
        size: u64,
    ) {
        self.commands.push(Command::CopyBuffer {
            dst,
            dst_offset,
            src,
            src_offset,
            size,
        });
    }

    fn copy_texture_region(&mut self, dst: TextureCopyLocation, src: TextureCopyLocation) {
        self.commands.push(Command::CopyTexture { dst, src });
    }

    fn resource_barrier(&mut self, barrier: &TransitionBarrier) {
        self.commands.push(Command::Barrier(*barrier));
    }
}
