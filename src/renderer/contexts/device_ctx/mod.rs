pub mod command_recorder;
pub mod device;

pub use command_recorder::{CommandRecorder, TextureCopyLocation, TransitionBarrier};
pub use device::{
    CopyableFootprints, CpuDescriptor, GpuDescriptor, MappedPtr, NativeBufferDesc, NativeResource,
    NativeTextureDesc, RenderDevice, SubresourceFootprint,
};
