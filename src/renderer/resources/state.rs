use crate::renderer::contexts::device_ctx::command_recorder::{CommandRecorder, TransitionBarrier};
use crate::renderer::contexts::device_ctx::device::NativeResource;

/// GPU access mode a resource is tracked in
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    #[default]
    Common,
    VertexAndConstantBuffer,
    IndexBuffer,
    RenderTarget,
    UnorderedAccess,
    DepthWrite,
    DepthRead,
    NonPixelShaderResource,
    PixelShaderResource,
    CopyDest,
    CopySource,
    /// Host-visible upload memory; also the combined read state for buffers
    GenericRead,
}

impl ResourceState {
    pub fn is_writable(&self) -> bool {
        matches!(
            self,
            Self::RenderTarget | Self::UnorderedAccess | Self::DepthWrite | Self::CopyDest
        )
    }
}

/// Records the barrier that moves `resource` from `before` to `after` and returns the new state.
///
/// Every state change a factory or a record makes goes through here. Identical states record
/// nothing.
pub fn transition(
    recorder: &mut dyn CommandRecorder,
    resource: NativeResource,
    before: ResourceState,
    after: ResourceState,
) -> ResourceState {
    if before == after {
        return after;
    }

    log::trace!("Barrier {:?}: {:?} -> {:?}", resource, before, after);
    recorder.resource_barrier(&TransitionBarrier {
        resource,
        before,
        after,
    });

    after
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::internals::command_list::{Command, SoftwareCommandList};

    #[test]
    fn identical_states_record_nothing() {
        let mut list = SoftwareCommandList::new();
        let resource = NativeResource::from_raw(7).unwrap();

        let state = transition(&mut list, resource, ResourceState::Common, ResourceState::Common);
        assert_eq!(state, ResourceState::Common);
        assert!(list.commands().is_empty());

        let state = transition(&mut list, resource, ResourceState::Common, ResourceState::CopyDest);
        assert_eq!(state, ResourceState::CopyDest);
        assert_eq!(
            list.commands(),
            &[Command::Barrier(TransitionBarrier {
                resource,
                before: ResourceState::Common,
                after: ResourceState::CopyDest,
            })]
        );
    }
}
