pub mod allocator;

use std::collections::HashMap;
use std::sync::Arc;
use crate::renderer::config::FactoryConfig;
use crate::renderer::contexts::device_ctx::command_recorder::CommandRecorder;
use crate::renderer::contexts::device_ctx::device::RenderDevice;
use crate::renderer::contexts::resource_ctx::allocator::{
    BufferAllocator, DescriptorAllocator, TextureAllocator,
};
use crate::renderer::error::{ResourceError, Result};
use crate::renderer::factories::{
    BufferFactory, ConstantFactory, DepthStencilFactory, IndexFactory, RenderTargetFactory,
    ResourceFactory, RwBufferFactory, RwTextureFactory, TextureFactory, VertexFactory,
};
use crate::renderer::resources::descriptor::ResourceDescriptor;
use crate::renderer::resources::record::ResourceRecord;
use crate::renderer::resources::ResourceKind;

/// Responsibilities:
/// - Build one factory per resource kind, once
/// - Route resource requests to the factory of their kind
/// - Hold the allocators only weakly, through the factories
pub struct RenderResourceContext {
    factories: HashMap<ResourceKind, Box<dyn ResourceFactory>>,
}

impl RenderResourceContext {
    pub fn new(
        device: &Arc<dyn RenderDevice>,
        buffers: &Arc<dyn BufferAllocator>,
        textures: &Arc<dyn TextureAllocator>,
        descriptors: &Arc<dyn DescriptorAllocator>,
        config: FactoryConfig,
    ) -> Self {
        let factories: [Box<dyn ResourceFactory>; 9] = [
            Box::new(VertexFactory::new(device, buffers, config)),
            Box::new(IndexFactory::new(device, buffers, config)),
            Box::new(ConstantFactory::new(device, buffers, descriptors, config)),
            Box::new(BufferFactory::new(device, buffers, descriptors, config)),
            Box::new(RwBufferFactory::new(device, buffers, descriptors, config)),
            Box::new(TextureFactory::new(device, buffers, textures, descriptors, config)),
            Box::new(RwTextureFactory::new(device, textures, descriptors)),
            Box::new(RenderTargetFactory::new(device, textures, descriptors)),
            Box::new(DepthStencilFactory::new(device, textures, descriptors)),
        ];

        Self {
            factories: factories
                .into_iter()
                .map(|factory| (factory.kind(), factory))
                .collect(),
        }
    }

    pub fn factory(&self, kind: ResourceKind) -> Option<&dyn ResourceFactory> {
        self.factories.get(&kind).map(Box::as_ref)
    }

    /// Builds a resource of `kind`, appending its upload and barrier commands to `recorder`
    pub fn create_resource(
        &self,
        recorder: Option<&mut dyn CommandRecorder>,
        kind: ResourceKind,
        desc: &ResourceDescriptor<'_>,
    ) -> Result<ResourceRecord> {
        if desc.kind() != kind {
            return Err(ResourceError::invalid(format!(
                "'{}' is described as {:?} but was requested as {:?}",
                desc.name,
                desc.kind(),
                kind,
            )));
        }
        let factory = self.factory(kind).ok_or_else(|| {
            ResourceError::invalid(format!("no factory registered for {kind:?}"))
        })?;

        let record = factory.create_resource(recorder, desc)?;
        log::debug!(
            "Created {:?} '{}' ({:?}) in {:?}",
            kind,
            desc.name,
            record.native(),
            record.current_state(),
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::internals::SoftwareBackend;

    #[test]
    fn every_kind_has_a_factory() {
        let backend = SoftwareBackend::new(Default::default());
        let context = backend.resource_context(FactoryConfig::default());

        for kind in ResourceKind::ALL {
            let factory = context.factory(*kind).unwrap();
            assert_eq!(factory.kind(), *kind);
        }
    }
}
