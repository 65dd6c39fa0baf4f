/// "Contexts" group the collaborators the factories work against: the device and command
/// recording capabilities on one side, the allocators and the factory registry on the other.

pub mod device_ctx;
pub mod resource_ctx;
