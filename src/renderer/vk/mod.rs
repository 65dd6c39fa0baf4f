// This module maps the backend-neutral resource types onto their Vulkan equivalents.

pub mod util;
