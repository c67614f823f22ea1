use vulkanalia::prelude::v1_2::*;

/// Whether the validation layers should be enabled.
pub const VALIDATION_ENABLED: bool = cfg!(debug_assertions);
/// The name of the validation layers.
pub const VALIDATION_LAYER: vk::ExtensionName = vk::ExtensionName::from_bytes(b"VK_LAYER_KHRONOS_validation");

/// The required device extensions.
pub const DEVICE_EXTENSIONS: &[vk::ExtensionName] = &[vk::KHR_SWAPCHAIN_EXTENSION.name];

/// The Vulkan SDK version that started requiring the portability subset extension for macOS.
pub const PORTABILITY_MACOS_VERSION: vulkanalia::Version = vulkanalia::Version::new(1, 3, 216);

/// The maximum number of frames that can be processed concurrently.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Swapchain images requested before clamping to the surface limits.
pub const PREFERRED_IMAGE_COUNT: u32 = 3;

pub const ENGINE_NAME: &[u8] = b"vk2d\0";
pub const ENGINE_VERSION: u32 = vk::make_version(1, 0, 0);

/// Devices reporting at least this API version get a scoring bonus.
pub const MIN_API_VERSION: u32 = vk::make_version(1, 3, 0);

pub const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

// Shaders

pub const VERTEX_SHADER_PATH: &str = "shaders/vert.spv";
pub const FRAGMENT_SHADER_PATH: &str = "shaders/frag.spv";
pub const SHADER_ENTRY_POINT: &[u8] = b"main\0";
