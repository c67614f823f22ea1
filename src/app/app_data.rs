use super::buffer::UniformBuffer;
use super::queue_family::QueueFamilyIndices;

use vulkanalia::prelude::v1_2::*;

/// The Vulkan data structure.
#[derive(Debug, Default)]
pub struct Data {
    pub messenger: vk::DebugUtilsMessengerEXT,

    pub surface: vk::SurfaceKHR,

    pub physical_device: vk::PhysicalDevice,
    pub queue_families: QueueFamilyIndices,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,

    pub swapchain_format: vk::Format,
    pub swapchain_extent: vk::Extent2D,
    pub swapchain: vk::SwapchainKHR,
    pub swapchain_images: Vec<vk::Image>,
    pub swapchain_image_views: Vec<vk::ImageView>,

    // Pipeline
    pub descriptor_set_layout: vk::DescriptorSetLayout,
    pub pipeline_layout: vk::PipelineLayout,
    pub pipeline: vk::Pipeline,

    pub command_pool: vk::CommandPool,

    // Frame slots
    pub command_buffers: Vec<vk::CommandBuffer>,
    pub uniform_buffers: Vec<UniformBuffer>,
    pub descriptor_pool: vk::DescriptorPool,
    pub descriptor_sets: Vec<vk::DescriptorSet>,

    // Sync Objects
    pub image_available_semaphores: Vec<vk::Semaphore>,
    pub render_finished_semaphores: Vec<vk::Semaphore>,
    pub in_flight_fences: Vec<vk::Fence>,
}
