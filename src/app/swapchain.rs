use super::app_data;
use super::app_defines;
use super::error::EngineError;

use anyhow::Result;
use log::*;
use vulkanalia::prelude::v1_2::*;
use vulkanalia::vk::{KhrSurfaceExtension, KhrSwapchainExtension};
use winit::window::Window;

#[derive(Clone, Debug)]
pub struct SwapchainSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupport {
    pub unsafe fn get(instance: &Instance, data: &app_data::Data, physical_device: vk::PhysicalDevice) -> Result<Self> {
        Ok(Self {
            capabilities: instance.get_physical_device_surface_capabilities_khr(physical_device, data.surface)?,
            formats: instance.get_physical_device_surface_formats_khr(physical_device, data.surface)?,
            present_modes: instance.get_physical_device_surface_present_modes_khr(physical_device, data.surface)?,
        })
    }
}

/// sRGB with a non-linear color space if offered, the first format otherwise.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Result<vk::SurfaceFormatKHR> {
    let preferred = formats
        .iter()
        .cloned()
        .find(|f| f.format == vk::Format::B8G8R8A8_SRGB && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
        .or_else(|| {
            formats
                .iter()
                .cloned()
                .find(|f| f.format == vk::Format::R8G8B8A8_SRGB && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
        })
        .or_else(|| formats.first().cloned());

    preferred.ok_or_else(|| EngineError::NoSurfaceFormat.into())
}

pub fn choose_present_mode(present_modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    present_modes
        .iter()
        .cloned()
        .find(|m| *m == vk::PresentModeKHR::MAILBOX)
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// The surface's own extent when it reports one, the window size clamped
/// into the supported range otherwise.
pub fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    let min = capabilities.min_image_extent;
    let max = capabilities.max_image_extent;
    vk::Extent2D::builder()
        .width(width.clamp(min.width, max.width))
        .height(height.clamp(min.height, max.height))
        .build()
}

/// A max image count of zero means the surface declares no upper bound.
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let requested = app_defines::PREFERRED_IMAGE_COUNT.max(capabilities.min_image_count);
    if capabilities.max_image_count != 0 && requested > capabilities.max_image_count {
        capabilities.max_image_count
    } else {
        requested
    }
}

pub unsafe fn create(window: &Window, instance: &Instance, device: &Device, data: &mut app_data::Data) -> Result<()> {
    let support = SwapchainSupport::get(instance, data, data.physical_device)?;

    let surface_format = choose_surface_format(&support.formats)?;
    let present_mode = choose_present_mode(&support.present_modes);
    let size = window.inner_size();
    let extent = choose_extent(&support.capabilities, size.width, size.height);
    let image_count = choose_image_count(&support.capabilities);

    let (sharing_mode, queue_family_indices) = data.queue_families.sharing();

    let info = vk::SwapchainCreateInfoKHR::builder()
        .surface(data.surface)
        .min_image_count(image_count)
        .image_format(surface_format.format)
        .image_color_space(surface_format.color_space)
        .image_extent(extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
        .image_sharing_mode(sharing_mode)
        .queue_family_indices(&queue_family_indices)
        .pre_transform(support.capabilities.current_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(present_mode)
        .clipped(true)
        .old_swapchain(vk::SwapchainKHR::null());

    data.swapchain = device.create_swapchain_khr(&info, None)?;
    data.swapchain_images = device.get_swapchain_images_khr(data.swapchain)?;
    data.swapchain_format = surface_format.format;
    data.swapchain_extent = extent;

    info!(
        "Created swapchain ({}x{}, {:?}, {:?}, {} images).",
        extent.width,
        extent.height,
        surface_format.format,
        present_mode,
        data.swapchain_images.len(),
    );

    Ok(())
}

pub unsafe fn create_swapchain_image_views(device: &Device, data: &mut app_data::Data) -> Result<()> {
    let components = vk::ComponentMapping::builder()
        .r(vk::ComponentSwizzle::IDENTITY)
        .g(vk::ComponentSwizzle::IDENTITY)
        .b(vk::ComponentSwizzle::IDENTITY)
        .a(vk::ComponentSwizzle::IDENTITY)
        .build();

    let subresource_range = vk::ImageSubresourceRange::builder()
        .aspect_mask(vk::ImageAspectFlags::COLOR)
        .base_mip_level(0)
        .level_count(1)
        .base_array_layer(0)
        .layer_count(1)
        .build();

    data.swapchain_image_views = Vec::with_capacity(data.swapchain_images.len());
    for image in &data.swapchain_images {
        let info = vk::ImageViewCreateInfo::builder()
            .image(*image)
            .view_type(vk::ImageViewType::_2D)
            .format(data.swapchain_format)
            .components(components)
            .subresource_range(subresource_range);

        match device.create_image_view(&info, None) {
            Ok(view) => data.swapchain_image_views.push(view),
            Err(e) => {
                // Views are owned as a unit; drop the ones already built.
                destroy_swapchain_image_views(device, data);
                return Err(e.into());
            }
        }
    }

    Ok(())
}

pub unsafe fn destroy_swapchain_image_views(device: &Device, data: &mut app_data::Data) {
    data.swapchain_image_views.drain(..).for_each(|v| device.destroy_image_view(v, None));
}

/// Views first, then the swapchain that owns the images.
pub unsafe fn destroy(device: &Device, data: &mut app_data::Data) {
    destroy_swapchain_image_views(device, data);
    if !data.swapchain.is_null() {
        device.destroy_swapchain_khr(data.swapchain, None);
        data.swapchain = vk::SwapchainKHR::null();
    }
    data.swapchain_images.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capabilities(min_image_count: u32, max_image_count: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count,
            max_image_count,
            current_extent: vk::Extent2D { width: u32::MAX, height: u32::MAX },
            min_image_extent: vk::Extent2D { width: 100, height: 50 },
            max_image_extent: vk::Extent2D { width: 1920, height: 1080 },
            ..Default::default()
        }
    }

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR { format, color_space }
    }

    #[test]
    fn image_count_stays_within_surface_bounds() {
        for (min, max) in [(1, 0), (2, 3), (2, 2), (4, 8), (5, 0), (1, 1)] {
            let count = choose_image_count(&capabilities(min, max));
            assert!(count >= min, "{} < min {}", count, min);
            if max != 0 {
                assert!(count <= max, "{} > max {}", count, max);
            } else {
                assert!(count >= app_defines::PREFERRED_IMAGE_COUNT.max(min));
            }
        }
    }

    #[test]
    fn image_count_prefers_three() {
        assert_eq!(choose_image_count(&capabilities(2, 8)), 3);
        assert_eq!(choose_image_count(&capabilities(4, 8)), 4);
        assert_eq!(choose_image_count(&capabilities(1, 2)), 2);
    }

    #[test]
    fn extent_uses_surface_extent_when_defined() {
        let mut capabilities = capabilities(2, 0);
        capabilities.current_extent = vk::Extent2D { width: 640, height: 480 };
        let extent = choose_extent(&capabilities, 1000, 1000);
        assert_eq!((extent.width, extent.height), (640, 480));
    }

    #[test]
    fn extent_clamps_each_axis_to_its_own_bounds() {
        let capabilities = capabilities(2, 0);

        let extent = choose_extent(&capabilities, 4000, 10);
        assert_eq!((extent.width, extent.height), (1920, 50));

        let extent = choose_extent(&capabilities, 10, 4000);
        assert_eq!((extent.width, extent.height), (100, 1080));

        let extent = choose_extent(&capabilities, 800, 600);
        assert_eq!((extent.width, extent.height), (800, 600));
    }

    #[test]
    fn prefers_srgb_nonlinear_format() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        assert_eq!(choose_surface_format(&formats).unwrap(), formats[1]);
    }

    #[test]
    fn falls_back_to_first_format() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        assert_eq!(choose_surface_format(&formats).unwrap(), formats[0]);
    }

    #[test]
    fn no_formats_is_an_error_not_a_panic() {
        let error = choose_surface_format(&[]).unwrap_err();
        assert!(matches!(error.downcast_ref::<EngineError>(), Some(EngineError::NoSurfaceFormat)));
    }

    #[test]
    fn prefers_mailbox_then_fifo() {
        let modes = [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::FIFO];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::MAILBOX);

        let modes = [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO_RELAXED];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::FIFO);
    }
}
