use super::app_data;
use super::app_defines;

use anyhow::Result;
use vulkanalia::prelude::v1_2::*;

/// One image-acquired semaphore, one render-finished semaphore and one
/// signaled fence per frame slot.
pub unsafe fn create_sync_objects(device: &Device, data: &mut app_data::Data) -> Result<()> {
    let semaphore_info = vk::SemaphoreCreateInfo::builder();
    let fence_info = vk::FenceCreateInfo::builder().flags(vk::FenceCreateFlags::SIGNALED);

    for _ in 0..app_defines::MAX_FRAMES_IN_FLIGHT {
        data.image_available_semaphores.push(device.create_semaphore(&semaphore_info, None)?);
        data.render_finished_semaphores.push(device.create_semaphore(&semaphore_info, None)?);
        data.in_flight_fences.push(device.create_fence(&fence_info, None)?);
    }

    Ok(())
}

pub unsafe fn destroy_sync_objects(device: &Device, data: &mut app_data::Data) {
    data.in_flight_fences.drain(..).for_each(|f| device.destroy_fence(f, None));
    data.render_finished_semaphores.drain(..).for_each(|s| device.destroy_semaphore(s, None));
    data.image_available_semaphores.drain(..).for_each(|s| device.destroy_semaphore(s, None));
}
