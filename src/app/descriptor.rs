use super::app_data;
use super::app_defines;
use super::buffer::UniformBuffer;
use super::camera::UniformBufferObject;

use anyhow::Result;
use vulkanalia::prelude::v1_2::*;

/// Set 0, binding 0: the per-frame view/projection uniform buffer.
pub unsafe fn create_descriptor_set_layout(device: &Device, data: &mut app_data::Data) -> Result<()> {
    let ubo_binding = vk::DescriptorSetLayoutBinding::builder()
        .binding(0)
        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
        .descriptor_count(1)
        .stage_flags(vk::ShaderStageFlags::VERTEX);

    let bindings = &[ubo_binding];
    let info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(bindings);

    data.descriptor_set_layout = device.create_descriptor_set_layout(&info, None)?;

    Ok(())
}

pub unsafe fn create_uniform_buffers(instance: &Instance, device: &Device, data: &mut app_data::Data) -> Result<()> {
    for _ in 0..app_defines::MAX_FRAMES_IN_FLIGHT {
        let uniform_buffer = UniformBuffer::create::<UniformBufferObject>(instance, device, data)?;
        data.uniform_buffers.push(uniform_buffer);
    }

    Ok(())
}

pub unsafe fn create_descriptor_pool(device: &Device, data: &mut app_data::Data) -> Result<()> {
    let ubo_size = vk::DescriptorPoolSize::builder()
        .type_(vk::DescriptorType::UNIFORM_BUFFER)
        .descriptor_count(app_defines::MAX_FRAMES_IN_FLIGHT as u32);

    let pool_sizes = &[ubo_size];
    let info = vk::DescriptorPoolCreateInfo::builder()
        .pool_sizes(pool_sizes)
        .max_sets(app_defines::MAX_FRAMES_IN_FLIGHT as u32);

    data.descriptor_pool = device.create_descriptor_pool(&info, None)?;

    Ok(())
}

/// One set per frame slot, each pointing at that slot's uniform buffer.
/// The sets outlive swapchain rebuilds.
pub unsafe fn create_descriptor_sets(device: &Device, data: &mut app_data::Data) -> Result<()> {
    // Allocate

    let layouts = vec![data.descriptor_set_layout; app_defines::MAX_FRAMES_IN_FLIGHT];
    let info = vk::DescriptorSetAllocateInfo::builder().descriptor_pool(data.descriptor_pool).set_layouts(&layouts);

    data.descriptor_sets = device.allocate_descriptor_sets(&info)?;

    // Update

    for (set, uniform_buffer) in data.descriptor_sets.iter().zip(&data.uniform_buffers) {
        let info = vk::DescriptorBufferInfo::builder()
            .buffer(uniform_buffer.buffer())
            .offset(0)
            .range(uniform_buffer.size());

        let buffer_info = &[info];
        let ubo_write = vk::WriteDescriptorSet::builder()
            .dst_set(*set)
            .dst_binding(0)
            .dst_array_element(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .buffer_info(buffer_info);

        device.update_descriptor_sets(&[ubo_write], &[] as &[vk::CopyDescriptorSet]);
    }

    Ok(())
}

pub unsafe fn destroy(device: &Device, data: &mut app_data::Data) {
    // Destroying the pool frees its sets.
    device.destroy_descriptor_pool(data.descriptor_pool, None);
    data.descriptor_sets.clear();
    data.uniform_buffers.drain(..).for_each(|u| u.destroy(device));
    device.destroy_descriptor_set_layout(data.descriptor_set_layout, None);
}
