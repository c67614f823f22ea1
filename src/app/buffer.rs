use super::app_data;
use super::error::EngineError;

use anyhow::Result;
use log::*;
use std::ffi::c_void;
use std::mem::{self, size_of};
use std::ptr::copy_nonoverlapping as memcpy;
use std::sync::atomic::{AtomicUsize, Ordering};
use vulkanalia::prelude::v1_2::*;

static LEAKED_BUFFERS: AtomicUsize = AtomicUsize::new(0);

/// A buffer together with the memory bound to it.
///
/// Not `Clone`: exactly one owner frees the pair, and `destroy` consumes it
/// so the handles can't be touched afterwards. Freeing needs the `Device`,
/// which `Drop` has no access to, so a buffer dropped without `destroy` is
/// only reported, never freed.
#[derive(Debug)]
pub struct AllocatedBuffer {
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
}

impl AllocatedBuffer {
    pub unsafe fn create(
        instance: &Instance,
        device: &Device,
        data: &app_data::Data,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> Result<Self> {
        // Buffer

        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = device.create_buffer(&buffer_info, None)?;

        // Memory

        let requirements = device.get_buffer_memory_requirements(buffer);
        let memory_properties = instance.get_physical_device_memory_properties(data.physical_device);

        let memory_type_index = match get_memory_type_index(&memory_properties, properties, requirements) {
            Ok(index) => index,
            Err(e) => {
                device.destroy_buffer(buffer, None);
                return Err(e);
            }
        };

        let memory_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);

        let memory = match device.allocate_memory(&memory_info, None) {
            Ok(memory) => memory,
            Err(e) => {
                device.destroy_buffer(buffer, None);
                return Err(e.into());
            }
        };

        let allocated = Self { buffer, memory, size };
        if let Err(e) = device.bind_buffer_memory(buffer, memory, 0) {
            allocated.destroy(device);
            return Err(e.into());
        }

        Ok(allocated)
    }

    pub fn buffer(&self) -> vk::Buffer {
        self.buffer
    }

    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    /// Copies `items` into the start of the buffer. The memory must be host visible.
    pub unsafe fn write<T: Copy>(&self, device: &Device, items: &[T]) -> Result<()> {
        let memory = device.map_memory(self.memory, 0, self.size, vk::MemoryMapFlags::empty())?;
        memcpy(items.as_ptr(), memory.cast(), items.len());
        device.unmap_memory(self.memory);
        Ok(())
    }

    pub unsafe fn map(&self, device: &Device) -> Result<*mut c_void> {
        Ok(device.map_memory(self.memory, 0, self.size, vk::MemoryMapFlags::empty())?)
    }

    /// The buffer goes first, then its memory.
    pub unsafe fn destroy(self, device: &Device) {
        device.destroy_buffer(self.buffer, None);
        device.free_memory(self.memory, None);
        mem::forget(self);
    }
}

impl Drop for AllocatedBuffer {
    fn drop(&mut self) {
        if !self.buffer.is_null() {
            LEAKED_BUFFERS.fetch_add(1, Ordering::Relaxed);
            warn!("Buffer {:?} ({} bytes) dropped without being destroyed.", self.buffer, self.size);
        }
    }
}

/// Buffers dropped without `destroy` since startup.
pub fn leaked_buffers() -> usize {
    LEAKED_BUFFERS.load(Ordering::Relaxed)
}

/// First memory type allowed by `requirements` whose flags include `properties`.
pub fn get_memory_type_index(
    memory: &vk::PhysicalDeviceMemoryProperties,
    properties: vk::MemoryPropertyFlags,
    requirements: vk::MemoryRequirements,
) -> Result<u32> {
    (0..memory.memory_type_count)
        .find(|i| {
            let suitable = (requirements.memory_type_bits & (1 << i)) != 0;
            let memory_type = memory.memory_types[*i as usize];
            suitable && memory_type.property_flags.contains(properties)
        })
        .ok_or_else(|| EngineError::NoSuitableMemoryType.into())
}

/// Uploads `items` into a new device-local buffer through a host-visible
/// staging buffer. Blocks until the graphics queue is idle.
pub unsafe fn create_device_local<T: Copy>(
    instance: &Instance,
    device: &Device,
    data: &app_data::Data,
    items: &[T],
    usage: vk::BufferUsageFlags,
) -> Result<AllocatedBuffer> {
    let size = (size_of::<T>() * items.len()) as vk::DeviceSize;

    let staging = AllocatedBuffer::create(
        instance,
        device,
        data,
        size,
        vk::BufferUsageFlags::TRANSFER_SRC,
        vk::MemoryPropertyFlags::HOST_COHERENT | vk::MemoryPropertyFlags::HOST_VISIBLE,
    )?;

    let result = upload_from_staging(instance, device, data, &staging, items, usage);
    staging.destroy(device);

    trace!("Uploaded {} bytes with usage {:?}.", size, usage);

    result
}

unsafe fn upload_from_staging<T: Copy>(
    instance: &Instance,
    device: &Device,
    data: &app_data::Data,
    staging: &AllocatedBuffer,
    items: &[T],
    usage: vk::BufferUsageFlags,
) -> Result<AllocatedBuffer> {
    staging.write(device, items)?;

    let destination = AllocatedBuffer::create(
        instance,
        device,
        data,
        staging.size(),
        vk::BufferUsageFlags::TRANSFER_DST | usage,
        vk::MemoryPropertyFlags::DEVICE_LOCAL,
    )?;

    if let Err(e) = copy_buffer(device, data, staging.buffer(), destination.buffer(), staging.size()) {
        destination.destroy(device);
        return Err(e);
    }

    Ok(destination)
}

/// Records and submits a one-time copy, then waits for the graphics queue.
pub unsafe fn copy_buffer(
    device: &Device,
    data: &app_data::Data,
    source: vk::Buffer,
    destination: vk::Buffer,
    size: vk::DeviceSize,
) -> Result<()> {
    let info = vk::CommandBufferAllocateInfo::builder()
        .level(vk::CommandBufferLevel::PRIMARY)
        .command_pool(data.command_pool)
        .command_buffer_count(1);

    let command_buffer = device.allocate_command_buffers(&info)?[0];

    let result = record_and_submit_copy(device, data, command_buffer, source, destination, size);
    device.free_command_buffers(data.command_pool, &[command_buffer]);

    result
}

unsafe fn record_and_submit_copy(
    device: &Device,
    data: &app_data::Data,
    command_buffer: vk::CommandBuffer,
    source: vk::Buffer,
    destination: vk::Buffer,
    size: vk::DeviceSize,
) -> Result<()> {
    let info = vk::CommandBufferBeginInfo::builder()
        .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

    device.begin_command_buffer(command_buffer, &info)?;

    let regions = vk::BufferCopy::builder().src_offset(0).dst_offset(0).size(size);
    device.cmd_copy_buffer(command_buffer, source, destination, &[regions]);

    device.end_command_buffer(command_buffer)?;

    let command_buffers = &[command_buffer];
    let info = vk::SubmitInfo::builder().command_buffers(command_buffers);

    device.queue_submit(data.graphics_queue, &[info], vk::Fence::null())?;
    device.queue_wait_idle(data.graphics_queue)?;

    Ok(())
}

/// A host-visible uniform buffer that stays mapped for its whole life.
#[derive(Debug)]
pub struct UniformBuffer {
    buffer: AllocatedBuffer,
    mapped: *mut c_void,
}

impl UniformBuffer {
    pub unsafe fn create<T>(instance: &Instance, device: &Device, data: &app_data::Data) -> Result<Self> {
        let buffer = AllocatedBuffer::create(
            instance,
            device,
            data,
            size_of::<T>() as vk::DeviceSize,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            vk::MemoryPropertyFlags::HOST_COHERENT | vk::MemoryPropertyFlags::HOST_VISIBLE,
        )?;

        match buffer.map(device) {
            Ok(mapped) => Ok(Self { buffer, mapped }),
            Err(e) => {
                buffer.destroy(device);
                Err(e)
            }
        }
    }

    pub fn buffer(&self) -> vk::Buffer {
        self.buffer.buffer()
    }

    pub fn size(&self) -> vk::DeviceSize {
        self.buffer.size()
    }

    /// The slot owning this buffer must not have GPU work in flight.
    pub unsafe fn update<T: Copy>(&self, value: &T) {
        memcpy(value, self.mapped.cast(), 1);
    }

    pub unsafe fn destroy(self, device: &Device) {
        device.unmap_memory(self.buffer.memory);
        self.buffer.destroy(device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_properties(flags: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut properties = vk::PhysicalDeviceMemoryProperties::default();
        properties.memory_type_count = flags.len() as u32;
        for (i, flags) in flags.iter().enumerate() {
            properties.memory_types[i].property_flags = *flags;
        }
        properties
    }

    fn requirements(memory_type_bits: u32) -> vk::MemoryRequirements {
        vk::MemoryRequirements { size: 256, alignment: 16, memory_type_bits }
    }

    fn host() -> vk::MemoryPropertyFlags {
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT
    }

    #[test]
    fn picks_first_matching_type() {
        let memory = memory_properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            host(),
            host() | vk::MemoryPropertyFlags::HOST_CACHED,
        ]);

        assert_eq!(get_memory_type_index(&memory, vk::MemoryPropertyFlags::DEVICE_LOCAL, requirements(0b111)).unwrap(), 0);
        assert_eq!(get_memory_type_index(&memory, host(), requirements(0b111)).unwrap(), 1);
    }

    #[test]
    fn requested_flags_must_be_a_subset() {
        let memory = memory_properties(&[vk::MemoryPropertyFlags::HOST_VISIBLE, host()]);
        assert_eq!(get_memory_type_index(&memory, host(), requirements(0b11)).unwrap(), 1);
    }

    #[test]
    fn respects_requirement_bitmask() {
        let memory = memory_properties(&[host(), host()]);
        assert_eq!(get_memory_type_index(&memory, host(), requirements(0b10)).unwrap(), 1);
    }

    #[test]
    fn dropping_without_destroy_is_counted() {
        let before = leaked_buffers();

        drop(AllocatedBuffer { buffer: vk::Buffer::from_raw(1), memory: vk::DeviceMemory::null(), size: 64 });
        assert!(leaked_buffers() > before);
    }

    #[test]
    fn fails_without_matching_type() {
        let memory = memory_properties(&[vk::MemoryPropertyFlags::DEVICE_LOCAL]);
        let error = get_memory_type_index(&memory, host(), requirements(0b1)).unwrap_err();
        assert!(matches!(error.downcast_ref::<EngineError>(), Some(EngineError::NoSuitableMemoryType)));
    }
}
