use super::app_data;
use super::buffer::{self, AllocatedBuffer};
use super::draw_list::DrawCommand;
use super::shape::Shape;

use anyhow::Result;
use log::*;
use nalgebra_glm as glm;
use vulkanalia::prelude::v1_2::*;

/// Geometry living in device-local memory, drawn with its own model matrix.
///
/// Owned by the caller. It must only be destroyed once no frame that drew it
/// is still in flight (wait for the device to go idle first).
#[derive(Debug)]
pub struct DrawableObject {
    vertex_buffer: AllocatedBuffer,
    index_buffer: AllocatedBuffer,
    index_count: u32,
    transform: glm::Mat4,
}

impl DrawableObject {
    pub unsafe fn upload(instance: &Instance, device: &Device, data: &app_data::Data, shape: &Shape) -> Result<Self> {
        shape.validate()?;

        let vertex_buffer = buffer::create_device_local(
            instance,
            device,
            data,
            &shape.vertices,
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?;

        let index_buffer = match buffer::create_device_local(
            instance,
            device,
            data,
            &shape.indices,
            vk::BufferUsageFlags::INDEX_BUFFER,
        ) {
            Ok(index_buffer) => index_buffer,
            Err(e) => {
                vertex_buffer.destroy(device);
                return Err(e);
            }
        };

        debug!("Uploaded object ({} vertices, {} indices).", shape.vertices.len(), shape.indices.len());

        Ok(Self {
            vertex_buffer,
            index_buffer,
            index_count: shape.index_count(),
            transform: glm::identity(),
        })
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn transform(&self) -> &glm::Mat4 {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: glm::Mat4) {
        self.transform = transform;
    }

    /// Snapshot of what the recorder needs, taken at enqueue time.
    pub fn draw_command(&self) -> DrawCommand {
        DrawCommand {
            vertex_buffer: self.vertex_buffer.buffer(),
            index_buffer: self.index_buffer.buffer(),
            index_count: self.index_count,
            model: self.transform,
        }
    }

    pub unsafe fn destroy(self, device: &Device) {
        self.vertex_buffer.destroy(device);
        self.index_buffer.destroy(device);
    }
}
