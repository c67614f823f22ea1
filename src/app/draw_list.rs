use log::*;
use nalgebra_glm as glm;
use vulkanalia::prelude::v1_2::*;

/// Everything the command recorder needs to draw one object.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DrawCommand {
    pub vertex_buffer: vk::Buffer,
    pub index_buffer: vk::Buffer,
    pub index_count: u32,
    pub model: glm::Mat4,
}

/// Draw requests for the next frame, in submission order, with a hard cap.
#[derive(Clone, Debug)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
    capacity: usize,
    rejected: usize,
}

impl DrawList {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { commands: Vec::with_capacity(capacity), capacity, rejected: 0 }
    }

    /// Returns `false` and drops the command when the list is full.
    pub fn push(&mut self, command: DrawCommand) -> bool {
        if self.commands.len() >= self.capacity {
            if self.rejected == 0 {
                warn!("Draw list full ({} objects), dropping draw requests.", self.capacity);
            }
            self.rejected += 1;
            return false;
        }

        self.commands.push(command);
        true
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Requests dropped since the last `clear`.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn iter(&self) -> impl Iterator<Item = &DrawCommand> {
        self.commands.iter()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.rejected = 0;
    }
}
