use nalgebra_glm as glm;
use std::mem::size_of;
use vulkanalia::prelude::v1_2::*;

/// One interleaved vertex: a 2D position followed by an RGB color.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Vertex {
    pub pos: glm::Vec2,
    pub color: glm::Vec3,
}

impl Vertex {
    pub fn new(pos: glm::Vec2, color: glm::Vec3) -> Self {
        Self { pos, color }
    }

    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription::builder()
            .binding(0)
            .stride(size_of::<Vertex>() as u32)
            .input_rate(vk::VertexInputRate::VERTEX)
            .build()
    }

    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 2] {
        let pos = vk::VertexInputAttributeDescription::builder()
            .binding(0)
            .location(0)
            .format(vk::Format::R32G32_SFLOAT)
            .offset(0)
            .build();
        let color = vk::VertexInputAttributeDescription::builder()
            .binding(0)
            .location(1)
            .format(vk::Format::R32G32B32_SFLOAT)
            .offset(size_of::<glm::Vec2>() as u32)
            .build();
        [pos, color]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_tightly_interleaved() {
        assert_eq!(size_of::<Vertex>(), 5 * size_of::<f32>());

        let binding = Vertex::binding_description();
        assert_eq!(binding.stride, 20);

        let [pos, color] = Vertex::attribute_descriptions();
        assert_eq!((pos.location, pos.offset), (0, 0));
        assert_eq!((color.location, color.offset), (1, 8));
        assert_eq!(pos.binding, color.binding);
    }
}
