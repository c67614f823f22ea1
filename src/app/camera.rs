use nalgebra_glm as glm;

/// The view and projection matrices shared by every object in a frame.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct UniformBufferObject {
    pub view: glm::Mat4,
    pub proj: glm::Mat4,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: glm::Vec3,
    pub target: glm::Vec3,
    pub up: glm::Vec3,
    pub near: f32,
    pub far: f32,
    /// Vertical field of view, in radians.
    pub fov_y: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: glm::vec3(0.0, 0.0, 2.0),
            target: glm::vec3(0.0, 0.0, 0.0),
            up: glm::vec3(0.0, 1.0, 0.0),
            near: 0.1,
            far: 10.0,
            fov_y: 45f32.to_radians(),
        }
    }
}

impl Camera {
    pub fn view(&self) -> glm::Mat4 {
        glm::look_at(&self.position, &self.target, &self.up)
    }

    /// Depth range [0, 1] with Y pointing down, as Vulkan clip space expects.
    pub fn projection(&self, aspect: f32) -> glm::Mat4 {
        let mut proj = glm::perspective_rh_zo(aspect, self.fov_y, self.near, self.far);
        proj[(1, 1)] *= -1.0;
        proj
    }

    pub fn uniforms(&self, width: u32, height: u32) -> UniformBufferObject {
        let aspect = if height == 0 { 1.0 } else { width as f32 / height as f32 };
        UniformBufferObject { view: self.view(), proj: self.projection(aspect) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn origin_lands_in_front_of_default_camera() {
        let camera = Camera::default();
        let view = camera.view();

        let origin = view * glm::vec4(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(origin, glm::vec4(0.0, 0.0, -2.0, 1.0), epsilon = 1e-6);
    }

    #[test]
    fn projection_flips_y_and_maps_depth_to_unit_range() {
        let camera = Camera::default();
        let proj = camera.projection(1.0);

        let up = proj * glm::vec4(0.0, 1.0, -1.0, 1.0);
        assert!(up.y / up.w < 0.0);

        let near = proj * glm::vec4(0.0, 0.0, -camera.near, 1.0);
        let far = proj * glm::vec4(0.0, 0.0, -camera.far, 1.0);
        assert_relative_eq!(near.z / near.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn uniforms_follow_surface_aspect() {
        let camera = Camera::default();
        let wide = camera.uniforms(1600, 800);
        let square = camera.uniforms(800, 800);

        assert_relative_eq!(wide.proj[(0, 0)] * 2.0, square.proj[(0, 0)], epsilon = 1e-6);
        assert_eq!(wide.view, square.view);
    }

    #[test]
    fn zero_height_does_not_divide_by_zero() {
        let uniforms = Camera::default().uniforms(800, 0);
        assert!(uniforms.proj.iter().all(|v| v.is_finite()));
    }
}
