use super::error::EngineError;
use super::vertex::Vertex;

use anyhow::Result;
use nalgebra_glm as glm;
use std::f32::consts::TAU;

pub const CIRCLE_DEFAULT_SEGMENTS: u16 = 32;

/// Host-side geometry waiting to be uploaded: vertices plus the
/// counter-clockwise triangle list indexing them.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
}

impl Shape {
    /// Every vertex gets the same color.
    pub fn new(positions: &[glm::Vec2], color: glm::Vec3, indices: &[u16]) -> Self {
        Self {
            vertices: positions.iter().map(|p| Vertex::new(*p, color)).collect(),
            indices: indices.to_vec(),
        }
    }

    pub fn triangle(positions: [glm::Vec2; 3], color: glm::Vec3) -> Self {
        Self::new(&positions, color, &[0, 1, 2])
    }

    /// Axis-aligned rectangle spanning `origin` to `origin + size`.
    pub fn rectangle(origin: glm::Vec2, size: glm::Vec2, color: glm::Vec3) -> Self {
        let opposite = origin + size;
        let positions = [
            origin,
            glm::vec2(opposite.x, origin.y),
            opposite,
            glm::vec2(origin.x, opposite.y),
        ];

        Self::new(&positions, color, &[0, 1, 2, 2, 3, 0])
    }

    /// Fan triangulation from the first point. Only correct for convex outlines.
    pub fn convex_polygon(positions: &[glm::Vec2], color: glm::Vec3) -> Result<Self> {
        if positions.len() < 3 {
            return Err(EngineError::EmptyGeometry.into());
        }
        if positions.len() > usize::from(u16::MAX) {
            return Err(EngineError::InvalidIndices(format!("{} vertices exceed u16 indices", positions.len())).into());
        }

        let indices = (1..positions.len() as u16 - 1)
            .flat_map(|i| [0, i, i + 1])
            .collect::<Vec<_>>();

        Ok(Self::new(positions, color, &indices))
    }

    /// A center vertex surrounded by `segments` rim vertices.
    pub fn circle(center: glm::Vec2, radius: f32, color: glm::Vec3, segments: u16) -> Result<Self> {
        if segments < 3 || segments == u16::MAX {
            return Err(EngineError::InvalidIndices(format!("{} circle segments", segments)).into());
        }

        let mut positions = Vec::with_capacity(usize::from(segments) + 1);
        positions.push(center);
        for i in 0..segments {
            let angle = TAU * f32::from(i) / f32::from(segments);
            positions.push(center + glm::vec2(angle.cos(), angle.sin()) * radius);
        }

        let indices = (1..=segments)
            .flat_map(|i| [0, i, if i == segments { 1 } else { i + 1 }])
            .collect::<Vec<_>>();

        Ok(Self::new(&positions, color, &indices))
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn validate(&self) -> Result<()> {
        if self.vertices.is_empty() || self.indices.is_empty() {
            return Err(EngineError::EmptyGeometry.into());
        }
        if self.indices.len() % 3 != 0 {
            return Err(EngineError::InvalidIndices(format!("{} indices is not a triangle list", self.indices.len())).into());
        }
        if let Some(index) = self.indices.iter().find(|i| usize::from(**i) >= self.vertices.len()) {
            return Err(EngineError::InvalidIndices(format!("index {} out of {} vertices", index, self.vertices.len())).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn positions(shape: &Shape) -> Vec<(f32, f32)> {
        shape.vertices.iter().map(|v| (v.pos.x, v.pos.y)).collect()
    }

    #[test]
    fn rectangle_corners_and_indices() {
        let shape = Shape::rectangle(glm::vec2(-0.5, -0.5), glm::vec2(1.0, 1.0), glm::vec3(1.0, 1.0, 1.0));

        assert_eq!(positions(&shape), vec![(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)]);
        assert_eq!(shape.indices, vec![0, 1, 2, 2, 3, 0]);
        assert_eq!(shape.index_count(), 6);
        assert!(shape.validate().is_ok());
    }

    #[test]
    fn triangle_has_three_vertices() {
        let color = glm::vec3(1.0, 0.0, 0.0);
        let shape = Shape::triangle([glm::vec2(0.0, -0.5), glm::vec2(0.5, 0.5), glm::vec2(-0.5, 0.5)], color);

        assert_eq!(shape.vertices.len(), 3);
        assert_eq!(shape.indices, vec![0, 1, 2]);
        assert!(shape.vertices.iter().all(|v| v.color == color));
    }

    #[test]
    fn polygon_uses_a_fan() {
        let points = [
            glm::vec2(0.0, 0.0),
            glm::vec2(1.0, 0.0),
            glm::vec2(1.5, 1.0),
            glm::vec2(0.5, 1.5),
            glm::vec2(-0.5, 1.0),
        ];
        let shape = Shape::convex_polygon(&points, glm::vec3(0.0, 1.0, 0.0)).unwrap();

        assert_eq!(shape.indices, vec![0, 1, 2, 0, 2, 3, 0, 3, 4]);
        assert_eq!(shape.index_count(), (points.len() as u32 - 2) * 3);
    }

    #[test]
    fn polygon_needs_three_points() {
        assert!(Shape::convex_polygon(&[glm::vec2(0.0, 0.0), glm::vec2(1.0, 0.0)], glm::vec3(0.0, 0.0, 0.0)).is_err());
    }

    #[test]
    fn circle_closes_the_rim() {
        let shape = Shape::circle(glm::vec2(1.0, 2.0), 0.5, glm::vec3(0.0, 0.0, 1.0), 4).unwrap();

        assert_eq!(shape.vertices.len(), 5);
        assert_eq!(shape.indices, vec![0, 1, 2, 0, 2, 3, 0, 3, 4, 0, 4, 1]);
        assert_relative_eq!(shape.vertices[1].pos, glm::vec2(1.5, 2.0), epsilon = 1e-6);
        assert_relative_eq!(shape.vertices[2].pos, glm::vec2(1.0, 2.5), epsilon = 1e-6);
        assert!(shape.validate().is_ok());
    }

    #[test]
    fn circle_rim_is_at_radius() {
        let center = glm::vec2(0.0, 0.0);
        let shape = Shape::circle(center, 2.0, glm::vec3(1.0, 1.0, 1.0), CIRCLE_DEFAULT_SEGMENTS).unwrap();

        for vertex in &shape.vertices[1..] {
            assert_relative_eq!(glm::distance(&vertex.pos, &center), 2.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn circle_rejects_too_few_segments() {
        assert!(Shape::circle(glm::vec2(0.0, 0.0), 1.0, glm::vec3(0.0, 0.0, 0.0), 2).is_err());
    }

    #[test]
    fn validate_catches_bad_indices() {
        let color = glm::vec3(0.0, 0.0, 0.0);
        let points = [glm::vec2(0.0, 0.0), glm::vec2(1.0, 0.0), glm::vec2(0.0, 1.0)];

        assert!(Shape::new(&points, color, &[0, 1]).validate().is_err());
        assert!(Shape::new(&points, color, &[0, 1, 3]).validate().is_err());
        assert!(Shape::new(&[], color, &[]).validate().is_err());
    }
}
