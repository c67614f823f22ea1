use super::app_data;
use super::error::EngineError;

use anyhow::Result;
use log::*;
use vulkanalia::prelude::v1_2::*;
use vulkanalia::vk::KhrSurfaceExtension;

/// Queue capabilities of a single queue family, as far as selection cares.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FamilySupport {
    pub graphics: bool,
    pub present: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilyIndices {
    pub unsafe fn get(instance: &Instance, data: &app_data::Data, physical_device: vk::PhysicalDevice) -> Result<Self> {
        let properties = instance.get_physical_device_queue_family_properties(physical_device);

        let mut families = Vec::with_capacity(properties.len());
        for (index, properties) in properties.iter().enumerate() {
            families.push(FamilySupport {
                graphics: properties.queue_flags.contains(vk::QueueFlags::GRAPHICS),
                present: instance.get_physical_device_surface_support_khr(physical_device, index as u32, data.surface)?,
            });
        }

        let indices = Self::select(&families)?;
        debug!("Queue families: graphics = {}, present = {}.", indices.graphics, indices.present);

        Ok(indices)
    }

    /// Prefers one family that can both draw and present; otherwise picks
    /// the first graphics family and the first present family separately.
    pub fn select(families: &[FamilySupport]) -> Result<Self> {
        if let Some(shared) = families.iter().position(|f| f.graphics && f.present) {
            return Ok(Self { graphics: shared as u32, present: shared as u32 });
        }

        let graphics = families
            .iter()
            .position(|f| f.graphics)
            .ok_or(EngineError::MissingQueueFamily("graphics"))?;
        let present = families
            .iter()
            .position(|f| f.present)
            .ok_or(EngineError::MissingQueueFamily("present"))?;

        Ok(Self { graphics: graphics as u32, present: present as u32 })
    }

    pub fn is_shared(&self) -> bool {
        self.graphics == self.present
    }

    /// Image sharing mode and the family list that goes with it.
    pub fn sharing(&self) -> (vk::SharingMode, Vec<u32>) {
        if self.is_shared() {
            (vk::SharingMode::EXCLUSIVE, vec![])
        } else {
            (vk::SharingMode::CONCURRENT, vec![self.graphics, self.present])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAPHICS: FamilySupport = FamilySupport { graphics: true, present: false };
    const PRESENT: FamilySupport = FamilySupport { graphics: false, present: true };
    const BOTH: FamilySupport = FamilySupport { graphics: true, present: true };
    const NONE: FamilySupport = FamilySupport { graphics: false, present: false };

    #[test]
    fn prefers_a_single_shared_family() {
        let indices = QueueFamilyIndices::select(&[GRAPHICS, PRESENT, BOTH]).unwrap();
        assert_eq!(indices, QueueFamilyIndices { graphics: 2, present: 2 });
        assert!(indices.is_shared());
        assert_eq!(indices.sharing(), (vk::SharingMode::EXCLUSIVE, vec![]));
    }

    #[test]
    fn falls_back_to_distinct_families() {
        let indices = QueueFamilyIndices::select(&[NONE, PRESENT, GRAPHICS]).unwrap();
        assert_eq!(indices, QueueFamilyIndices { graphics: 2, present: 1 });
        assert_eq!(indices.sharing(), (vk::SharingMode::CONCURRENT, vec![2, 1]));
    }

    #[test]
    fn fails_without_present_support() {
        let error = QueueFamilyIndices::select(&[GRAPHICS, NONE]).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<EngineError>(),
            Some(EngineError::MissingQueueFamily("present"))
        ));
    }

    #[test]
    fn fails_without_any_family() {
        assert!(QueueFamilyIndices::select(&[]).is_err());
    }
}
