use super::app_data;
use super::app_defines;
use super::error::{EngineError, SuitabilityError};
use super::queue_family;
use super::swapchain;

use anyhow::Result;
use std::collections::HashSet;
use log::*;
use vulkanalia::prelude::v1_2::*;

/// The properties a physical device is scored on.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceTraits {
    pub geometry_shader: bool,
    pub discrete: bool,
    pub api_version: u32,
    pub max_image_dimension_2d: u32,
}

impl DeviceTraits {
    unsafe fn query(instance: &Instance, physical_device: vk::PhysicalDevice) -> Self {
        let properties = instance.get_physical_device_properties(physical_device);
        let features = instance.get_physical_device_features(physical_device);

        Self {
            geometry_shader: features.geometry_shader == vk::TRUE,
            discrete: properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU,
            api_version: properties.api_version,
            max_image_dimension_2d: properties.limits.max_image_dimension_2d,
        }
    }

    /// Zero means unusable.
    pub fn score(&self) -> u64 {
        if !self.geometry_shader {
            return 0;
        }

        let mut score = 0;
        if self.discrete {
            score += 1000;
        }
        if self.api_version >= app_defines::MIN_API_VERSION {
            score += 10000;
        }

        score + u64::from(self.max_image_dimension_2d)
    }
}

/// Vulkan 1.3 features the renderer cannot run without.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RequiredFeatures {
    pub dynamic_rendering: bool,
    pub synchronization2: bool,
}

impl RequiredFeatures {
    unsafe fn query(instance: &Instance, physical_device: vk::PhysicalDevice) -> Self {
        let mut features_13 = vk::PhysicalDeviceVulkan13Features::default();
        let mut features = vk::PhysicalDeviceFeatures2::builder().push_next(&mut features_13);
        instance.get_physical_device_features2(physical_device, &mut features);

        Self {
            dynamic_rendering: features_13.dynamic_rendering == vk::TRUE,
            synchronization2: features_13.synchronization2 == vk::TRUE,
        }
    }

    pub fn check(&self) -> Result<(), SuitabilityError> {
        if !self.dynamic_rendering {
            return Err(SuitabilityError("dynamic rendering support"));
        }
        if !self.synchronization2 {
            return Err(SuitabilityError("synchronization2 support"));
        }
        Ok(())
    }
}

/// Index of the best scored device. The first one wins on ties.
pub fn pick_best(scores: &[u64]) -> Result<usize> {
    if scores.is_empty() {
        return Err(EngineError::NoPhysicalDevice.into());
    }

    let mut best = 0;
    for (index, score) in scores.iter().enumerate().skip(1) {
        if *score > scores[best] {
            best = index;
        }
    }

    if scores[best] == 0 {
        Err(EngineError::UnsuitablePhysicalDevice.into())
    } else {
        Ok(best)
    }
}

pub unsafe fn pick_physical_device(instance: &Instance, data: &mut app_data::Data) -> Result<()> {
    let physical_devices = instance.enumerate_physical_devices()?;

    let mut scores = Vec::with_capacity(physical_devices.len());
    for physical_device in &physical_devices {
        let properties = instance.get_physical_device_properties(*physical_device);

        let score = match check_physical_device(instance, data, *physical_device) {
            Ok(()) => DeviceTraits::query(instance, *physical_device).score(),
            Err(error) => {
                warn!("Skipping physical device (`{}`): {}", properties.device_name, error);
                0
            }
        };

        debug!("Physical device (`{}`) scored {}.", properties.device_name, score);
        scores.push(score);
    }

    let best = pick_best(&scores)?;
    data.physical_device = physical_devices[best];
    data.queue_families = queue_family::QueueFamilyIndices::get(instance, data, data.physical_device)?;

    let properties = instance.get_physical_device_properties(data.physical_device);
    info!("Selected physical device (`{}`).", properties.device_name);

    Ok(())
}

unsafe fn check_physical_device(instance: &Instance, data: &app_data::Data, physical_device: vk::PhysicalDevice) -> Result<()> {
    queue_family::QueueFamilyIndices::get(instance, data, physical_device)?;
    check_physical_device_extensions(instance, physical_device)?;
    RequiredFeatures::query(instance, physical_device).check()?;

    let support = swapchain::SwapchainSupport::get(instance, data, physical_device)?;
    if support.formats.is_empty() || support.present_modes.is_empty() {
        return Err(SuitabilityError("swapchain support").into());
    }

    Ok(())
}

unsafe fn check_physical_device_extensions(instance: &Instance, physical_device: vk::PhysicalDevice) -> Result<()> {
    let extensions = instance.enumerate_device_extension_properties(physical_device, None)?
        .iter().map(|e| e.extension_name).collect::<HashSet<_>>();

    if app_defines::DEVICE_EXTENSIONS.iter().all(|e| extensions.contains(e)) {
        Ok(())
    } else {
        Err(SuitabilityError("required device extensions").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn traits(discrete: bool, api_version: u32, max_image_dimension_2d: u32) -> DeviceTraits {
        DeviceTraits { geometry_shader: true, discrete, api_version, max_image_dimension_2d }
    }

    #[test]
    fn missing_geometry_shader_scores_zero() {
        let device = DeviceTraits { geometry_shader: false, ..traits(true, app_defines::MIN_API_VERSION, 16384) };
        assert_eq!(device.score(), 0);
    }

    #[test]
    fn score_adds_discrete_api_and_image_dimension() {
        assert_eq!(traits(false, vk::make_version(1, 2, 0), 4096).score(), 4096);
        assert_eq!(traits(true, vk::make_version(1, 2, 0), 4096).score(), 5096);
        assert_eq!(traits(true, app_defines::MIN_API_VERSION, 4096).score(), 15096);
    }

    #[test]
    fn api_version_outweighs_discrete_gpu() {
        let integrated_modern = traits(false, app_defines::MIN_API_VERSION, 8192);
        let discrete_old = traits(true, vk::make_version(1, 1, 0), 16384);
        assert!(integrated_modern.score() > discrete_old.score());
    }

    #[test]
    fn devices_without_vulkan_13_features_are_rejected() {
        let full = RequiredFeatures { dynamic_rendering: true, synchronization2: true };
        assert!(full.check().is_ok());

        let error = RequiredFeatures { dynamic_rendering: false, ..full }.check().unwrap_err();
        assert_eq!(error.to_string(), "Missing dynamic rendering support.");

        let error = RequiredFeatures { synchronization2: false, ..full }.check().unwrap_err();
        assert_eq!(error.to_string(), "Missing synchronization2 support.");

        assert!(RequiredFeatures::default().check().is_err());
    }

    #[test]
    fn picks_highest_score_first_on_ties() {
        assert_eq!(pick_best(&[10, 30, 20]).unwrap(), 1);
        assert_eq!(pick_best(&[30, 30]).unwrap(), 0);
    }

    #[test]
    fn no_devices_is_an_error() {
        let error = pick_best(&[]).unwrap_err();
        assert!(matches!(error.downcast_ref::<EngineError>(), Some(EngineError::NoPhysicalDevice)));
    }

    #[test]
    fn all_zero_scores_is_an_error() {
        let error = pick_best(&[0, 0]).unwrap_err();
        assert!(matches!(error.downcast_ref::<EngineError>(), Some(EngineError::UnsuitablePhysicalDevice)));
    }
}
