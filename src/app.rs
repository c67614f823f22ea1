mod app_data;
mod app_defines;
mod buffer;
mod camera;
mod command_buffer;
mod config;
mod descriptor;
mod draw_list;
mod error;
mod frame;
mod instance;
mod logical_device;
mod object;
mod physical_device;
mod pipeline;
mod queue_family;
mod scene;
mod shader;
mod shape;
mod swapchain;
mod sync;
mod vertex;

pub use camera::Camera;
pub use config::{EngineConfig, Version};
pub use frame::FrameStatus;
pub use object::DrawableObject;
pub use scene::SceneGraph;
pub use shape::{Shape, CIRCLE_DEFAULT_SEGMENTS};

use draw_list::DrawList;
use frame::{FrameSlots, SlotState};

use anyhow::{anyhow, Result};
use log::*;
use nalgebra_glm as glm;
use vulkanalia::loader::{LibloadingLoader, LIBRARY};
use vulkanalia::prelude::v1_2::*;
use vulkanalia::window as vk_window;
use winit::window::Window;

use vulkanalia::vk::ExtDebugUtilsExtension;
use vulkanalia::vk::KhrSurfaceExtension;
use vulkanalia::vk::KhrSwapchainExtension;

/// The rendering engine: one window surface, one device, one pipeline and
/// two frames in flight.
#[derive(Debug)]
pub struct App {
    entry: Entry,
    instance: Instance,
    data: app_data::Data,
    device: Device,
    slots: FrameSlots,
    draw_list: DrawList,
    camera: Camera,
    /// Set by the window layer when the framebuffer changed size.
    pub resized: bool,
}

impl App {
    /// Brings up the whole Vulkan stack for `window`. On failure everything
    /// created so far is destroyed before the error is returned.
    pub unsafe fn create(window: &Window, config: &EngineConfig) -> Result<Self> {
        config.validate()?;

        let loader = LibloadingLoader::new(LIBRARY)?;
        let entry = Entry::new(loader).map_err(|b| anyhow!("{}", b))?;
        let mut data = app_data::Data::default();
        let instance = instance::create(window, &entry, config, &mut data)?;

        let device = match create_device(window, &entry, &instance, &mut data) {
            Ok(device) => device,
            Err(e) => {
                destroy_instance(&instance, &mut data);
                return Err(e);
            }
        };

        let mut app = Self {
            entry,
            instance,
            data,
            device,
            slots: FrameSlots::new(app_defines::MAX_FRAMES_IN_FLIGHT),
            draw_list: DrawList::with_capacity(config.max_draws),
            camera: Camera::default(),
            resized: false,
        };

        if let Err(e) = app.create_resources(window) {
            error!("Engine initialization failed: {}", e);
            app.destroy();
            return Err(e);
        }

        info!("Engine ready ({} draws per frame).", app.draw_list.capacity());

        Ok(app)
    }

    unsafe fn create_resources(&mut self, window: &Window) -> Result<()> {
        swapchain::create(window, &self.instance, &self.device, &mut self.data)?;
        swapchain::create_swapchain_image_views(&self.device, &mut self.data)?;

        descriptor::create_descriptor_set_layout(&self.device, &mut self.data)?;
        pipeline::create_pipeline(&self.device, &mut self.data)?;

        command_buffer::create_command_pool(&self.device, &mut self.data)?;

        descriptor::create_uniform_buffers(&self.instance, &self.device, &mut self.data)?;
        descriptor::create_descriptor_pool(&self.device, &mut self.data)?;
        descriptor::create_descriptor_sets(&self.device, &mut self.data)?;

        command_buffer::create_command_buffers(&self.device, &mut self.data)?;

        sync::create_sync_objects(&self.device, &mut self.data)?;

        Ok(())
    }

    // Objects

    /// Uploads single-colored geometry. Blocks until the copy has finished,
    /// so keep it out of the steady-state frame loop.
    pub unsafe fn upload_object(&self, positions: &[glm::Vec2], color: glm::Vec3, indices: &[u16]) -> Result<DrawableObject> {
        self.upload_shape(&Shape::new(positions, color, indices))
    }

    pub unsafe fn upload_shape(&self, shape: &Shape) -> Result<DrawableObject> {
        DrawableObject::upload(&self.instance, &self.device, &self.data, shape)
    }

    pub unsafe fn create_triangle(&self, positions: [glm::Vec2; 3], color: glm::Vec3) -> Result<DrawableObject> {
        self.upload_shape(&Shape::triangle(positions, color))
    }

    pub unsafe fn create_rectangle(&self, origin: glm::Vec2, size: glm::Vec2, color: glm::Vec3) -> Result<DrawableObject> {
        self.upload_shape(&Shape::rectangle(origin, size, color))
    }

    pub unsafe fn create_circle(&self, center: glm::Vec2, radius: f32, color: glm::Vec3, segments: u16) -> Result<DrawableObject> {
        self.upload_shape(&Shape::circle(center, radius, color, segments)?)
    }

    /// The object must not be referenced by a frame still in flight; call
    /// `wait_idle` first.
    pub unsafe fn destroy_object(&self, object: DrawableObject) {
        object.destroy(&self.device);
    }

    // Frame

    /// Queues `object` for the next frame. Returns `false` once the per-frame
    /// draw cap is reached; the request is dropped.
    pub fn draw(&mut self, object: &DrawableObject) -> bool {
        self.draw_list.push(object.draw_command())
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn update_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    /// Draws everything queued with `draw` since the last call. The queue is
    /// emptied whether or not the frame made it to the screen.
    pub unsafe fn render(&mut self, window: &Window) -> Result<FrameStatus> {
        let result = self.render_frame(window);
        trace!("Frame had {} draws, {} rejected.", self.draw_list.len(), self.draw_list.rejected());
        self.draw_list.clear();
        result
    }

    unsafe fn render_frame(&mut self, window: &Window) -> Result<FrameStatus> {
        match self.begin_frame(window)? {
            Some(image_index) => self.end_frame(window, image_index),
            None => Ok(FrameStatus::Skipped),
        }
    }

    /// Waits for the current slot and acquires an image. Returns `None` when
    /// the swapchain had to be rebuilt instead.
    unsafe fn begin_frame(&mut self, window: &Window) -> Result<Option<usize>> {
        let slot = self.slots.current();
        let in_flight_fence = *self
            .data
            .in_flight_fences
            .get(slot)
            .ok_or_else(|| anyhow!("Frame slot {} has no sync objects.", slot))?;

        self.device.wait_for_fences(&[in_flight_fence], true, u64::MAX)?;
        self.slots.fence_signaled();
        debug_assert_eq!(self.slots.state(slot), SlotState::Idle);
        self.slots.transition(SlotState::Acquiring)?;

        let result = self.device.acquire_next_image_khr(
            self.data.swapchain,
            u64::MAX,
            self.data.image_available_semaphores[slot],
            vk::Fence::null(),
        );

        let image_index = match result {
            Ok((image_index, _)) if !self.resized => image_index as usize,
            Ok(_) | Err(vk::ErrorCode::OUT_OF_DATE_KHR) => {
                self.slots.abandon();
                self.recreate_swapchain(window)?;
                return Ok(None);
            }
            Err(e) => {
                self.slots.abandon();
                return Err(anyhow!(e));
            }
        };

        if let Err(e) = self.device.reset_fences(&[in_flight_fence]) {
            self.slots.abandon();
            return Err(e.into());
        }
        self.slots.transition(SlotState::Recording)?;

        Ok(Some(image_index))
    }

    unsafe fn end_frame(&mut self, window: &Window, image_index: usize) -> Result<FrameStatus> {
        let slot = self.slots.current();

        if let Err(e) = self.submit(slot, image_index) {
            self.recover_unsubmitted_slot();
            return Err(e);
        }
        self.slots.transition(SlotState::Submitted)?;

        let wait_semaphores = &[self.data.render_finished_semaphores[slot]];
        let swapchains = &[self.data.swapchain];
        let image_indices = &[image_index as u32];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(wait_semaphores)
            .swapchains(swapchains)
            .image_indices(image_indices);

        let result = self.device.queue_present_khr(self.data.present_queue, &present_info);
        let (status, rebuild) = frame::present_outcome(result, self.resized)?;

        if rebuild {
            self.recreate_swapchain(window)?;
            return Ok(status);
        }

        self.slots.advance();

        Ok(status)
    }

    unsafe fn submit(&mut self, slot: usize, image_index: usize) -> Result<()> {
        command_buffer::record(&self.device, &self.data, slot, image_index, &self.draw_list)?;

        let extent = self.data.swapchain_extent;
        self.data.uniform_buffers[slot].update(&self.camera.uniforms(extent.width, extent.height));

        let wait_semaphores = &[self.data.image_available_semaphores[slot]];
        let wait_stages = &[command_buffer::ACQUIRE_WAIT_STAGE];
        let command_buffers = &[self.data.command_buffers[slot]];
        let signal_semaphores = &[self.data.render_finished_semaphores[slot]];
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(wait_semaphores)
            .wait_dst_stage_mask(wait_stages)
            .command_buffers(command_buffers)
            .signal_semaphores(signal_semaphores);

        self.device.queue_submit(self.data.graphics_queue, &[submit_info], self.data.in_flight_fences[slot])?;

        Ok(())
    }

    /// The current slot's fence was reset and its acquire semaphore signaled,
    /// but nothing was submitted. Fresh sync objects put every slot back into
    /// a waitable state.
    unsafe fn recover_unsubmitted_slot(&mut self) {
        if let Err(e) = self.device.device_wait_idle() {
            error!("Failed to wait for device idle after a failed submit: {}", e);
        }

        sync::destroy_sync_objects(&self.device, &mut self.data);
        match sync::create_sync_objects(&self.device, &mut self.data) {
            Ok(()) => self.slots.reset(),
            Err(e) => error!("Failed to recreate sync objects after a failed submit: {}", e),
        }
    }

    /// Rebuilds the swapchain and the per-slot sync objects. Command buffers
    /// and descriptor sets survive; the pipeline is only rebuilt if the
    /// surface format changed.
    unsafe fn recreate_swapchain(&mut self, window: &Window) -> Result<()> {
        self.device.device_wait_idle()?;

        let format = self.data.swapchain_format;
        swapchain::destroy(&self.device, &mut self.data);

        sync::destroy_sync_objects(&self.device, &mut self.data);
        sync::create_sync_objects(&self.device, &mut self.data)?;

        swapchain::create(window, &self.instance, &self.device, &mut self.data)?;
        swapchain::create_swapchain_image_views(&self.device, &mut self.data)?;

        if self.data.swapchain_format != format {
            warn!("Surface format changed from {:?} to {:?}, rebuilding pipeline.", format, self.data.swapchain_format);
            pipeline::destroy(&self.device, &mut self.data);
            pipeline::create_pipeline(&self.device, &mut self.data)?;
        }

        self.slots.reset();
        self.resized = false;

        Ok(())
    }

    pub unsafe fn wait_idle(&self) -> Result<()> {
        self.device.device_wait_idle()?;
        Ok(())
    }

    /// Destroys everything the engine owns, in reverse creation order.
    /// Objects handed out by `upload_*` must be destroyed before this.
    pub unsafe fn destroy(&mut self) {
        if let Err(e) = self.device.device_wait_idle() {
            warn!("Failed to wait for device idle during shutdown: {}", e);
        }

        sync::destroy_sync_objects(&self.device, &mut self.data);
        descriptor::destroy(&self.device, &mut self.data);
        pipeline::destroy(&self.device, &mut self.data);
        self.device.destroy_command_pool(self.data.command_pool, None);
        self.data.command_buffers.clear();
        swapchain::destroy(&self.device, &mut self.data);
        self.device.destroy_device(None);

        destroy_instance(&self.instance, &mut self.data);

        let leaked = buffer::leaked_buffers();
        if leaked > 0 {
            warn!("{} buffers were dropped without being destroyed.", leaked);
        }

        info!("Engine destroyed.");
    }
}

unsafe fn create_device(window: &Window, entry: &Entry, instance: &Instance, data: &mut app_data::Data) -> Result<Device> {
    data.surface = vk_window::create_surface(instance, window, window)?;
    physical_device::pick_physical_device(instance, data)?;
    logical_device::create(entry, instance, data)
}

unsafe fn destroy_instance(instance: &Instance, data: &mut app_data::Data) {
    instance.destroy_surface_khr(data.surface, None);

    if app_defines::VALIDATION_ENABLED {
        instance.destroy_debug_utils_messenger_ext(data.messenger, None);
    }

    instance.destroy_instance(None);
}
