use anyhow::{anyhow, Result};
use vulkanalia::prelude::v1_2::*;

/// Outcome of one `App::render` call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameStatus {
    /// The frame was submitted and handed to the presentation engine.
    Presented,
    /// Nothing reached the screen and the swapchain was rebuilt; try again next loop.
    Skipped,
}

/// Reads a present result: what the frame amounts to and whether the
/// swapchain has to be rebuilt. Only `OUT_OF_DATE` is recoverable; every
/// other error is returned even while a resize is pending.
pub fn present_outcome(result: Result<vk::SuccessCode, vk::ErrorCode>, resized: bool) -> Result<(FrameStatus, bool)> {
    match result {
        Ok(code) => Ok((FrameStatus::Presented, resized || code == vk::SuccessCode::SUBOPTIMAL_KHR)),
        Err(vk::ErrorCode::OUT_OF_DATE_KHR) => Ok((FrameStatus::Skipped, true)),
        Err(e) => Err(anyhow!(e)),
    }
}

/// Where a frame slot is in its acquire → record → submit cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SlotState {
    Idle,
    Acquiring,
    Recording,
    Submitted,
}

impl SlotState {
    fn next(self) -> Self {
        match self {
            SlotState::Idle => SlotState::Acquiring,
            SlotState::Acquiring => SlotState::Recording,
            SlotState::Recording => SlotState::Submitted,
            SlotState::Submitted => SlotState::Idle,
        }
    }
}

/// Tracks which frame slot is current and what each slot is doing.
///
/// A `Submitted` slot only becomes `Idle` again once its fence has been
/// waited on at the start of the next frame that uses it.
#[derive(Clone, Debug)]
pub struct FrameSlots {
    states: Vec<SlotState>,
    current: usize,
}

impl FrameSlots {
    pub fn new(count: usize) -> Self {
        Self { states: vec![SlotState::Idle; count], current: 0 }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn state(&self, slot: usize) -> SlotState {
        self.states[slot]
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// The fence of the current slot has been waited on.
    pub fn fence_signaled(&mut self) {
        let state = &mut self.states[self.current];
        if *state == SlotState::Submitted {
            *state = SlotState::Idle;
        }
    }

    /// Moves the current slot one step forward, rejecting skipped steps.
    pub fn transition(&mut self, to: SlotState) -> Result<()> {
        let state = &mut self.states[self.current];
        if state.next() != to {
            return Err(anyhow!("Frame slot {} cannot go from {:?} to {:?}.", self.current, state, to));
        }
        *state = to;
        Ok(())
    }

    /// Acquisition was abandoned, either for a swapchain rebuild or because
    /// it failed. The slot can be acquired again.
    pub fn abandon(&mut self) {
        self.states[self.current] = SlotState::Idle;
    }

    pub fn advance(&mut self) {
        self.current = (self.current + 1) % self.len();
    }

    /// Fresh sync objects start signaled, so every slot is idle again.
    pub fn reset(&mut self) {
        self.states.iter_mut().for_each(|s| *s = SlotState::Idle);
        self.current = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_frame(slots: &mut FrameSlots) {
        slots.fence_signaled();
        slots.transition(SlotState::Acquiring).unwrap();
        slots.transition(SlotState::Recording).unwrap();
        slots.transition(SlotState::Submitted).unwrap();
        slots.advance();
    }

    #[test]
    fn counter_wraps_modulo_slot_count() {
        let mut slots = FrameSlots::new(2);
        let mut seen = vec![];
        for _ in 0..5 {
            seen.push(slots.current());
            run_frame(&mut slots);
        }
        assert_eq!(seen, [0, 1, 0, 1, 0]);
    }

    #[test]
    fn reset_returns_to_slot_zero() {
        let mut slots = FrameSlots::new(2);
        run_frame(&mut slots);
        assert_eq!(slots.current(), 1);
        assert_eq!(slots.state(0), SlotState::Submitted);

        slots.reset();

        assert_eq!(slots.current(), 0);
        assert!((0..slots.len()).all(|s| slots.state(s) == SlotState::Idle));

        run_frame(&mut slots);
        assert_eq!(slots.current(), 1);
        run_frame(&mut slots);
        assert_eq!(slots.current(), 0);
    }

    #[test]
    fn submitted_slot_goes_idle_after_fence_wait() {
        let mut slots = FrameSlots::new(2);
        run_frame(&mut slots);
        run_frame(&mut slots);

        assert_eq!(slots.state(0), SlotState::Submitted);
        slots.fence_signaled();
        assert_eq!(slots.state(0), SlotState::Idle);
    }

    #[test]
    fn recording_requires_acquisition() {
        let mut slots = FrameSlots::new(2);
        assert!(slots.transition(SlotState::Recording).is_err());
        assert!(slots.transition(SlotState::Submitted).is_err());
        assert_eq!(slots.state(0), SlotState::Idle);
    }

    #[test]
    fn failed_acquire_can_be_retried() {
        let mut slots = FrameSlots::new(2);
        slots.fence_signaled();
        slots.transition(SlotState::Acquiring).unwrap();

        // Without abandoning, a retry is rejected and the slot is stuck.
        assert!(slots.transition(SlotState::Acquiring).is_err());

        slots.abandon();
        slots.fence_signaled();
        assert!(slots.transition(SlotState::Acquiring).is_ok());
    }

    #[test]
    fn failed_submit_recovers_through_reset() {
        let mut slots = FrameSlots::new(2);
        run_frame(&mut slots);
        slots.fence_signaled();
        slots.transition(SlotState::Acquiring).unwrap();
        slots.transition(SlotState::Recording).unwrap();

        slots.reset();

        assert_eq!(slots.current(), 0);
        slots.fence_signaled();
        assert!(slots.transition(SlotState::Acquiring).is_ok());
    }

    #[test]
    fn present_errors_are_not_hidden_by_a_pending_resize() {
        assert!(present_outcome(Err(vk::ErrorCode::SURFACE_LOST_KHR), true).is_err());
        assert!(present_outcome(Err(vk::ErrorCode::DEVICE_LOST), false).is_err());
    }

    #[test]
    fn present_results_decide_status_and_rebuild() {
        let outcome = |result, resized| present_outcome(result, resized).unwrap();

        assert_eq!(outcome(Ok(vk::SuccessCode::SUCCESS), false), (FrameStatus::Presented, false));
        assert_eq!(outcome(Ok(vk::SuccessCode::SUCCESS), true), (FrameStatus::Presented, true));
        assert_eq!(outcome(Ok(vk::SuccessCode::SUBOPTIMAL_KHR), false), (FrameStatus::Presented, true));
        assert_eq!(outcome(Err(vk::ErrorCode::OUT_OF_DATE_KHR), false), (FrameStatus::Skipped, true));
    }

    #[test]
    fn abandoned_acquisition_can_restart() {
        let mut slots = FrameSlots::new(2);
        slots.transition(SlotState::Acquiring).unwrap();
        slots.abandon();
        assert!(slots.transition(SlotState::Acquiring).is_ok());
    }
}
