use log::*;
use vulkanalia::vk::{self, DeviceV1_0, HasBuilder};

use super::device::VulkanDevice;
use crate::error::Result;

/// The queue and swapchain operations one frame is made of.
pub trait FrameBackend {
    fn wait_for_fence(&mut self, fence: vk::Fence) -> Result<()>;
    fn reset_fence(&mut self, fence: vk::Fence) -> Result<()>;
    fn acquire_next_image(&mut self, signal: vk::Semaphore) -> Result<u32>;
    fn reset_command_buffer(&mut self) -> Result<()>;
    fn record(&mut self, image_index: u32) -> Result<()>;
    fn submit(
        &mut self,
        wait: vk::Semaphore,
        wait_stage: vk::PipelineStageFlags,
        signal: vk::Semaphore,
        fence: vk::Fence,
    ) -> Result<()>;
    fn present(&mut self, wait: vk::Semaphore, image_index: u32) -> Result<()>;
}

/// The two semaphores and the fence shared by every frame.
///
/// Only one frame is ever in flight: the fence wait at the top of a frame
/// returns once the previous submission has finished, which is what makes
/// it safe to reset and re-record the single command buffer.
#[derive(Copy, Clone, Debug)]
pub struct FrameSync {
    pub image_available: vk::Semaphore,
    pub render_finished: vk::Semaphore,
    pub in_flight: vk::Fence,
}

impl FrameSync {
    pub unsafe fn create(device: &VulkanDevice) -> Result<FrameSync> {
        let semaphore_info = vk::SemaphoreCreateInfo::builder();
        // Signaled so the first frame does not wait forever.
        let fence_info = vk::FenceCreateInfo::builder().flags(vk::FenceCreateFlags::SIGNALED);

        let device = &device.vk_device;
        let image_available = device.create_semaphore(&semaphore_info, None)?;
        let render_finished = match device.create_semaphore(&semaphore_info, None) {
            Ok(semaphore) => semaphore,
            Err(error) => {
                device.destroy_semaphore(image_available, None);
                return Err(error.into());
            }
        };
        let in_flight = match device.create_fence(&fence_info, None) {
            Ok(fence) => fence,
            Err(error) => {
                device.destroy_semaphore(render_finished, None);
                device.destroy_semaphore(image_available, None);
                return Err(error.into());
            }
        };

        debug!("Created frame synchronization objects.");

        Ok(FrameSync {
            image_available,
            render_finished,
            in_flight,
        })
    }

    /// Draws and presents one frame, returning the swapchain image it used.
    pub fn draw_frame<B: FrameBackend>(&self, backend: &mut B) -> Result<u32> {
        backend.wait_for_fence(self.in_flight)?;
        backend.reset_fence(self.in_flight)?;

        let image_index = backend.acquire_next_image(self.image_available)?;

        backend.reset_command_buffer()?;
        backend.record(image_index)?;

        backend.submit(
            self.image_available,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            self.render_finished,
            self.in_flight,
        )?;
        backend.present(self.render_finished, image_index)?;

        Ok(image_index)
    }

    pub fn destroyer(&self, device: &VulkanDevice) -> impl FnOnce() + 'static {
        let (device, sync) = (device.vk_device.clone(), *self);
        move || unsafe {
            device.destroy_fence(sync.in_flight, None);
            device.destroy_semaphore(sync.render_finished, None);
            device.destroy_semaphore(sync.image_available, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use std::collections::HashSet;
    use vulkanalia::vk::Handle;

    #[derive(Clone, Debug, PartialEq)]
    enum Call {
        Wait(vk::Fence),
        ResetFence(vk::Fence),
        Acquire { signal: vk::Semaphore },
        ResetCommands,
        Record(u32),
        Submit {
            wait: vk::Semaphore,
            signal: vk::Semaphore,
            fence: vk::Fence,
        },
        Present {
            wait: vk::Semaphore,
            image_index: u32,
        },
    }

    /// A GPU that finishes every submission before the next call and keeps
    /// the signal state of each semaphore and fence it is handed.
    struct FakeGpu {
        calls: Vec<Call>,
        signaled_fences: HashSet<vk::Fence>,
        signaled_semaphores: HashSet<vk::Semaphore>,
        fence_signals: usize,
        image_count: u32,
        next_image: u32,
        acquire_error: Option<vk::ErrorCode>,
    }

    impl FakeGpu {
        /// `fence` starts signaled, as it is created.
        fn new(image_count: u32, fence: vk::Fence) -> Self {
            Self {
                calls: Vec::new(),
                signaled_fences: HashSet::from([fence]),
                signaled_semaphores: HashSet::new(),
                fence_signals: 0,
                image_count,
                next_image: 0,
                acquire_error: None,
            }
        }
    }

    impl FrameBackend for FakeGpu {
        fn wait_for_fence(&mut self, fence: vk::Fence) -> Result<()> {
            assert!(
                self.signaled_fences.contains(&fence),
                "waiting on an unsignaled fence never returns"
            );
            self.calls.push(Call::Wait(fence));
            Ok(())
        }

        fn reset_fence(&mut self, fence: vk::Fence) -> Result<()> {
            assert_eq!(
                self.calls.last(),
                Some(&Call::Wait(fence)),
                "fence reset before its wait"
            );
            self.signaled_fences.remove(&fence);
            self.calls.push(Call::ResetFence(fence));
            Ok(())
        }

        fn acquire_next_image(&mut self, signal: vk::Semaphore) -> Result<u32> {
            if let Some(code) = self.acquire_error {
                return Err(code.into());
            }
            assert!(self.signaled_semaphores.insert(signal), "semaphore signaled twice");
            let index = self.next_image;
            self.next_image = (self.next_image + 1) % self.image_count;
            self.calls.push(Call::Acquire { signal });
            Ok(index)
        }

        fn reset_command_buffer(&mut self) -> Result<()> {
            self.calls.push(Call::ResetCommands);
            Ok(())
        }

        fn record(&mut self, image_index: u32) -> Result<()> {
            self.calls.push(Call::Record(image_index));
            Ok(())
        }

        fn submit(
            &mut self,
            wait: vk::Semaphore,
            wait_stage: vk::PipelineStageFlags,
            signal: vk::Semaphore,
            fence: vk::Fence,
        ) -> Result<()> {
            assert_eq!(wait_stage, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT);
            assert!(
                self.signaled_semaphores.remove(&wait),
                "submission waits on a semaphore nothing signals"
            );
            assert!(self.signaled_semaphores.insert(signal), "semaphore signaled twice");
            assert!(self.signaled_fences.insert(fence), "fence signaled twice");
            self.fence_signals += 1;
            self.calls.push(Call::Submit { wait, signal, fence });
            Ok(())
        }

        fn present(&mut self, wait: vk::Semaphore, image_index: u32) -> Result<()> {
            assert!(
                self.signaled_semaphores.remove(&wait),
                "presentation waits on a semaphore nothing signals"
            );
            self.calls.push(Call::Present { wait, image_index });
            Ok(())
        }
    }

    fn sync() -> FrameSync {
        FrameSync {
            image_available: vk::Semaphore::from_raw(1),
            render_finished: vk::Semaphore::from_raw(2),
            in_flight: vk::Fence::from_raw(3),
        }
    }

    #[test]
    fn every_frame_follows_the_same_sequence() {
        let sync = sync();
        let mut gpu = FakeGpu::new(3, sync.in_flight);

        let frames = 5;
        for _ in 0..frames {
            sync.draw_frame(&mut gpu).unwrap();
        }

        let image_available = vk::Semaphore::from_raw(1);
        let render_finished = vk::Semaphore::from_raw(2);
        let in_flight = vk::Fence::from_raw(3);
        let expected = (0..frames)
            .flat_map(|frame| {
                let index = frame % 3;
                vec![
                    Call::Wait(in_flight),
                    Call::ResetFence(in_flight),
                    Call::Acquire {
                        signal: image_available,
                    },
                    Call::ResetCommands,
                    Call::Record(index),
                    Call::Submit {
                        wait: image_available,
                        signal: render_finished,
                        fence: in_flight,
                    },
                    Call::Present {
                        wait: render_finished,
                        image_index: index,
                    },
                ]
            })
            .collect::<Vec<_>>();
        assert_eq!(gpu.calls, expected);
        assert!(gpu.signaled_semaphores.is_empty());
    }

    #[test]
    fn fence_is_signaled_once_per_submission() {
        let sync = sync();
        let mut gpu = FakeGpu::new(2, sync.in_flight);

        for frame in 1..=4 {
            let index = sync.draw_frame(&mut gpu).unwrap();
            assert_eq!(index, (frame - 1) % 2);
            assert_eq!(gpu.fence_signals, frame as usize);
            assert!(gpu.signaled_fences.contains(&sync.in_flight));
        }
        let submits = gpu
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Submit { .. }))
            .count();
        assert_eq!(submits, gpu.fence_signals);
    }

    #[test]
    #[should_panic(expected = "submission waits on a semaphore nothing signals")]
    fn crossed_semaphores_are_caught() {
        let sync = sync();
        let mut gpu = FakeGpu::new(2, sync.in_flight);
        gpu.wait_for_fence(sync.in_flight).unwrap();
        gpu.reset_fence(sync.in_flight).unwrap();
        gpu.acquire_next_image(sync.image_available).unwrap();

        let _ = gpu.submit(
            sync.render_finished,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            sync.image_available,
            sync.in_flight,
        );
    }

    #[test]
    fn failed_acquire_stops_the_frame() {
        let sync = sync();
        let mut gpu = FakeGpu::new(2, sync.in_flight);
        gpu.acquire_error = Some(vk::ErrorCode::OUT_OF_DATE_KHR);

        let error = sync.draw_frame(&mut gpu).unwrap_err();

        assert!(matches!(error, RenderError::SwapchainOutOfDate));
        assert!(error.is_recoverable());
        assert_eq!(
            gpu.calls,
            vec![Call::Wait(sync.in_flight), Call::ResetFence(sync.in_flight)]
        );
        assert_eq!(gpu.fence_signals, 0);
    }
}
