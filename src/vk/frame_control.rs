use log::trace;
use vulkano::sync::GpuFuture;

/// Fence of the previous submission. One frame is in flight at a time, so
/// recording frame N+1 may overlap the GPU executing frame N but no more.
#[derive(Default)]
pub struct FrameControl {
    fence: Option<Box<dyn GpuFuture>>,
    frame_count: usize,
}

impl FrameControl {
    pub fn update(&mut self, new_fence: Option<Box<dyn GpuFuture>>) {
        self.fence = new_fence;
        self.frame_count += 1;
        trace!("frame {} submitted", self.frame_count);
    }

    /// Takes the current fence, leaving `None`
    pub fn take(&mut self) -> Option<Box<dyn GpuFuture>> {
        self.fence.take()
    }

    /// Releases resources held by submissions the GPU has finished
    pub fn cleanup_finished(&mut self) {
        if let Some(f) = &mut self.fence {
            f.cleanup_finished();
        }
    }

    #[must_use]
    pub const fn frame_count(&self) -> usize {
        self.frame_count
    }
}
