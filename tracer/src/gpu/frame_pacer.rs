use std::sync::{Arc, Mutex};

/// Counting permit bounding how many frames may be outstanding on the GPU.
/// A permit is taken before a frame's command stream is built and returned by
/// the queue's submitted-work-done callback (or immediately, when the frame
/// is skipped). The render loop alternates `try_acquire` with a blocking
/// device poll, which is what lets completion callbacks fire on this thread.
#[derive(Clone)]
pub(crate) struct FramePacer {
    permits: Arc<Mutex<u32>>,
    depth: u32,
}

impl FramePacer {
    /// One frame building on the CPU while one executes on the GPU.
    pub(crate) const FRAMES_IN_FLIGHT: u32 = 2;

    #[must_use]
    pub(crate) fn new(depth: u32) -> Self {
        assert!(depth > 0);
        Self { permits: Arc::new(Mutex::new(depth)), depth }
    }

    #[must_use]
    pub(crate) fn try_acquire(&self) -> bool {
        let mut permits = self.permits.lock().expect("frame pacer lock poisoned");
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    pub(crate) fn release(&self) {
        let mut permits = self.permits.lock().expect("frame pacer lock poisoned");
        debug_assert!(*permits < self.depth, "released a permit that was never acquired");
        *permits += 1;
    }
}
