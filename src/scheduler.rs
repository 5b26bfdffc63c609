use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

type FrameTask = Box<dyn FnOnce()>;

/// Queue of work deferred until the next rendered frame.
///
/// The event loop calls [`FrameScheduler::run_frame`] once per frame, after
/// input has been handled and before drawing. Tasks requested while a frame
/// is running land in the following frame, never the current one.
///
/// There is no cancellation handle. Tasks that can go stale carry their own
/// identity check and turn into no-ops when they fire.
#[derive(Clone, Default)]
pub struct FrameScheduler {
    queue: Rc<RefCell<VecDeque<FrameTask>>>,
    frames: Rc<Cell<u64>>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_frame(&self, task: impl FnOnce() + 'static) {
        self.queue.borrow_mut().push_back(Box::new(task));
    }

    /// Run every task queued before this call. Returns how many ran.
    pub fn run_frame(&self) -> usize {
        let tasks: Vec<FrameTask> = self.queue.borrow_mut().drain(..).collect();
        self.frames.set(self.frames.get().wrapping_add(1));
        let count = tasks.len();
        for task in tasks {
            task();
        }
        count
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn frame_count(&self) -> u64 {
        self.frames.get()
    }
}

impl fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("pending", &self.pending())
            .field("frames", &self.frame_count())
            .finish()
    }
}
