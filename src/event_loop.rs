use std::io;
use std::time::{Duration, Instant};

use crossterm::event::Event;

use crate::drivers::InputDriver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlow {
    Continue,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEvent {
    Input(Event),
    /// One frame interval elapsed: run deferred tasks, poll the backend, draw.
    Frame,
}

/// Single-threaded pump that owns input polling and the frame clock.
///
/// Every iteration starts with a `Frame` tick and then drains input until the
/// next frame is due. Deferred work scheduled while handling input therefore
/// runs at the start of the following iteration, after the input that caused
/// it.
pub struct EventLoop<D> {
    driver: D,
    frame_interval: Duration,
    frames: u64,
}

impl<D: InputDriver> EventLoop<D> {
    pub fn new(driver: D, frame_interval: Duration) -> Self {
        Self {
            driver,
            frame_interval,
            frames: 0,
        }
    }

    pub fn driver(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Runs until `handler` returns [`ControlFlow::Quit`] or the driver fails.
    pub fn run<F>(&mut self, mut handler: F) -> io::Result<()>
    where
        F: FnMut(&mut D, LoopEvent) -> io::Result<ControlFlow>,
    {
        loop {
            self.frames = self.frames.wrapping_add(1);
            if handler(&mut self.driver, LoopEvent::Frame)? == ControlFlow::Quit {
                return Ok(());
            }

            let deadline = Instant::now() + self.frame_interval;
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if !self.driver.poll(remaining)? {
                    break;
                }
                let event = self.driver.read()?;
                if handler(&mut self.driver, LoopEvent::Input(event))? == ControlFlow::Quit {
                    return Ok(());
                }
                if remaining.is_zero() {
                    break;
                }
            }
        }
    }
}
