use ab_glyph::FontVec;
use anyhow::{Result, bail};
use catex_core::{Frame, InputEvent, Placement};
use catex_experiment::{ExperimentError, Surface};
use catex_timing::{FrameTimeStats, HighPrecisionTimer, Timer};
use std::time::{Duration, Instant};
use tracing::debug;
use winit::event_loop::EventLoop;
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};

use crate::window::WindowState;

const OPEN_TIMEOUT: Duration = Duration::from_secs(10);

/// The experiment window as a [`Surface`]: winit events are pumped on
/// every poll so the session loop, not the event loop, owns the thread.
pub struct WindowSurface {
    event_loop: EventLoop<()>,
    state: WindowState,
    timer: HighPrecisionTimer,
    closed: bool,
}

impl WindowSurface {
    /// Opens the window and waits until the pixel surface and renderer exist.
    pub fn open(
        title: &str,
        windowed: bool,
        font: FontVec,
        timer: HighPrecisionTimer,
    ) -> Result<Self> {
        let event_loop = EventLoop::new()?;
        let mut surface = Self {
            event_loop,
            state: WindowState::new(title, windowed, font, timer.clone()),
            timer,
            closed: false,
        };

        let started = Instant::now();
        while !surface.state.is_ready() {
            surface.pump(Some(Duration::from_millis(10)));
            if let Some(e) = surface.state.failure.take() {
                return Err(e);
            }
            if surface.closed {
                bail!("window closed before it was ready");
            }
            if started.elapsed() > OPEN_TIMEOUT {
                bail!("window did not open within {OPEN_TIMEOUT:?}");
            }
        }
        Ok(surface)
    }

    fn pump(&mut self, timeout: Option<Duration>) {
        if let PumpStatus::Exit(code) = self.event_loop.pump_app_events(timeout, &mut self.state) {
            debug!(code, "event loop exited");
            self.closed = true;
        }
    }

    fn check_failure(&mut self) -> Result<(), ExperimentError> {
        match self.state.failure.take() {
            Some(e) => Err(ExperimentError::surface(e)),
            None => Ok(()),
        }
    }

    pub fn preload(&mut self, placements: &[Placement]) -> Result<usize, ExperimentError> {
        let renderer = self
            .state
            .renderer
            .as_mut()
            .ok_or_else(|| ExperimentError::surface("renderer is not available"))?;
        renderer.preload(placements).map_err(ExperimentError::surface)
    }

    pub fn frame_stats(&self) -> FrameTimeStats {
        self.timer.frame_stats()
    }

    pub fn close(self) {
        self.state.restore_cursor();
    }
}

impl Surface for WindowSurface {
    fn present(&mut self, frame: &Frame) -> Result<(), ExperimentError> {
        self.pump(Some(Duration::ZERO));
        self.check_failure()?;

        let (Some(pixels), Some(renderer)) =
            (self.state.pixels.as_mut(), self.state.renderer.as_mut())
        else {
            return Err(ExperimentError::surface("window is not open"));
        };

        let t = self.timer.now();
        let stats = renderer
            .render_frame(frame, pixels.frame_mut())
            .map_err(ExperimentError::surface)?;
        if stats.redrawn {
            pixels
                .render()
                .map_err(|e| ExperimentError::surface(e.to_string()))?;
            let elapsed = self.timer.elapsed(t);
            self.timer.record_frame(elapsed);
            debug!(
                draw_ms = stats.draw.as_secs_f64() * 1e3,
                copy_ms = stats.copy.as_secs_f64() * 1e3,
                present_ms = elapsed.as_secs_f64() * 1e3,
                "frame presented"
            );
        }
        Ok(())
    }

    fn poll_events(&mut self) -> Result<Vec<InputEvent>, ExperimentError> {
        self.pump(Some(Duration::ZERO));
        self.check_failure()?;
        let mut events = std::mem::take(&mut self.state.pending);
        if self.closed {
            events.push(InputEvent::Quit);
        }
        Ok(events)
    }

    fn sleep(&mut self, d: Duration) {
        self.timer.sleep(d);
    }
}
