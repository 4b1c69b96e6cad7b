use ab_glyph::FontVec;
use anyhow::{Context, Result, anyhow};
use catex_core::{InputEvent, Key};
use catex_render::SkiaRenderer;
use catex_timing::{HighPrecisionTimer, Timer};
use pixels::{Pixels, SurfaceTexture};
use std::sync::Arc;
use tracing::{info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::WindowEvent,
    event_loop::ActiveEventLoop,
    keyboard::{Key as WinitKey, NamedKey},
    window::{Fullscreen, Window, WindowId},
};

/// Window, pixel surface and renderer, plus the input collected since the
/// last poll. Driven by `pump_app_events` from [`crate::surface`].
pub struct WindowState {
    title: String,
    windowed: bool,
    font: Option<FontVec>,
    timer: HighPrecisionTimer,

    pub window: Option<Arc<Window>>,
    pub pixels: Option<Pixels<'static>>,
    pub renderer: Option<SkiaRenderer>,

    pub pending: Vec<InputEvent>,
    pub failure: Option<anyhow::Error>,
}

impl WindowState {
    pub fn new(title: &str, windowed: bool, font: FontVec, timer: HighPrecisionTimer) -> Self {
        Self {
            title: title.to_string(),
            windowed,
            font: Some(font),
            timer,
            window: None,
            pixels: None,
            renderer: None,
            pending: Vec::new(),
            failure: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.window.is_some() && self.pixels.is_some() && self.renderer.is_some()
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow!("no monitor available"))?;

        let mut attributes = Window::default_attributes()
            .with_title(self.title.clone())
            .with_resizable(self.windowed);
        attributes = if self.windowed {
            attributes.with_inner_size(LogicalSize::new(1280.0, 800.0))
        } else {
            attributes.with_fullscreen(Some(Fullscreen::Borderless(Some(monitor.clone()))))
        };

        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();
        info!(
            width = size.width,
            height = size.height,
            scale_factor = window.scale_factor(),
            refresh_hz = monitor.refresh_rate_millihertz().map(|mhz| mhz as f64 / 1000.0),
            "display configured"
        );

        let surface_texture = SurfaceTexture::new(size.width, size.height, window.clone());
        let pixels = Pixels::new(size.width, size.height, surface_texture)
            .map_err(|e| anyhow!("cannot create pixel surface: {e}"))?;

        let font = self.font.take().context("renderer already created")?;
        let renderer = SkiaRenderer::new(size.width, size.height, font)?;

        if !self.windowed {
            window.set_cursor_visible(false);
        }
        window.request_redraw();

        self.pixels = Some(pixels);
        self.renderer = Some(renderer);
        self.window = Some(window);
        Ok(())
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>) -> Result<()> {
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }
        if let Some(pixels) = &mut self.pixels {
            pixels
                .resize_surface(size.width, size.height)
                .map_err(|e| anyhow!("cannot resize surface: {e}"))?;
            pixels
                .resize_buffer(size.width, size.height)
                .map_err(|e| anyhow!("cannot resize buffer: {e}"))?;
        }
        if let Some(renderer) = &mut self.renderer {
            renderer.resize(size.width, size.height)?;
        }
        info!(width = size.width, height = size.height, "display resized");
        Ok(())
    }

    pub fn restore_cursor(&self) {
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }
    }
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                self.failure = Some(e.context("failed to create window and surface"));
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.pending.push(InputEvent::Quit),
            WindowEvent::KeyboardInput { event, .. }
                if event.state.is_pressed() && !event.repeat =>
            {
                if let Some(key) = map_key(&event.logical_key) {
                    self.pending.push(InputEvent::KeyDown {
                        key,
                        timestamp_ns: self.timer.now(),
                    });
                }
            }
            WindowEvent::Resized(size) => {
                if let Err(e) = self.handle_resize(size) {
                    self.failure = Some(e);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(pixels) = &self.pixels {
                    if let Err(e) = pixels.render() {
                        warn!(error = %e, "redraw failed");
                    }
                }
            }
            _ => {}
        }
    }
}

/// Translates a winit key into the experiment's key vocabulary.
pub fn map_key(key: &WinitKey) -> Option<Key> {
    match key {
        WinitKey::Named(NamedKey::Space) => Some(Key::Space),
        WinitKey::Named(NamedKey::Enter) => Some(Key::Enter),
        WinitKey::Named(NamedKey::Escape) => Some(Key::Escape),
        WinitKey::Named(NamedKey::Backspace) => Some(Key::Backspace),
        WinitKey::Character(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(' '), None) => Some(Key::Space),
                (Some(c), None) if !c.is_control() => Some(Key::Char(c)),
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_named_and_character_keys() {
        assert_eq!(map_key(&WinitKey::Named(NamedKey::Space)), Some(Key::Space));
        assert_eq!(map_key(&WinitKey::Named(NamedKey::Escape)), Some(Key::Escape));
        assert_eq!(map_key(&WinitKey::Named(NamedKey::Enter)), Some(Key::Enter));
        assert_eq!(map_key(&WinitKey::Character("j".into())), Some(Key::Char('j')));
        assert_eq!(map_key(&WinitKey::Character("J".into())), Some(Key::Char('J')));
        assert_eq!(map_key(&WinitKey::Character("7".into())), Some(Key::Char('7')));
    }

    #[test]
    fn ignores_composed_and_unknown_keys() {
        assert_eq!(map_key(&WinitKey::Character("ab".into())), None);
        assert_eq!(map_key(&WinitKey::Named(NamedKey::Tab)), None);
    }
}
