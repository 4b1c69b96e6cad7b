use ab_glyph::FontVec;
use catex_core::{Frame, Placement};
use catex_timing::{HighPrecisionTimer, Timer};
use std::time::Duration;
use tiny_skia::{Color, Paint, Pixmap, Rect, Transform};
use tracing::{debug, info};

use crate::blit::blit_centered;
use crate::error::RenderError;
use crate::images::ImageCache;
use crate::text::TextCache;

const TEXT_PX: f32 = 36.0;
const LINE_SPACING: f32 = 1.5;
const FIXATION_PX: u32 = 40;
const FIXATION_BAR_PX: f32 = 4.0;
const IMAGE_CACHE_ENTRIES: usize = 512;

#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub draw: Duration,
    pub copy: Duration,
    pub total: Duration,
    /// False when the frame equalled the previous one and the buffer was
    /// left as is.
    pub redrawn: bool,
}

/// Software renderer: draws a [`Frame`] onto an offscreen white canvas and
/// copies it into the RGBA frame buffer of the window.
pub struct SkiaRenderer {
    width: u32,
    height: u32,
    center: (f32, f32),

    text: TextCache,
    images: ImageCache,
    fixation: Pixmap,

    canvas: Pixmap,
    last_frame: Option<Frame>,
    timer: HighPrecisionTimer,
}

impl SkiaRenderer {
    pub fn new(width: u32, height: u32, font: FontVec) -> Result<Self, RenderError> {
        let renderer = Self {
            width,
            height,
            center: (width as f32 / 2.0, height as f32 / 2.0),
            text: TextCache::new(font, TEXT_PX),
            images: ImageCache::new(IMAGE_CACHE_ENTRIES),
            fixation: fixation_cross()?,
            canvas: blank_canvas(width, height)?,
            last_frame: None,
            timer: HighPrecisionTimer::new(),
        };
        info!(width, height, "renderer ready");
        Ok(renderer)
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.width = width;
        self.height = height;
        self.center = (width as f32 / 2.0, height as f32 / 2.0);
        self.canvas = blank_canvas(width, height)?;
        self.last_frame = None;
        debug!(width, height, "renderer resized");
        Ok(())
    }

    /// Decode and scale images ahead of time so presenting a stimulus never
    /// waits on the disk.
    pub fn preload<'a>(
        &mut self,
        placements: impl IntoIterator<Item = &'a Placement>,
    ) -> Result<usize, RenderError> {
        let mut loaded = 0;
        for p in placements {
            self.images.get_or_load(p)?;
            loaded += 1;
        }
        info!(loaded, cached = self.images.len(), "stimulus images preloaded");
        Ok(loaded)
    }

    pub fn render_frame(
        &mut self,
        frame: &Frame,
        frame_buffer: &mut [u8],
    ) -> Result<FrameStats, RenderError> {
        let expected = self.width as usize * self.height as usize * 4;
        if frame_buffer.len() != expected {
            return Err(RenderError::BufferSize {
                expected,
                actual: frame_buffer.len(),
            });
        }
        if self.last_frame.as_ref() == Some(frame) {
            return Ok(FrameStats::default());
        }

        let t0 = self.timer.now();
        self.canvas.fill(Color::WHITE);
        self.draw(frame)?;
        let draw = self.timer.elapsed(t0);

        // The canvas is opaque, so premultiplied equals straight RGBA.
        let t_copy = self.timer.now();
        frame_buffer.copy_from_slice(self.canvas.data());
        let copy = self.timer.elapsed(t_copy);

        self.last_frame = Some(frame.clone());
        Ok(FrameStats {
            draw,
            copy,
            total: self.timer.elapsed(t0),
            redrawn: true,
        })
    }

    fn draw(&mut self, frame: &Frame) -> Result<(), RenderError> {
        match frame {
            Frame::Blank => {}
            Frame::Fixation => {
                blit_centered(&mut self.canvas, &self.fixation, self.center);
            }
            Frame::Text { lines, tone } => {
                let line_height = self.text.size_px() * LINE_SPACING;
                let centers = line_centers(lines.len(), self.center.1, line_height);
                for (line, y) in lines.iter().zip(centers) {
                    let Some(pm) = self.text.get_or_render(line, *tone) else {
                        continue;
                    };
                    blit_centered(&mut self.canvas, &pm, (self.center.0, y));
                }
            }
            Frame::Stimulus { base, overlay, .. } => {
                let img = self.images.get_or_load(base)?;
                blit_centered(&mut self.canvas, &img, self.center);
                if let Some(target) = overlay {
                    let img = self.images.get_or_load(target)?;
                    blit_centered(&mut self.canvas, &img, self.center);
                }
            }
        }
        Ok(())
    }
}

/// Vertical centres for `count` lines stacked around `center_y`.
pub(crate) fn line_centers(
    count: usize,
    center_y: f32,
    line_height: f32,
) -> impl Iterator<Item = f32> {
    let mid = count.saturating_sub(1) as f32 / 2.0;
    (0..count).map(move |i| center_y + (i as f32 - mid) * line_height)
}

fn blank_canvas(width: u32, height: u32) -> Result<Pixmap, RenderError> {
    let mut canvas = Pixmap::new(width, height).ok_or(RenderError::Pixmap { width, height })?;
    canvas.fill(Color::WHITE);
    Ok(canvas)
}

fn fixation_cross() -> Result<Pixmap, RenderError> {
    let size = FIXATION_PX;
    let mut pm = Pixmap::new(size, size).ok_or(RenderError::Pixmap {
        width: size,
        height: size,
    })?;

    let mut paint = Paint::default();
    paint.anti_alias = false;
    paint.set_color(Color::BLACK);

    let extent = size as f32;
    let offset = (extent - FIXATION_BAR_PX) * 0.5;
    let bars = [
        Rect::from_xywh(0.0, offset, extent, FIXATION_BAR_PX),
        Rect::from_xywh(offset, 0.0, FIXATION_BAR_PX, extent),
    ];
    for bar in bars.into_iter().flatten() {
        pm.fill_rect(bar, &paint, Transform::identity(), None);
    }
    Ok(pm)
}
