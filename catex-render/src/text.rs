use ab_glyph::{Font, FontVec, Glyph, PxScale, ScaleFont, point};
use catex_cache::TextInterner;
use catex_core::Tone;
use std::collections::HashMap;
use std::sync::Arc;
use tiny_skia::{Pixmap, PremultipliedColorU8};

/// Rasterised lines keyed by interned text and tone.
pub struct TextCache {
    font: FontVec,
    size_px: f32,
    interner: TextInterner,
    map: HashMap<(usize, Tone), Arc<Pixmap>>,
}

impl TextCache {
    pub fn new(font: FontVec, size_px: f32) -> Self {
        Self {
            font,
            size_px,
            interner: TextInterner::new(),
            map: HashMap::new(),
        }
    }

    pub fn size_px(&self) -> f32 {
        self.size_px
    }

    /// `None` for text without visible glyphs.
    pub fn get_or_render(&mut self, text: &str, tone: Tone) -> Option<Arc<Pixmap>> {
        let id = self.interner.intern(text);
        if let Some(p) = self.map.get(&(id, tone)) {
            return Some(Arc::clone(p));
        }
        let pm = Arc::new(render_text_pixmap(text, self.size_px, &self.font, tone.rgba())?);
        self.map.insert((id, tone), Arc::clone(&pm));
        Some(pm)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// One line of text on a transparent, premultiplied pixmap sized to the
/// glyph bounds.
pub fn render_text_pixmap<F: Font>(
    text: &str,
    font_size: f32,
    font: &F,
    rgba: [u8; 4],
) -> Option<Pixmap> {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);

    // Layout with baseline at ascent
    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += sf.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, sf.ascent()),
        });
        pen_x += sf.h_advance(id);
    }

    let outlined: Vec<_> = glyphs
        .into_iter()
        .filter_map(|g| font.outline_glyph(g))
        .collect();
    if outlined.is_empty() {
        return None;
    }

    let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
    let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for out in &outlined {
        let b = out.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
    let mut pm = Pixmap::new(w, h)?;
    let stride = w as usize;
    let dst = pm.pixels_mut();

    for out in &outlined {
        let b = out.px_bounds();
        out.draw(|x, y, cov| {
            if cov <= f32::EPSILON {
                return;
            }
            let ix = (x as f32 + b.min.x - min_x).floor() as i32;
            let iy = (y as f32 + b.min.y - min_y).floor() as i32;
            if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                return;
            }
            let i = iy as usize * stride + ix as usize;

            let a = (cov * rgba[3] as f32 / 255.0).clamp(0.0, 1.0);
            let sa = (a * 255.0) as u8;
            let bg = dst[i];
            let inv = 1.0 - sa as f32 / 255.0;
            let mix = |s: u8, d: u8| ((s as f32 * a) as u8).saturating_add((d as f32 * inv) as u8);
            let r = mix(rgba[0], bg.red());
            let g = mix(rgba[1], bg.green());
            let bl = mix(rgba[2], bg.blue());
            let al = sa.saturating_add((bg.alpha() as f32 * inv) as u8);
            // from_rgba rejects channels above alpha
            let px = PremultipliedColorU8::from_rgba(r.min(al), g.min(al), bl.min(al), al);
            if let Some(px) = px {
                dst[i] = px;
            }
        });
    }

    Some(pm)
}
