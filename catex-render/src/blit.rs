use bytemuck::{cast_slice, cast_slice_mut};
use tiny_skia::{IntRect, Pixmap};

/// Draws `src` onto `dst` with its centre at `center`, clipped to `dst`.
///
/// Both pixmaps are premultiplied RGBA. A fully opaque source is copied row
/// by row; anything else is composited source-over. Returns the touched
/// region, or `None` when nothing landed on the canvas.
pub fn blit_centered(dst: &mut Pixmap, src: &Pixmap, center: (f32, f32)) -> Option<IntRect> {
    let (w, h) = (src.width() as i32, src.height() as i32);
    let x0 = (center.0 - w as f32 * 0.5).floor() as i32;
    let y0 = (center.1 - h as f32 * 0.5).floor() as i32;

    let dst_x = x0.max(0);
    let dst_y = y0.max(0);
    let end_x = (x0 + w).min(dst.width() as i32);
    let end_y = (y0 + h).min(dst.height() as i32);
    if end_x <= dst_x || end_y <= dst_y {
        return None;
    }

    let copy_w = (end_x - dst_x) as usize;
    let copy_h = (end_y - dst_y) as usize;
    let src_x = (dst_x - x0) as usize;
    let src_y = (dst_y - y0) as usize;
    let src_stride = src.width() as usize;
    let dst_stride = dst.width() as usize;

    // [u8; 4] has alignment 1, so these casts cannot fail.
    let src_px: &[[u8; 4]] = cast_slice(src.data());
    let dst_px: &mut [[u8; 4]] = cast_slice_mut(dst.data_mut());

    let row_starts =
        |stride: usize, x: usize, y: usize| (0..copy_h).map(move |r| (y + r) * stride + x);

    let opaque = row_starts(src_stride, src_x, src_y)
        .all(|s| src_px[s..s + copy_w].iter().all(|p| p[3] == 255));

    let rows = row_starts(src_stride, src_x, src_y)
        .zip(row_starts(dst_stride, dst_x as usize, dst_y as usize));
    for (s, d) in rows {
        let src_row = &src_px[s..s + copy_w];
        let dst_row = &mut dst_px[d..d + copy_w];
        if opaque {
            dst_row.copy_from_slice(src_row);
        } else {
            for (dp, sp) in dst_row.iter_mut().zip(src_row) {
                *dp = source_over(*sp, *dp);
            }
        }
    }

    IntRect::from_xywh(dst_x, dst_y, copy_w as u32, copy_h as u32)
}

/// Porter-Duff over in premultiplied space: out = src + dst * (1 - src.a)
#[inline]
fn source_over(s: [u8; 4], d: [u8; 4]) -> [u8; 4] {
    let inv = 255 - s[3] as u32;
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = (s[i] as u32 + (d[i] as u32 * inv + 127) / 255).min(255) as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_skia::Color;

    fn solid(w: u32, h: u32, color: Color) -> Pixmap {
        let mut pm = Pixmap::new(w, h).unwrap();
        pm.fill(color);
        pm
    }

    #[test]
    fn opaque_copy_lands_centred() {
        let mut canvas = solid(10, 10, Color::WHITE);
        let src = solid(4, 2, Color::BLACK);
        let rect = blit_centered(&mut canvas, &src, (5.0, 5.0)).unwrap();
        assert_eq!((rect.x(), rect.y(), rect.width(), rect.height()), (3, 4, 4, 2));

        let px = canvas.pixel(3, 4).unwrap();
        assert_eq!((px.red(), px.alpha()), (0, 255));
        let outside = canvas.pixel(2, 4).unwrap();
        assert_eq!(outside.red(), 255);
    }

    #[test]
    fn clips_at_canvas_edges() {
        let mut canvas = solid(10, 10, Color::WHITE);
        let src = solid(6, 6, Color::BLACK);
        let rect = blit_centered(&mut canvas, &src, (0.0, 9.0)).unwrap();
        assert_eq!((rect.x(), rect.y(), rect.width(), rect.height()), (0, 6, 3, 4));
        assert_eq!(canvas.pixel(0, 9).unwrap().red(), 0);
        assert_eq!(canvas.pixel(3, 9).unwrap().red(), 255);

        assert!(blit_centered(&mut canvas, &src, (-20.0, 5.0)).is_none());
    }

    #[test]
    fn translucent_source_blends() {
        let mut canvas = solid(4, 4, Color::WHITE);
        let src = solid(2, 2, Color::from_rgba8(255, 0, 0, 128));
        blit_centered(&mut canvas, &src, (2.0, 2.0)).unwrap();

        let px = canvas.pixel(1, 1).unwrap();
        assert_eq!(px.alpha(), 255);
        assert_eq!(px.green(), 127);
        assert!(px.red() >= 254);
    }
}
