use catex_core::Placement;
use image::imageops::FilterType;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tiny_skia::{IntSize, Pixmap};
use tracing::debug;

use crate::error::RenderError;

/// Decoded stimulus images, already scaled to their display box.
pub struct ImageCache {
    map: HashMap<(PathBuf, (u32, u32)), Arc<Pixmap>>,
    capacity: usize,
}

impl ImageCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn get_or_load(&mut self, placement: &Placement) -> Result<Arc<Pixmap>, RenderError> {
        let key = (placement.asset.path.clone(), placement.size);
        if let Some(p) = self.map.get(&key) {
            return Ok(Arc::clone(p));
        }
        if self.map.len() >= self.capacity {
            debug!(entries = self.map.len(), "image cache full, dropping all entries");
            self.map.clear();
        }
        let pm = Arc::new(load_scaled(&placement.asset.path, placement.size)?);
        debug!(path = %placement.asset.path.display(), size = ?placement.size, "image loaded");
        self.map.insert(key, Arc::clone(&pm));
        Ok(pm)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}

/// Decodes `path`, scales it to exactly `size` and premultiplies it.
pub fn load_scaled(path: &Path, (width, height): (u32, u32)) -> Result<Pixmap, RenderError> {
    let img = image::open(path).map_err(|source| RenderError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    let mut data = img
        .resize_exact(width, height, FilterType::Triangle)
        .into_rgba8()
        .into_raw();

    for px in data.chunks_exact_mut(4) {
        let a = px[3] as u16;
        for c in &mut px[..3] {
            *c = ((*c as u16 * a + 127) / 255) as u8;
        }
    }

    let size = IntSize::from_wh(width, height).ok_or(RenderError::Pixmap { width, height })?;
    Pixmap::from_vec(data, size).ok_or(RenderError::Pixmap { width, height })
}
