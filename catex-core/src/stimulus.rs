use crate::input::Category;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Opaque handle to one stimulus image in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRef {
    pub category: Category,
    pub path: PathBuf,
}

impl AssetRef {
    pub fn new(category: Category, path: impl Into<PathBuf>) -> Self {
        Self {
            category,
            path: path.into(),
        }
    }
}

/// An image drawn centred on screen, scaled to `size` pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub asset: AssetRef,
    pub size: (u32, u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tone {
    #[default]
    Neutral,
    Positive,
    Negative,
}

impl Tone {
    pub fn rgba(self) -> [u8; 4] {
        match self {
            Tone::Neutral => [0, 0, 0, 255],
            Tone::Positive => [0, 255, 0, 255],
            Tone::Negative => [255, 0, 0, 255],
        }
    }
}

/// Description of what the display surface should show next.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Frame {
    #[default]
    Blank,
    /// Centred lines of text (instructions, breaks, feedback, forms).
    Text { lines: Vec<String>, tone: Tone },
    Fixation,
    /// `base` is the stimulus (or the distractor in the flanker layout),
    /// `overlay` the target shape drawn on top of it.
    Stimulus {
        trial: usize,
        base: Placement,
        overlay: Option<Placement>,
    },
}

impl Frame {
    pub fn text<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Frame::Text {
            lines: lines.into_iter().map(Into::into).collect(),
            tone: Tone::Neutral,
        }
    }

    pub fn feedback(text: impl Into<String>, tone: Tone) -> Self {
        Frame::Text {
            lines: vec![text.into()],
            tone,
        }
    }

    pub fn is_stimulus(&self) -> bool {
        matches!(self, Frame::Stimulus { .. })
    }
}
