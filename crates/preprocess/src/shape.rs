//! Declared and resolved model input shapes

use std::fmt;

/// Height and width used when the model leaves them open
pub const DEFAULT_SPATIAL: usize = 224;

/// Channel count used when the model leaves it open
pub const DEFAULT_CHANNELS: usize = 3;

/// One axis of a declared shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    /// Concrete, positive extent
    Fixed(usize),
    /// Symbolic or unknown extent
    Dynamic,
}

impl Dimension {
    /// Concrete extent, if any
    pub fn fixed(self) -> Option<usize> {
        match self {
            Dimension::Fixed(n) if n > 0 => Some(n),
            _ => None,
        }
    }
}

impl From<Option<usize>> for Dimension {
    fn from(value: Option<usize>) -> Self {
        match value {
            Some(n) if n > 0 => Dimension::Fixed(n),
            _ => Dimension::Dynamic,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Fixed(n) => write!(f, "{n}"),
            Dimension::Dynamic => write!(f, "?"),
        }
    }
}

/// Input shape as declared by the model, NHWC layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputShape {
    pub batch: Dimension,
    pub height: Dimension,
    pub width: Dimension,
    pub channels: Dimension,
}

impl InputShape {
    /// Fully concrete shape with a batch of one
    pub fn fixed(height: usize, width: usize, channels: usize) -> Self {
        Self {
            batch: Dimension::Fixed(1),
            height: Dimension::Fixed(height),
            width: Dimension::Fixed(width),
            channels: Dimension::Fixed(channels),
        }
    }

    /// Shape with nothing known
    pub fn unknown() -> Self {
        Self {
            batch: Dimension::Dynamic,
            height: Dimension::Dynamic,
            width: Dimension::Dynamic,
            channels: Dimension::Dynamic,
        }
    }

    /// Build from per-axis extents.
    ///
    /// Rank 4 is read as NHWC and rank 3 as HWC; any other rank is unknown.
    pub fn from_dims(dims: &[Option<usize>]) -> Self {
        match *dims {
            [n, h, w, c] => Self {
                batch: n.into(),
                height: h.into(),
                width: w.into(),
                channels: c.into(),
            },
            [h, w, c] => Self {
                batch: Dimension::Fixed(1),
                height: h.into(),
                width: w.into(),
                channels: c.into(),
            },
            _ => Self::unknown(),
        }
    }

    /// Per-axis extents, `None` for dynamic axes
    pub fn to_dims(&self) -> Vec<Option<usize>> {
        vec![
            self.batch.fixed(),
            self.height.fixed(),
            self.width.fixed(),
            self.channels.fixed(),
        ]
    }

    /// Resolve dynamic axes to documented defaults
    pub fn resolve(&self) -> ResolvedShape {
        let mut warnings = Vec::new();

        let (height, width) = match (self.height.fixed(), self.width.fixed()) {
            (Some(h), Some(w)) => (h, w),
            _ => {
                warnings.push(format!(
                    "Model input size is dynamic ({}x{}); using {}x{}",
                    self.height, self.width, DEFAULT_SPATIAL, DEFAULT_SPATIAL
                ));
                (DEFAULT_SPATIAL, DEFAULT_SPATIAL)
            }
        };

        let channels = match self.channels.fixed() {
            Some(c) => c,
            None => {
                warnings.push(format!(
                    "Model channel count is dynamic; using {}",
                    DEFAULT_CHANNELS
                ));
                DEFAULT_CHANNELS
            }
        };

        ResolvedShape {
            height,
            width,
            channels,
            warnings,
        }
    }
}

impl fmt::Display for InputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.batch, self.height, self.width, self.channels
        )
    }
}

/// Concrete (H, W, C) target for preprocessing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedShape {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
    /// Non-fatal notes about defaults that were applied
    pub warnings: Vec<String>,
}

impl ResolvedShape {
    /// Concrete shape without warnings
    pub fn new(height: usize, width: usize, channels: usize) -> Self {
        Self {
            height,
            width,
            channels,
            warnings: Vec::new(),
        }
    }

    /// Whether a default was substituted for a dynamic axis
    pub fn fell_back(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// `[1, H, W, C]`
    pub fn batched(&self) -> [usize; 4] {
        [1, self.height, self.width, self.channels]
    }
}
