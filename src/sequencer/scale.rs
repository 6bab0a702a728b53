#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const MAX_SCALE_INTERVALS: usize = 12;

/// Named interval sets for common scales.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleKind {
    #[default]
    Chromatic,
    Major,
    Minor,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    HarmonicMinor,
    MajorPentatonic,
    MinorPentatonic,
    Blues,
    WholeTone,
}

impl ScaleKind {
    pub fn intervals(&self) -> &'static [u8] {
        match self {
            ScaleKind::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
            ScaleKind::Major => &[0, 2, 4, 5, 7, 9, 11],
            ScaleKind::Minor => &[0, 2, 3, 5, 7, 8, 10],
            ScaleKind::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            ScaleKind::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
            ScaleKind::Lydian => &[0, 2, 4, 6, 7, 9, 11],
            ScaleKind::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            ScaleKind::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11],
            ScaleKind::MajorPentatonic => &[0, 2, 4, 7, 9],
            ScaleKind::MinorPentatonic => &[0, 3, 5, 7, 10],
            ScaleKind::Blues => &[0, 3, 5, 6, 7, 10],
            ScaleKind::WholeTone => &[0, 2, 4, 6, 8, 10],
        }
    }
}

/// A root pitch class plus an ordered set of semitone offsets.
///
/// Intervals are kept sorted, unique and below 12, so a scale degree is an
/// index into `intervals()` and every octave repeats the same pattern.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(from = "ScaleRepr", into = "ScaleRepr")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scale {
    root: u8,
    intervals: [u8; MAX_SCALE_INTERVALS],
    len: u8,
}

/// Wire shape of a [`Scale`]. Decoding always goes through [`Scale::new`].
#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct ScaleRepr {
    #[serde(default)]
    root: u8,
    #[serde(default)]
    intervals: Vec<u8>,
}

#[cfg(feature = "serde")]
impl From<ScaleRepr> for Scale {
    fn from(repr: ScaleRepr) -> Self {
        Scale::new(repr.root, &repr.intervals)
    }
}

#[cfg(feature = "serde")]
impl From<Scale> for ScaleRepr {
    fn from(scale: Scale) -> Self {
        ScaleRepr {
            root: scale.root,
            intervals: scale.intervals().to_vec(),
        }
    }
}

impl Scale {
    /// Build a scale from raw semitone offsets.
    ///
    /// Offsets are folded into one octave, sorted and deduplicated. An empty
    /// set falls back to chromatic.
    pub fn new(root: u8, intervals: &[u8]) -> Self {
        let mut present = [false; MAX_SCALE_INTERVALS];
        for &interval in intervals {
            present[(interval % 12) as usize] = true;
        }

        let mut out = [0u8; MAX_SCALE_INTERVALS];
        let mut len = 0usize;
        for (semitone, _) in present.iter().enumerate().filter(|(_, p)| **p) {
            out[len] = semitone as u8;
            len += 1;
        }

        if len == 0 {
            return Self::chromatic(root);
        }

        Self {
            root: root % 12,
            intervals: out,
            len: len as u8,
        }
    }

    pub fn chromatic(root: u8) -> Self {
        Self::from_kind(root, ScaleKind::Chromatic)
    }

    pub fn from_kind(root: u8, kind: ScaleKind) -> Self {
        Self::new(root, kind.intervals())
    }

    pub fn root(&self) -> u8 {
        self.root
    }

    pub fn intervals(&self) -> &[u8] {
        &self.intervals[..(self.len as usize).min(MAX_SCALE_INTERVALS)]
    }

    pub fn degree_count(&self) -> usize {
        self.intervals().len()
    }

    /// Rebuild through [`Scale::new`], restoring the sorted-unique invariant.
    pub fn sanitized(self) -> Self {
        Self::new(self.root, self.intervals())
    }

    /// Whether `pitch` lands on one of the scale's pitch classes.
    pub fn contains(&self, pitch: i32) -> bool {
        let class = (pitch - self.root as i32).rem_euclid(12) as u8;
        self.intervals().contains(&class)
    }

    /// Nearest in-scale pitch within MIDI range. Ties resolve downward.
    pub fn snap(&self, pitch: i32) -> u8 {
        let pitch = pitch.clamp(0, 127);
        for distance in 0..12 {
            let below = pitch - distance;
            if below >= 0 && self.contains(below) {
                return below as u8;
            }
            let above = pitch + distance;
            if above <= 127 && self.contains(above) {
                return above as u8;
            }
        }
        pitch as u8
    }

    /// Move `pitch` by `degrees` scale steps, then snap back into range.
    ///
    /// The starting pitch is snapped first, so an off-scale input moves
    /// relative to its nearest scale neighbour.
    pub fn transpose(&self, pitch: u8, degrees: i32) -> u8 {
        let snapped = self.snap(pitch as i32) as i32;
        let len = self.degree_count() as i32;
        if len == 0 {
            return snapped as u8;
        }
        let relative = snapped - self.root as i32;
        let class = relative.rem_euclid(12) as u8;
        let degree = self
            .intervals()
            .iter()
            .position(|&i| i == class)
            .unwrap_or(0) as i32;
        let octave = (relative - class as i32).div_euclid(12);

        let total = octave * len + degree + degrees;
        let new_octave = total.div_euclid(len);
        let new_degree = total.rem_euclid(len) as usize;
        let target = self.root as i32 + new_octave * 12 + self.intervals[new_degree] as i32;

        self.snap(target)
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::chromatic(0)
    }
}
