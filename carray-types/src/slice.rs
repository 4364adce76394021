use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use crate::ArrayError;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
/// A `start:stop:step` selection over a sequence.
///
/// Bounds may be negative, in which case they count from the end of the
/// sequence, and the step may be negative to walk the sequence backwards.
/// Out of range bounds are clamped rather than rejected.
pub struct Slice {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// A [Slice] resolved against a concrete sequence length.
pub struct SliceIndices {
    /// The first selected position (only meaningful when `count > 0`).
    pub start: usize,
    pub step: i64,
    /// The number of selected positions.
    pub count: usize,
}

impl Slice {
    /// Selects the entire sequence.
    pub const fn full() -> Self {
        Self {
            start: None,
            stop: None,
            step: None,
        }
    }

    pub const fn new(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Self {
        Self { start, stop, step }
    }

    /// Returns the same slice walking with the given step.
    pub const fn with_step(mut self, step: i64) -> Self {
        self.step = Some(step);
        self
    }

    /// Resolves the slice against a sequence of length `len`.
    pub fn indices(&self, len: usize) -> Result<SliceIndices, ArrayError> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(ArrayError::ZeroStep);
        }

        let len = len as i64;
        let (lower, upper) = if step < 0 { (-1, len - 1) } else { (0, len) };

        let clamp = |bound: i64| -> i64 {
            if bound < 0 {
                (bound + len).max(lower)
            } else {
                bound.min(upper)
            }
        };

        let start = self
            .start
            .map(clamp)
            .unwrap_or(if step < 0 { upper } else { lower });
        let stop = self
            .stop
            .map(clamp)
            .unwrap_or(if step < 0 { lower } else { upper });

        let count = if step < 0 {
            if stop < start {
                (start - stop - 1) / (-step) + 1
            } else {
                0
            }
        } else if start < stop {
            (stop - start - 1) / step + 1
        } else {
            0
        };

        Ok(SliceIndices {
            start: start.max(0) as usize,
            step,
            count: count as usize,
        })
    }
}

impl SliceIndices {
    /// The lowest and highest (exclusive) positions touched by the slice.
    pub fn span(&self) -> Range<usize> {
        if self.count == 0 {
            return 0..0;
        }
        let last = self.start as i64 + (self.count as i64 - 1) * self.step;
        if self.step < 0 {
            last as usize..self.start + 1
        } else {
            self.start..last as usize + 1
        }
    }

    /// Iterates over the selected positions in selection order.
    pub fn iter(&self) -> impl Iterator<Item = usize> {
        let SliceIndices { start, step, count } = *self;
        (0..count).map(move |k| (start as i64 + k as i64 * step) as usize)
    }
}

impl From<RangeFull> for Slice {
    fn from(_: RangeFull) -> Self {
        Self::full()
    }
}

impl From<Range<usize>> for Slice {
    fn from(range: Range<usize>) -> Self {
        Self::new(Some(range.start as i64), Some(range.end as i64), None)
    }
}

impl From<RangeFrom<usize>> for Slice {
    fn from(range: RangeFrom<usize>) -> Self {
        Self::new(Some(range.start as i64), None, None)
    }
}

impl From<RangeTo<usize>> for Slice {
    fn from(range: RangeTo<usize>) -> Self {
        Self::new(None, Some(range.end as i64), None)
    }
}
