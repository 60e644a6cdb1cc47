//! # Line Split Decisions
//!
//! Where to cut a wrapped block of lines when only part of it fits in the
//! height left on a page. The rules mirror typesetting practice: keep at
//! least `orphans` lines before the cut and push at least `widows` lines
//! after it, otherwise move the block whole.

/// Tolerance for heights that land exactly on a line boundary.
const EPSILON: f64 = 1e-9;

/// A successful split: the first `fit_lines` lines stay, the rest overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitPoint {
    pub fit_lines: usize,
}

/// Decide how many of `line_count` lines stay within `available_height`.
///
/// Returns `None` when everything fits, when nothing fits, or when the
/// orphan and widow minimums cannot both be met; the caller should then move
/// the whole block.
pub fn split_lines(
    line_count: usize,
    line_height: f64,
    available_height: f64,
    orphans: usize,
    widows: usize,
) -> Option<SplitPoint> {
    if line_count == 0 || line_height <= 0.0 || !available_height.is_finite() {
        return None;
    }

    let fit = ((available_height + EPSILON) / line_height).floor();
    if fit < 1.0 {
        return None;
    }
    let mut fit = fit as usize;
    if fit >= line_count {
        return None;
    }

    // Pull lines back so the overflow part has enough widows.
    let remainder = line_count - fit;
    if remainder < widows {
        fit = line_count.saturating_sub(widows);
    }

    if fit == 0 || fit < orphans {
        return None;
    }

    Some(SplitPoint { fit_lines: fit })
}
