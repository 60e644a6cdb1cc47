//! # Page Break Decisions
//!
//! Logic for deciding when a band forces a new page and which column a tiled
//! band goes into. Kept free of layout state so each rule can be tested on
//! plain numbers.

/// Heights within this distance of the limit still fit.
pub const EPSILON: f64 = 1e-6;

/// What to do with the next band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakDecision {
    /// Place the band at the current cursor.
    Place,
    /// Finish the current page and place the band on a fresh one.
    MoveToNextPage,
}

/// Decide whether a full-width band of `band_height` goes on this page.
///
/// A page without content always accepts the band, so a band taller than
/// the whole content area is placed alone instead of looping.
pub fn decide_break(
    remaining_height: f64,
    band_height: f64,
    page_has_content: bool,
    page_break_before: bool,
) -> BreakDecision {
    if !page_has_content {
        return BreakDecision::Place;
    }
    if page_break_before || band_height > remaining_height + EPSILON {
        return BreakDecision::MoveToNextPage;
    }
    BreakDecision::Place
}

/// Whether a band of `band_height` fits below `cursor` in a column of
/// `column_height`.
pub fn fits(cursor: f64, band_height: f64, column_height: f64) -> bool {
    cursor + band_height <= column_height + EPSILON
}
