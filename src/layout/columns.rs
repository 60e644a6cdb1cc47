//! # Column Geometry
//!
//! Column configuration for a section and the arithmetic for tiling bands
//! into side-by-side columns.

use serde::Serialize;

use crate::error::ReportError;
use crate::model::{ColumnMode, Section};

/// Column setup of one section.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnConfig {
    pub columns: usize,
    pub gap: f64,
    /// Relative widths; `None` divides the space equally.
    pub widths: Option<Vec<f64>>,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            columns: 1,
            gap: 0.0,
            widths: None,
        }
    }
}

impl ColumnConfig {
    /// Read and validate a section's column settings.
    pub fn from_section(section: &Section) -> Result<Self, ReportError> {
        if section.column_mode == Some(ColumnMode::Flow) {
            return Err(ReportError::config(
                "columnMode \"flow\" is not implemented; use \"tile\"",
            ));
        }
        let columns = section.columns.unwrap_or(1) as usize;
        if columns == 0 {
            return Err(ReportError::config("columns must be at least 1"));
        }
        let gap = section.column_gap.unwrap_or(0.0);
        if !gap.is_finite() || gap < 0.0 {
            return Err(ReportError::config(format!("invalid columnGap {gap}")));
        }
        if let Some(widths) = &section.column_widths {
            if widths.len() != columns {
                return Err(ReportError::config(format!(
                    "columnWidths has {} entries for {} columns",
                    widths.len(),
                    columns
                )));
            }
            if widths.iter().any(|w| !w.is_finite() || *w < 0.0) || widths.iter().sum::<f64>() <= 0.0 {
                return Err(ReportError::config(
                    "columnWidths must be non-negative with a positive sum",
                ));
            }
        }
        Ok(Self {
            columns,
            gap,
            widths: section.column_widths.clone(),
        })
    }

    pub fn is_multi(&self) -> bool {
        self.columns > 1
    }

    /// Horizontal position and width of every column within `content_width`.
    pub fn slots(&self, content_width: f64) -> Vec<ColumnSlot> {
        let n = self.columns.max(1);
        let usable = (content_width - self.gap * (n - 1) as f64).max(0.0);
        let widths: Vec<f64> = match &self.widths {
            Some(ratios) => {
                let total: f64 = ratios.iter().sum();
                ratios.iter().map(|r| r / total * usable).collect()
            }
            None => vec![usable / n as f64; n],
        };

        let mut x = 0.0;
        widths
            .into_iter()
            .enumerate()
            .map(|(index, width)| {
                let slot = ColumnSlot {
                    index,
                    offset_x: x,
                    width,
                };
                x += width + self.gap;
                slot
            })
            .collect()
    }
}

/// One column's horizontal extent, relative to the left margin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnSlot {
    pub index: usize,
    pub offset_x: f64,
    pub width: f64,
}

/// Column fields of a tiled band. Present together or not at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnPlacement {
    pub column_index: usize,
    pub column_offset_x: f64,
    pub column_width: f64,
}

impl From<ColumnSlot> for ColumnPlacement {
    fn from(slot: ColumnSlot) -> Self {
        Self {
            column_index: slot.index,
            column_offset_x: slot.offset_x,
            column_width: slot.width,
        }
    }
}

/// The three runs of a multi-column content stream: leading full-width
/// titles, the tiled middle, and trailing full-width body/summary/noData.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Regions {
    pub tiled_start: usize,
    pub trailing_start: usize,
}

/// Split a content stream of `kinds` into leading, tiled and trailing runs.
pub fn split_regions<K: Copy>(
    kinds: &[K],
    is_leading: impl Fn(K) -> bool,
    is_trailing: impl Fn(K) -> bool,
) -> Regions {
    let tiled_start = kinds.iter().take_while(|k| is_leading(**k)).count();
    let trailing_len = kinds[tiled_start..]
        .iter()
        .rev()
        .take_while(|k| is_trailing(**k))
        .count();
    Regions {
        tiled_start,
        trailing_start: kinds.len() - trailing_len,
    }
}
