//! # Template Model
//!
//! The input representation for the layout engine. A template is a list of
//! sections; each section is an ordered list of bands; each band is a
//! horizontal strip holding positioned elements. This is designed to be
//! produced by a visual designer or written directly as JSON.
//!
//! Bands are never mutated by the engine. Expansion wraps each one in an
//! [`Arc`](std::sync::Arc) and shares it into every instance and placed band.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ReportError;

/// A complete template ready for layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Page configuration shared by every section unless overridden.
    #[serde(default)]
    pub page: PageConfig,

    /// Named styles that elements reference through `Element::style`.
    #[serde(default)]
    pub styles: Map<String, Value>,

    pub sections: Vec<Section>,
}

impl Template {
    pub fn from_json(json: &str) -> Result<Self, ReportError> {
        serde_json::from_str(json).map_err(|e| ReportError::parse("template", e))
    }
}

/// Configuration for a page: size, margins, growth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageConfig {
    pub width: f64,
    pub height: f64,

    /// Page margins in points (1/72 inch).
    #[serde(default)]
    pub margins: Edges,

    /// When set, the page grows to fit its content and `height` becomes the
    /// minimum height.
    #[serde(default)]
    pub auto_height: bool,
}

impl Default for PageConfig {
    fn default() -> Self {
        // US Letter with half-inch margins.
        Self {
            width: 612.0,
            height: 792.0,
            margins: Edges::uniform(36.0),
            auto_height: false,
        }
    }
}

impl PageConfig {
    pub fn content_width(&self) -> f64 {
        (self.width - self.margins.horizontal()).max(0.0)
    }

    /// Height between the top and bottom margins.
    pub fn inner_height(&self) -> f64 {
        (self.height - self.margins.vertical()).max(0.0)
    }

    /// Merge a section-level override over this configuration.
    pub fn merged(&self, over: Option<&PageOverride>) -> PageConfig {
        let Some(over) = over else {
            return self.clone();
        };
        PageConfig {
            width: over.width.unwrap_or(self.width),
            height: over.height.unwrap_or(self.height),
            margins: over.margins.unwrap_or(self.margins),
            auto_height: over.auto_height.unwrap_or(self.auto_height),
        }
    }
}

/// Per-section page settings. Anything left out falls back to the template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margins: Option<Edges>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_height: Option<bool>,
}

/// Edge values (top, right, bottom, left) used for margins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Edges {
    pub fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn symmetric(vertical: f64, horizontal: f64) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

/// A top-level template partition with its own page and column setup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<PageOverride>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_gap: Option<f64>,

    /// Relative column widths. Scaled to fill the space left after gaps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_widths: Option<Vec<f64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_mode: Option<ColumnMode>,

    pub bands: Vec<Band>,
}

/// How bands are distributed across columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnMode {
    /// Fill each column top to bottom, then move right.
    #[default]
    Tile,
    /// Newspaper-style continuous flow. Not supported by the engine.
    Flow,
}

/// The thirteen band types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BandKind {
    PageHeader,
    PageFooter,
    LastPageFooter,
    ColumnHeader,
    ColumnFooter,
    Background,
    Title,
    Body,
    Detail,
    GroupHeader,
    GroupFooter,
    NoData,
    Summary,
}

/// Where a content band sits in the ordered content stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ContentRegion {
    Title,
    Detail,
    Body,
    Summary,
}

/// Per-page bands that are measured once and repeated by the paginator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralSlot {
    PageHeader,
    PageFooter,
    LastPageFooter,
    ColumnHeader,
    ColumnFooter,
    Background,
}

impl BandKind {
    /// `None` for content bands, which form the content stream instead.
    pub fn structural_slot(self) -> Option<StructuralSlot> {
        match self {
            BandKind::PageHeader => Some(StructuralSlot::PageHeader),
            BandKind::PageFooter => Some(StructuralSlot::PageFooter),
            BandKind::LastPageFooter => Some(StructuralSlot::LastPageFooter),
            BandKind::ColumnHeader => Some(StructuralSlot::ColumnHeader),
            BandKind::ColumnFooter => Some(StructuralSlot::ColumnFooter),
            BandKind::Background => Some(StructuralSlot::Background),
            BandKind::Title
            | BandKind::Body
            | BandKind::Detail
            | BandKind::GroupHeader
            | BandKind::GroupFooter
            | BandKind::NoData
            | BandKind::Summary => None,
        }
    }

    /// `None` for structural bands.
    pub fn content_region(self) -> Option<ContentRegion> {
        match self {
            BandKind::Title => Some(ContentRegion::Title),
            BandKind::Detail
            | BandKind::GroupHeader
            | BandKind::GroupFooter
            | BandKind::NoData => Some(ContentRegion::Detail),
            BandKind::Body => Some(ContentRegion::Body),
            BandKind::Summary => Some(ContentRegion::Summary),
            BandKind::PageHeader
            | BandKind::PageFooter
            | BandKind::LastPageFooter
            | BandKind::ColumnHeader
            | BandKind::ColumnFooter
            | BandKind::Background => None,
        }
    }

    /// Bands that always span the full content width in a multi-column
    /// section when they trail the tiled region.
    pub fn is_trailing_full_width(self) -> bool {
        match self {
            BandKind::Body | BandKind::Summary | BandKind::NoData => true,
            BandKind::PageHeader
            | BandKind::PageFooter
            | BandKind::LastPageFooter
            | BandKind::ColumnHeader
            | BandKind::ColumnFooter
            | BandKind::Background
            | BandKind::Title
            | BandKind::Detail
            | BandKind::GroupHeader
            | BandKind::GroupFooter => false,
        }
    }
}

/// A horizontal template strip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Band {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: BandKind,

    /// Declared height in points. The minimum height for auto-height bands.
    #[serde(default)]
    pub height: f64,

    /// Grow to fit the tallest measured element.
    #[serde(default)]
    pub auto_height: bool,

    /// Dot path to the array a `detail` band iterates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,

    /// Item field used to partition a detail band into groups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,

    /// Scope name each detail item is bound under. Defaults to `item`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,

    /// Expression; the instance is dropped when it evaluates falsy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    #[serde(default)]
    pub page_break_before: bool,

    /// Outline entry title (may contain expressions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark: Option<String>,

    /// Cross-reference target name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,

    #[serde(default)]
    pub elements: Vec<Element>,
}

impl Band {
    /// Create a band with the given id, kind and height and nothing else set.
    pub fn new(id: &str, kind: BandKind, height: f64) -> Self {
        Self {
            id: id.to_string(),
            kind,
            height,
            auto_height: false,
            data_source: None,
            group_by: None,
            item_name: None,
            condition: None,
            page_break_before: false,
            bookmark: None,
            anchor: None,
            background_color: None,
            elements: vec![],
        }
    }

    /// Create a `detail` band iterating `data_source`.
    pub fn detail(id: &str, data_source: &str, height: f64) -> Self {
        Self {
            data_source: Some(data_source.to_string()),
            ..Self::new(id, BandKind::Detail, height)
        }
    }

    pub fn item_name(&self) -> &str {
        self.item_name.as_deref().unwrap_or("item")
    }
}

/// A positioned element inside a band. Coordinates are band-relative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: String,

    /// Element type; selects the measurer (e.g. `text`, `image`).
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,

    /// Name of a style in the template's style sheet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,

    /// Type-specific properties. May contain expressions.
    #[serde(default)]
    pub props: Value,
}

impl Element {
    pub fn new(id: &str, kind: &str, x: f64, y: f64, width: f64, height: f64, props: Value) -> Self {
        Self {
            id: id.to_string(),
            kind: kind.to_string(),
            x,
            y,
            width,
            height,
            style: None,
            props,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn band_kind_deserializes_camel_case() {
        let kinds: Vec<BandKind> =
            serde_json::from_value(json!(["lastPageFooter", "groupHeader", "noData"])).unwrap();
        assert_eq!(
            kinds,
            vec![BandKind::LastPageFooter, BandKind::GroupHeader, BandKind::NoData]
        );
    }

    #[test]
    fn unknown_band_kind_is_rejected() {
        let result: Result<BandKind, _> = serde_json::from_value(json!("sidebar"));
        assert!(result.is_err());
    }

    #[test]
    fn band_defaults() {
        let band: Band = serde_json::from_value(json!({
            "id": "d1",
            "type": "detail",
            "height": 20,
            "dataSource": "lines"
        }))
        .unwrap();
        assert_eq!(band.kind, BandKind::Detail);
        assert!(!band.auto_height);
        assert!(!band.page_break_before);
        assert_eq!(band.item_name(), "item");
        assert!(band.elements.is_empty());
    }

    #[test]
    fn every_kind_is_structural_or_content() {
        let all = [
            BandKind::PageHeader,
            BandKind::PageFooter,
            BandKind::LastPageFooter,
            BandKind::ColumnHeader,
            BandKind::ColumnFooter,
            BandKind::Background,
            BandKind::Title,
            BandKind::Body,
            BandKind::Detail,
            BandKind::GroupHeader,
            BandKind::GroupFooter,
            BandKind::NoData,
            BandKind::Summary,
        ];
        for kind in all {
            assert_ne!(
                kind.structural_slot().is_some(),
                kind.content_region().is_some(),
                "{kind:?}"
            );
        }
    }

    #[test]
    fn section_page_override_merges() {
        let base = PageConfig {
            width: 500.0,
            height: 700.0,
            margins: Edges::uniform(10.0),
            auto_height: false,
        };
        let over = PageOverride {
            height: Some(300.0),
            auto_height: Some(true),
            ..Default::default()
        };
        let merged = base.merged(Some(&over));
        assert_eq!(merged.width, 500.0);
        assert_eq!(merged.height, 300.0);
        assert_eq!(merged.margins, Edges::uniform(10.0));
        assert!(merged.auto_height);
        assert_eq!(base.merged(None), base);
    }
}
