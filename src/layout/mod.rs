//! # Pagination Layout Engine
//!
//! Places an expanded section's bands onto pages.
//!
//! The engine never lays content out on an endless strip and slices it
//! afterwards. Bands flow *into* pages:
//!
//! 1. Open a page: emit page headers, then column headers.
//! 2. Measure the next band and ask: does it fit below the cursor?
//! 3. If it fits, place it and advance the cursor.
//! 4. If it doesn't and the page already holds content, finalize the page
//!    (backgrounds, column footers, page footer) and open a new one.
//! 5. A band taller than the whole content area still gets placed, alone,
//!    on a fresh page.
//!
//! Multi-column sections tile their detail region into columns with a
//! sticky column pointer; titles before and body/summary/noData after the
//! tiled region stay full width.
//!
//! The page under construction is a [`PageBuilder`] value that each
//! placement step takes and returns, so there is no shared mutable cursor.

pub mod columns;
pub mod page_break;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::error::ReportError;
use crate::expand::{BandInstance, ExpandedSection};
use crate::expr::Expressions;
use crate::measure::{MeasureContext, MeasurerRegistry, Resources, StyleSheet};
use crate::model::{Band, BandKind, Element, PageConfig};
use crate::scope::Scope;

pub use columns::{ColumnConfig, ColumnPlacement, ColumnSlot};
use columns::split_regions;
use page_break::{decide_break, fits, BreakDecision};

/// A band instance in its final position.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutBand {
    pub band: Arc<Band>,
    /// Distance from the page's top margin.
    pub offset_y: f64,
    pub measured_height: f64,
    /// Measured height per element id. Empty for fixed-height bands.
    pub element_heights: BTreeMap<String, f64>,
    pub scope: Scope,
    /// Set only for bands tiled into a column.
    #[serde(flatten)]
    pub column: Option<ColumnPlacement>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutPage {
    pub section_index: usize,
    pub page_index: usize,
    pub bands: Vec<LayoutBand>,
    /// Final page height on auto-height pages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub computed_height: Option<f64>,
}

/// A bookmark collected from a placed band.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkEntry {
    pub title: String,
    pub page_index: usize,
    pub offset_y: f64,
}

/// The complete paginated layout of a template.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutResult {
    pub pages: Vec<LayoutPage>,
    pub total_pages: usize,
    pub bookmarks: Vec<BookmarkEntry>,
    /// Anchor name → 1-based page number.
    pub anchors: BTreeMap<String, usize>,
}

/// Give pages their global index and stamp `_pageNumber` into every scope.
pub fn number_pages(pages: &mut [LayoutPage], first_page_index: usize) {
    for (i, page) in pages.iter_mut().enumerate() {
        page.page_index = first_page_index + i;
        for band in &mut page.bands {
            band.scope.stamp_page_number(page.page_index + 1);
        }
    }
}

/// Places bands onto pages, measuring them through the registered measurers.
pub struct LayoutEngine<'a> {
    measurers: &'a MeasurerRegistry,
    expressions: &'a dyn Expressions,
    styles: &'a StyleSheet,
    resources: &'a Resources,
}

/// A band instance with its height known.
#[derive(Debug, Clone)]
struct Measured {
    band: Arc<Band>,
    scope: Scope,
    height: f64,
    element_heights: BTreeMap<String, f64>,
}

impl Measured {
    fn at(&self, offset_y: f64, column: Option<ColumnPlacement>) -> LayoutBand {
        LayoutBand {
            band: Arc::clone(&self.band),
            offset_y,
            measured_height: self.height,
            element_heights: self.element_heights.clone(),
            scope: self.scope.clone(),
            column,
        }
    }
}

fn total_height(bands: &[Measured]) -> f64 {
    bands.iter().map(|b| b.height).sum()
}

/// Structural bands of a section, measured once.
struct Chrome {
    page_header: Vec<Measured>,
    page_footer: Vec<Measured>,
    last_page_footer: Vec<Measured>,
    /// One list per column slot.
    column_header: Vec<Vec<Measured>>,
    column_footer: Vec<Vec<Measured>>,
    background: Vec<Measured>,
}

/// Vertical budget of a page in this section. All offsets are relative to
/// the top margin.
struct PageGeometry {
    page: PageConfig,
    slots: Vec<ColumnSlot>,
    multi_column: bool,
    header_height: f64,
    column_header_height: f64,
    column_footer_height: f64,
    footer_reserve: f64,
    /// Unbounded on auto-height pages.
    content_height: f64,
}

impl PageGeometry {
    fn content_top(&self) -> f64 {
        self.header_height + self.column_header_height
    }

    fn placement(&self, slot: ColumnSlot) -> Option<ColumnPlacement> {
        self.multi_column.then(|| slot.into())
    }
}

/// The page under construction.
#[derive(Debug, Clone)]
struct PageBuilder {
    bands: Vec<LayoutBand>,
    /// Full-width cursor, relative to the content top.
    cursor_y: f64,
    column_cursors: Vec<f64>,
    current_column: usize,
    /// Any content band has been placed on this page.
    has_content: bool,
}

impl PageBuilder {
    fn bottom(&self) -> f64 {
        self.column_cursors
            .iter()
            .copied()
            .fold(self.cursor_y, f64::max)
    }
}

impl<'a> LayoutEngine<'a> {
    pub fn new(
        measurers: &'a MeasurerRegistry,
        expressions: &'a dyn Expressions,
        styles: &'a StyleSheet,
        resources: &'a Resources,
    ) -> Self {
        Self {
            measurers,
            expressions,
            styles,
            resources,
        }
    }

    /// Paginate one expanded section. Page indices start at 0 and scopes keep
    /// `_pageNumber = 0`; see [`number_pages`] for the final numbering.
    pub fn layout_section(
        &self,
        page: &PageConfig,
        columns: &ColumnConfig,
        expanded: &ExpandedSection,
        section_index: usize,
    ) -> Result<Vec<LayoutPage>, ReportError> {
        let content_width = page.content_width();
        let inner_height = page.inner_height();
        let slots = columns.slots(content_width);

        let measure_all = |list: &[BandInstance], width: f64| -> Result<Vec<Measured>, ReportError> {
            list.iter()
                .map(|instance| self.measure_band(instance, width, inner_height))
                .collect()
        };
        let per_column = |list: &[BandInstance]| -> Result<Vec<Vec<Measured>>, ReportError> {
            slots.iter().map(|slot| measure_all(list, slot.width)).collect()
        };

        let chrome = Chrome {
            page_header: measure_all(&expanded.page_header, content_width)?,
            page_footer: measure_all(&expanded.page_footer, content_width)?,
            last_page_footer: measure_all(&expanded.last_page_footer, content_width)?,
            column_header: per_column(&expanded.column_header)?,
            column_footer: per_column(&expanded.column_footer)?,
            background: measure_all(&expanded.background, content_width)?,
        };

        let tallest = |lists: &[Vec<Measured>]| {
            lists.iter().map(|l| total_height(l)).fold(0.0, f64::max)
        };
        let header_height = total_height(&chrome.page_header);
        let column_header_height = tallest(&chrome.column_header);
        let column_footer_height = tallest(&chrome.column_footer);
        let footer_reserve =
            total_height(&chrome.page_footer).max(total_height(&chrome.last_page_footer));
        let content_height = if page.auto_height {
            f64::INFINITY
        } else {
            (inner_height - header_height - footer_reserve - column_header_height).max(0.0)
        };

        tracing::debug!(
            section = section_index,
            columns = slots.len(),
            content_height,
            footer_reserve,
            "section geometry"
        );

        let mut pass = SectionPass {
            engine: self,
            geometry: PageGeometry {
                page: page.clone(),
                slots,
                multi_column: columns.is_multi(),
                header_height,
                column_header_height,
                column_footer_height,
                footer_reserve,
                content_height,
            },
            chrome,
            section_index,
            pages: Vec::new(),
        };

        let bands = &expanded.content_bands;
        let mut builder = pass.start_page();
        if pass.geometry.multi_column {
            let kinds: Vec<BandKind> = bands.iter().map(|b| b.band.kind).collect();
            let regions = split_regions(
                &kinds,
                |k| k == BandKind::Title,
                BandKind::is_trailing_full_width,
            );
            for instance in &bands[..regions.tiled_start] {
                builder = pass.place_full_width(builder, instance)?;
            }
            builder = pass.tile(builder, &bands[regions.tiled_start..regions.trailing_start])?;
            for instance in &bands[regions.trailing_start..] {
                builder = pass.place_full_width(builder, instance)?;
            }
        } else {
            for instance in bands {
                builder = pass.place_full_width(builder, instance)?;
            }
        }

        Ok(pass.finish(builder))
    }

    /// Measure a band at `width`. Fixed-height bands keep their declared
    /// height; auto-height bands grow to their tallest element.
    fn measure_band(
        &self,
        instance: &BandInstance,
        width: f64,
        available_height: f64,
    ) -> Result<Measured, ReportError> {
        let band = &instance.band;
        let mut height = band.height;
        let mut element_heights = BTreeMap::new();

        if band.auto_height {
            for element in &band.elements {
                let element_height =
                    self.measure_element(element, &instance.scope, width, available_height)?;
                height = height.max(element.y + element_height);
                element_heights.insert(element.id.clone(), element_height);
            }
        }

        Ok(Measured {
            band: Arc::clone(band),
            scope: instance.scope.clone(),
            height,
            element_heights,
        })
    }

    fn measure_element(
        &self,
        element: &Element,
        scope: &Scope,
        band_width: f64,
        available_height: f64,
    ) -> Result<f64, ReportError> {
        let Some(measurer) = self.measurers.get(&element.kind) else {
            return Ok(element.height);
        };
        let props = self.expressions.resolve_props(&element.props, scope);
        let available_width = if element.width > 0.0 {
            element.width
        } else {
            (band_width - element.x).max(0.0)
        };
        let ctx = MeasureContext {
            available_width,
            available_height,
            style_name: element.style.as_deref(),
            styles: self.styles,
            resources: self.resources,
        };
        let size = measurer
            .measure(&props, &ctx)
            .map_err(|e| ReportError::validation(&element.id, e))?;
        Ok(size.height)
    }
}

/// State of one section's pagination.
struct SectionPass<'e, 'a> {
    engine: &'e LayoutEngine<'a>,
    geometry: PageGeometry,
    chrome: Chrome,
    section_index: usize,
    pages: Vec<LayoutPage>,
}

impl SectionPass<'_, '_> {
    fn start_page(&self) -> PageBuilder {
        let g = &self.geometry;
        let mut bands = Vec::new();

        let mut y = 0.0;
        for header in &self.chrome.page_header {
            bands.push(header.at(y, None));
            y += header.height;
        }
        for (slot, list) in g.slots.iter().zip(&self.chrome.column_header) {
            let mut cy = g.header_height;
            for header in list {
                bands.push(header.at(cy, g.placement(*slot)));
                cy += header.height;
            }
        }

        PageBuilder {
            bands,
            cursor_y: 0.0,
            column_cursors: vec![0.0; g.slots.len()],
            current_column: 0,
            has_content: false,
        }
    }

    fn break_page(&mut self, builder: PageBuilder) -> PageBuilder {
        let page = self.finalize_page(builder, false);
        self.pages.push(page);
        self.start_page()
    }

    fn place_full_width(
        &mut self,
        mut builder: PageBuilder,
        instance: &BandInstance,
    ) -> Result<PageBuilder, ReportError> {
        let g = &self.geometry;
        let measured =
            self.engine
                .measure_band(instance, g.page.content_width(), g.content_height)?;
        let remaining = g.content_height - builder.cursor_y;

        let decision = decide_break(
            remaining,
            measured.height,
            builder.has_content,
            instance.band.page_break_before,
        );
        if decision == BreakDecision::MoveToNextPage {
            builder = self.break_page(builder);
        }

        let offset_y = self.geometry.content_top() + builder.cursor_y;
        builder.bands.push(measured.at(offset_y, None));
        builder.cursor_y += measured.height;
        builder.has_content = true;
        Ok(builder)
    }

    /// Tile `instances` into columns, probing forward from the current
    /// column only.
    fn tile(
        &mut self,
        mut builder: PageBuilder,
        instances: &[BandInstance],
    ) -> Result<PageBuilder, ReportError> {
        if instances.is_empty() {
            return Ok(builder);
        }
        let start = builder.cursor_y;
        builder.column_cursors.fill(start);
        builder.current_column = 0;

        for instance in instances {
            if instance.band.page_break_before && builder.has_content {
                builder = self.break_page(builder);
            }

            let mut choice = None;
            for column in builder.current_column..self.geometry.slots.len() {
                let measured = self.measure_in_column(instance, column)?;
                if fits(
                    builder.column_cursors[column],
                    measured.height,
                    self.geometry.content_height,
                ) {
                    choice = Some((column, measured));
                    break;
                }
            }

            let (column, measured) = match choice {
                Some(found) => found,
                None => {
                    if builder.has_content {
                        builder = self.break_page(builder);
                    }
                    let column = builder.current_column;
                    (column, self.measure_in_column(instance, column)?)
                }
            };

            if column != builder.current_column {
                tracing::trace!(band = %instance.band.id, column, "moved to next column");
            }

            let slot = self.geometry.slots[column];
            let offset_y = self.geometry.content_top() + builder.column_cursors[column];
            builder.bands.push(measured.at(offset_y, self.geometry.placement(slot)));
            builder.column_cursors[column] += measured.height;
            builder.current_column = column;
            builder.has_content = true;
        }

        builder.cursor_y = builder.bottom();
        Ok(builder)
    }

    fn measure_in_column(
        &self,
        instance: &BandInstance,
        column: usize,
    ) -> Result<Measured, ReportError> {
        let g = &self.geometry;
        self.engine
            .measure_band(instance, g.slots[column].width, g.content_height)
    }

    /// Close a page: backgrounds first, then the placed bands, column
    /// footers and the page footer.
    fn finalize_page(&self, builder: PageBuilder, is_last: bool) -> LayoutPage {
        let g = &self.geometry;
        let content_bottom = g.content_top() + builder.bottom();

        let mut bands: Vec<LayoutBand> = self
            .chrome
            .background
            .iter()
            .map(|b| b.at(0.0, None))
            .collect();
        bands.extend(builder.bands);

        let footer = if is_last && !self.chrome.last_page_footer.is_empty() {
            &self.chrome.last_page_footer
        } else {
            &self.chrome.page_footer
        };

        // Column footers take no content space; they follow the content.
        let footer_top = if g.page.auto_height {
            content_bottom + g.column_footer_height
        } else {
            g.page.inner_height() - total_height(footer)
        };

        for (slot, list) in g.slots.iter().zip(&self.chrome.column_footer) {
            let mut y = content_bottom;
            for column_footer in list {
                bands.push(column_footer.at(y, g.placement(*slot)));
                y += column_footer.height;
            }
        }
        let mut y = footer_top;
        for band in footer {
            bands.push(band.at(y, None));
            y += band.height;
        }

        let computed_height = g.page.auto_height.then(|| {
            let content = bands
                .iter()
                .filter(|b| b.band.kind != BandKind::Background)
                .map(|b| b.offset_y + b.measured_height)
                .fold(0.0, f64::max);
            (g.page.margins.vertical() + content).max(g.page.height)
        });

        let page_index = self.pages.len();
        tracing::debug!(
            section = self.section_index,
            page = page_index,
            bands = bands.len(),
            "page finished"
        );

        LayoutPage {
            section_index: self.section_index,
            page_index,
            bands,
            computed_height,
        }
    }

    fn finish(mut self, builder: PageBuilder) -> Vec<LayoutPage> {
        let last = self.finalize_page(builder, true);
        self.pages.push(last);
        self.pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::{expand_section, ExpandContext};
    use crate::expr::TemplateExpressions;
    use crate::measure::{ElementMeasurer, Size};
    use crate::model::{Edges, Section};
    use crate::error::ValidationError;
    use serde_json::{json, Value};

    fn page(height: f64, margin: f64) -> PageConfig {
        PageConfig {
            width: 612.0,
            height,
            margins: Edges::uniform(margin),
            auto_height: false,
        }
    }

    fn layout_with(
        registry: &MeasurerRegistry,
        page: &PageConfig,
        section: &Section,
        data: &Value,
    ) -> Result<Vec<LayoutPage>, ReportError> {
        let exprs = TemplateExpressions;
        let anchors = BTreeMap::new();
        let ctx = ExpandContext {
            total_pages_hint: 0,
            anchors: &anchors,
        };
        let expanded = expand_section(section, data, &exprs, &ctx)?;
        let styles = StyleSheet::default();
        let resources = Resources::new();
        let engine = LayoutEngine::new(registry, &exprs, &styles, &resources);
        let columns = ColumnConfig::from_section(section)?;
        engine.layout_section(page, &columns, &expanded, 0)
    }

    fn layout(page: &PageConfig, section: &Section, data: &Value) -> Vec<LayoutPage> {
        layout_with(&MeasurerRegistry::new(), page, section, data).unwrap()
    }

    fn section(bands: Vec<Band>) -> Section {
        Section {
            bands,
            ..Default::default()
        }
    }

    fn rows(n: usize) -> Value {
        json!({ "rows": (0..n).map(|i| json!({"n": i})).collect::<Vec<_>>() })
    }

    fn ids(page: &LayoutPage) -> Vec<&str> {
        page.bands.iter().map(|b| b.band.id.as_str()).collect()
    }

    #[test]
    fn single_band_single_page() {
        let pages = layout(
            &page(792.0, 40.0),
            &section(vec![Band::new("b", BandKind::Body, 100.0)]),
            &json!({}),
        );
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].bands[0].offset_y, 0.0);
        assert_eq!(pages[0].bands[0].measured_height, 100.0);
        assert!(pages[0].computed_height.is_none());
    }

    #[test]
    fn empty_section_yields_one_page() {
        let pages = layout(&page(792.0, 40.0), &section(vec![]), &json!({}));
        assert_eq!(pages.len(), 1);
        assert!(pages[0].bands.is_empty());
    }

    #[test]
    fn overflowing_band_moves_to_next_page() {
        // 100pt content area, 3 × 40pt rows → 2 + 1.
        let pages = layout(
            &page(140.0, 20.0),
            &section(vec![Band::detail("row", "rows", 40.0)]),
            &rows(3),
        );
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].bands.len(), 2);
        assert_eq!(pages[1].bands[0].offset_y, 0.0);
    }

    #[test]
    fn oversized_band_placed_alone() {
        let pages = layout(
            &page(140.0, 20.0),
            &section(vec![
                Band::new("small", BandKind::Title, 10.0),
                Band::new("huge", BandKind::Body, 500.0),
                Band::new("after", BandKind::Summary, 10.0),
            ]),
            &json!({}),
        );
        assert_eq!(pages.len(), 3);
        assert_eq!(ids(&pages[1]), vec!["huge"]);
        assert_eq!(ids(&pages[2]), vec!["after"]);
    }

    #[test]
    fn headers_repeat_and_footer_sits_at_bottom() {
        let pages = layout(
            &page(200.0, 20.0),
            &section(vec![
                Band::new("head", BandKind::PageHeader, 20.0),
                Band::new("foot", BandKind::PageFooter, 10.0),
                Band::detail("row", "rows", 50.0),
            ]),
            &rows(4),
        );
        // 160 inner − 20 − 10 = 130 → 2 rows per page.
        assert_eq!(pages.len(), 2);
        for p in &pages {
            assert_eq!(p.bands[0].band.id, "head");
            let footer = p.bands.last().unwrap();
            assert_eq!(footer.band.id, "foot");
            assert_eq!(footer.offset_y, 150.0);
        }
        assert_eq!(pages[1].bands[1].offset_y, 20.0);
    }

    #[test]
    fn last_page_footer_replaces_footer_on_final_page() {
        let pages = layout(
            &page(200.0, 20.0),
            &section(vec![
                Band::new("foot", BandKind::PageFooter, 20.0),
                Band::new("last", BandKind::LastPageFooter, 60.0),
                Band::detail("row", "rows", 25.0),
            ]),
            &rows(5),
        );
        // Reservation is 60 → 100pt area → 4 rows, then 1.
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].bands.last().unwrap().band.id, "foot");
        assert_eq!(pages[0].bands.last().unwrap().offset_y, 140.0);
        let last = pages[1].bands.last().unwrap();
        assert_eq!(last.band.id, "last");
        assert_eq!(last.offset_y, 100.0);
    }

    #[test]
    fn page_break_before_forces_new_page() {
        let mut second = Band::new("second", BandKind::Body, 10.0);
        second.page_break_before = true;
        let mut first = Band::new("first", BandKind::Title, 10.0);
        first.page_break_before = true;
        let pages = layout(&page(792.0, 40.0), &section(vec![first, second]), &json!({}));
        assert_eq!(pages.len(), 2);
        assert_eq!(ids(&pages[0]), vec!["first"]);
    }

    #[test]
    fn backgrounds_come_first() {
        let pages = layout(
            &page(792.0, 40.0),
            &section(vec![
                Band::new("b", BandKind::Body, 10.0),
                Band::new("bg", BandKind::Background, 700.0),
            ]),
            &json!({}),
        );
        assert_eq!(ids(&pages[0]), vec!["bg", "b"]);
        assert_eq!(pages[0].bands[0].offset_y, 0.0);
    }

    #[test]
    fn auto_height_page_grows() {
        let mut cfg = page(100.0, 10.0);
        cfg.auto_height = true;
        let pages = layout(
            &cfg,
            &section(vec![
                Band::detail("row", "rows", 30.0),
                Band::new("foot", BandKind::PageFooter, 10.0),
            ]),
            &rows(5),
        );
        assert_eq!(pages.len(), 1);
        let footer = pages[0].bands.last().unwrap();
        assert_eq!(footer.offset_y, 150.0);
        assert_eq!(pages[0].computed_height, Some(180.0));
    }

    #[test]
    fn auto_height_page_never_shrinks() {
        let mut cfg = page(300.0, 10.0);
        cfg.auto_height = true;
        let pages = layout(
            &cfg,
            &section(vec![Band::new("b", BandKind::Body, 10.0)]),
            &json!({}),
        );
        assert_eq!(pages[0].computed_height, Some(300.0));
    }

    fn two_columns(bands: Vec<Band>) -> Section {
        Section {
            columns: Some(2),
            column_gap: Some(12.0),
            bands,
            ..Default::default()
        }
    }

    #[test]
    fn tiles_into_columns_then_pages() {
        // 80pt area, 40pt rows: two per column, four per page.
        let pages = layout(
            &page(120.0, 20.0),
            &two_columns(vec![Band::detail("row", "rows", 40.0)]),
            &rows(5),
        );
        assert_eq!(pages.len(), 2);
        let columns: Vec<usize> = pages[0]
            .bands
            .iter()
            .map(|b| b.column.unwrap().column_index)
            .collect();
        assert_eq!(columns, vec![0, 0, 1, 1]);
        let first = pages[0].bands[2].column.unwrap();
        assert_eq!(first.column_offset_x, 292.0);
        assert_eq!(first.column_width, 280.0);
        assert_eq!(pages[0].bands[2].offset_y, 0.0);
        assert_eq!(pages[1].bands[0].column.unwrap().column_index, 0);
    }

    #[test]
    fn column_pointer_is_sticky() {
        // The last 10pt row would still fit under the 70pt row in col 0,
        // but the pointer has already moved on to col 1.
        let data = json!({"rows": [{"h": 1}, {"h": 2}, {"h": 3}]});
        let mut tall = Band::detail("tall", "rows", 70.0);
        tall.condition = Some("item.h == 1".to_string());
        let mut mid = Band::detail("mid", "rows", 60.0);
        mid.condition = Some("item.h == 2".to_string());
        let mut short = Band::detail("short", "rows", 10.0);
        short.condition = Some("item.h == 3".to_string());
        let pages = layout(&page(120.0, 20.0), &two_columns(vec![tall, mid, short]), &data);
        let placed: Vec<(&str, usize)> = pages[0]
            .bands
            .iter()
            .map(|b| (b.band.id.as_str(), b.column.unwrap().column_index))
            .collect();
        assert_eq!(placed, vec![("tall", 0), ("mid", 1), ("short", 1)]);
    }

    #[test]
    fn titles_and_summary_stay_full_width() {
        let pages = layout(
            &page(300.0, 20.0),
            &two_columns(vec![
                Band::new("title", BandKind::Title, 30.0),
                Band::detail("row", "rows", 40.0),
                Band::new("summary", BandKind::Summary, 20.0),
            ]),
            &rows(3),
        );
        let page = &pages[0];
        assert!(page.bands[0].column.is_none());
        assert_eq!(page.bands[1].offset_y, 30.0);
        let summary = page.bands.last().unwrap();
        assert!(summary.column.is_none());
        // Tallest column holds three rows below the title.
        assert_eq!(summary.offset_y, 150.0);
    }

    #[test]
    fn column_headers_and_footers_per_column() {
        let pages = layout(
            &page(200.0, 20.0),
            &two_columns(vec![
                Band::new("ch", BandKind::ColumnHeader, 10.0),
                Band::new("cf", BandKind::ColumnFooter, 10.0),
                Band::detail("row", "rows", 40.0),
            ]),
            &rows(1),
        );
        let page = &pages[0];
        let headers: Vec<&LayoutBand> = page.bands.iter().filter(|b| b.band.id == "ch").collect();
        let footers: Vec<&LayoutBand> = page.bands.iter().filter(|b| b.band.id == "cf").collect();
        assert_eq!(headers.len(), 2);
        assert_eq!(footers.len(), 2);
        assert_eq!(footers[1].column.unwrap().column_index, 1);
        let row = page.bands.iter().find(|b| b.band.id == "row").unwrap();
        assert_eq!(row.offset_y, 10.0);
        // directly below the content, level across columns
        assert_eq!(footers[0].offset_y, 50.0);
        assert_eq!(footers[1].offset_y, 50.0);
    }

    #[test]
    fn column_footer_takes_no_content_space() {
        // 160pt area holds all four rows; the footer follows them.
        let pages = layout(
            &page(200.0, 20.0),
            &section(vec![
                Band::new("cf", BandKind::ColumnFooter, 40.0),
                Band::detail("row", "rows", 40.0),
            ]),
            &rows(4),
        );
        assert_eq!(pages.len(), 1);
        let footer = pages[0].bands.last().unwrap();
        assert_eq!(footer.band.id, "cf");
        assert_eq!(footer.offset_y, 160.0);
    }

    #[test]
    fn auto_height_column_footer_follows_content() {
        let mut cfg = page(100.0, 10.0);
        cfg.auto_height = true;
        let pages = layout(
            &cfg,
            &two_columns(vec![
                Band::new("cf", BandKind::ColumnFooter, 10.0),
                Band::new("foot", BandKind::PageFooter, 10.0),
                Band::detail("row", "rows", 30.0),
            ]),
            &rows(3),
        );
        assert_eq!(pages.len(), 1);
        let page = &pages[0];
        let offsets = |id: &str| -> Vec<f64> {
            page.bands
                .iter()
                .filter(|b| b.band.id == id)
                .map(|b| b.offset_y)
                .collect()
        };
        // unbounded area: every row stays in column 0
        assert_eq!(offsets("row"), vec![0.0, 30.0, 60.0]);
        assert_eq!(offsets("cf"), vec![90.0, 90.0]);
        assert_eq!(offsets("foot"), vec![100.0]);
        assert_eq!(page.computed_height, Some(130.0));
    }

    #[test]
    fn page_break_before_on_tiled_band() {
        let mut totals = Band::detail("totals", "more", 20.0);
        totals.page_break_before = true;
        let data = json!({"rows": [{"n": 0}, {"n": 1}], "more": [{"n": 2}]});
        let pages = layout(
            &page(300.0, 20.0),
            &two_columns(vec![Band::detail("row", "rows", 20.0), totals]),
            &data,
        );
        assert_eq!(pages.len(), 2);
        assert_eq!(ids(&pages[0]), vec!["row", "row"]);
        let moved = &pages[1].bands[0];
        assert_eq!(moved.band.id, "totals");
        assert_eq!(moved.offset_y, 0.0);
        assert_eq!(moved.column.unwrap().column_index, 0);
    }

    #[test]
    fn single_column_bands_have_no_column_fields() {
        let pages = layout(
            &page(792.0, 40.0),
            &section(vec![
                Band::new("ch", BandKind::ColumnHeader, 10.0),
                Band::new("b", BandKind::Body, 10.0),
            ]),
            &json!({}),
        );
        assert!(pages[0].bands.iter().all(|b| b.column.is_none()));
    }

    struct Tall;

    impl ElementMeasurer for Tall {
        fn measure(&self, props: &Value, _ctx: &MeasureContext<'_>) -> Result<Size, ValidationError> {
            let height = props["h"]
                .as_f64()
                .ok_or_else(|| ValidationError::new("h must be a number"))?;
            Ok(Size { width: 10.0, height })
        }
    }

    #[test]
    fn auto_height_band_grows_to_tallest_element() {
        let mut registry = MeasurerRegistry::new();
        registry.register("box", Tall);
        let mut band = Band::new("b", BandKind::Body, 20.0);
        band.auto_height = true;
        band.elements = vec![
            crate::model::Element::new("a", "box", 0.0, 5.0, 50.0, 10.0, json!({"h": 30})),
            crate::model::Element::new("b", "box", 0.0, 0.0, 50.0, 10.0, json!({"h": "{{ h }}"})),
            crate::model::Element::new("c", "unknown", 0.0, 40.0, 50.0, 15.0, json!({})),
        ];
        let err = layout_with(&registry, &page(792.0, 40.0), &section(vec![band.clone()]), &json!({}))
            .unwrap_err();
        assert!(matches!(err, ReportError::Validation { ref element_id, .. } if element_id == "b"));

        band.elements[1].props = json!({"h": 12});
        let pages =
            layout_with(&registry, &page(792.0, 40.0), &section(vec![band]), &json!({})).unwrap();
        let placed = &pages[0].bands[0];
        assert_eq!(placed.measured_height, 55.0);
        assert_eq!(placed.element_heights["a"], 30.0);
        assert_eq!(placed.element_heights["c"], 15.0);
    }

    #[test]
    fn number_pages_stamps_scopes() {
        let mut pages = layout(
            &page(140.0, 20.0),
            &section(vec![
                Band::new("head", BandKind::PageHeader, 10.0),
                Band::detail("row", "rows", 40.0),
            ]),
            &rows(4),
        );
        number_pages(&mut pages, 3);
        assert_eq!(pages[0].page_index, 3);
        assert_eq!(pages[1].page_index, 4);
        assert_eq!(pages[1].bands[0].scope.page_number(), 5);
    }
}
