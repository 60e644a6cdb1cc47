//! # Reportflow
//!
//! A banded report layout engine.
//!
//! A template is a stack of horizontal *bands* (page headers, titles, detail
//! rows, group headers, summaries...). Reportflow expands those bands against
//! a data object and paginates the result: every band instance ends up on a
//! page, at an offset, with a measured height and the scope its expressions
//! were evaluated in. Drawing is left to the caller.
//!
//! Pages are never sliced out of an endless canvas. Each band is measured and
//! asked "does this fit?" before it is placed, so headers repeat, footers stay
//! put and groups flow across columns and pages.
//!
//! ## Architecture
//!
//! ```text
//! Template + data (JSON)
//!       ↓
//!   [model]     — Template, sections, bands, elements
//!       ↓
//!   [expand]    — Detail iteration, grouping, conditions → band instances
//!       ↓
//!   [layout]    — Measure, place, break pages, tile columns
//!       │            ↑
//!       │        [measure] / [text] — element measurers, text flow
//!       ↓
//!   LayoutResult (pages → positioned bands)
//! ```
//!
//! Page totals and cross-references are resolved by running the pipeline
//! twice: once to count pages and record anchors, once more with those
//! numbers in every scope.

pub mod error;
pub mod expand;
pub mod expr;
pub mod layout;
pub mod measure;
pub mod model;
pub mod scope;
pub mod text;

#[cfg(feature = "wasm")]
pub mod wasm;

use std::collections::BTreeMap;

use serde_json::Value;

use error::ReportError;
use expand::{expand_section, ExpandContext};
use expr::{Expressions, TemplateExpressions};
use layout::{number_pages, BookmarkEntry, ColumnConfig, LayoutEngine, LayoutPage, LayoutResult};
use measure::{MeasurerRegistry, Resources, StyleSheet};
use model::{Section, Template};

/// The pluggable parts of a layout run.
pub struct Collaborators {
    pub measurers: MeasurerRegistry,
    pub expressions: Box<dyn Expressions>,
    /// Handles measurers need (fonts, image sizes). Never inspected here.
    pub resources: Resources,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            measurers: MeasurerRegistry::with_defaults(),
            expressions: Box::new(TemplateExpressions),
            resources: Resources::new(),
        }
    }
}

/// One pass of one section: expand, then paginate.
///
/// Page indices start at `first_page_index` and every scope carries its
/// page's `_pageNumber`.
pub fn layout_section(
    template: &Template,
    section_index: usize,
    data: &Value,
    collab: &Collaborators,
    ctx: &ExpandContext<'_>,
    first_page_index: usize,
) -> Result<Vec<LayoutPage>, ReportError> {
    let section: &Section = template.sections.get(section_index).ok_or_else(|| {
        ReportError::config(format!("template has no section {section_index}"))
    })?;
    let page = template.page.merged(section.page.as_ref());
    let columns = ColumnConfig::from_section(section)?;
    let expanded = expand_section(section, data, collab.expressions.as_ref(), ctx)?;

    let styles = StyleSheet::new(template.styles.clone());
    let engine = LayoutEngine::new(
        &collab.measurers,
        collab.expressions.as_ref(),
        &styles,
        &collab.resources,
    );
    let mut pages = engine.layout_section(&page, &columns, &expanded, section_index)?;
    number_pages(&mut pages, first_page_index);
    Ok(pages)
}

/// Run every section once with the given totals.
fn layout_pass(
    template: &Template,
    data: &Value,
    collab: &Collaborators,
    total_pages_hint: usize,
    anchors: &BTreeMap<String, usize>,
) -> Result<LayoutResult, ReportError> {
    let ctx = ExpandContext {
        total_pages_hint,
        anchors,
    };

    let mut pages = Vec::new();
    for index in 0..template.sections.len() {
        let section_pages = layout_section(template, index, data, collab, &ctx, pages.len())?;
        pages.extend(section_pages);
    }

    let mut bookmarks = Vec::new();
    let mut found_anchors = BTreeMap::new();
    for page in &pages {
        for placed in &page.bands {
            if let Some(title) = &placed.band.bookmark {
                bookmarks.push(BookmarkEntry {
                    title: collab.expressions.resolve(title, &placed.scope),
                    page_index: page.page_index,
                    offset_y: placed.offset_y,
                });
            }
            if let Some(name) = &placed.band.anchor {
                let name = collab.expressions.resolve(name, &placed.scope);
                found_anchors.entry(name).or_insert(page.page_index + 1);
            }
        }
    }

    Ok(LayoutResult {
        total_pages: pages.len(),
        pages,
        bookmarks,
        anchors: found_anchors,
    })
}

/// Lay out a whole template.
///
/// Runs exactly two passes: the first with `_totalPages = 0` and no anchors
/// to learn the page count and anchor pages, the second with those values so
/// that expressions referring to them resolve.
pub fn layout_template(
    template: &Template,
    data: &Value,
    collab: &Collaborators,
) -> Result<LayoutResult, ReportError> {
    let first = layout_pass(template, data, collab, 0, &BTreeMap::new())?;
    tracing::debug!(
        total_pages = first.total_pages,
        anchors = first.anchors.len(),
        "first pass complete"
    );

    let second = layout_pass(template, data, collab, first.total_pages, &first.anchors)?;
    tracing::debug!(total_pages = second.total_pages, "second pass complete");
    Ok(second)
}

/// Lay out a template and data given as JSON, with the default
/// collaborators.
pub fn layout_json(template_json: &str, data_json: &str) -> Result<LayoutResult, ReportError> {
    let template = Template::from_json(template_json)?;
    let data: Value = if data_json.trim().is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_str(data_json).map_err(|e| ReportError::parse("data", e))?
    };
    layout_template(&template, &data, &Collaborators::default())
}
