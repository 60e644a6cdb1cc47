//! # Band Expansion
//!
//! Turns one section's declared bands plus the data object into concrete,
//! scope-bound band instances ready for pagination.
//!
//! Structural bands (page/column headers and footers, backgrounds) are
//! bucketed by kind and instantiated once. Content bands are reordered into
//! four regions (title, detail, body, summary) and expanded in place:
//!
//! - a `detail` band becomes one instance per item of its `dataSource` array;
//! - with `groupBy`, items are partitioned by key (first-seen order) and each
//!   group is emitted as `groupHeader → items → groupFooter`, using the group
//!   bands declared directly before and after the detail band;
//! - `noData` survives only when no detail band produced any item.
//!
//! Conditions are evaluated last. A false condition on a group header drops
//! the whole group. During expansion `_pageNumber` is always 0.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::Value;

use crate::error::ReportError;
use crate::expr::Expressions;
use crate::model::{Band, BandKind, ContentRegion, Section, StructuralSlot};
use crate::scope::{resolve_path, value_to_string, Scope, GROUP_COUNT, GROUP_KEY, INDEX};

/// A concrete occurrence of a band with its own scope.
#[derive(Debug, Clone)]
pub struct BandInstance {
    pub band: Arc<Band>,
    pub scope: Scope,
}

/// A section's bands after expansion.
#[derive(Debug, Clone, Default)]
pub struct ExpandedSection {
    pub page_header: Vec<BandInstance>,
    pub page_footer: Vec<BandInstance>,
    pub last_page_footer: Vec<BandInstance>,
    pub column_header: Vec<BandInstance>,
    pub column_footer: Vec<BandInstance>,
    pub background: Vec<BandInstance>,
    /// Title, detail, body and summary regions in that order.
    pub content_bands: Vec<BandInstance>,
}

impl ExpandedSection {
    fn slot_mut(&mut self, slot: StructuralSlot) -> &mut Vec<BandInstance> {
        match slot {
            StructuralSlot::PageHeader => &mut self.page_header,
            StructuralSlot::PageFooter => &mut self.page_footer,
            StructuralSlot::LastPageFooter => &mut self.last_page_footer,
            StructuralSlot::ColumnHeader => &mut self.column_header,
            StructuralSlot::ColumnFooter => &mut self.column_footer,
            StructuralSlot::Background => &mut self.background,
        }
    }
}

/// Values from outside the section that every scope sees.
#[derive(Debug, Clone, Copy)]
pub struct ExpandContext<'a> {
    /// Page count from a previous pass; 0 on the first pass.
    pub total_pages_hint: usize,
    /// Anchor name → page number from a previous pass.
    pub anchors: &'a BTreeMap<String, usize>,
}

/// Expand `section` against `data`.
pub fn expand_section(
    section: &Section,
    data: &Value,
    exprs: &dyn Expressions,
    ctx: &ExpandContext<'_>,
) -> Result<ExpandedSection, ReportError> {
    for band in &section.bands {
        if !band.height.is_finite() || band.height < 0.0 {
            return Err(ReportError::config(format!(
                "band '{}' has invalid height {}",
                band.id, band.height
            )));
        }
    }

    let base = Scope::base(data, ctx.total_pages_hint, ctx.anchors);
    let mut expanded = ExpandedSection::default();

    let mut regions: BTreeMap<ContentRegion, Vec<Arc<Band>>> = BTreeMap::new();
    for band in &section.bands {
        let band = Arc::new(band.clone());
        if let Some(slot) = band.kind.structural_slot() {
            let instance = BandInstance {
                band,
                scope: base.clone(),
            };
            if passes(&instance, exprs) {
                expanded.slot_mut(slot).push(instance);
            }
        } else if let Some(region) = band.kind.content_region() {
            regions.entry(region).or_default().push(band);
        }
    }

    for (region, bands) in &regions {
        let instances = match region {
            ContentRegion::Detail => expand_detail_region(bands, data, &base, exprs)?,
            ContentRegion::Title | ContentRegion::Body | ContentRegion::Summary => bands
                .iter()
                .map(|band| BandInstance {
                    band: Arc::clone(band),
                    scope: base.clone(),
                })
                .filter(|instance| passes(instance, exprs))
                .collect(),
        };
        expanded.content_bands.extend(instances);
    }

    tracing::debug!(
        section = section.id.as_deref().unwrap_or(""),
        content = expanded.content_bands.len(),
        "expanded section"
    );

    Ok(expanded)
}

/// A detail band's resolved items and the group bands it claimed.
struct DetailPlan<'d> {
    items: &'d [Value],
    header: Option<Arc<Band>>,
    footer: Option<Arc<Band>>,
}

fn expand_detail_region(
    bands: &[Arc<Band>],
    data: &Value,
    base: &Scope,
    exprs: &dyn Expressions,
) -> Result<Vec<BandInstance>, ReportError> {
    // Resolve every data source up front so a bad one fails before anything
    // is emitted, and claim group bands adjacent to grouped details.
    let mut plans: HashMap<usize, DetailPlan<'_>> = HashMap::new();
    let mut claimed = vec![false; bands.len()];
    for (i, band) in bands.iter().enumerate() {
        if band.kind != BandKind::Detail {
            continue;
        }
        let items = resolve_items(band, data)?;
        let mut plan = DetailPlan {
            items,
            header: None,
            footer: None,
        };
        if band.group_by.is_some() {
            if i > 0 && bands[i - 1].kind == BandKind::GroupHeader && !claimed[i - 1] {
                claimed[i - 1] = true;
                plan.header = Some(Arc::clone(&bands[i - 1]));
            }
            if i + 1 < bands.len() && bands[i + 1].kind == BandKind::GroupFooter {
                claimed[i + 1] = true;
                plan.footer = Some(Arc::clone(&bands[i + 1]));
            }
        }
        plans.insert(i, plan);
    }

    let has_items = plans.values().any(|plan| !plan.items.is_empty());

    let mut out = Vec::new();
    for (i, band) in bands.iter().enumerate() {
        if claimed[i] {
            continue;
        }
        match band.kind {
            BandKind::Detail => {
                let Some(plan) = plans.get(&i) else {
                    continue;
                };
                match band.group_by.as_deref() {
                    Some(field) => emit_groups(band, field, plan, base, exprs, &mut out),
                    None => {
                        for (index, item) in plan.items.iter().enumerate() {
                            push_if(&mut out, item_instance(band, item, index, base), exprs);
                        }
                    }
                }
            }
            BandKind::NoData => {
                if !has_items {
                    push_if(
                        &mut out,
                        BandInstance {
                            band: Arc::clone(band),
                            scope: base.clone(),
                        },
                        exprs,
                    );
                }
            }
            BandKind::GroupHeader | BandKind::GroupFooter => {
                push_if(
                    &mut out,
                    BandInstance {
                        band: Arc::clone(band),
                        scope: base.clone(),
                    },
                    exprs,
                );
            }
            BandKind::PageHeader
            | BandKind::PageFooter
            | BandKind::LastPageFooter
            | BandKind::ColumnHeader
            | BandKind::ColumnFooter
            | BandKind::Background
            | BandKind::Title
            | BandKind::Body
            | BandKind::Summary => {}
        }
    }
    Ok(out)
}

fn resolve_items<'d>(band: &Band, data: &'d Value) -> Result<&'d [Value], ReportError> {
    let Some(path) = band.data_source.as_deref() else {
        return Err(ReportError::config(format!(
            "detail band '{}' has no dataSource",
            band.id
        )));
    };
    match resolve_path(data, path) {
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(ReportError::config(format!(
            "dataSource '{}' of detail band '{}' is not an array (found {})",
            path,
            band.id,
            json_type_name(other)
        ))),
        None => Err(ReportError::config(format!(
            "dataSource '{}' of detail band '{}' did not resolve",
            path, band.id
        ))),
    }
}

fn emit_groups(
    band: &Arc<Band>,
    field: &str,
    plan: &DetailPlan<'_>,
    base: &Scope,
    exprs: &dyn Expressions,
    out: &mut Vec<BandInstance>,
) {
    // Partition by key, keeping first-seen group order.
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<(usize, &Value)>> = HashMap::new();
    for (index, item) in plan.items.iter().enumerate() {
        let key = resolve_path(item, field)
            .map(value_to_string)
            .unwrap_or_default();
        let members = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Vec::new()
        });
        members.push((index, item));
    }

    for key in order {
        let members = &groups[&key];
        let group_scope = base.with_all([
            (GROUP_KEY, Value::String(key.clone())),
            (GROUP_COUNT, Value::from(members.len())),
        ]);

        if let Some(header) = &plan.header {
            let instance = BandInstance {
                band: Arc::clone(header),
                scope: group_scope.clone(),
            };
            if !passes(&instance, exprs) {
                continue;
            }
            out.push(instance);
        }

        for &(index, item) in members {
            let instance = item_instance(band, item, index, &group_scope);
            push_if(out, instance, exprs);
        }

        if let Some(footer) = &plan.footer {
            push_if(
                out,
                BandInstance {
                    band: Arc::clone(footer),
                    scope: group_scope.clone(),
                },
                exprs,
            );
        }
    }
}

fn item_instance(
    band: &Arc<Band>,
    item: &Value,
    index: usize,
    scope: &Scope,
) -> BandInstance {
    BandInstance {
        band: Arc::clone(band),
        scope: scope.with_all([(band.item_name(), item.clone()), (INDEX, Value::from(index))]),
    }
}

fn passes(instance: &BandInstance, exprs: &dyn Expressions) -> bool {
    match instance.band.condition.as_deref() {
        Some(condition) => exprs.evaluate(condition, &instance.scope),
        None => true,
    }
}

fn push_if(out: &mut Vec<BandInstance>, instance: BandInstance, exprs: &dyn Expressions) {
    if passes(&instance, exprs) {
        out.push(instance);
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
