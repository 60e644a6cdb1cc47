//! Built-in measurer for `text` elements.
//!
//! Props (each may also come from the element's named style):
//!
//! | key             | meaning                                        |
//! |-----------------|------------------------------------------------|
//! | `content`       | the text; ignored when `runs` is present        |
//! | `runs`          | `[{ text, fontSize?, letterSpacing? }]`         |
//! | `fontSize`      | points, default 12                             |
//! | `lineHeight`    | multiple of the font size, default 1.2         |
//! | `letterSpacing` | points added per character boundary            |
//! | `orphans`       | minimum lines kept before a split, default 2   |
//! | `widows`        | minimum lines pushed after a split, default 2  |

use std::sync::Arc;

use serde_json::Value;

use super::{ElementMeasurer, MeasureContext, Size, SplitProps};
use crate::error::ValidationError;
use crate::text::{flow_runs, AverageWidthMetrics, FontMetrics, TextFlow, TextRun};

const DEFAULT_FONT_SIZE: f64 = 12.0;
const DEFAULT_LINE_HEIGHT: f64 = 1.2;
const DEFAULT_ORPHANS: usize = 2;
const DEFAULT_WIDOWS: usize = 2;

/// Font metrics handed to [`TextMeasurer`] through
/// [`Resources`](super::Resources). Without one, approximate metrics are
/// used.
#[derive(Clone)]
pub struct Fonts(pub Arc<dyn FontMetrics>);

/// Measures and splits text with the greedy text flow.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextMeasurer;

struct TextProps {
    runs: Vec<TextRun>,
    line_height: f64,
    orphans: usize,
    widows: usize,
    /// Runs came from `runs`; a split rewrites `runs` instead of `content`.
    styled: bool,
}

impl TextMeasurer {
    fn read_props(props: &Value, ctx: &MeasureContext<'_>) -> Result<TextProps, ValidationError> {
        let font_size = number(ctx.prop(props, "fontSize"), "fontSize")?.unwrap_or(DEFAULT_FONT_SIZE);
        if font_size <= 0.0 {
            return Err(ValidationError::new("fontSize must be positive"));
        }
        let line_height =
            number(ctx.prop(props, "lineHeight"), "lineHeight")?.unwrap_or(DEFAULT_LINE_HEIGHT);
        if line_height < 0.0 {
            return Err(ValidationError::new("lineHeight must not be negative"));
        }
        let letter_spacing = number(ctx.prop(props, "letterSpacing"), "letterSpacing")?.unwrap_or(0.0);
        let orphans = number(ctx.prop(props, "orphans"), "orphans")?
            .map_or(DEFAULT_ORPHANS, |n| n.max(0.0) as usize);
        let widows = number(ctx.prop(props, "widows"), "widows")?
            .map_or(DEFAULT_WIDOWS, |n| n.max(0.0) as usize);

        let (runs, styled) = match props.get("runs") {
            Some(Value::Array(items)) => {
                let mut runs = Vec::with_capacity(items.len());
                for item in items {
                    let text = match item.get("text") {
                        Some(Value::String(s)) => s.clone(),
                        Some(Value::Null) | None => String::new(),
                        Some(_) => return Err(ValidationError::new("runs[].text must be a string")),
                    };
                    runs.push(TextRun {
                        text,
                        font_size: number(item.get("fontSize"), "runs[].fontSize")?.unwrap_or(font_size),
                        letter_spacing: number(item.get("letterSpacing"), "runs[].letterSpacing")?
                            .unwrap_or(letter_spacing),
                    });
                }
                (runs, true)
            }
            Some(Value::Null) | None => {
                let text = match props.get("content") {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    Some(Value::Null) | None => String::new(),
                    Some(_) => return Err(ValidationError::new("content must be a string")),
                };
                let run = TextRun {
                    text,
                    font_size,
                    letter_spacing,
                };
                (vec![run], false)
            }
            Some(_) => return Err(ValidationError::new("runs must be an array")),
        };

        // The line box follows the largest run.
        let largest = runs.iter().map(|r| r.font_size).fold(font_size, f64::max);

        Ok(TextProps {
            runs,
            line_height: largest * line_height,
            orphans,
            widows,
            styled,
        })
    }

    fn flow(props: &TextProps, ctx: &MeasureContext<'_>) -> TextFlow {
        let fallback = AverageWidthMetrics;
        let metrics: &dyn FontMetrics = match ctx.resources.get::<Fonts>() {
            Some(Fonts(metrics)) => metrics.as_ref(),
            None => &fallback,
        };
        flow_runs(metrics, &props.runs, ctx.available_width, props.line_height)
    }
}

impl ElementMeasurer for TextMeasurer {
    fn measure(&self, props: &Value, ctx: &MeasureContext<'_>) -> Result<Size, ValidationError> {
        let text = Self::read_props(props, ctx)?;
        let flow = Self::flow(&text, ctx);
        let width = flow.lines.iter().map(|l| l.width).fold(0.0, f64::max);
        Ok(Size {
            width,
            height: flow.total_height(),
        })
    }

    fn split(
        &self,
        props: &Value,
        ctx: &MeasureContext<'_>,
        available_height: f64,
    ) -> Result<Option<SplitProps>, ValidationError> {
        let text = Self::read_props(props, ctx)?;
        let flow = Self::flow(&text, ctx);
        let Some((fit, overflow)) = flow.split(available_height, text.orphans, text.widows) else {
            return Ok(None);
        };

        if !text.styled {
            return Ok(Some(SplitProps {
                fit: with_key(props, "content", Value::String(fit.to_text())),
                overflow: with_key(props, "content", Value::String(overflow.to_text())),
            }));
        }

        // Each span keeps its source run's props with the text narrowed.
        let source = props.get("runs").and_then(Value::as_array);
        let runs_of = |part: &TextFlow| -> Value {
            let runs = part
                .to_spans()
                .into_iter()
                .map(|span| {
                    let item = source
                        .and_then(|items| items.get(span.run))
                        .cloned()
                        .unwrap_or_else(|| Value::Object(Default::default()));
                    with_key(&item, "text", Value::String(span.text))
                })
                .collect();
            Value::Array(runs)
        };
        Ok(Some(SplitProps {
            fit: with_key(props, "runs", runs_of(&fit)),
            overflow: with_key(props, "runs", runs_of(&overflow)),
        }))
    }
}

/// A copy of an object with `key` replaced.
fn with_key(object: &Value, key: &str, value: Value) -> Value {
    let mut out = object.clone();
    if let Value::Object(map) = &mut out {
        map.insert(key.to_string(), value);
    }
    out
}

fn number(value: Option<&Value>, key: &str) -> Result<Option<f64>, ValidationError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(_) => Err(ValidationError::new(format!("{key} must be a number"))),
    }
}
