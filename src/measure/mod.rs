//! # Element Measurement
//!
//! The contract between the layout engine and per-element-type plugins. The
//! engine decides where bands go and how tall they are; measurers answer how
//! much room a single element needs once its props are resolved.
//!
//! A measurer sees only the resolved props and a [`MeasureContext`]. The
//! context carries the available box, the template's style sheet, and an
//! opaque [`Resources`] map for whatever handles the plugin needs (font
//! metrics, decoded image sizes). The engine never looks inside it.

mod text;

use std::any::{Any, TypeId};
use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ValidationError;

pub use text::{Fonts, TextMeasurer};

/// Measured size of an element in points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// The two halves of a split element's props.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitProps {
    pub fit: Value,
    pub overflow: Value,
}

/// Named styles from the template, looked up by element style names.
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    styles: Map<String, Value>,
}

impl StyleSheet {
    pub fn new(styles: Map<String, Value>) -> Self {
        Self { styles }
    }

    pub fn resolve(&self, name: &str) -> Option<&Value> {
        self.styles.get(name)
    }
}

/// Type-keyed bag of opaque handles for measurers.
#[derive(Default)]
pub struct Resources {
    entries: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) {
        self.entries.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<T>())
    }
}

impl std::fmt::Debug for Resources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resources")
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// What a measurer is told about the space it is being measured into.
#[derive(Debug, Clone, Copy)]
pub struct MeasureContext<'a> {
    pub available_width: f64,
    pub available_height: f64,
    /// The element's declared style name, if any.
    pub style_name: Option<&'a str>,
    pub styles: &'a StyleSheet,
    pub resources: &'a Resources,
}

impl<'a> MeasureContext<'a> {
    /// The element's named style, when it has one and the sheet defines it.
    pub fn style(&self) -> Option<&'a Value> {
        self.style_name.and_then(|name| self.styles.resolve(name))
    }

    /// Look up a property: element props first, then the named style.
    pub fn prop<'v>(&self, props: &'v Value, key: &str) -> Option<&'v Value>
    where
        'a: 'v,
    {
        props
            .get(key)
            .or_else(|| self.style().and_then(|style| style.get(key)))
    }
}

/// Per-element-type measurement plugin.
pub trait ElementMeasurer: Send + Sync {
    /// Size needed for `props` within the context's available box.
    fn measure(&self, props: &Value, ctx: &MeasureContext<'_>) -> Result<Size, ValidationError>;

    /// Split `props` so the first part fits in `available_height`.
    ///
    /// `Ok(None)` means the element cannot or should not split here; the
    /// caller moves it whole.
    fn split(
        &self,
        _props: &Value,
        _ctx: &MeasureContext<'_>,
        _available_height: f64,
    ) -> Result<Option<SplitProps>, ValidationError> {
        Ok(None)
    }
}

/// Measurers keyed by element type.
#[derive(Default)]
pub struct MeasurerRegistry {
    measurers: HashMap<String, Box<dyn ElementMeasurer>>,
}

impl MeasurerRegistry {
    /// An empty registry. Every element keeps its declared height.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in `text` measurer.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("text", TextMeasurer);
        registry
    }

    pub fn register(&mut self, kind: &str, measurer: impl ElementMeasurer + 'static) {
        self.measurers.insert(kind.to_string(), Box::new(measurer));
    }

    pub fn get(&self, kind: &str) -> Option<&dyn ElementMeasurer> {
        self.measurers.get(kind).map(|m| m.as_ref())
    }
}

impl std::fmt::Debug for MeasurerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&String> = self.measurers.keys().collect();
        kinds.sort();
        f.debug_struct("MeasurerRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}
