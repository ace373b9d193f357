//! Peak annotations attached to a data object.
//!
//! Annotations live under the `annotations` metadata key as a JSON object keyed by
//! annotation name, so they round-trip through the document like any other attribute.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ObjectError;

/// Metadata key holding the serialized annotations
pub const ANNOTATIONS_KEY: &str = "annotations";

/// Where an annotation is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnnotationKind {
    /// Annotation on a 1D plot
    #[default]
    #[serde(rename = "1d")]
    OneDimensional,
    /// Annotation on a 2D plot
    #[serde(rename = "2d")]
    TwoDimensional,
}

/// RGB color with components in `[0, 1]`
pub type Color = [f64; 3];

/// A single labelled region on a plot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// 1D or 2D annotation
    #[serde(default)]
    pub kind: AnnotationKind,
    /// Unique name within the collection
    pub name: String,
    /// Text shown on the plot
    pub label: String,
    /// `(x, y)` of the label
    pub label_position: (f64, f64),
    /// Whether the label is shown
    #[serde(default = "default_true")]
    pub label_show: bool,
    /// Label color
    #[serde(default)]
    pub label_color: Color,
    /// `(x, y, width, height)` of the highlighted patch
    pub patch_position: (f64, f64, f64, f64),
    /// Patch color
    #[serde(default)]
    pub patch_color: Color,
    /// Patch transparency
    #[serde(default = "default_alpha")]
    pub patch_alpha: f64,
    /// Whether the patch is shown
    #[serde(default = "default_true")]
    pub patch_show: bool,
    /// Whether an arrow points from the label to the marker
    #[serde(default)]
    pub arrow_show: bool,
    /// Arrow style name
    #[serde(default = "default_arrow_style")]
    pub arrow_style: String,
    /// Whether the marker is shown
    #[serde(default)]
    pub marker_show: bool,
    /// `(x, y)` of the marker
    #[serde(default)]
    pub marker_position: Option<(f64, f64)>,
}

fn default_true() -> bool {
    true
}

fn default_alpha() -> f64 {
    1.0
}

fn default_arrow_style() -> String {
    "default".to_string()
}

impl Annotation {
    /// Annotation with default styling
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        label_position: (f64, f64),
        patch_position: (f64, f64, f64, f64),
    ) -> Self {
        Self {
            kind: AnnotationKind::default(),
            name: name.into(),
            label: label.into(),
            label_position,
            label_show: true,
            label_color: [0.0; 3],
            patch_position,
            patch_color: [0.0; 3],
            patch_alpha: 1.0,
            patch_show: true,
            arrow_show: false,
            arrow_style: default_arrow_style(),
            marker_show: false,
            marker_position: None,
        }
    }

    /// Patch width
    pub fn width(&self) -> f64 {
        self.patch_position.2
    }

    /// Patch height
    pub fn height(&self) -> f64 {
        self.patch_position.3
    }

    /// Left edge of the patch
    pub fn span_x_min(&self) -> f64 {
        self.patch_position.0
    }

    /// Right edge of the patch
    pub fn span_x_max(&self) -> f64 {
        self.patch_position.0 + self.patch_position.2
    }

    /// Bottom edge of the patch
    pub fn span_y_min(&self) -> f64 {
        self.patch_position.1
    }

    /// Top edge of the patch
    pub fn span_y_max(&self) -> f64 {
        self.patch_position.1 + self.patch_position.3
    }

    /// Arrow from the label to `target` (or the marker): `(x, y, dx, dy)`
    pub fn arrow(&self, target: Option<(f64, f64)>) -> Option<(f64, f64, f64, f64)> {
        let (tx, ty) = target.or(self.marker_position)?;
        let (lx, ly) = self.label_position;
        Some((lx, ly, tx - lx, ty - ly))
    }
}

/// Named collection of [`Annotation`]s
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Annotations {
    annotations: BTreeMap<String, Annotation>,
}

impl Annotations {
    /// Empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Read annotations from the `annotations` metadata value
    pub fn from_value(value: &Value) -> Result<Self, ObjectError> {
        let annotations: Self = serde_json::from_value(value.clone())?;
        if let Some((key, a)) = annotations.annotations.iter().find(|(k, a)| **k != a.name) {
            return Err(ObjectError::InvalidMetadata(format!(
                "annotation stored under `{key}` is named `{}`",
                a.name
            )));
        }
        Ok(annotations)
    }

    /// Serialize into a metadata value
    pub fn to_value(&self) -> Result<Value, ObjectError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Add or replace an annotation under its own name
    pub fn add(&mut self, annotation: Annotation) {
        self.annotations
            .insert(annotation.name.clone(), annotation);
    }

    /// Annotation named `name`
    pub fn get(&self, name: &str) -> Option<&Annotation> {
        self.annotations.get(name)
    }

    /// Mutable annotation named `name`
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Annotation> {
        self.annotations.get_mut(name)
    }

    /// Remove and return the annotation named `name`
    pub fn remove(&mut self, name: &str) -> Option<Annotation> {
        self.annotations.remove(name)
    }

    /// Whether an annotation named `name` exists
    pub fn contains(&self, name: &str) -> bool {
        self.annotations.contains_key(name)
    }

    /// Number of annotations
    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Annotation names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.annotations.keys().map(String::as_str)
    }

    /// Annotations in name order
    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.values()
    }

    /// Label x positions of every annotation
    pub fn label_position_x(&self) -> Vec<f64> {
        self.iter().map(|a| a.label_position.0).collect()
    }

    /// Label y positions of every annotation
    pub fn label_position_y(&self) -> Vec<f64> {
        self.iter().map(|a| a.label_position.1).collect()
    }
}
