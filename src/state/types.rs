//! Widget state type definitions
//!
//! Defines the value model tracked per widget and the aggregate payload shapes
//! handed to the transport.

use serde::{Deserialize, Serialize};

/// Kind of value a widget currently carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    /// One-shot boolean (button press)
    Trigger,
    /// Boolean (checkbox)
    Bool,
    /// Signed integer (number input, integer slider)
    Int,
    /// Floating-point (slider, number input)
    Float,
    /// Text (text input, selectbox label)
    String,
    /// Sequence of floats (range slider)
    FloatArray,
}

impl std::fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WidgetKind::Trigger => write!(f, "trigger"),
            WidgetKind::Bool => write!(f, "bool"),
            WidgetKind::Int => write!(f, "int"),
            WidgetKind::Float => write!(f, "float"),
            WidgetKind::String => write!(f, "string"),
            WidgetKind::FloatArray => write!(f, "float_array"),
        }
    }
}

/// Nested float sequence, kept as its own message like the peer expects
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FloatArray {
    pub value: Vec<f64>,
}

impl From<Vec<f64>> for FloatArray {
    fn from(value: Vec<f64>) -> Self {
        Self { value }
    }
}

/// The single active value of a widget
///
/// Serialized with the peer's field names, e.g. `{"floatValue": 0.5}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WidgetValue {
    #[serde(rename = "triggerValue")]
    Trigger(bool),
    #[serde(rename = "boolValue")]
    Bool(bool),
    #[serde(rename = "intValue")]
    Int(i64),
    #[serde(rename = "floatValue")]
    Float(f64),
    #[serde(rename = "stringValue")]
    String(String),
    #[serde(rename = "floatArrayValue")]
    FloatArray(FloatArray),
}

impl WidgetValue {
    /// Tag of the active variant
    pub fn kind(&self) -> WidgetKind {
        match self {
            WidgetValue::Trigger(_) => WidgetKind::Trigger,
            WidgetValue::Bool(_) => WidgetKind::Bool,
            WidgetValue::Int(_) => WidgetKind::Int,
            WidgetValue::Float(_) => WidgetKind::Float,
            WidgetValue::String(_) => WidgetKind::String,
            WidgetValue::FloatArray(_) => WidgetKind::FloatArray,
        }
    }

    /// Extract the float sequence if this is a `FloatArray`
    pub fn as_float_array(&self) -> Option<&[f64]> {
        match self {
            WidgetValue::FloatArray(arr) => Some(&arr.value),
            _ => None,
        }
    }
}

/// Protocol zero value: an unset trigger
impl Default for WidgetValue {
    fn default() -> Self {
        WidgetValue::Trigger(false)
    }
}

/// One registry entry: a widget id and its current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WidgetState {
    pub id: String,
    #[serde(flatten)]
    pub value: WidgetValue,
}

impl WidgetState {
    /// Zero-value entry for `id`
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: WidgetValue::default(),
        }
    }
}

/// Aggregate of every widget's current value at snapshot time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WidgetStates {
    pub widgets: Vec<WidgetState>,
}

impl WidgetStates {
    /// Find the entry for `id`
    pub fn get(&self, id: &str) -> Option<&WidgetState> {
        self.widgets.iter().find(|w| w.id == id)
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }
}

/// Message sent back to the peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BackMsg {
    /// Full set of current widget values
    UpdateWidgets(WidgetStates),
}
