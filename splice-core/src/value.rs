//! Parameter Values
//!
//! Every parameter declares a [`DataType`]. Behavior that varies by type
//! (default value, how many keyframe tracks it has, whether it can be saved,
//! its text encoding) lives on the type itself instead of being switched
//! over at each call site.

use serde::{Deserialize, Serialize};

use crate::error::ValueParseError;
use crate::time::Rational;

/// The kind of data a parameter carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// No data.
    None,
    /// Signed integer.
    Int,
    /// Floating point scalar.
    Float,
    /// Exact time value.
    Rational,
    /// 2D vector.
    Vec2,
    /// 3D vector.
    Vec3,
    /// 4D vector.
    Vec4,
    /// RGBA color.
    Color,
    /// Free text.
    Text,
    /// Checkbox.
    Boolean,
    /// Index into a fixed list of choices.
    Combo,
    /// Font family name.
    Font,
    /// File path.
    File,
    /// Rendered image. Produced at evaluation time, never stored.
    Texture,
    /// Audio samples. Produced at evaluation time, never stored.
    Samples,
    /// Transformation matrix. Produced at evaluation time, never stored.
    Matrix,
}

impl DataType {
    /// Every type, in declaration order.
    pub const ALL: [DataType; 16] = [
        DataType::None,
        DataType::Int,
        DataType::Float,
        DataType::Rational,
        DataType::Vec2,
        DataType::Vec3,
        DataType::Vec4,
        DataType::Color,
        DataType::Text,
        DataType::Boolean,
        DataType::Combo,
        DataType::Font,
        DataType::File,
        DataType::Texture,
        DataType::Samples,
        DataType::Matrix,
    ];

    /// Name used in saved projects.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::None => "none",
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Rational => "rational",
            DataType::Vec2 => "vec2",
            DataType::Vec3 => "vec3",
            DataType::Vec4 => "vec4",
            DataType::Color => "color",
            DataType::Text => "text",
            DataType::Boolean => "boolean",
            DataType::Combo => "combo",
            DataType::Font => "font",
            DataType::File => "file",
            DataType::Texture => "texture",
            DataType::Samples => "samples",
            DataType::Matrix => "matrix",
        }
    }

    /// Look a type up by its saved name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// Number of independently keyframable components.
    ///
    /// Runtime-only types have no tracks.
    pub fn track_count(&self) -> usize {
        match self {
            DataType::Vec2 => 2,
            DataType::Vec3 => 3,
            DataType::Vec4 | DataType::Color => 4,
            DataType::None | DataType::Texture | DataType::Samples | DataType::Matrix => 0,
            _ => 1,
        }
    }

    /// True if values of this type are written to project files.
    pub fn is_storable(&self) -> bool {
        self.track_count() > 0
    }

    /// Initial value of a freshly declared input.
    pub fn default_value(&self) -> Value {
        match self {
            DataType::Int => Value::Int(0),
            DataType::Float => Value::Float(0.0),
            DataType::Rational => Value::Rational(Rational::ZERO),
            DataType::Vec2 => Value::Vec2([0.0; 2]),
            DataType::Vec3 => Value::Vec3([0.0; 3]),
            DataType::Vec4 => Value::Vec4([0.0; 4]),
            DataType::Color => Value::Color([0.0, 0.0, 0.0, 1.0]),
            DataType::Text => Value::Text(String::new()),
            DataType::Boolean => Value::Boolean(false),
            DataType::Combo => Value::Combo(0),
            DataType::Font => Value::Font(String::new()),
            DataType::File => Value::File(String::new()),
            DataType::None | DataType::Texture | DataType::Samples | DataType::Matrix => {
                Value::None
            }
        }
    }
}

/// A parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    /// Absent or runtime-only.
    None,
    /// Signed integer.
    Int(i64),
    /// Floating point scalar.
    Float(f64),
    /// Exact time.
    Rational(Rational),
    /// 2D vector.
    Vec2([f64; 2]),
    /// 3D vector.
    Vec3([f64; 3]),
    /// 4D vector.
    Vec4([f64; 4]),
    /// RGBA color, linear.
    Color([f64; 4]),
    /// Free text.
    Text(String),
    /// Checkbox state.
    Boolean(bool),
    /// Selected choice index.
    Combo(i64),
    /// Font family name.
    Font(String),
    /// File path.
    File(String),
}

impl Value {
    /// The type this value belongs to.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::None => DataType::None,
            Value::Int(_) => DataType::Int,
            Value::Float(_) => DataType::Float,
            Value::Rational(_) => DataType::Rational,
            Value::Vec2(_) => DataType::Vec2,
            Value::Vec3(_) => DataType::Vec3,
            Value::Vec4(_) => DataType::Vec4,
            Value::Color(_) => DataType::Color,
            Value::Text(_) => DataType::Text,
            Value::Boolean(_) => DataType::Boolean,
            Value::Combo(_) => DataType::Combo,
            Value::Font(_) => DataType::Font,
            Value::File(_) => DataType::File,
        }
    }

    /// Encode as text for a project file.
    ///
    /// Vector components are separated by `:`.
    pub fn to_text(&self) -> String {
        match self {
            Value::None => String::new(),
            Value::Int(v) | Value::Combo(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Rational(v) => v.to_string(),
            Value::Vec2(v) => join_components(v),
            Value::Vec3(v) => join_components(v),
            Value::Vec4(v) | Value::Color(v) => join_components(v),
            Value::Text(v) | Value::Font(v) | Value::File(v) => v.clone(),
            Value::Boolean(v) => (if *v { "1" } else { "0" }).to_string(),
        }
    }

    /// Decode the text form produced by [`Value::to_text`].
    pub fn parse(data_type: DataType, text: &str) -> Result<Value, ValueParseError> {
        let err = || ValueParseError {
            data_type,
            text: text.to_string(),
        };

        let value = match data_type {
            DataType::Int => Value::Int(text.trim().parse().map_err(|_| err())?),
            DataType::Combo => Value::Combo(text.trim().parse().map_err(|_| err())?),
            DataType::Float => Value::Float(text.trim().parse().map_err(|_| err())?),
            DataType::Rational => Value::Rational(text.parse().map_err(|_| err())?),
            DataType::Vec2 => Value::Vec2(split_components(text).ok_or_else(err)?),
            DataType::Vec3 => Value::Vec3(split_components(text).ok_or_else(err)?),
            DataType::Vec4 => Value::Vec4(split_components(text).ok_or_else(err)?),
            DataType::Color => Value::Color(split_components(text).ok_or_else(err)?),
            DataType::Text => Value::Text(text.to_string()),
            DataType::Font => Value::Font(text.to_string()),
            DataType::File => Value::File(text.to_string()),
            DataType::Boolean => match text.trim() {
                "1" | "true" => Value::Boolean(true),
                "0" | "false" => Value::Boolean(false),
                _ => return Err(err()),
            },
            DataType::None | DataType::Texture | DataType::Samples | DataType::Matrix => {
                Value::None
            }
        };

        Ok(value)
    }
}

fn join_components(components: &[f64]) -> String {
    components
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(":")
}

fn split_components<const N: usize>(text: &str) -> Option<[f64; N]> {
    let mut out = [0.0; N];
    let mut parts = text.split(':');

    for slot in out.iter_mut() {
        *slot = parts.next()?.trim().parse().ok()?;
    }

    if parts.next().is_some() {
        return None;
    }

    Some(out)
}
