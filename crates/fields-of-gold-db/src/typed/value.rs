//! The in-memory state of a structured column.

use super::schema::Schema;

/// What a structured column holds on a model instance.
///
/// A value read from storage is always `Absent` or `Typed`. `Raw` only
/// appears after application code stores a plain document that has not been
/// coerced yet.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TypedValue<T> {
    /// No value (SQL NULL).
    #[default]
    Absent,
    /// A plain document awaiting coercion.
    Raw(serde_json::Value),
    /// An instance of the bound schema.
    Typed(T),
}

impl<T: Schema> TypedValue<T> {
    /// Returns `true` for [`TypedValue::Absent`].
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Returns `true` for [`TypedValue::Raw`].
    pub const fn is_raw(&self) -> bool {
        matches!(self, Self::Raw(_))
    }

    /// Returns the structured value, if there is one.
    pub const fn as_typed(&self) -> Option<&T> {
        match self {
            Self::Typed(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the structured value for in-place mutation.
    pub fn as_typed_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Typed(value) => Some(value),
            _ => None,
        }
    }

    /// Consumes the value, returning the structured value if there is one.
    pub fn into_typed(self) -> Option<T> {
        match self {
            Self::Typed(value) => Some(value),
            _ => None,
        }
    }
}

impl<T: Schema> From<T> for TypedValue<T> {
    fn from(value: T) -> Self {
        Self::Typed(value)
    }
}

impl<T: Schema> From<Option<T>> for TypedValue<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Self::Typed)
    }
}

impl<T: Schema> From<serde_json::Value> for TypedValue<T> {
    /// JSON `null` becomes [`TypedValue::Absent`]; anything else is `Raw`.
    fn from(doc: serde_json::Value) -> Self {
        if doc.is_null() {
            Self::Absent
        } else {
            Self::Raw(doc)
        }
    }
}
