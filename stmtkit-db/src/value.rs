//! Parameter and column value types for the safe `SQLite` wrapper.

use super::statement::Datatype;

/// An owned value that can be bound to a prepared statement parameter or
/// read from a result column.
///
/// The borrowed `view_*` accessors on [`Statement`](crate::Statement) avoid
/// copies; `Value` is for bulk binding and for keeping a row around after the
/// statement has moved on.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit IEEE float.
    Real(f64),
    /// UTF-8 text.
    Text(String),
    /// Binary blob.
    Blob(Vec<u8>),
    /// SQL NULL.
    Null,
}

impl Value {
    /// The storage class this value is bound with.
    #[must_use]
    pub const fn datatype(&self) -> Datatype {
        match self {
            Self::Integer(_) => Datatype::Integer,
            Self::Real(_) => Datatype::Float,
            Self::Text(_) => Datatype::Text,
            Self::Blob(_) => Datatype::Blob,
            Self::Null => Datatype::Null,
        }
    }

    /// Returns `true` for SQL NULL.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Self::Blob(v.to_vec())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Convenience macro for building parameter lists.
///
/// Usage: `params![1_i64, blob.as_slice(), "text", None::<i64>]`
#[macro_export]
macro_rules! params {
    ($($val:expr),* $(,)?) => {
        &[$($crate::Value::from($val)),*][..]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_maps_none_to_null() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".to_string()));
    }

    #[test]
    fn test_datatype_per_variant() {
        assert_eq!(Value::from(1_i32).datatype(), Datatype::Integer);
        assert_eq!(Value::from(0.5).datatype(), Datatype::Float);
        assert_eq!(Value::from(vec![1_u8]).datatype(), Datatype::Blob);
        assert!(Value::Null.is_null());
    }
}
