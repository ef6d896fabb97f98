use std::fmt;

/// A scalar reading of a metric.
///
/// Gauges can produce either integers or floating-point numbers; everything else reads as an
/// integer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    /// A signed integer.
    Integer(i64),
    /// A floating-point number.
    Float(f64),
}

impl Value {
    /// Gets this value as a floating-point number.
    pub fn as_f64(&self) -> f64 {
        match self {
            Value::Integer(v) => *v as f64,
            Value::Float(v) => *v,
        }
    }

    /// Gets this value as an integer, if it is one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Float(_) => None,
        }
    }

    /// Whether this value is a floating-point NaN.
    pub fn is_nan(&self) -> bool {
        matches!(self, Value::Float(v) if v.is_nan())
    }

    pub(crate) fn from_count(count: u64) -> Self {
        Value::Integer(i64::try_from(count).unwrap_or(i64::MAX))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
        }
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Integer(i64::from(v))
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}
