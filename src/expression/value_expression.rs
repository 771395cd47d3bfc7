use crate::model::FieldPath;
use crate::value::{MapValue, Value};

/// A value position in the query that may not be known until execution time.
#[derive(Clone, Debug, PartialEq)]
pub enum ValueExpression {
    /// Already a literal.
    Constant(Value),
    /// Named placeholder bound through the query context at execution time.
    Parameter(String),
    /// Member access over a captured constant object.
    Member { target: MapValue, path: FieldPath },
    /// Marker for prefix matching: resolves to the inner string followed by
    /// U+FFFF, the exclusive upper bound of all strings with that prefix.
    PrefixUpperBound(Box<ValueExpression>),
}

impl ValueExpression {
    pub fn constant(value: impl Into<Value>) -> Self {
        ValueExpression::Constant(value.into())
    }

    pub fn parameter(name: impl Into<String>) -> Self {
        ValueExpression::Parameter(name.into())
    }

    pub fn member(target: MapValue, path: FieldPath) -> Self {
        ValueExpression::Member { target, path }
    }

    pub fn prefix_upper_bound(inner: ValueExpression) -> Self {
        ValueExpression::PrefixUpperBound(Box::new(inner))
    }

    /// Whether this expression depends on execution-time input.
    pub fn is_deferred(&self) -> bool {
        match self {
            ValueExpression::Constant(_) => false,
            ValueExpression::Parameter(_) | ValueExpression::Member { .. } => true,
            ValueExpression::PrefixUpperBound(inner) => inner.is_deferred(),
        }
    }
}

impl From<Value> for ValueExpression {
    fn from(value: Value) -> Self {
        ValueExpression::Constant(value)
    }
}

macro_rules! constant_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ValueExpression {
                fn from(value: $ty) -> Self {
                    ValueExpression::Constant(Value::from(value))
                }
            }
        )*
    };
}

constant_from!(bool, i32, i64, f64, &str, String, chrono::DateTime<chrono::Utc>);
