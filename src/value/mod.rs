mod array_value;
mod bytes_value;
mod compare;
mod json;
mod map_value;
#[allow(clippy::module_inception)]
mod value;

pub use array_value::ArrayValue;
pub use bytes_value::BytesValue;
pub use compare::{compare_values, value_order};
pub use json::{from_plain_json, to_plain_json};
pub use map_value::MapValue;
pub use value::{Value, ValueKind};
