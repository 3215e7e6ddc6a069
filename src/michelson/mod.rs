pub mod address;
pub mod packed;
pub mod value;

pub use address::{comparable_address, validate_address};
pub use packed::{PackedString, PackedStringError};
pub use value::{Parameters, Value};
