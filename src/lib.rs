//! marshal48: a decoder/encoder for the Marshal 4.8 binary object format.

pub mod cli;
pub mod errors;
pub mod fixnum;
pub mod host;
pub mod json_host;
pub mod marshal;
pub mod project;
pub mod repr;
pub mod session;
pub mod stream;
pub mod unmarshal;
pub mod value;

pub use errors::{MarshalError, Result};
pub use session::Session;
pub use value::Value;
