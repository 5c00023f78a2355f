pub mod error;
pub(crate) mod reader;

pub use error::CursorError;
pub(crate) use reader::ByteCursor;
