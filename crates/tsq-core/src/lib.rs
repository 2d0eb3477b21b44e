pub mod error;
pub mod field;
pub mod frame;
pub mod request;
pub mod types;

pub use error::{QueryError, Result};
pub use field::{Field, FieldConfig, Labels};
pub use frame::Frame;
pub use request::{QueryRequest, QueryTarget, RawTimeRange, ScopedVars, TimeRange};
pub use types::*;
