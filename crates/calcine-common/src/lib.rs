pub mod error;
pub mod reference;
pub mod value;

pub use error::*;
pub use reference::*;
pub use value::*;
