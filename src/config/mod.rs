pub mod descriptor;
pub mod error;
pub mod groups;
pub mod parser;

pub use descriptor::{ConnectionDescriptor, DriverKind, SafeInfo, Secret};
pub use error::ConfigError;
pub use groups::{GroupIndex, GroupView};
pub use parser::parse_connections;
