pub mod acl;
pub mod collector;
pub mod directory;
pub mod dump;
pub mod error;
pub mod graph;
pub mod normalize;
pub mod postprocess;
pub mod registry;
pub mod secdesc;

pub use collector::{Collector, CollectorConfig};
pub use directory::{Directory, LdapDirectory};
pub use dump::Dump;
pub use error::Error;

pub type Result<T> = std::result::Result<T, crate::Error>;
