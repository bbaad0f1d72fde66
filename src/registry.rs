//! Static lookup tables for directory constants: object-type and
//! extended-right GUIDs, well-known SIDs, access-mask and flag names.

pub mod flags;
pub mod object_types;
pub mod sids;

pub use flags::*;
pub use object_types::TypeRegistry;
pub use sids::SidCatalog;
