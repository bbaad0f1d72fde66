//! MS-DTYP 2.4: security descriptor wire structures and decoding.

pub mod ace;
pub mod acl;
pub mod decode;
pub mod descriptor;
pub mod guid;
pub mod helpers;
pub mod sid;

pub use ace::*;
pub use acl::*;
pub use decode::*;
pub use descriptor::*;
pub use guid::Guid;
pub use sid::Sid;

#[cfg(test)]
mod tests;
