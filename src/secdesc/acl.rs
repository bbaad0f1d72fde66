//! MS-DTYP 2.4.5: ACL

use binrw::prelude::*;

use super::Ace;

#[binrw::binread]
#[derive(Debug, PartialEq, Eq, Clone)]
#[br(little)]
pub struct Acl {
    pub acl_revision: AclRevision,
    #[br(temp, assert(sbz1 == 0))]
    sbz1: u8,
    pub acl_size: u16,
    #[br(temp)]
    ace_count: u16,
    #[br(temp, assert(sbz2 == 0))]
    sbz2: u16,
    #[br(count = ace_count)]
    pub ace: Vec<Ace>,
}

#[binrw::binread]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[br(repr(u8))]
pub enum AclRevision {
    /// Windows NT 4.0
    Nt4 = 2,
    /// Active directory
    DS = 4,
}
