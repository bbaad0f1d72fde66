//! MS-DTYP 2.4.6: Security Descriptor
//!
//! Directory descriptors are always self-relative: the four trailing
//! offsets point anywhere inside the blob (AD typically serializes the
//! DACL before the owner and group), so each element is read at its
//! offset rather than sequentially.

use binrw::prelude::*;
use modular_bitfield::prelude::*;

use super::helpers::read_at_offset;
use super::{Acl, Sid};

#[binrw::binread]
#[derive(Debug, PartialEq, Eq)]
#[br(little)]
pub struct SecurityDescriptor {
    #[br(temp, assert(revision == 1))]
    revision: u8,
    pub sbz1: u8,
    #[br(assert(control.self_relative()))]
    pub control: SecurityDescriptorControl,
    #[br(temp)]
    offset_owner: u32,
    #[br(temp)]
    offset_group: u32,
    #[br(temp)]
    offset_sacl: u32,
    #[br(temp)]
    offset_dacl: u32,
    #[br(parse_with = read_at_offset, args(offset_owner))]
    pub owner_sid: Option<Sid>,
    #[br(parse_with = read_at_offset, args(offset_group))]
    pub group_sid: Option<Sid>,
    #[br(parse_with = read_at_offset, args(offset_sacl))]
    pub sacl: Option<Acl>,
    #[br(parse_with = read_at_offset, args(offset_dacl))]
    pub dacl: Option<Acl>,
}

impl SecurityDescriptor {
    pub fn parse(data: &[u8]) -> crate::Result<Self> {
        let mut cursor = std::io::Cursor::new(data);
        Ok(Self::read(&mut cursor)?)
    }

    /// Raw 16-bit control word.
    pub fn control_bits(&self) -> u16 {
        u16::from_le_bytes(self.control.into_bytes())
    }
}

#[bitfield]
#[derive(BinRead, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityDescriptorControl {
    pub owner_defaulted: bool,
    pub group_defaulted: bool,
    pub dacl_present: bool,
    pub dacl_defaulted: bool,

    pub sacl_present: bool,
    pub sacl_defaulted: bool,
    pub dacl_trusted: bool,
    pub server_security: bool,

    pub dacl_computed: bool,
    pub sacl_computed: bool,
    pub dacl_auto_inherited: bool,
    pub sacl_auto_inherited: bool,

    pub dacl_protected: bool,
    pub sacl_protected: bool,
    pub rm_control_valid: bool,
    pub self_relative: bool,
}
