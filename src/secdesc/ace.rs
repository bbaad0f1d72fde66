//! MS-DTYP 2.4.4: ACE

use binrw::io::TakeSeekExt;
use binrw::prelude::*;
use modular_bitfield::prelude::*;

use super::{Guid, Sid};

#[binrw::binread]
#[derive(Debug, PartialEq, Eq, Clone)]
#[br(little)]
pub struct Ace {
    pub ace_type: AceType,
    pub ace_flags: AceFlags,
    #[br(temp)]
    ace_size: u16,
    #[br(args(ace_type))]
    #[br(map_stream = |s| s.take_seek(ace_size.saturating_sub(4) as u64))]
    #[br(pad_size_to = ace_size.saturating_sub(4) as u64)]
    pub value: AceValue,
}

impl Ace {
    /// Raw access mask, for any ACE layout that carries one.
    pub fn mask(&self) -> u32 {
        match &self.value {
            AceValue::Access(ace) => ace.access_mask,
            AceValue::Object(ace) => ace.access_mask,
        }
    }

    pub fn sid(&self) -> &Sid {
        match &self.value {
            AceValue::Access(ace) => &ace.sid,
            AceValue::Object(ace) => &ace.sid,
        }
    }
}

/// All defined ACE layouts collapse to two shapes for reading: a plain
/// access ACE (mask + SID) and an object ACE (mask + type GUIDs + SID).
/// Callback application data and resource-attribute payloads trail the
/// SID and are skipped via the ACE size field.
#[binrw::binread]
#[derive(Debug, PartialEq, Eq, Clone)]
#[br(import(ace_type: AceType))]
pub enum AceValue {
    #[br(pre_assert(ace_type.is_object()))]
    Object(AccessObjectAce),
    Access(AccessAce),
}

#[binrw::binread]
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AccessAce {
    pub access_mask: u32,
    pub sid: Sid,
}

#[binrw::binread]
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AccessObjectAce {
    pub access_mask: u32,
    pub flags: ObjectAceFlags,
    #[br(if(flags.object_type_present()))]
    pub object_type: Option<Guid>,
    #[br(if(flags.inherited_object_type_present()))]
    pub inherited_object_type: Option<Guid>,
    pub sid: Sid,
}

#[bitfield]
#[derive(BinRead, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectAceFlags {
    pub object_type_present: bool,
    pub inherited_object_type_present: bool,
    #[skip]
    __: B30,
}

#[binrw::binread]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[br(repr(u8))]
pub enum AceType {
    AccessAllowed = 0,
    AccessDenied = 1,
    SystemAudit = 2,
    SystemAlarm = 3,
    AccessAllowedCompound = 4,
    AccessAllowedObject = 5,
    AccessDeniedObject = 6,
    SystemAuditObject = 7,
    SystemAlarmObject = 8,
    AccessAllowedCallback = 9,
    AccessDeniedCallback = 10,
    AccessAllowedCallbackObject = 11,
    AccessDeniedCallbackObject = 12,
    SystemAuditCallback = 13,
    SystemAlarmCallback = 14,
    SystemAuditCallbackObject = 15,
    SystemAlarmCallbackObject = 16,
    SystemMandatoryLabel = 17,
    SystemResourceAttribute = 18,
    SystemScopedPolicyId = 19,
}

impl AceType {
    pub fn is_object(&self) -> bool {
        matches!(
            self,
            AceType::AccessAllowedObject
                | AceType::AccessDeniedObject
                | AceType::SystemAuditObject
                | AceType::SystemAlarmObject
                | AceType::AccessAllowedCallbackObject
                | AceType::AccessDeniedCallbackObject
                | AceType::SystemAuditCallbackObject
                | AceType::SystemAlarmCallbackObject
        )
    }

    /// Structure name used in the dump, matching the MS-DTYP names.
    pub fn name(&self) -> &'static str {
        match self {
            AceType::AccessAllowed => "ACCESS_ALLOWED_ACE",
            AceType::AccessDenied => "ACCESS_DENIED_ACE",
            AceType::SystemAudit => "SYSTEM_AUDIT_ACE",
            AceType::SystemAlarm => "SYSTEM_ALARM_ACE",
            AceType::AccessAllowedCompound => "ACCESS_ALLOWED_COMPOUND_ACE",
            AceType::AccessAllowedObject => "ACCESS_ALLOWED_OBJECT_ACE",
            AceType::AccessDeniedObject => "ACCESS_DENIED_OBJECT_ACE",
            AceType::SystemAuditObject => "SYSTEM_AUDIT_OBJECT_ACE",
            AceType::SystemAlarmObject => "SYSTEM_ALARM_OBJECT_ACE",
            AceType::AccessAllowedCallback => "ACCESS_ALLOWED_CALLBACK_ACE",
            AceType::AccessDeniedCallback => "ACCESS_DENIED_CALLBACK_ACE",
            AceType::AccessAllowedCallbackObject => "ACCESS_ALLOWED_CALLBACK_OBJECT_ACE",
            AceType::AccessDeniedCallbackObject => "ACCESS_DENIED_CALLBACK_OBJECT_ACE",
            AceType::SystemAuditCallback => "SYSTEM_AUDIT_CALLBACK_ACE",
            AceType::SystemAlarmCallback => "SYSTEM_ALARM_CALLBACK_ACE",
            AceType::SystemAuditCallbackObject => "SYSTEM_AUDIT_CALLBACK_OBJECT_ACE",
            AceType::SystemAlarmCallbackObject => "SYSTEM_ALARM_CALLBACK_OBJECT_ACE",
            AceType::SystemMandatoryLabel => "SYSTEM_MANDATORY_LABEL_ACE",
            AceType::SystemResourceAttribute => "SYSTEM_RESOURCE_ATTRIBUTE_ACE",
            AceType::SystemScopedPolicyId => "SYSTEM_SCOPED_POLICY_ID_ACE",
        }
    }
}

#[bitfield]
#[derive(BinRead, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AceFlags {
    pub object_inherit: bool,
    pub container_inherit: bool,
    pub no_propagate_inherit: bool,
    pub inherit_only: bool,

    pub inherited: bool,
    #[skip]
    __: bool,
    pub successful_access: bool,
    pub failed_access: bool,
}
