//! Decoded, serializable form of a directory security descriptor.
//!
//! The wire structures in this module's siblings stay faithful to
//! MS-DTYP; this layer expands flag words into their names, renders SIDs
//! canonically and resolves object-type GUIDs against the type registry,
//! producing the shape embedded in the dump under `nTSecurityDescriptor`
//! and the other descriptor-valued attributes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::registry::{
    expand_flags, ACCESS_MASKS, ACE_DATA_FLAGS, ACE_FLAGS, SidCatalog, TypeRegistry,
};

use super::{AceValue, SecurityDescriptor, Sid};

/// Lookup state needed while decoding: the SID catalog for name
/// annotation, the NetBIOS domain table for qualified names, and the
/// object-type registry.
pub struct DecodeContext<'a> {
    pub sids: &'a SidCatalog,
    pub domain_netbios: &'a HashMap<String, String>,
    pub types: &'a TypeRegistry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedSecurityDescriptor {
    #[serde(rename = "IsACLProtected")]
    pub is_acl_protected: bool,
    #[serde(rename = "Control", skip_serializing_if = "Option::is_none")]
    pub control: Option<u16>,
    #[serde(rename = "OwnerSid", skip_serializing_if = "Option::is_none")]
    pub owner_sid: Option<String>,
    #[serde(rename = "OwnerName", skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    #[serde(rename = "GroupSid", skip_serializing_if = "Option::is_none")]
    pub group_sid: Option<String>,
    #[serde(rename = "GroupName", skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(rename = "Dacls", skip_serializing_if = "Option::is_none")]
    pub dacls: Option<Vec<DecodedAce>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedAce {
    #[serde(rename = "Type")]
    pub ace_type: String,
    #[serde(rename = "Sid")]
    pub sid: String,
    #[serde(rename = "ResolvedSidName", skip_serializing_if = "Option::is_none")]
    pub resolved_sid_name: Option<String>,
    #[serde(rename = "Foreign", skip_serializing_if = "Option::is_none")]
    pub foreign: Option<bool>,
    #[serde(rename = "Flags")]
    pub flags: Vec<String>,
    #[serde(rename = "Ace_Data_Flags", skip_serializing_if = "Option::is_none")]
    pub data_flags: Option<Vec<String>>,
    #[serde(rename = "Mask")]
    pub mask: u32,
    #[serde(rename = "Privs")]
    pub privs: Vec<String>,
    #[serde(rename = "ControlObjectType", skip_serializing_if = "Option::is_none")]
    pub control_object_type: Option<String>,
    #[serde(
        rename = "InheritableObjectType",
        skip_serializing_if = "Option::is_none"
    )]
    pub inheritable_object_type: Option<String>,
}

impl DecodedAce {
    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.iter().any(|f| f == name)
    }

    pub fn has_priv(&self, name: &str) -> bool {
        self.privs.iter().any(|p| p == name)
    }

    pub fn has_data_flag(&self, name: &str) -> bool {
        self.data_flags
            .as_ref()
            .is_some_and(|d| d.iter().any(|f| f == name))
    }
}

impl DecodedSecurityDescriptor {
    /// Decodes a self-relative descriptor blob. The SACL, if the server
    /// sent one despite the SD-flags control, is discarded.
    pub fn decode(data: &[u8], ctx: &DecodeContext) -> crate::Result<Self> {
        let sd = SecurityDescriptor::parse(data)?;

        let annotate = |sid: &Sid| {
            let canonical = sid.to_string();
            let name = ctx.sids.name(&canonical).map(String::from);
            (canonical, name)
        };

        let (owner_sid, owner_name) = match &sd.owner_sid {
            Some(sid) => {
                let (s, n) = annotate(sid);
                (Some(s), n)
            }
            None => (None, None),
        };
        let (group_sid, group_name) = match &sd.group_sid {
            Some(sid) => {
                let (s, n) = annotate(sid);
                (Some(s), n)
            }
            None => (None, None),
        };

        let dacls = sd
            .dacl
            .as_ref()
            .map(|acl| acl.ace.iter().map(|ace| decode_ace(ace, ctx)).collect());

        Ok(Self {
            is_acl_protected: sd.control.dacl_protected(),
            control: Some(sd.control_bits()).filter(|c| *c != 0),
            owner_sid,
            owner_name,
            group_sid,
            group_name,
            dacls,
        })
    }
}

fn decode_ace(ace: &super::Ace, ctx: &DecodeContext) -> DecodedAce {
    let sid = ace.sid().to_string();

    // "DOMAIN\name" annotation for SIDs present in the catalog.
    let mut resolved_sid_name = None;
    let mut foreign = None;
    if let Some(name) = ctx.sids.name(&sid) {
        let mut parts = vec![name.to_string()];
        let domain_sid = Sid::domain_sid(&sid);
        if let Some(nb) = ctx.domain_netbios.get(&domain_sid) {
            parts.push(nb.clone());
        } else if sid.starts_with("S-1-5-32-") {
            parts.push("Builtin".to_string());
        }
        parts.reverse();
        resolved_sid_name = Some(parts.join("\\"));
        foreign = Some(false);
    }

    let flags_raw = ace.ace_flags.into_bytes()[0];
    let flags = ACE_FLAGS
        .iter()
        .filter(|(_, bit)| *bit & flags_raw == *bit)
        .map(|(name, _)| name.to_string())
        .collect();

    let (data_flags, control_object_type, inheritable_object_type) = match &ace.value {
        AceValue::Object(obj) => {
            let raw = u32::from_le_bytes(obj.flags.into_bytes());
            (
                Some(expand_flags(ACE_DATA_FLAGS, raw)),
                obj.object_type.as_ref().map(|g| ctx.types.resolve(g)),
                obj.inherited_object_type.as_ref().map(|g| ctx.types.resolve(g)),
            )
        }
        AceValue::Access(_) => (None, None, None),
    };

    DecodedAce {
        ace_type: ace.ace_type.name().to_string(),
        sid,
        resolved_sid_name,
        foreign,
        flags,
        data_flags,
        mask: ace.mask(),
        privs: expand_flags(ACCESS_MASKS, ace.mask()),
        control_object_type,
        inheritable_object_type,
    }
}
