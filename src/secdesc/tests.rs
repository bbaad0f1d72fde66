use std::collections::HashMap;
use std::str::FromStr;

use crate::registry::{SidCatalog, TypeRegistry};

use super::*;

#[test]
pub fn test_owner_group_parse() {
    let buff = &[
        0x1, 0x0, 0x0, 0x80, 0x14, 0x0, 0x0, 0x0, 0x30, 0x0, 0x0, 0x0, 0x0, 0x0, 0x0, 0x0, 0x0,
        0x0, 0x0, 0x0, 0x1, 0x5, 0x0, 0x0, 0x0, 0x0, 0x0, 0x5, 0x15, 0x0, 0x0, 0x0, 0x17, 0x3d,
        0xa7, 0x2e, 0x95, 0x56, 0x53, 0xf9, 0x15, 0xdf, 0xf2, 0x80, 0xe9, 0x3, 0x0, 0x0, 0x1, 0x5,
        0x0, 0x0, 0x0, 0x0, 0x0, 0x5, 0x15, 0x0, 0x0, 0x0, 0x17, 0x3d, 0xa7, 0x2e, 0x95, 0x56,
        0x53, 0xf9, 0x15, 0xdf, 0xf2, 0x80, 0xe9, 0x3, 0x0, 0x0,
    ];
    let sd = SecurityDescriptor::parse(buff).unwrap();
    assert!(sd.control.self_relative());
    assert!(!sd.control.dacl_protected());
    assert_eq!(
        sd.owner_sid,
        Some(Sid::from_str("S-1-5-21-782712087-4182988437-2163400469-1001").unwrap())
    );
    assert_eq!(
        sd.group_sid,
        Some(Sid::from_str("S-1-5-21-782712087-4182988437-2163400469-1001").unwrap())
    );
    assert_eq!(sd.sacl, None);
    assert_eq!(sd.dacl, None);
}

#[test]
pub fn test_dacl_only_parse() {
    let buff = &[
        0x1, 0x0, 0x4, 0x84, 0x0, 0x0, 0x0, 0x0, 0x0, 0x0, 0x0, 0x0, 0x0, 0x0, 0x0, 0x0, 0x14, 0x0,
        0x0, 0x0, 0x2, 0x0, 0x90, 0x0, 0x5, 0x0, 0x0, 0x0, 0x0, 0x13, 0x24, 0x0, 0xff, 0x1, 0x1f,
        0x0, 0x1, 0x5, 0x0, 0x0, 0x0, 0x0, 0x0, 0x5, 0x15, 0x0, 0x0, 0x0, 0x17, 0x3d, 0xa7, 0x2e,
        0x95, 0x56, 0x53, 0xf9, 0x15, 0xdf, 0xf2, 0x80, 0xe9, 0x3, 0x0, 0x0, 0x0, 0x13, 0x18, 0x0,
        0xff, 0x1, 0x1f, 0x0, 0x1, 0x2, 0x0, 0x0, 0x0, 0x0, 0x0, 0x5, 0x20, 0x0, 0x0, 0x0, 0x20,
        0x2, 0x0, 0x0, 0x0, 0x13, 0x14, 0x0, 0xff, 0x1, 0x1f, 0x0, 0x1, 0x1, 0x0, 0x0, 0x0, 0x0,
        0x0, 0x5, 0x12, 0x0, 0x0, 0x0, 0x0, 0x13, 0x14, 0x0, 0xa9, 0x0, 0x12, 0x0, 0x1, 0x1, 0x0,
        0x0, 0x0, 0x0, 0x0, 0x1, 0x0, 0x0, 0x0, 0x0, 0x0, 0x13, 0x24, 0x0, 0xff, 0x1, 0x1f, 0x0,
        0x1, 0x5, 0x0, 0x0, 0x0, 0x0, 0x0, 0x5, 0x15, 0x0, 0x0, 0x0, 0x17, 0x3d, 0xa7, 0x2e, 0x95,
        0x56, 0x53, 0xf9, 0x15, 0xdf, 0xf2, 0x80, 0xea, 0x3, 0x0, 0x0,
    ];
    let sd = SecurityDescriptor::parse(buff).unwrap();
    assert!(sd.control.dacl_present());
    assert!(sd.control.dacl_auto_inherited());
    assert_eq!(sd.owner_sid, None);
    assert_eq!(sd.group_sid, None);
    let dacl = sd.dacl.unwrap();
    assert_eq!(dacl.acl_revision, AclRevision::Nt4);
    assert_eq!(dacl.ace.len(), 5);

    let first = &dacl.ace[0];
    assert_eq!(first.ace_type, AceType::AccessAllowed);
    assert!(first.ace_flags.inherited());
    assert!(first.ace_flags.container_inherit());
    assert!(first.ace_flags.object_inherit());
    assert_eq!(first.mask(), 0x1f01ff);
    assert_eq!(
        first.sid().to_string(),
        "S-1-5-21-782712087-4182988437-2163400469-1001"
    );
    assert_eq!(dacl.ace[3].mask(), 0x1200a9);
    assert_eq!(dacl.ace[3].sid().to_string(), "S-1-1-0");
}

/// A protected descriptor whose DACL holds a single object ACE granting
/// ADS_RIGHT_DS_READ_PROP on DS-Replication-Get-Changes.
const OBJECT_ACE_BLOB: &[u8] = &[
    0x01, 0x00, 0x04, 0x90, // revision, sbz1, control: DP|PD|SR
    0x00, 0x00, 0x00, 0x00, // offset_owner
    0x00, 0x00, 0x00, 0x00, // offset_group
    0x00, 0x00, 0x00, 0x00, // offset_sacl
    0x14, 0x00, 0x00, 0x00, // offset_dacl
    // ACL header
    0x04, 0x00, 0x40, 0x00, 0x01, 0x00, 0x00, 0x00, //
    // ACE: type 5, flags 0, size 56
    0x05, 0x00, 0x38, 0x00, //
    0x10, 0x00, 0x00, 0x00, // mask: ADS_RIGHT_DS_READ_PROP
    0x01, 0x00, 0x00, 0x00, // object flags: OBJECT_TYPE_PRESENT
    0xaa, 0xf6, 0x31, 0x11, 0x07, 0x9c, 0xd1, 0x11, 0xf7, 0x9f, 0x00, 0xc0, 0x4f, 0xc2, 0xdc,
    0xd2, // 1131f6aa-9c07-11d1-f79f-00c04fc2dcd2
    0x01, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05, 0x15, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00,
    0x00, 0x02, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x50, 0x04, 0x00,
    0x00, // S-1-5-21-1-2-3-1104
];

#[test]
pub fn test_object_ace_parse() {
    let sd = SecurityDescriptor::parse(OBJECT_ACE_BLOB).unwrap();
    assert!(sd.control.dacl_protected());
    let dacl = sd.dacl.unwrap();
    assert_eq!(dacl.ace.len(), 1);
    let ace = &dacl.ace[0];
    assert_eq!(ace.ace_type, AceType::AccessAllowedObject);
    match &ace.value {
        AceValue::Object(obj) => {
            assert_eq!(
                obj.object_type.unwrap().to_string(),
                "1131f6aa-9c07-11d1-f79f-00c04fc2dcd2"
            );
            assert_eq!(obj.inherited_object_type, None);
            assert_eq!(obj.sid.to_string(), "S-1-5-21-1-2-3-1104");
        }
        other => panic!("expected object ace, got {other:?}"),
    }
}

#[test]
pub fn test_decode_object_ace() {
    let sids = SidCatalog::new();
    let types = TypeRegistry::new();
    let netbios = HashMap::new();
    let ctx = DecodeContext {
        sids: &sids,
        domain_netbios: &netbios,
        types: &types,
    };
    let decoded = DecodedSecurityDescriptor::decode(OBJECT_ACE_BLOB, &ctx).unwrap();
    assert!(decoded.is_acl_protected);
    let dacls = decoded.dacls.unwrap();
    assert_eq!(dacls.len(), 1);
    let ace = &dacls[0];
    assert_eq!(ace.ace_type, "ACCESS_ALLOWED_OBJECT_ACE");
    assert_eq!(ace.sid, "S-1-5-21-1-2-3-1104");
    assert_eq!(ace.mask, 0x10);
    assert_eq!(ace.privs, vec!["ADS_RIGHT_DS_READ_PROP"]);
    assert!(ace.has_data_flag("ACE_OBJECT_TYPE_PRESENT"));
    assert!(!ace.has_data_flag("ACE_INHERITED_OBJECT_TYPE_PRESENT"));
    assert_eq!(
        ace.control_object_type.as_deref(),
        Some("DS-Replication-Get-Changes")
    );
    assert_eq!(ace.inheritable_object_type, None);
}

#[test]
pub fn test_decode_resolves_well_known_names() {
    // Allowed ACE for Administrators with GENERIC_ALL semantics.
    let buff = &[
        0x01, 0x00, 0x04, 0x80, // control: DP|SR
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x14, 0x00, 0x00,
        0x00, // dacl at 0x14
        0x02, 0x00, 0x24, 0x00, 0x01, 0x00, 0x00, 0x00, // ACL header
        0x00, 0x00, 0x1c, 0x00, // allowed ACE, size 28
        0xff, 0x01, 0x0f, 0x00, // mask 0x000f01ff
        0x01, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05, 0x20, 0x00, 0x00, 0x00, 0x20, 0x02, 0x00,
        0x00, // S-1-5-32-544
    ];
    let sids = SidCatalog::new();
    let types = TypeRegistry::new();
    let netbios = HashMap::new();
    let ctx = DecodeContext {
        sids: &sids,
        domain_netbios: &netbios,
        types: &types,
    };
    let decoded = DecodedSecurityDescriptor::decode(buff, &ctx).unwrap();
    let ace = &decoded.dacls.unwrap()[0];
    assert_eq!(ace.resolved_sid_name.as_deref(), Some("Builtin\\Administrators"));
    assert_eq!(ace.foreign, Some(false));
    assert!(ace.has_priv("GENERIC_ALL"));
    assert!(ace.has_priv("GENERIC_WRITE"));
    assert!(ace.has_priv("WRITE_DACL"));
}

#[test]
pub fn test_malformed_descriptor() {
    assert!(SecurityDescriptor::parse(&[0x01, 0x00]).is_err());
    // bad revision
    assert!(SecurityDescriptor::parse(&[
        0x02, 0x00, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00
    ])
    .is_err());
}
