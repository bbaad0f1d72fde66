//! Named bit tables for flag-encoded directory attributes and for the
//! ACE header/mask fields surfaced in the dump.

/// ACE header flags (MS-DTYP 2.4.4.1).
pub const ACE_FLAGS: &[(&str, u8)] = &[
    ("OBJECT_INHERIT_ACE", 0x01),
    ("CONTAINER_INHERIT_ACE", 0x02),
    ("NO_PROPAGATE_INHERIT_ACE", 0x04),
    ("INHERIT_ONLY_ACE", 0x08),
    ("INHERITED_ACE", 0x10),
    ("SUCCESSFUL_ACCESS_ACE_FLAG", 0x40),
    ("FAILED_ACCESS_ACE_FLAG", 0x80),
];

/// Access-mask bits, including the directory-service object rights.
/// The four generic rights use the patterns the directory maps them to
/// (ActiveDirectoryRights semantics), not the raw generic bits.
pub const ACCESS_MASKS: &[(&str, u32)] = &[
    ("DELETE", 0x0001_0000),
    ("READ_CONTROL", 0x0002_0000),
    ("WRITE_DACL", 0x0004_0000),
    ("WRITE_OWNER", 0x0008_0000),
    ("SYNCHRONIZE", 0x0010_0000),
    ("ACCESS_SYSTEM_SECURITY", 0x0100_0000),
    ("MAXIMUM_ALLOWED", 0x0200_0000),
    ("ADS_RIGHT_DS_CREATE_CHILD", 0x0000_0001),
    ("ADS_RIGHT_DS_DELETE_CHILD", 0x0000_0002),
    ("ADS_RIGHT_DS_SELF", 0x0000_0008),
    ("ADS_RIGHT_DS_READ_PROP", 0x0000_0010),
    ("ADS_RIGHT_DS_WRITE_PROP", 0x0000_0020),
    ("ADS_RIGHT_DS_CONTROL_ACCESS", 0x0000_0100),
    ("GENERIC_READ", 0x0002_0094),
    ("GENERIC_WRITE", 0x0002_0028),
    ("GENERIC_EXECUTE", 0x0002_0004),
    ("GENERIC_ALL", 0x000F_01FF),
];

/// Object-ACE data flags (MS-DTYP 2.4.4.3).
pub const ACE_DATA_FLAGS: &[(&str, u32)] = &[
    ("ACE_OBJECT_TYPE_PRESENT", 0x1),
    ("ACE_INHERITED_OBJECT_TYPE_PRESENT", 0x2),
];

/// A mask "has" a named bit pattern when every bit of the pattern is set.
pub fn has_flag(pattern: u32, value: u32) -> bool {
    pattern & value == pattern
}

/// Expands a flag table against a raw value into the set names.
pub fn expand_flags(table: &[(&str, u32)], value: u32) -> Vec<String> {
    table
        .iter()
        .filter(|(_, bit)| has_flag(*bit, value))
        .map(|(name, _)| name.to_string())
        .collect()
}

pub const USER_ACCOUNT_CONTROL: &[(&str, u32)] = &[
    ("SCRIPT", 0x0001),
    ("ACCOUNTDISABLE", 0x0002),
    ("HOMEDIR_REQUIRED", 0x0008),
    ("LOCKOUT", 0x0010),
    ("PASSWD_NOTREQD", 0x0020),
    ("PASSWD_CANT_CHANGE", 0x0040),
    ("ENCRYPTED_TEXT_PWD_ALLOWED", 0x0080),
    ("TEMP_DUPLICATE_ACCOUNT", 0x0100),
    ("NORMAL_ACCOUNT", 0x0200),
    ("INTERDOMAIN_TRUST_ACCOUNT", 0x0800),
    ("WORKSTATION_TRUST_ACCOUNT", 0x1000),
    ("SERVER_TRUST_ACCOUNT", 0x2000),
    ("DONT_EXPIRE_PASSWORD", 0x10000),
    ("MNS_LOGON_ACCOUNT", 0x20000),
    ("SMARTCARD_REQUIRED", 0x40000),
    ("TRUSTED_FOR_DELEGATION", 0x80000),
    ("NOT_DELEGATED", 0x100000),
    ("USE_DES_KEY_ONLY", 0x200000),
    ("DONT_REQ_PREAUTH", 0x400000),
    ("PASSWORD_EXPIRED", 0x800000),
    ("TRUSTED_TO_AUTH_FOR_DELEGATION", 0x1000000),
    ("PARTIAL_SECRETS_ACCOUNT", 0x04000000),
];

pub const TRUST_ATTRIBUTES: &[(&str, u32)] = &[
    ("NON_TRANSITIVE", 0x00000001),
    ("UPLEVEL_ONLY", 0x00000002),
    ("QUARANTINED_DOMAIN", 0x00000004),
    ("FOREST_TRANSITIVE", 0x00000008),
    ("CROSS_ORGANIZATION", 0x00000010),
    ("WITHIN_FOREST", 0x00000020),
    ("TREAT_AS_EXTERNAL", 0x00000040),
    ("USES_RC4_ENCRYPTION", 0x00000080),
    ("CROSS_ORGANIZATION_NO_TGT_DELEGATION", 0x00000200),
    ("CROSS_ORGANIZATION_ENABLE_TGT_DELEGATION", 0x00000800),
    ("PIM_TRUST", 0x00000400),
];

/// MS-CRTD 2.27 msPKI-Certificate-Name-Flag.
pub const PKI_CERTIFICATE_NAME_FLAG: &[(&str, u32)] = &[
    ("CT_FLAG_ENROLLEE_SUPPLIES_SUBJECT", 0x00000001),
    ("CT_FLAG_ENROLLEE_SUPPLIES_SUBJECT_ALT_NAME", 0x00010000),
    ("CT_FLAG_SUBJECT_ALT_REQUIRE_DOMAIN_DNS", 0x00400000),
    ("CT_FLAG_SUBJECT_ALT_REQUIRE_SPN", 0x00800000),
    ("CT_FLAG_SUBJECT_ALT_REQUIRE_DIRECTORY_GUID", 0x01000000),
    ("CT_FLAG_SUBJECT_ALT_REQUIRE_UPN", 0x02000000),
    ("CT_FLAG_SUBJECT_ALT_REQUIRE_EMAIL", 0x04000000),
    ("CT_FLAG_SUBJECT_ALT_REQUIRE_DNS", 0x08000000),
    ("CT_FLAG_SUBJECT_REQUIRE_DNS_AS_CN", 0x10000000),
    ("CT_FLAG_SUBJECT_REQUIRE_EMAIL", 0x20000000),
    ("CT_FLAG_SUBJECT_REQUIRE_COMMON_NAME", 0x40000000),
    ("CT_FLAG_SUBJECT_REQUIRE_DIRECTORY_PATH", 0x80000000),
    ("CT_FLAG_OLD_CERT_SUPPLIES_SUBJECT_AND_ALT_NAME", 0x00000008),
];

/// MS-CRTD 2.26 msPKI-Enrollment-Flag.
pub const PKI_ENROLLMENT_FLAG: &[(&str, u32)] = &[
    ("CT_FLAG_INCLUDE_SYMMETRIC_ALGORITHMS", 0x00000001),
    ("CT_FLAG_PEND_ALL_REQUESTS", 0x00000002),
    ("CT_FLAG_PUBLISH_TO_KRA_CONTAINER", 0x00000004),
    ("CT_FLAG_PUBLISH_TO_DS", 0x00000008),
    ("CT_FLAG_AUTO_ENROLLMENT_CHECK_USER_DS_CERTIFICATE", 0x00000010),
    ("CT_FLAG_AUTO_ENROLLMENT", 0x00000020),
    ("CT_FLAG_PREVIOUS_APPROVAL_VALIDATE_REENROLLMENT", 0x00000040),
    ("CT_FLAG_USER_INTERACTION_REQUIRED", 0x00000100),
    ("CT_FLAG_REMOVE_INVALID_CERTIFICATE_FROM_PERSONAL_STORE", 0x00000400),
    ("CT_FLAG_ALLOW_ENROLL_ON_BEHALF_OF", 0x00000800),
    ("CT_FLAG_ADD_OCSP_NOCHECK", 0x00001000),
    ("CT_FLAG_ENABLE_KEY_REUSE_ON_NT_TOKEN_KEYSET_STORAGE_FULL", 0x00002000),
    ("CT_FLAG_NOREVOCATIONINFOINISSUEDCERTS", 0x00004000),
    ("CT_FLAG_INCLUDE_BASIC_CONSTRAINTS_FOR_EE_CERTS", 0x00008000),
    (
        "CT_FLAG_ALLOW_PREVIOUS_APPROVAL_KEYBASEDRENEWAL_VALIDATE_REENROLLMENT",
        0x00010000,
    ),
    ("CT_FLAG_ISSUANCE_POLICIES_FROM_REQUEST", 0x00020000),
    ("CT_FLAG_SKIP_AUTO_RENEWAL", 0x00040000),
    ("CT_FLAG_NO_SECURITY_EXTENSION", 0x00080000),
];

/// MS-CRTD 2.28 msPKI-Private-Key-Flag.
pub const PKI_PRIVATE_KEY_FLAG: &[(&str, u32)] = &[
    ("CT_FLAG_REQUIRE_PRIVATE_KEY_ARCHIVAL", 0x00000001),
    ("CT_FLAG_EXPORTABLE_KEY", 0x00000010),
    ("CT_FLAG_STRONG_KEY_PROTECTION_REQUIRED", 0x00000020),
    ("CT_FLAG_REQUIRE_ALTERNATE_SIGNATURE_ALGORITHM", 0x00000040),
    ("CT_FLAG_REQUIRE_SAME_KEY_RENEWAL", 0x00000080),
    ("CT_FLAG_USE_LEGACY_PROVIDER", 0x00000100),
    ("CT_FLAG_ATTEST_NONE", 0x00000000),
    ("CT_FLAG_ATTEST_REQUIRED", 0x00002000),
    ("CT_FLAG_ATTEST_PREFERRED", 0x00001000),
    ("CT_FLAG_ATTESTATION_WITHOUT_POLICY", 0x00004000),
    ("CT_FLAG_EK_TRUST_ON_USE", 0x00000200),
    ("CT_FLAG_EK_VALIDATE_CERT", 0x00000400),
    ("CT_FLAG_EK_VALIDATE_KEY", 0x00000800),
    ("CT_FLAG_HELLO_LOGON_KEY", 0x00200000),
];

/// Certification-authority `flags` attribute.
pub const CA_FLAGS: &[(&str, u32)] = &[
    ("NO_TEMPLATE_SUPPORT", 0x00000001),
    ("SUPPORTS_NT_AUTHENTICATION", 0x00000002),
    ("CA_SUPPORTS_MANUAL_AUTHENTICATION", 0x00000004),
    ("CA_SERVERTYPE_ADVANCED", 0x00000008),
];

/// Attributes whose integer value expands into a `<name>Flags` field.
pub const FLAG_ATTRIBUTES: &[(&str, &[(&str, u32)])] = &[
    ("userAccountControl", USER_ACCOUNT_CONTROL),
    ("trustAttributes", TRUST_ATTRIBUTES),
    ("msPKI-Certificate-Name-Flag", PKI_CERTIFICATE_NAME_FLAG),
    ("msPKI-Enrollment-Flag", PKI_ENROLLMENT_FLAG),
    ("msPKI-Private-Key-Flag", PKI_PRIVATE_KEY_FLAG),
];

pub const TRUST_DIRECTION: &[(i64, &str)] = &[
    (0, "DISABLED"),
    (1, "INBOUND"),
    (2, "OUTBOUND"),
    (3, "BIDIRECTIONAL"),
];

pub const TRUST_TYPE: &[(i64, &str)] = &[
    (1, "DOWNLEVEL"),
    (2, "UPLEVEL"),
    (3, "MIT"),
    (4, "DCE"),
    (5, "AAD"),
];

/// Attributes whose integer value resolves into a `<name>Resolved` field.
pub const LOOKUP_ATTRIBUTES: &[(&str, &[(i64, &str)])] =
    &[("trustDirection", TRUST_DIRECTION), ("trustType", TRUST_TYPE)];

/// MS-ADTS 6.1.4.2 domain/forest functional levels.
pub const FUNCTIONAL_LEVELS: &[(i64, &str)] = &[
    (0, "2000 Mixed/Native"),
    (1, "2003 Interim"),
    (2, "2003"),
    (3, "2008"),
    (4, "2008 R2"),
    (5, "2012"),
    (6, "2012 R2"),
    (7, "2016"),
];

pub fn lookup(table: &'static [(i64, &'static str)], value: i64) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == value).map(|(_, v)| *v)
}

/// SharpHound collection-method bits, used for the graph file `meta.methods`.
pub mod collection_methods {
    pub const GROUP: u32 = 1;
    pub const LOCAL_ADMIN: u32 = 1 << 1;
    pub const GPO_LOCAL_GROUP: u32 = 1 << 2;
    pub const SESSION: u32 = 1 << 3;
    pub const LOGGED_ON: u32 = 1 << 4;
    pub const TRUSTS: u32 = 1 << 5;
    pub const ACL: u32 = 1 << 6;
    pub const CONTAINER: u32 = 1 << 7;
    pub const RDP: u32 = 1 << 8;
    pub const OBJECT_PROPS: u32 = 1 << 9;
    pub const SESSION_LOOP: u32 = 1 << 10;
    pub const LOGGED_ON_LOOP: u32 = 1 << 11;
    pub const DCOM: u32 = 1 << 12;
    pub const SPN_TARGETS: u32 = 1 << 13;
    pub const PS_REMOTE: u32 = 1 << 14;
    pub const USER_RIGHTS: u32 = 1 << 15;
    pub const CA_REGISTRY: u32 = 1 << 16;
    pub const DC_REGISTRY: u32 = 1 << 17;
    pub const CERT_SERVICES: u32 = 1 << 18;
}
