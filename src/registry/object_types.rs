//! Object-type and control-access-right GUIDs.
//!
//! MS-ADTS 5.1.3.2.1 and the published schema class/attribute listings.
//! Several GUIDs map to the same display name; those collisions are
//! historical and kept as-is. The registry is extended at runtime from
//! `schemaIDGUID` values when the schema partition is collected.

use std::collections::HashMap;

/// Control access rights, attribute sets and class GUIDs, keyed by the
/// lowercase textual GUID.
pub const OBJECT_TYPES: &[(&str, &str)] = &[
    ("ee914b82-0a98-11d1-adbb-00c04fd8d5cd", "Abandon-Replication"),
    ("440820ad-65b4-11d1-a3da-0000f875ae0d", "Add-GUID"),
    ("1abd7cf8-0a99-11d1-adbb-00c04fd8d5cd", "Allocate-Rids"),
    ("68b1d179-0d15-4d4f-ab71-46152e79a7bc", "Allowed-To-Authenticate"),
    ("edacfd8f-ffb3-11d1-b41d-00a0c968f939", "Apply-Group-Policy"),
    ("0e10c968-78fb-11d2-90d4-00c04f79dc55", "Certificate-Enrollment"),
    ("a05b8cc2-17bc-4802-a710-e7c15ab866a2", "Certificate-AutoEnrollment"),
    ("014bf69c-7b3b-11d1-85f6-08002be74fab", "Change-Domain-Master"),
    ("cc17b1fb-33d9-11d2-97d4-00c04fd8d5cd", "Change-Infrastructure-Master"),
    ("bae50096-4752-11d1-9052-00c04fc2d4cf", "Change-PDC"),
    ("d58d5f36-0a98-11d1-adbb-00c04fd8d5cd", "Change-Rid-Master"),
    ("e12b56b6-0a95-11d1-adbb-00c04fd8d5cd", "Change-Schema-Master"),
    ("e2a36dc9-ae17-47c3-b58b-be34c55ba633", "Create-Inbound-Forest-Trust"),
    ("fec364e0-0a98-11d1-adbb-00c04fd8d5cd", "Do-Garbage-Collection"),
    ("ab721a52-1e2f-11d0-9819-00aa0040529b", "Domain-Administer-Server"),
    ("69ae6200-7f46-11d2-b9ad-00c04f79f805", "DS-Check-Stale-Phantoms"),
    ("2f16c4a5-b98e-432c-952a-cb388ba33f2e", "DS-Execute-Intentions-Script"),
    ("9923a32a-3607-11d2-b9be-0000f87a36b2", "DS-Install-Replica"),
    ("4ecc03fe-ffc0-4947-b630-eb672a8a9dbc", "DS-Query-Self-Quota"),
    ("1131f6aa-9c07-11d1-f79f-00c04fc2dcd2", "DS-Replication-Get-Changes"),
    ("1131f6ad-9c07-11d1-f79f-00c04fc2dcd2", "DS-Replication-Get-Changes-All"),
    (
        "89e95b76-444d-4c62-991a-0facbeda640c",
        "DS-Replication-Get-Changes-In-Filtered-Set",
    ),
    ("1131f6ac-9c07-11d1-f79f-00c04fc2dcd2", "DS-Replication-Manage-Topology"),
    ("f98340fb-7c5b-4cdb-a00b-2ebdfa115a96", "DS-Replication-Monitor-Topology"),
    ("1131f6ab-9c07-11d1-f79f-00c04fc2dcd2", "DS-Replication-Synchronize"),
    (
        "05c74c5e-4deb-43b4-bd9f-86664c2a7fd5",
        "Enable-Per-User-Reversibly-Encrypted-Password",
    ),
    ("b7b1b3de-ab09-4242-9e30-9980e5d322f7", "Generate-RSoP-Logging"),
    ("b7b1b3dd-ab09-4242-9e30-9980e5d322f7", "Generate-RSoP-Planning"),
    ("7c0e2a7c-a419-48e4-a995-10180aad54dd", "Manage-Optional-Features"),
    ("ba33815a-4f93-4c76-87f3-57574bff8109", "Migrate-SID-History"),
    ("b4e60130-df3f-11d1-9c86-006008764d0e", "msmq-Open-Connector"),
    ("06bd3201-df3e-11d1-9c86-006008764d0e", "msmq-Peek"),
    ("4b6e08c3-df3c-11d1-9c86-006008764d0e", "msmq-Peek-computer-Journal"),
    ("4b6e08c1-df3c-11d1-9c86-006008764d0e", "msmq-Peek-Dead-Letter"),
    ("06bd3200-df3e-11d1-9c86-006008764d0e", "msmq-Receive"),
    ("4b6e08c2-df3c-11d1-9c86-006008764d0e", "msmq-Receive-computer-Journal"),
    ("4b6e08c0-df3c-11d1-9c86-006008764d0e", "msmq-Receive-Dead-Letter"),
    ("06bd3203-df3e-11d1-9c86-006008764d0e", "msmq-Receive-journal"),
    ("06bd3202-df3e-11d1-9c86-006008764d0e", "msmq-Send"),
    ("a1990816-4298-11d1-ade2-00c04fd8d5cd", "Open-Address-Book"),
    (
        "1131f6ae-9c07-11d1-f79f-00c04fc2dcd2",
        "Read-Only-Replication-Secret-Synchronization",
    ),
    ("45ec5156-db7e-47bb-b53f-dbeb2d03c40f", "Reanimate-Tombstones"),
    ("0bc1554e-0a99-11d1-adbb-00c04fd8d5cd", "Recalculate-Hierarchy"),
    ("62dd28a8-7f46-11d2-b9ad-00c04f79f805", "Recalculate-Security-Inheritance"),
    ("ab721a56-1e2f-11d0-9819-00aa0040529b", "Receive-As"),
    ("9432c620-033c-4db7-8b58-14ef6d0bf477", "Refresh-Group-Cache"),
    ("1a60ea8d-58a6-4b20-bcdc-fb71eb8a9ff8", "Reload-SSL-Certificate"),
    ("7726b9d5-a4b4-4288-a6b2-dce952e80a7f", "Run-Protect_Admin_Groups-Task"),
    ("91d67418-0135-4acc-8d79-c08e857cfbec", "SAM-Enumerate-Entire-Domain"),
    ("ab721a54-1e2f-11d0-9819-00aa0040529b", "Send-As"),
    ("ab721a55-1e2f-11d0-9819-00aa0040529b", "Send-To"),
    ("ccc2dc7d-a6ad-4a7a-8846-c04e3cc53501", "Unexpire-Password"),
    ("280f369c-67c7-438e-ae98-1d46f3c6f541", "Update-Password-Not-Required-Bit"),
    ("be2bb760-7f46-11d2-b9ad-00c04f79f805", "Update-Schema-Cache"),
    ("ab721a53-1e2f-11d0-9819-00aa0040529b", "User-Change-Password"),
    ("00299570-246d-11d0-a768-00aa006e0529", "User-Force-Change-Password"),
    ("3e0f7e18-2c7a-4c10-ba82-4d926db99a3e", "DS-Clone-Domain-Controller"),
    ("084c93a2-620d-4879-a836-f0ae47de0e89", "DS-Read-Partition-Secrets"),
    ("94825a8d-b171-4116-8146-1e34d8f54401", "DS-Write-Partition-Secrets"),
    ("4125c71f-7fac-4ff0-bcb7-f09a41325286", "DS-Set-Owner"),
    ("88a9933e-e5c8-4f2a-9dd7-2527416b8092", "DS-Bypass-Quota"),
    ("9b026da6-0d3c-465c-8bee-5199d7165cba", "DS-Validated-Write-Computer"),
    ("e362ed86-b728-0842-b27d-2dea7a9df218", "ms-DS-ManagedPassword"),
    ("037088f8-0ae1-11d2-b422-00a0c968f939", "rASInformation"),
    ("3e0abfd0-126a-11d0-a060-00aa006c33ed", "sAMAccountName"),
    (
        "3f78c3e5-f79a-46bd-a0b8-9d18116ddc79",
        "msDS-AllowedToActOnBehalfOfOtherIdentity",
    ),
    ("46a9b11d-60ae-405a-b7e8-ff8a58d456d2", "tokenGroupsGlobalAndUniversal"),
    // no published name for this one
    (
        "47cf3000-0019-4754-8c71-da7b9a2d5349",
        "47cf3000-0019-4754-8c71-da7b9a2d5349",
    ),
    ("4828cc14-1437-45bc-9b07-ad6f015e5f28", "inetOrgPerson"),
    ("4c164200-20c0-11d0-a768-00aa006e0529", "User-Account-Restrictions"),
    ("5805bc62-bdc9-4428-a5e2-856a0f4c185e", "terminalServerLicenseServer"),
    ("59ba2f42-79a2-11d0-9020-00c04fc2d3cf", "generalInformation"),
    ("5b47d60f-6090-40b2-9f37-2a4de88f3063", "msDS-KeyCredentialLink"),
    ("5f202010-79a5-11d0-9020-00c04fc2d4cf", "logonInformation"),
    ("6db69a1c-9422-11d1-aebd-0000f80367c1", "terminalServer"),
    ("72e39547-7b18-11d1-adef-00c04fd8d5cd", "validatedDNSHostName"),
    ("736e4812-af31-11d2-b7df-00805f48caeb", "trustedDomain"),
    ("77b5b886-944a-11d1-aebd-0000f80367c1", "personalInformation"),
    ("91e647de-d96f-4b70-9557-d63ff4f3ccd8", "privateInformation"),
    ("b7c69e6d-2cc7-11d2-854e-00a0c983f608", "tokenGroups"),
    ("b8119fd0-04f6-4762-ab7a-4986c76b3f9a", "domainOtherParameters"),
    ("bc0ac240-79a9-11d0-9020-00c04fc2d4cf", "groupMembership"),
    ("bf9679c0-0de6-11d0-a285-00aa003049e2", "Member"),
    ("bf967950-0de6-11d0-a285-00aa003049e2", "description"),
    ("bf967953-0de6-11d0-a285-00aa003049e2", "displayName"),
    ("bf967a7f-0de6-11d0-a285-00aa003049e2", "userCertificate"),
    ("bf967a86-0de6-11d0-a285-00aa003049e2", "computer"),
    ("bf967a9c-0de6-11d0-a285-00aa003049e2", "group"),
    ("bf967aa8-0de6-11d0-a285-00aa003049e2", "printer"),
    ("bf967aba-0de6-11d0-a285-00aa003049e2", "user"),
    (
        "c47d1819-529b-4c8a-8516-4f273a07e43c",
        "c47d1819-529b-4c8a-8516-4f273a07e43c",
    ),
    ("c7407360-20bf-11d0-a768-00aa006e0529", "domainPassword"),
    ("e45795b2-9455-11d1-aebd-0000f80367c1", "emailInformation"),
    ("e45795b3-9455-11d1-aebd-0000f80367c1", "webInformation"),
    ("e48d0154-bcf8-11d1-8702-00c04fb96050", "publicInformation"),
    ("ea1b7b93-5e48-46d5-bc6c-4df4fda78a35", "msTPM-TpmInformationForComputer"),
    ("f3a64788-5306-11d1-a9c5-0000f80367c1", "servicePrincipalName"),
    ("bf967aa5-0de6-11d0-a285-00aa003049e2", "organizationalUnit"),
    ("5cb41ed0-0e4c-11d0-a286-00aa003049e2", "contact"),
    ("19195a5a-6da0-11d0-afd3-00c04fd930c9", "domain"),
    ("f30e3bc2-9ff0-11d1-b603-0000f80367c1", "groupPolicyContainer"),
    ("ea1dddc4-60ff-416e-8cc0-17cee534bce7", "ms-PKI-Certificate-Name-Flag"),
    ("d15ef7d8-f226-46db-ae79-b34e560bd12c", "ms-PKI-Enrollment-Flag"),
    ("e5209ca2-3bba-11d2-90cc-00c04fd91ab1", "PKI-Certificate-Template"),
    ("00000000-0000-0000-0000-000000000000", "AllProperties"),
];

/// EKU OIDs that make a certificate usable for client authentication.
pub const AUTHENTICATION_OIDS: &[&str] = &[
    "1.3.6.1.5.5.7.3.2",      // ClientAuthentication
    "1.3.6.1.5.2.3.4",        // PKINITClientAuthentication
    "1.3.6.1.4.1.311.20.2.2", // SmartcardLogon
    "2.5.29.37.0",            // AnyPurpose
];

/// GUID-to-display-name lookup, extendable from the schema partition.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: HashMap<String, String>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            types: OBJECT_TYPES
                .iter()
                .map(|(guid, name)| (guid.to_string(), name.to_string()))
                .collect(),
        }
    }

    /// Resolves a GUID to its display name, falling back to the lowercase
    /// textual GUID when unknown.
    pub fn resolve(&self, guid: &crate::secdesc::Guid) -> String {
        let text = guid.to_string();
        self.types.get(&text).cloned().unwrap_or(text)
    }

    /// Registers a `schemaIDGUID` to display-name mapping from the schema.
    pub fn extend(&mut self, guid: String, name: String) {
        self.types.insert(guid, name);
    }
}
