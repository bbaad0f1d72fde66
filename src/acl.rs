//! Translation of decoded DACLs into the finite set of abstract rights
//! used by the attack-graph output.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::normalize::{get_ci, get_str, Record};
use crate::registry::SidCatalog;
use crate::secdesc::{DecodedAce, DecodedSecurityDescriptor};

/// Principal classes the rights matrix distinguishes, derived from the
/// leading RDN of `objectCategory`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectClass {
    User,
    Group,
    Computer,
    Gmsa,
    Ou,
    Container,
    Domain,
    Configuration,
    CertTemplate,
    EnrollmentService,
    CertAuthority,
    Gpo,
    Unknown,
}

/// Extracts the short class name from an `objectCategory` DN and maps it
/// onto the class enum. `Person` normalizes to `User` and a `-DNS`
/// suffix is stripped, so `CN=Domain-DNS,...` reads as `Domain`.
pub fn object_class(entry: &Record) -> (String, ObjectClass) {
    let category = get_str(entry, "objectCategory").unwrap_or_default();
    let short = category
        .split(',')
        .next()
        .unwrap_or_default()
        .rsplit('=')
        .next()
        .unwrap_or_default()
        .replace("Person", "User")
        .replace("-DNS", "");
    let class = match short.to_lowercase().as_str() {
        "user" => ObjectClass::User,
        "group" => ObjectClass::Group,
        "computer" => ObjectClass::Computer,
        "ms-ds-group-managed-service-account" => ObjectClass::Gmsa,
        "organizational-unit" => ObjectClass::Ou,
        "container" => ObjectClass::Container,
        "domain" => ObjectClass::Domain,
        "configuration" => ObjectClass::Configuration,
        "pki-certificate-template" => ObjectClass::CertTemplate,
        "pki-enrollment-service" => ObjectClass::EnrollmentService,
        "certification-authority" => ObjectClass::CertAuthority,
        "group-policy-container" => ObjectClass::Gpo,
        _ => ObjectClass::Unknown,
    };
    (short, class)
}

/// One translated right: who holds it, what it is, how it arrived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AceRow {
    #[serde(rename = "PrincipalSID")]
    pub principal_sid: String,
    #[serde(rename = "PrincipalType")]
    pub principal_type: String,
    #[serde(rename = "RightName")]
    pub right_name: String,
    #[serde(rename = "IsInherited")]
    pub is_inherited: bool,
}

/// Principals whose ACEs never translate to rights.
const CREATOR_SYSTEM_SIDS: &[&str] = &["S-1-3-0", "S-1-5-18", "S-1-5-10"];

const ALLOWED_ACE_TYPES: &[&str] = &["ACCESS_ALLOWED_OBJECT_ACE", "ACCESS_ALLOWED_ACE"];

/// Object-type names are matched with case and hyphens ignored, so the
/// built-in registry spellings and schema CN spellings both hit.
fn norm_type(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-')
        .collect::<String>()
        .to_lowercase()
}

fn type_in(ace: &DecodedAce, targets: &[&str]) -> bool {
    ace.control_object_type
        .as_deref()
        .map(norm_type)
        .is_some_and(|t| targets.contains(&t.as_str()))
}

const ALL_PROPERTIES: &str = "allproperties";
const MEMBER: &[&str] = &["member", ALL_PROPERTIES];
const ALLOWED_TO_ACT: &[&str] = &["msdsallowedtoactonbehalfofotheridentity", ALL_PROPERTIES];
const ACCOUNT_RESTRICTIONS: &[&str] = &["useraccountrestrictions", ALL_PROPERTIES];
const KEY_CREDENTIAL_LINK: &[&str] = &["msdskeycredentiallink", ALL_PROPERTIES];
const SERVICE_PRINCIPAL_NAME: &[&str] = &["serviceprincipalname", ALL_PROPERTIES];
const PKI_ENROLLMENT_FLAG: &[&str] = &["mspkienrollmentflag", ALL_PROPERTIES];
const PKI_NAME_FLAG: &[&str] = &["mspkicertificatenameflag", ALL_PROPERTIES];
const LAPS_PASSWORD: &[&str] = &["msmcsadmpwd", ALL_PROPERTIES];
const FORCE_CHANGE_PASSWORD: &[&str] = &["userforcechangepassword", ALL_PROPERTIES];
const GET_CHANGES: &[&str] = &["dsreplicationgetchanges", ALL_PROPERTIES];
const GET_CHANGES_ALL: &[&str] = &["dsreplicationgetchangesall", ALL_PROPERTIES];
const GET_CHANGES_FILTERED: &[&str] = &["dsreplicationgetchangesinfilteredset", ALL_PROPERTIES];
const ENROLLMENT: &[&str] = &[
    "certificateenrollment",
    "certificateautoenrollment",
    ALL_PROPERTIES,
];

pub struct AclTranslator<'a> {
    pub sids: &'a SidCatalog,
    /// Dotted FQDN of the first enumerated domain, uppercase. Principal
    /// SIDs outside `S-1-5-21-` are qualified with it.
    pub core_domain: &'a str,
}

impl AclTranslator<'_> {
    fn qualify_sid(&self, sid: &str) -> String {
        if sid.starts_with("S-1-5-21-") {
            sid.to_string()
        } else {
            format!("{}-{}", self.core_domain, sid)
        }
    }

    fn row(&self, sid: &str, right: &str, inherited: bool) -> AceRow {
        AceRow {
            principal_sid: self.qualify_sid(sid),
            principal_type: self.sids.principal_type(sid),
            right_name: right.to_string(),
            is_inherited: inherited,
        }
    }

    /// Translates an entry's decoded descriptors into rights rows.
    /// Callers only invoke this when `nTSecurityDescriptor` is present.
    pub fn translate(&self, entry: &Record) -> Vec<AceRow> {
        let mut out = Vec::new();

        // Every ACE of a readable msDS-GroupMSAMembership descriptor can
        // read the managed password.
        if let Some(gmsa) = get_ci(entry, "msDS-GroupMSAMembership")
            .and_then(|v| parse_descriptor(v))
        {
            for ace in gmsa.dacls.unwrap_or_default() {
                if CREATOR_SYSTEM_SIDS.contains(&ace.sid.as_str()) {
                    continue;
                }
                out.push(self.row(
                    &ace.sid,
                    "ReadGMSAPassword",
                    ace.has_flag("INHERITED_ACE"),
                ));
            }
        }

        let Some(sd) = get_ci(entry, "nTSecurityDescriptor").and_then(|v| parse_descriptor(v))
        else {
            return out;
        };

        let (class_name, class) = object_class(entry);
        let has_laps = get_ci(entry, "ms-Mcs-AdmPwdExpirationTime").is_some();

        if let Some(owner) = &sd.owner_sid {
            if !CREATOR_SYSTEM_SIDS.contains(&owner.as_str()) {
                out.push(self.row(owner, "Owns", false));
            }
        }

        for ace in sd.dacls.unwrap_or_default() {
            self.translate_ace(&ace, class, &class_name, has_laps, &mut out);
        }

        // The matrix can reach the same right through more than one rule
        // (LAPS reads under GENERIC_ALL also satisfy the read-property
        // rule); identical rows collapse.
        let mut seen = std::collections::HashSet::new();
        out.retain(|row| {
            seen.insert((
                row.principal_sid.clone(),
                row.right_name.clone(),
                row.is_inherited,
            ))
        });
        out
    }

    fn translate_ace(
        &self,
        ace: &DecodedAce,
        class: ObjectClass,
        class_name: &str,
        has_laps: bool,
        out: &mut Vec<AceRow>,
    ) {
        use ObjectClass::*;

        if CREATOR_SYSTEM_SIDS.contains(&ace.sid.as_str()) {
            return;
        }
        if !ALLOWED_ACE_TYPES.contains(&ace.ace_type.as_str()) {
            return;
        }
        if ace.has_flag("INHERIT_ONLY_ACE") && !ace.has_flag("INHERITED_ACE") {
            return;
        }

        let is_object = ace.ace_type == "ACCESS_ALLOWED_OBJECT_ACE";
        let inherited = ace.has_flag("INHERITED_ACE");
        let object_type_present = ace.has_data_flag("ACE_OBJECT_TYPE_PRESENT");

        // Inherited object ACEs that only apply to other classes.
        if is_object
            && inherited
            && ace.has_data_flag("ACE_INHERITED_OBJECT_TYPE_PRESENT")
            && !ace
                .inheritable_object_type
                .as_deref()
                .unwrap_or_default()
                .eq_ignore_ascii_case(class_name)
        {
            return;
        }

        let laps_read = class == Computer && has_laps && object_type_present
            && type_in(ace, LAPS_PASSWORD);

        if ace.has_priv("GENERIC_ALL") {
            if laps_read {
                out.push(self.row(&ace.sid, "ReadLAPSPassword", inherited));
            } else {
                out.push(self.row(&ace.sid, "GenericAll", inherited));
                return; // implies all other permissions
            }
        }

        let generic_write = (ace.has_priv("GENERIC_WRITE")
            && matches!(class, User | Group | Computer | Gpo | Gmsa))
            || (ace.has_priv("ADS_RIGHT_DS_WRITE_PROP")
                && matches!(class, User | Group | Computer | Gpo)
                && !object_type_present);
        let all_extended = ace.has_priv("ADS_RIGHT_DS_CONTROL_ACCESS")
            && matches!(class, User | Domain | Computer | Gmsa | CertTemplate)
            && (!object_type_present || type_in(ace, &[ALL_PROPERTIES]));

        if generic_write {
            out.push(self.row(&ace.sid, "GenericWrite", inherited));
        }
        if ace.has_priv("WRITE_DACL") {
            out.push(self.row(&ace.sid, "WriteDacl", inherited));
        }
        if ace.has_priv("WRITE_OWNER") {
            out.push(self.row(&ace.sid, "WriteOwner", inherited));
        }
        if all_extended {
            out.push(self.row(&ace.sid, "AllExtendedRights", inherited));
        }

        if object_type_present {
            if ace.has_priv("ADS_RIGHT_DS_WRITE_PROP") || generic_write {
                let targeted = match class {
                    Group if type_in(ace, MEMBER) => Some("AddMember"),
                    Computer if type_in(ace, ALLOWED_TO_ACT) => Some("AddAllowedToAct"),
                    Computer if type_in(ace, ACCOUNT_RESTRICTIONS) => {
                        Some("WriteAccountRestrictions")
                    }
                    Computer | User | Gmsa if type_in(ace, KEY_CREDENTIAL_LINK) => {
                        Some("AddKeyCredentialLink")
                    }
                    User if type_in(ace, SERVICE_PRINCIPAL_NAME) => Some("WriteSPN"),
                    CertTemplate if type_in(ace, PKI_ENROLLMENT_FLAG) => {
                        Some("WritePKIEnrollmentFlag")
                    }
                    CertTemplate if type_in(ace, PKI_NAME_FLAG) => Some("WritePKINameFlag"),
                    _ => None,
                };
                if let Some(right) = targeted {
                    out.push(self.row(&ace.sid, right, inherited));
                }
            }

            if ace.has_priv("ADS_RIGHT_DS_SELF") && class == Group && type_in(ace, MEMBER) {
                out.push(self.row(&ace.sid, "AddSelf", inherited));
            }

            if ace.has_priv("ADS_RIGHT_DS_READ_PROP") && laps_read {
                out.push(self.row(&ace.sid, "ReadLAPSPassword", inherited));
            }

            if ace.has_priv("ADS_RIGHT_DS_CONTROL_ACCESS") {
                if class == User && type_in(ace, FORCE_CHANGE_PASSWORD) {
                    out.push(self.row(&ace.sid, "ForceChangePassword", inherited));
                }
                if class == Domain {
                    if type_in(ace, GET_CHANGES) {
                        out.push(self.row(&ace.sid, "GetChanges", inherited));
                    }
                    if type_in(ace, GET_CHANGES_ALL) {
                        out.push(self.row(&ace.sid, "GetChangesAll", inherited));
                    }
                    if type_in(ace, GET_CHANGES_FILTERED) {
                        out.push(self.row(&ace.sid, "GetChangesInFilteredSet", inherited));
                    }
                }
                if matches!(class, EnrollmentService | CertTemplate) && type_in(ace, ENROLLMENT) {
                    out.push(self.row(&ace.sid, "Enroll", inherited));
                }
            }
        }

        if !is_object && class == EnrollmentService && ace.has_priv("GENERIC_WRITE") {
            out.push(self.row(&ace.sid, "ManageCA", inherited));
            if ace.has_priv("ADS_RIGHT_DS_DELETE_CHILD") {
                out.push(self.row(&ace.sid, "ManageCertificates", inherited));
            }
        }
    }
}

fn parse_descriptor(value: &Value) -> Option<DecodedSecurityDescriptor> {
    serde_json::from_value(value.clone()).ok()
}
