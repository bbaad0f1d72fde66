//! Domain, OU, GPO and container shaping: policy links, trusts and the
//! container hierarchy.

use serde_json::{Map, Value};

use crate::normalize::{get_ci, get_str, get_str_list, Record};
use crate::registry::{lookup, FUNCTIONAL_LEVELS, TRUST_DIRECTION};

use super::common::{common_object, remove_properties, update_properties};
use super::GraphAssembler;

fn gpo_changes() -> Value {
    serde_json::json!({
        "LocalAdmins": [],
        "RemoteDesktopUsers": [],
        "DcomUsers": [],
        "PSRemoteUsers": [],
        "AffectedComputers": [],
    })
}

/// Parses `gPLink` into `{GUID, IsEnforced}` pairs through the GPO map.
/// Links whose GPO was not collected are dropped with a note.
fn gplinks(asm: &GraphAssembler<'_>, record: &Record) -> Value {
    let Some(raw) = get_str(record, "gPLink") else {
        return Value::from(Vec::<Value>::new());
    };
    let raw = raw.to_uppercase().replace("[LDAP://", "");
    let mut links = Vec::new();
    let mut missing = Vec::new();
    for part in raw.split(']').filter(|p| !p.is_empty()) {
        let (dn, flag) = part.split_once(';').unwrap_or((part, "0"));
        match asm.gpo_map.get(dn) {
            Some(guid) => {
                let enforced = flag.parse::<i64>() == Ok(1);
                links.push(serde_json::json!({"GUID": guid, "IsEnforced": enforced}));
            }
            None => missing.push(dn.to_string()),
        }
    }
    if !missing.is_empty() {
        log::debug!(
            "The following non existent GPOs were found linked to OU \"{}\": {}",
            get_str(record, "distinguishedName").unwrap_or_default(),
            missing.join(", ")
        );
    }
    Value::from(links)
}

pub fn map_domain(asm: &GraphAssembler<'_>, record: &Record) -> Map<String, Value> {
    let dn = get_str(record, "distinguishedName").unwrap_or_default();
    let domain_name = super::common::domain_from_dn(dn);
    let mut out = common_object(asm, record);
    out.insert("ChildObjects".to_string(), Value::from(Vec::<Value>::new()));
    out.insert("GPOChanges".to_string(), gpo_changes());
    out.insert("Links".to_string(), gplinks(asm, record));
    out.insert("Trusts".to_string(), Value::from(Vec::<Value>::new()));

    let functional_level = match get_ci(record, "msDS-Behavior-Version") {
        Some(value) => match value.as_i64().and_then(|v| lookup(FUNCTIONAL_LEVELS, v)) {
            Some(level) => Value::from(level),
            None => value.clone(),
        },
        None => Value::Null,
    };
    update_properties(
        &mut out,
        vec![
            (
                "domainsid",
                get_ci(record, "objectSid").cloned().unwrap_or(Value::Null),
            ),
            ("domain", Value::from(domain_name.clone())),
            ("name", Value::from(domain_name)),
            ("functionallevel", functional_level),
            ("whencreated", Value::from("")),
            ("collected", Value::from(true)),
        ],
    );
    remove_properties(&mut out, &["displayname"]);
    out
}

pub fn map_ou(asm: &GraphAssembler<'_>, record: &Record) -> Map<String, Value> {
    let dn = get_str(record, "distinguishedName").unwrap_or_default();
    let domain_name = super::common::domain_from_dn(dn);
    let mut out = common_object(asm, record);
    out.insert("ChildObjects".to_string(), Value::from(Vec::<Value>::new()));
    out.insert("GPOChanges".to_string(), gpo_changes());
    out.insert("Links".to_string(), gplinks(asm, record));

    let blocks_inheritance = get_ci(record, "gPOptions")
        .and_then(Value::as_i64)
        .unwrap_or(0)
        == 1;
    update_properties(
        &mut out,
        vec![
            ("domainsid", Value::from(asm.domain_sid_for(&domain_name))),
            ("blocksinheritance", Value::from(blocks_inheritance)),
        ],
    );
    remove_properties(&mut out, &["displayname"]);
    out
}

pub fn map_gpo(asm: &GraphAssembler<'_>, record: &Record) -> Map<String, Value> {
    let dn = get_str(record, "distinguishedName").unwrap_or_default();
    let domain_name = super::common::domain_from_dn(dn);
    let mut out = common_object(asm, record);
    update_properties(
        &mut out,
        vec![
            (
                "name",
                Value::from(format!(
                    "{}@{}",
                    get_str(record, "displayName").unwrap_or_default().to_uppercase(),
                    domain_name
                )),
            ),
            (
                "gpcpath",
                Value::from(
                    get_str(record, "gPCFileSysPath")
                        .unwrap_or_default()
                        .to_uppercase(),
                ),
            ),
            ("domainsid", Value::from(asm.domain_sid_for(&domain_name))),
        ],
    );
    out
}

pub fn map_container(asm: &GraphAssembler<'_>, record: &Record) -> Map<String, Value> {
    let dn = get_str(record, "distinguishedName").unwrap_or_default();
    let domain_name = super::common::domain_from_dn(dn);
    let mut out = common_object(asm, record);
    out.insert(
        "DomainSID".to_string(),
        Value::from(asm.domain_sid_for(&domain_name)),
    );
    out.insert("ChildObjects".to_string(), Value::from(Vec::<Value>::new()));
    update_properties(
        &mut out,
        vec![("domainsid", Value::from(asm.domain_sid_for(&domain_name)))],
    );
    remove_properties(&mut out, &["displayname", "whencreated", "description"]);
    out
}

/// Derives the trust type from the expanded trust-attribute flags.
fn trust_type(record: &Record) -> &'static str {
    let flags = get_str_list(record, "trustAttributesFlags");
    let has = |name: &str| flags.iter().any(|f| f == name);
    if has("WITHIN_FOREST") {
        "ParentChild"
    } else if has("FOREST_TRANSITIVE") {
        "Forest"
    } else {
        "External"
    }
}

fn title_case(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

pub fn map_trusted_domain(record: &Record) -> Value {
    let direction = get_ci(record, "trustDirection")
        .and_then(Value::as_i64)
        .and_then(|v| lookup(TRUST_DIRECTION, v))
        .map(title_case)
        .unwrap_or_default();
    serde_json::json!({
        "TargetDomainName": get_str(record, "trustPartner").unwrap_or_default().to_uppercase(),
        "TargetDomainSid": get_ci(record, "securityIdentifier").cloned().unwrap_or(Value::Null),
        "IsTransitive": get_ci(record, "transitive").cloned().unwrap_or(Value::Null),
        "TrustDirection": direction,
        "TrustType": trust_type(record),
        "SidFilteringEnabled": get_ci(record, "sidFiltering").cloned().unwrap_or(Value::Null),
    })
}
