//! User, computer and group shaping, including the SPN and delegation
//! resolution that turns directory strings into computer references.

use serde_json::{Map, Value};

use crate::normalize::{get_ci, get_str, get_str_list, Record};
use crate::secdesc::Sid;

use super::common::{
    common_object, epoch_of, epoch_or_zero, has_uac_flag, remove_properties, update_properties,
    TypedRef,
};
use super::GraphAssembler;

/// Resolves `service/host[:port]` against the computer map. The port
/// defaults to the SQL Server port when absent or malformed.
fn parse_spn(asm: &GraphAssembler<'_>, spn: &str) -> Option<(String, u16)> {
    let rest = spn.split('/').nth(1)?;
    let mut parts = rest.split(':');
    let host = parts.next()?.to_lowercase();
    let port = parts
        .next()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(1433);
    let sid = asm
        .computer_map
        .iter()
        .find(|(key, _)| key.split(',').any(|part| part == host))
        .map(|(_, sid)| sid.clone());
    match sid {
        Some(sid) => Some((sid, port)),
        None => {
            log::debug!("Could not resolve SPN {spn} to a computer SID");
            None
        }
    }
}

/// SQL Server SPNs resolve into SQLAdmin targets; everything else is
/// dropped.
pub fn spn_target(asm: &GraphAssembler<'_>, spn: &str) -> Option<Value> {
    if !spn.to_lowercase().starts_with("mssqlsvc/") {
        return None;
    }
    let (sid, port) = parse_spn(asm, spn)?;
    Some(serde_json::json!({
        "ComputerSID": sid,
        "Port": port,
        "Service": "SQLAdmin",
    }))
}

fn spn_targets(asm: &GraphAssembler<'_>, record: &Record) -> Value {
    let targets: Vec<Value> = get_str_list(record, "servicePrincipalName")
        .iter()
        .filter_map(|spn| spn_target(asm, spn))
        .collect();
    Value::from(targets)
}

/// Constrained-delegation targets, only meaningful with protocol
/// transition enabled on the account.
fn allowed_to_delegate(asm: &GraphAssembler<'_>, record: &Record) -> Value {
    if !has_uac_flag(record, "TRUSTED_TO_AUTH_FOR_DELEGATION") {
        return Value::from(Vec::<Value>::new());
    }
    let mut refs: Vec<TypedRef> = Vec::new();
    for spn in get_str_list(record, "msDS-AllowedToDelegateTo") {
        let Some((sid, _)) = parse_spn(asm, &spn) else {
            continue;
        };
        if !refs.iter().any(|r| r.object_identifier == sid) {
            refs.push(TypedRef::new(sid, "Computer".to_string()));
        }
    }
    serde_json::to_value(refs).unwrap_or(Value::Null)
}

fn sid_history_refs(record: &Record, object_type: &str) -> Value {
    let refs: Vec<TypedRef> = get_str_list(record, "sIDHistory")
        .into_iter()
        .map(|sid| TypedRef::new(sid, object_type.to_string()))
        .collect();
    serde_json::to_value(refs).unwrap_or(Value::Null)
}

fn primary_group_sid(record: &Record) -> Value {
    let (Some(sid), Some(rid)) = (
        get_str(record, "objectSid"),
        get_ci(record, "primaryGroupID"),
    ) else {
        return Value::Null;
    };
    let rid = match rid {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return Value::Null,
    };
    Value::from(format!("{}-{rid}", Sid::domain_sid(sid)))
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0) != 0,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        _ => false,
    }
}

pub fn map_user(asm: &GraphAssembler<'_>, record: &Record) -> Map<String, Value> {
    let mut out = common_object(asm, record);
    out.insert("SPNTargets".to_string(), spn_targets(asm, record));
    out.insert("HasSIDHistory".to_string(), sid_history_refs(record, "User"));
    out.insert(
        "AllowedToDelegate".to_string(),
        allowed_to_delegate(asm, record),
    );
    out.insert("PrimaryGroupSID".to_string(), primary_group_sid(record));

    let spns = get_str_list(record, "servicePrincipalName");
    let mut updates = vec![
        (
            "displayname",
            get_ci(record, "displayName").cloned().unwrap_or(Value::Null),
        ),
        ("email", get_ci(record, "mail").cloned().unwrap_or(Value::Null)),
        (
            "homedirectory",
            get_ci(record, "homeDirectory").cloned().unwrap_or(Value::from("")),
        ),
        (
            "lastlogontimestamp",
            Value::from(epoch_of(record, "lastLogonTimestamp").unwrap_or(-1)),
        ),
        ("lastlogon", Value::from(epoch_or_zero(record, "lastLogon"))),
        ("pwdlastset", Value::from(epoch_or_zero(record, "pwdLastSet"))),
        ("admincount", Value::from(truthy(get_ci(record, "adminCount")))),
        ("sensitive", Value::from(has_uac_flag(record, "NOT_DELEGATED"))),
        (
            "dontreqpreauth",
            Value::from(has_uac_flag(record, "DONT_REQ_PREAUTH")),
        ),
        (
            "passwordnotreqd",
            Value::from(has_uac_flag(record, "PASSWD_NOTREQD")),
        ),
        (
            "unconstraineddelegation",
            Value::from(has_uac_flag(record, "TRUSTED_FOR_DELEGATION")),
        ),
        (
            "pwdneverexpires",
            Value::from(has_uac_flag(record, "DONT_EXPIRE_PASSWORD")),
        ),
        ("enabled", Value::from(!has_uac_flag(record, "ACCOUNTDISABLE"))),
        (
            "trustedtoauth",
            Value::from(has_uac_flag(record, "TRUSTED_TO_AUTH_FOR_DELEGATION")),
        ),
        ("serviceprincipalnames", Value::from(spns.clone())),
        ("hasspn", Value::from(!spns.is_empty())),
        (
            "unixpassword",
            get_ci(record, "unixUserPassword").cloned().unwrap_or(Value::Null),
        ),
        (
            "unicodepassword",
            get_ci(record, "unicodePwd").cloned().unwrap_or(Value::Null),
        ),
        (
            "userpassword",
            get_ci(record, "userPassword").cloned().unwrap_or(Value::Null),
        ),
        (
            "sfupassword",
            get_ci(record, "msSFU30Password").cloned().unwrap_or(Value::Null),
        ),
        (
            "logonscript",
            get_ci(record, "scriptPath").cloned().unwrap_or(Value::Null),
        ),
        (
            "samaccountname",
            get_ci(record, "sAMAccountName").cloned().unwrap_or(Value::Null),
        ),
        (
            "sidhistory",
            Value::from(get_str_list(record, "sIDHistory")),
        ),
        ("title", get_ci(record, "title").cloned().unwrap_or(Value::Null)),
    ];
    let (_, class) = crate::acl::object_class(record);
    if class == crate::acl::ObjectClass::Gmsa {
        updates.push(("gmsa", Value::from(true)));
    }
    update_properties(&mut out, updates);
    out
}

fn allowed_to_act(asm: &GraphAssembler<'_>, record: &Record) -> Value {
    let mut refs: Vec<TypedRef> = Vec::new();
    if let Some(dacls) = get_ci(record, "msDS-AllowedToActOnBehalfOfOtherIdentity")
        .and_then(Value::as_object)
        .and_then(|sd| sd.get("Dacls"))
        .and_then(Value::as_array)
    {
        for ace in dacls {
            let Some(sid) = ace.get("Sid").and_then(Value::as_str) else {
                continue;
            };
            if let Some(found) = asm
                .member_map
                .values()
                .find(|r| r.object_identifier == sid)
            {
                refs.push(found.clone());
            }
        }
    }
    serde_json::to_value(refs).unwrap_or(Value::Null)
}

pub fn map_computer(asm: &GraphAssembler<'_>, record: &Record) -> Map<String, Value> {
    let mut out = common_object(asm, record);
    let is_dc = has_uac_flag(record, "SERVER_TRUST_ACCOUNT");
    out.insert("PrimaryGroupSID".to_string(), primary_group_sid(record));
    out.insert(
        "HasSIDHistory".to_string(),
        sid_history_refs(record, "Computer"),
    );
    out.insert(
        "AllowedToDelegate".to_string(),
        allowed_to_delegate(asm, record),
    );
    out.insert("SPNTargets".to_string(), spn_targets(asm, record));
    for local in ["DcomUsers", "LocalAdmins", "PSRemoteUsers", "RemoteDesktopUsers"] {
        // local group membership cannot be collected over LDAP
        out.insert(local.to_string(), Value::from(Vec::<Value>::new()));
    }
    for session in ["Sessions", "PrivilegedSessions", "RegistrySessions"] {
        out.insert(
            session.to_string(),
            serde_json::json!({"Results": [], "Collected": false, "FailureReason": null}),
        );
    }
    out.insert("Status".to_string(), Value::Null);
    out.insert("AllowedToAct".to_string(), allowed_to_act(asm, record));
    out.insert("IsDC".to_string(), Value::from(is_dc));
    out.insert("DumpSMSAPassword".to_string(), Value::from(Vec::<Value>::new()));
    out.insert("LocalGroups".to_string(), Value::from(Vec::<Value>::new()));
    out.insert("UserRights".to_string(), Value::from(Vec::<Value>::new()));
    out.insert(
        "DomainSID".to_string(),
        Value::from(
            get_str(record, "objectSid")
                .map(Sid::domain_sid)
                .unwrap_or_default(),
        ),
    );
    out.insert(
        "DCRegistryData".to_string(),
        serde_json::json!({
            "CertificateMappingMethods": null,
            "StrongCertificateBindingEnforcement": null,
        }),
    );

    let updates = vec![
        ("email", get_ci(record, "mail").cloned().unwrap_or(Value::Null)),
        ("isdc", Value::from(is_dc)),
        (
            "lastlogontimestamp",
            Value::from(epoch_of(record, "lastLogonTimestamp").unwrap_or(-1)),
        ),
        ("lastlogon", Value::from(epoch_or_zero(record, "lastLogon"))),
        (
            "operatingsystem",
            get_ci(record, "operatingSystem").cloned().unwrap_or(Value::Null),
        ),
        ("pwdlastset", Value::from(epoch_or_zero(record, "pwdLastSet"))),
        (
            "name",
            Value::from(format!(
                "{}.{}",
                get_str(record, "name").unwrap_or_default(),
                get_str(record, "domain").unwrap_or_default().to_uppercase()
            )),
        ),
        (
            "haslaps",
            Value::from(get_ci(record, "ms-Mcs-AdmPwdExpirationTime").is_some()),
        ),
        (
            "serviceprincipalnames",
            Value::from(get_str_list(record, "servicePrincipalName")),
        ),
        (
            "unconstraineddelegation",
            Value::from(has_uac_flag(record, "TRUSTED_FOR_DELEGATION")),
        ),
        (
            "trustedtoauth",
            Value::from(has_uac_flag(record, "TRUSTED_TO_AUTH_FOR_DELEGATION")),
        ),
        (
            "samaccountname",
            get_ci(record, "sAMAccountName").cloned().unwrap_or(Value::Null),
        ),
        (
            "sidhistory",
            Value::from(get_str_list(record, "sIDHistory")),
        ),
        ("enabled", Value::from(!has_uac_flag(record, "ACCOUNTDISABLE"))),
    ];
    update_properties(&mut out, updates);
    remove_properties(&mut out, &["displayname"]);
    out
}

fn group_members(asm: &GraphAssembler<'_>, record: &Record) -> Value {
    let mut members = Vec::new();
    for member in get_str_list(record, "member") {
        if let Some(found) = asm.member_map.get(&member) {
            members.push(found.to_value());
        } else if member.contains("ForeignSecurityPrincipals") {
            let rid = member
                .split(',')
                .next()
                .unwrap_or_default()
                .rsplit('=')
                .next()
                .unwrap_or_default();
            members.push(
                TypedRef::new(asm.qualify_sid(rid), "Group".to_string()).to_value(),
            );
        } else {
            log::debug!("Group member {member} could not be mapped to an object type");
            members.push(TypedRef::new(member, "Unknown".to_string()).to_value());
        }
    }
    Value::from(members)
}

pub fn map_group(asm: &GraphAssembler<'_>, record: &Record) -> Map<String, Value> {
    let dn = get_str(record, "distinguishedName").unwrap_or_default();
    let domain_name = super::common::domain_from_dn(dn);
    let mut out = common_object(asm, record);
    out.insert("Members".to_string(), group_members(asm, record));
    if let Some(sid) = get_str(record, "objectSid") {
        out.insert(
            "ObjectIdentifier".to_string(),
            Value::from(asm.qualify_sid(sid)),
        );
    }
    update_properties(
        &mut out,
        vec![
            ("admincount", Value::from(truthy(get_ci(record, "adminCount")))),
            ("domainsid", Value::from(asm.domain_sid_for(&domain_name))),
            (
                "samaccountname",
                get_ci(record, "sAMAccountName").cloned().unwrap_or(Value::Null),
            ),
        ],
    );
    remove_properties(&mut out, &["displayname"]);
    out
}
