//! Shaping shared by every graph category: the common property block,
//! container resolution and identifier handling.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::normalize::{get_ci, get_first, get_str, parse_timestamp, Record};

use super::GraphAssembler;

/// A typed object reference, the graph format's universal pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedRef {
    #[serde(rename = "ObjectIdentifier")]
    pub object_identifier: String,
    #[serde(rename = "ObjectType")]
    pub object_type: String,
}

impl TypedRef {
    pub fn new(object_identifier: String, object_type: String) -> Self {
        Self {
            object_identifier,
            object_type,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Dotted uppercase domain name from the DC components of a DN.
pub fn domain_from_dn(dn: &str) -> String {
    dn.split(',')
        .filter(|part| part.to_uppercase().starts_with("DC="))
        .map(|part| part[3..].to_uppercase())
        .collect::<Vec<_>>()
        .join(".")
}

/// Graph identifiers render GUIDs uppercase without braces.
pub fn strip_guid(guid: &str) -> String {
    guid.to_uppercase().replace(['{', '}'], "")
}

/// Identity of an entry: its SID, or its brace-stripped GUID.
pub fn entry_id(record: &Record) -> String {
    if let Some(sid) = get_str(record, "objectSid") {
        return sid.to_string();
    }
    get_str(record, "objectGUID")
        .map(strip_guid)
        .unwrap_or_default()
}

/// Timestamp attribute as a Unix epoch, whichever rendering the dump
/// used.
pub fn epoch_of(record: &Record, name: &str) -> Option<i64> {
    get_ci(record, name).and_then(parse_timestamp)
}

/// Same, floored at zero: never-set FILETIME values read as 0.
pub fn epoch_or_zero(record: &Record, name: &str) -> i64 {
    epoch_of(record, name).filter(|e| *e > 0).unwrap_or(0)
}

pub fn uac_flags(record: &Record) -> Vec<String> {
    crate::normalize::get_str_list(record, "userAccountControlFlags")
}

pub fn has_uac_flag(record: &Record, flag: &str) -> bool {
    uac_flags(record).iter().any(|f| f == flag)
}

/// The container reference an entry contributes to the parent map.
pub fn container_ref(record: &Record) -> TypedRef {
    let category = get_str(record, "objectCategory").unwrap_or_default();
    let object_type = if category.contains("Container") {
        "Container"
    } else if category.contains("Domain") {
        "Domain"
    } else if category.contains("Configuration") {
        "Configuration"
    } else {
        "OU"
    };
    TypedRef::new(entry_id(record), object_type.to_string())
}

/// `ContainedBy` resolution from the parent map, with the Builtin
/// container and direct domain parents special-cased.
pub fn contained_by(asm: &GraphAssembler<'_>, record: &Record) -> Value {
    if asm.parent_map.is_empty() {
        return Value::Null;
    }
    let dn = get_str(record, "distinguishedName").unwrap_or_default();
    let Some((_, parent)) = dn.split_once(',') else {
        return Value::Null;
    };
    if let Some(parent_ref) = asm.parent_map.get(parent) {
        return parent_ref.to_value();
    }
    if parent.starts_with("CN=Builtin,DC=") {
        return TypedRef::new("S-1-5-32".to_string(), "Base".to_string()).to_value();
    }
    if parent.starts_with("DC=") {
        return Value::Null;
    }
    log::debug!("No parent container object identifier found in collected data for {dn}");
    Value::Null
}

fn is_acl_protected(record: &Record) -> Value {
    get_ci(record, "nTSecurityDescriptor")
        .and_then(Value::as_object)
        .and_then(|sd| sd.get("IsACLProtected"))
        .cloned()
        .unwrap_or(Value::Null)
}

/// The common outer object and property block every category starts
/// from.
pub fn common_object(asm: &GraphAssembler<'_>, record: &Record) -> Map<String, Value> {
    let dn = get_str(record, "distinguishedName").unwrap_or_default();
    let domain_name = domain_from_dn(dn);
    if get_ci(record, "nTSecurityDescriptor").is_none() {
        log::debug!(
            "Record for \"{dn}\" is missing the security descriptor field, \
             ACLs and dependant information will not be available"
        );
    }

    let mut properties = Map::new();
    properties.insert(
        "name".to_string(),
        Value::from(format!(
            "{}@{}",
            get_str(record, "name").unwrap_or_default().to_uppercase(),
            domain_name
        )),
    );
    properties.insert("domain".to_string(), Value::from(domain_name));
    properties.insert(
        "distinguishedname".to_string(),
        Value::from(dn.to_uppercase()),
    );
    properties.insert(
        "displayname".to_string(),
        Value::from(
            get_str(record, "displayName")
                .unwrap_or_default()
                .to_uppercase(),
        ),
    );
    properties.insert(
        "domainsid".to_string(),
        Value::from(
            get_str(record, "objectSid")
                .map(crate::secdesc::Sid::domain_sid)
                .unwrap_or_default(),
        ),
    );
    properties.insert(
        "description".to_string(),
        get_first(record, "description").cloned().unwrap_or(Value::Null),
    );
    properties.insert(
        "whencreated".to_string(),
        epoch_of(record, "whenCreated")
            .map(Value::from)
            .unwrap_or(Value::Null),
    );
    properties.insert("isaclprotected".to_string(), is_acl_protected(record));

    let aces = if get_ci(record, "nTSecurityDescriptor").is_some() {
        serde_json::to_value(asm.translator().translate(record)).unwrap_or_else(|_| Value::from(Vec::<Value>::new()))
    } else {
        Value::from(Vec::<Value>::new())
    };

    let mut object = Map::new();
    object.insert("Properties".to_string(), Value::Object(properties));
    object.insert("IsACLProtected".to_string(), is_acl_protected(record));
    object.insert(
        "IsDeleted".to_string(),
        get_ci(record, "isDeleted").cloned().unwrap_or(Value::from(false)),
    );
    object.insert("ObjectIdentifier".to_string(), Value::from(entry_id(record)));
    object.insert("ContainedBy".to_string(), contained_by(asm, record));
    object.insert("Aces".to_string(), aces);
    object
}

/// Inserts or replaces entries in an object's property block.
pub fn update_properties(object: &mut Map<String, Value>, entries: Vec<(&str, Value)>) {
    let Some(properties) = object
        .get_mut("Properties")
        .and_then(Value::as_object_mut)
    else {
        return;
    };
    for (key, value) in entries {
        properties.insert(key.to_string(), value);
    }
}

pub fn remove_properties(object: &mut Map<String, Value>, keys: &[&str]) {
    if let Some(properties) = object.get_mut("Properties").and_then(Value::as_object_mut) {
        for key in keys {
            properties.remove(*key);
        }
    }
}
