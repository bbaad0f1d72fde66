//! Schema partition collection: builds the display-name map used for
//! attribute pruning and extends the object-type registry with
//! `schemaIDGUID` mappings.

use std::collections::HashSet;

use serde_json::Value;

use crate::directory::{Directory, Pacer};
use crate::normalize::{get_str, Normalizer, Record};
use crate::secdesc::Guid;

/// The schema collection is limited to these attributes.
pub const SCHEMA_ATTRIBUTES: &[&str] = &[
    "adminDescription",
    "defaultSecurityDescriptor",
    "description",
    "name",
    "lDAPDisplayName",
    "mayContain",
    "mustContain",
    "objectClass",
    "schemaIDGUID",
    "systemMayContain",
    "systemMustContain",
];

pub struct SchemaCollection {
    pub entries: Vec<Record>,
    /// `schemaIDGUID` to `name` additions for the type registry.
    pub object_types: Vec<(String, String)>,
    /// Lowercase `lDAPDisplayName` values, for attribute pruning.
    pub display_names: HashSet<String>,
}

pub fn retrieve_schema<D: Directory>(
    directory: &mut D,
    page_size: i32,
    pacer: &Pacer,
    normalizer: &Normalizer,
) -> crate::Result<SchemaCollection> {
    log::info!("Querying schema from LDAP");
    let base = directory.server_info()?.schema_naming_context.clone();
    let attributes: Vec<String> = SCHEMA_ATTRIBUTES.iter().map(|a| a.to_string()).collect();
    let results = directory.search(
        &base,
        "(|(objectClass=classSchema)(objectClass=attributeSchema))",
        &attributes,
        page_size,
        pacer,
    )?;

    let mut entries = Vec::with_capacity(results.len());
    let mut object_types = Vec::new();
    let mut display_names = HashSet::new();
    for entry in results {
        // schemaIDGUID renders as a bare lowercase GUID here, unlike the
        // braced objectGUID form used elsewhere in the dump.
        let schema_guid = entry
            .bin_attrs
            .get("schemaIDGUID")
            .and_then(|v| v.first())
            .and_then(|raw| Guid::parse_bytes(raw).ok());
        let mut record = normalizer.normalize(entry);
        if let Some(guid) = schema_guid {
            record.insert(
                "schemaIDGUID".to_string(),
                Value::from(guid.to_string()),
            );
        }
        if let (Some(guid), Some(name)) =
            (get_str(&record, "schemaIDGUID"), get_str(&record, "name"))
        {
            object_types.push((guid.to_string(), name.to_string()));
        }
        if let Some(display_name) = get_str(&record, "lDAPDisplayName") {
            display_names.insert(display_name.to_lowercase());
        }
        entries.push(record);
    }
    Ok(SchemaCollection {
        entries,
        object_types,
        display_names,
    })
}
