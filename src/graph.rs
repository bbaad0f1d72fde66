//! Assembly of the per-category attack-graph ingest files from a
//! completed dump.

pub mod common;
pub mod pki;
pub mod principals;
pub mod structure;

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::acl::{object_class, AclTranslator};
use crate::dump::Dump;
use crate::normalize::{get_str, Record};
use crate::registry::collection_methods;
use crate::registry::SidCatalog;

pub use common::TypedRef;

/// Categories converted into graph files, in emission order.
const PARSE_CATEGORIES: &[&str] = &[
    "certauthorities",
    "certenrollservices",
    "certtemplates",
    "containers",
    "computers",
    "domains",
    "gpos",
    "groups",
    "ous",
    "users",
];

/// The certificate-authority parent containers that split the
/// `certauthorities` records into their graph categories.
const CA_CATEGORIES: &[(&str, &str)] = &[
    (
        "aiacas",
        "CN=AIA,CN=PUBLIC KEY SERVICES,CN=SERVICES,CN=CONFIGURATION",
    ),
    ("ntauthstores", "CN=PUBLIC KEY SERVICES,CN=SERVICES,CN=CONFIGURATION"),
    (
        "rootcas",
        "CN=CERTIFICATION AUTHORITIES,CN=PUBLIC KEY SERVICES,CN=SERVICES,CN=CONFIGURATION",
    ),
];

#[derive(Debug, Clone, Serialize)]
struct GraphMeta {
    methods: u32,
    #[serde(rename = "type")]
    category: String,
    count: usize,
    version: u32,
}

#[derive(Debug, Clone, Serialize)]
struct GraphFile {
    data: Vec<Value>,
    meta: GraphMeta,
}

/// Frozen cross-reference state for graph assembly, rebuilt from the
/// dump so that imported files convert identically to fresh runs.
pub struct GraphAssembler<'a> {
    dump: &'a Dump,
    pub sids: SidCatalog,
    /// Domain SID to dotted FQDN.
    pub domain_lt: HashMap<String, String>,
    /// Dotted FQDN back to domain SID.
    pub domain_sids: HashMap<String, String>,
    /// FQDN of the first enumerated domain, uppercase.
    pub core_domain: String,
    /// `dnshostname,name` (lowercase) to computer SID.
    pub computer_map: HashMap<String, String>,
    /// Principal DN to typed reference.
    pub member_map: HashMap<String, TypedRef>,
    /// Parent DN to container reference.
    pub parent_map: HashMap<String, TypedRef>,
    /// GPO DN (uppercase) to brace-stripped GUID.
    pub gpo_map: HashMap<String, String>,
    /// Certificate template name to typed reference.
    pub cert_template_map: HashMap<String, TypedRef>,
    methods: u32,
}

impl<'a> GraphAssembler<'a> {
    pub fn from_dump(dump: &'a Dump) -> Self {
        let mut sids = SidCatalog::new();
        for key in ["users", "groups", "computers"] {
            for record in dump.records(key) {
                let (Some(sid), Some(sam)) = (
                    get_str(record, "objectSid"),
                    get_str(record, "sAMAccountName"),
                ) else {
                    continue;
                };
                if get_str(record, "objectCategory").is_none() {
                    continue;
                }
                let (class_name, _) = object_class(record);
                sids.insert(sid.to_string(), sam.to_string(), class_name);
            }
        }

        let mut domain_lt = HashMap::new();
        let mut domain_sids = HashMap::new();
        for record in dump.records("domains") {
            let (Some(sid), Some(dn)) = (
                get_str(record, "objectSid"),
                get_str(record, "distinguishedName"),
            ) else {
                continue;
            };
            let fqdn = dn
                .split(',')
                .filter_map(|part| part.split('=').nth(1))
                .collect::<Vec<_>>()
                .join(".")
                .to_uppercase();
            domain_lt.insert(sid.to_string(), fqdn.clone());
            domain_sids.insert(fqdn, sid.to_string());
        }

        let core_domain = dump
            .records("domains")
            .first()
            .and_then(|r| get_str(r, "distinguishedName"))
            .map(common::domain_from_dn)
            .unwrap_or_default();
        if core_domain.is_empty() {
            log::info!("No domain info in dump file, this conversion is probably going to fail...");
        }

        let mut computer_map = HashMap::new();
        for record in dump.records("computers") {
            let Some(sid) = get_str(record, "objectSid") else {
                continue;
            };
            let key = format!(
                "{},{}",
                get_str(record, "dNSHostName").unwrap_or_default().to_lowercase(),
                get_str(record, "name").unwrap_or_default().to_lowercase()
            );
            computer_map.insert(key, sid.to_string());
        }

        let mut member_map = HashMap::new();
        for key in ["users", "groups", "computers"] {
            for record in dump.records(key) {
                let (Some(dn), Some(sid)) = (
                    get_str(record, "distinguishedName"),
                    get_str(record, "objectSid"),
                ) else {
                    continue;
                };
                let category = get_str(record, "objectCategory").unwrap_or_default();
                let short = category
                    .split(',')
                    .next()
                    .unwrap_or_default()
                    .rsplit('=')
                    .next()
                    .unwrap_or_default();
                let object_type = if short == "Person" { "User" } else { short };
                member_map.insert(
                    dn.to_string(),
                    TypedRef::new(sid.to_string(), object_type.to_string()),
                );
            }
        }

        let mut parent_map = HashMap::new();
        for key in ["domains", "containers", "ous"] {
            for record in dump.records(key) {
                let Some(dn) = get_str(record, "distinguishedName") else {
                    continue;
                };
                parent_map.insert(dn.to_string(), common::container_ref(record));
            }
        }

        let mut gpo_map = HashMap::new();
        for record in dump.records("gpos") {
            let (Some(dn), Some(guid)) = (
                get_str(record, "distinguishedName"),
                get_str(record, "objectGUID"),
            ) else {
                continue;
            };
            gpo_map.insert(dn.to_uppercase(), common::strip_guid(guid));
        }

        let mut cert_template_map = HashMap::new();
        for record in dump.records("certtemplates") {
            let (Some(name), Some(guid)) =
                (get_str(record, "name"), get_str(record, "objectGUID"))
            else {
                continue;
            };
            cert_template_map.insert(
                name.to_string(),
                TypedRef::new(common::strip_guid(guid), "CertTemplate".to_string()),
            );
        }

        let mut methods = collection_methods::ACL
            | collection_methods::OBJECT_PROPS
            | collection_methods::TRUSTS
            | collection_methods::USER_RIGHTS;
        if dump.contains("containers") {
            methods |= collection_methods::CONTAINER;
        }
        if dump.contains("groups") {
            methods |= collection_methods::GROUP;
        }
        if dump.sections().keys().any(|k| k.starts_with("cert")) {
            methods |= collection_methods::CERT_SERVICES;
        }

        Self {
            dump,
            sids,
            domain_lt,
            domain_sids,
            core_domain,
            computer_map,
            member_map,
            parent_map,
            gpo_map,
            cert_template_map,
            methods,
        }
    }

    pub fn translator(&self) -> AclTranslator<'_> {
        AclTranslator {
            sids: &self.sids,
            core_domain: &self.core_domain,
        }
    }

    /// Qualifies a SID outside `S-1-5-21-` with the core domain name.
    pub fn qualify_sid(&self, sid: &str) -> String {
        if sid.starts_with("S-1-5-21-") {
            sid.to_string()
        } else {
            format!("{}-{}", self.core_domain, sid)
        }
    }

    /// Reverse domain lookup: dotted FQDN to its SID, empty when the
    /// domain was not enumerated.
    pub fn domain_sid_for(&self, fqdn: &str) -> String {
        self.domain_sids.get(fqdn).cloned().unwrap_or_default()
    }

    /// Writes every graph file, returning the paths written.
    pub fn convert(
        &self,
        out_dir: &Path,
        filename_base: &str,
        timestamp: &str,
    ) -> crate::Result<Vec<PathBuf>> {
        log::info!("Processing data into graph ingest format");
        let mut written = Vec::new();
        for key in PARSE_CATEGORIES {
            if !self.dump.contains(key) {
                continue;
            }
            if *key == "certauthorities" {
                for (category, parent_prefix) in CA_CATEGORIES {
                    let records: Vec<&Record> = self
                        .dump
                        .records(key)
                        .into_iter()
                        .filter(|r| {
                            get_str(r, "distinguishedName")
                                .and_then(|dn| dn.split_once(','))
                                .map(|(_, parent)| {
                                    parent.to_uppercase().starts_with(parent_prefix)
                                })
                                .unwrap_or(false)
                        })
                        .collect();
                    written.push(self.write_category(
                        category,
                        &records,
                        out_dir,
                        filename_base,
                        timestamp,
                    )?);
                }
            } else {
                let category = if *key == "certenrollservices" {
                    "enterprisecas"
                } else {
                    *key
                };
                let records = self.dump.records(key);
                written.push(self.write_category(
                    category,
                    &records,
                    out_dir,
                    filename_base,
                    timestamp,
                )?);
            }
        }
        Ok(written)
    }

    fn write_category(
        &self,
        category: &str,
        records: &[&Record],
        out_dir: &Path,
        filename_base: &str,
        timestamp: &str,
    ) -> crate::Result<PathBuf> {
        log::info!("Generating graph {category} file");
        let mut data: Vec<Value> = records
            .iter()
            .map(|record| self.map_record(category, record))
            .collect();

        // Trust edges ride on the first domain record.
        if category == "domains" {
            if let Some(first) = data.first_mut().and_then(Value::as_object_mut) {
                let trusts: Vec<Value> = self
                    .dump
                    .records("trusted_domains")
                    .into_iter()
                    .map(|r| structure::map_trusted_domain(r))
                    .collect();
                first.insert("Trusts".to_string(), Value::from(trusts));
            }
        }

        let file = GraphFile {
            meta: GraphMeta {
                methods: self.methods,
                category: category.to_string(),
                count: data.len(),
                version: 6,
            },
            data,
        };

        let prefix = if filename_base.is_empty() {
            String::new()
        } else {
            format!("{filename_base}_")
        };
        let path = out_dir.join(format!("{prefix}{timestamp}_{category}.json"));
        log::debug!("Writing graph {category} output to: {}", path.display());
        let out = std::fs::File::create(&path)?;
        let mut writer = std::io::BufWriter::new(out);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
        file.serialize(&mut serializer)?;
        writer.flush()?;
        Ok(path)
    }

    fn map_record(&self, category: &str, record: &Record) -> Value {
        let object = match category {
            "users" => principals::map_user(self, record),
            "computers" => principals::map_computer(self, record),
            "groups" => principals::map_group(self, record),
            "domains" => structure::map_domain(self, record),
            "ous" => structure::map_ou(self, record),
            "gpos" => structure::map_gpo(self, record),
            "containers" => structure::map_container(self, record),
            "certtemplates" => pki::map_certtemplate(self, record),
            "enterprisecas" => pki::map_enterpriseca(self, record),
            "aiacas" => pki::map_aiaca(self, record),
            "ntauthstores" => pki::map_ntauthstore(self, record),
            "rootcas" => pki::map_rootca(self, record),
            other => {
                log::debug!("No graph mapping for category {other}");
                Map::new()
            }
        };
        Value::Object(object)
    }
}
