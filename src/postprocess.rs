//! Cross-entity resolution pass, run once collection is complete and the
//! SID catalog and domain tables are fully populated: decodes the
//! descriptor-valued attributes in place and binds records to their
//! domain by SID prefix.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::normalize::{get_ci, Record, SECURITY_DESCRIPTOR_ATTRIBUTES};
use crate::registry::{SidCatalog, TypeRegistry};
use crate::secdesc::{DecodeContext, DecodedSecurityDescriptor, Sid};

pub struct PostProcessor<'a> {
    pub sids: &'a SidCatalog,
    pub types: &'a TypeRegistry,
    /// SID → dotted FQDN.
    pub domain_lt: &'a HashMap<String, String>,
    /// SID → NetBIOS name.
    pub domain_ltnb: &'a HashMap<String, String>,
}

pub fn unhexlify(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len() / 2)
        .map(|i| u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok())
        .collect()
}

impl<'a> PostProcessor<'a> {
    fn decode_context(&self) -> DecodeContext<'a> {
        DecodeContext {
            sids: self.sids,
            domain_netbios: self.domain_ltnb,
            types: self.types,
        }
    }

    /// Processes every category of a dump document in place. The `info`,
    /// `schema` and `meta` sections are passed through untouched.
    pub fn process_dump(&self, dump: &mut Map<String, Value>) {
        for (key, section) in dump.iter_mut() {
            if matches!(key.as_str(), "info" | "schema" | "meta") {
                continue;
            }
            let Some(records) = section.as_array_mut() else {
                continue;
            };
            let is_domains = key.contains("domains");
            for record in records.iter_mut() {
                if let Some(record) = record.as_object_mut() {
                    self.process_record(key, record, is_domains);
                }
            }
        }
    }

    fn process_record(&self, key: &str, record: &mut Record, is_domains: bool) {
        for sd_attr in SECURITY_DESCRIPTOR_ATTRIBUTES {
            let Some(existing) = get_ci(record, sd_attr) else {
                continue;
            };
            // Values already decoded (import mode) are left alone.
            if !existing.is_string() {
                continue;
            }
            let attr_key = record
                .keys()
                .find(|k| k.eq_ignore_ascii_case(sd_attr))
                .cloned()
                .unwrap_or_else(|| sd_attr.to_string());
            let hex = existing.as_str().unwrap_or_default().to_string();
            if hex.is_empty() {
                // delete empty entries added by explicitly requesting the attribute
                record.remove(&attr_key);
                continue;
            }
            let decoded = unhexlify(&hex)
                .ok_or(())
                .and_then(|raw| {
                    DecodedSecurityDescriptor::decode(&raw, &self.decode_context()).map_err(|e| {
                        log::debug!("Error parsing security descriptor in field {sd_attr} of {key}: {e}");
                    })
                })
                .ok();
            match decoded.and_then(|d| serde_json::to_value(d).ok()) {
                Some(value) => {
                    record.insert(attr_key, value);
                }
                None => {
                    record.insert(attr_key, Value::Object(Map::new()));
                }
            }
        }

        if !is_domains {
            if let Some(sid) = get_ci(record, "objectSid").and_then(Value::as_str) {
                let domain_sid = Sid::domain_sid(sid);
                if let Some(fqdn) = self.domain_lt.get(&domain_sid) {
                    record.insert("domain".to_string(), Value::from(fqdn.clone()));
                }
                if let Some(nb) = self.domain_ltnb.get(&domain_sid) {
                    record.insert("domainShort".to_string(), Value::from(nb.clone()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unhexlify() {
        assert_eq!(unhexlify("0a0b").unwrap(), vec![0x0a, 0x0b]);
        assert!(unhexlify("0a0").is_none());
        assert!(unhexlify("zz").is_none());
    }
}
