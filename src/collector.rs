//! The enumeration pipeline: method registry, paged retrieval with
//! pacing, cross-method state and dump assembly.

pub mod config;
pub mod methods;
pub mod schema;

pub use config::QueryConfig;
pub use methods::Method;

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use crate::acl::object_class;
use crate::directory::{Directory, Pacer};
use crate::normalize::{get_ci, get_str, Normalizer, Record};
use crate::postprocess::PostProcessor;
use crate::registry::{expand_flags, SidCatalog, TypeRegistry, CA_FLAGS};

/// Attributes required by cross-method state; always re-added to
/// user-supplied attribute lists.
pub const MINIMUM_ATTRIBUTES: &[&str] = &["objectSid", "distinguishedName", "name"];

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Methods to run, in registry order.
    pub methods: Vec<Method>,
    /// Seconds to sleep between pages and between methods.
    pub delay: u64,
    /// Upper bound of the random jitter added to each sleep.
    pub jitter: u64,
    pub page_size: i32,
    pub query_config: Option<QueryConfig>,
    /// Request every attribute (`*`) instead of the per-method sets.
    pub all_attributes: bool,
    /// Global attribute list override.
    pub attributes: Option<Vec<String>>,
    /// Emit Unix epochs instead of rendered timestamps.
    pub timestamp_mode: bool,
    /// Keep `<name>_raw` hex fields next to decoded binary values.
    pub raw: bool,
    pub no_schema: bool,
    pub only_schema: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            methods: Method::all().to_vec(),
            delay: 0,
            jitter: 0,
            page_size: 500,
            query_config: None,
            all_attributes: false,
            attributes: None,
            timestamp_mode: false,
            raw: true,
            no_schema: false,
            only_schema: false,
        }
    }
}

pub struct Collector<D: Directory> {
    directory: D,
    config: CollectorConfig,
    normalizer: Normalizer,
    pacer: Pacer,
    types: TypeRegistry,
    sids: SidCatalog,
    schema: Vec<Record>,
    schema_attributes: HashSet<String>,
    domain_lt: HashMap<String, String>,
    domain_ltnb: HashMap<String, String>,
    config_containers_collected: bool,
    username: String,
}

impl<D: Directory> Collector<D> {
    pub fn new(directory: D, config: CollectorConfig, username: String) -> Self {
        let normalizer = Normalizer::new(config.timestamp_mode, config.raw);
        let pacer = Pacer::new(config.delay, config.jitter);
        Self {
            directory,
            config,
            normalizer,
            pacer,
            types: TypeRegistry::new(),
            sids: SidCatalog::new(),
            schema: Vec::new(),
            schema_attributes: HashSet::new(),
            domain_lt: HashMap::new(),
            domain_ltnb: HashMap::new(),
            config_containers_collected: false,
            username,
        }
    }

    /// Runs the full enumeration: optional schema load, every requested
    /// method in registry order with pacing, then post-processing.
    pub fn run(&mut self) -> crate::Result<crate::Dump> {
        let start_time = crate::dump::generate_timestamp();
        let mut out: Map<String, Value> = Map::new();

        if !self.config.no_schema {
            match self.retrieve_schema() {
                Ok(()) => {
                    out.insert(
                        "schema".to_string(),
                        Value::from(
                            self.schema.iter().cloned().map(Value::Object).collect::<Vec<_>>(),
                        ),
                    );
                }
                Err(e) => log::warn!("Schema collection failed, continuing without it: {e}"),
            }
        }

        if !self.config.only_schema {
            let methods = self.config.methods.clone();
            for method in methods {
                self.pacer.pause("between queries");
                if method == Method::Info {
                    log::info!("Querying server information from LDAP");
                    let info = self.directory.server_info()?.attributes.clone();
                    out.insert("info".to_string(), Value::Object(info));
                    continue;
                }
                match self.run_method(method) {
                    Ok(records) => {
                        let values: Vec<Value> =
                            records.into_iter().map(Value::Object).collect();
                        out.entry(method.name().to_string())
                            .or_insert_with(|| Value::Array(Vec::new()))
                            .as_array_mut()
                            .expect("method sections are arrays")
                            .extend(values);
                    }
                    Err(e) => {
                        log::warn!("Query method {} failed: {e}", method.name());
                        continue;
                    }
                }
                // PKI objects live under the configuration partition;
                // fetch its containers once so they can be linked.
                if method.is_cert_method()
                    && !out[method.name()].as_array().map(Vec::is_empty).unwrap_or(true)
                {
                    if let Ok(containers) = self.collect_config_containers() {
                        if !containers.is_empty() {
                            out.entry("containers".to_string())
                                .or_insert_with(|| Value::Array(Vec::new()))
                                .as_array_mut()
                                .expect("containers section is an array")
                                .extend(containers.into_iter().map(Value::Object));
                        }
                    }
                }
            }
        }

        let whoami = self
            .directory
            .whoami()
            .unwrap_or_else(|e| format!("Exception determining connected user: {e}"));
        let method_names: Vec<Value> = out
            .keys()
            .filter(|k| *k != "schema")
            .map(|k| Value::from(k.clone()))
            .collect();
        let meta = serde_json::json!({
            "start_time": start_time,
            "end_time": crate::dump::generate_timestamp(),
            "username": self.username,
            "whoami": whoami,
            "server": self.directory.server_name(),
            "methods": method_names,
            "sid_lookup": self.sids.entries(),
        });
        out.insert("meta".to_string(), meta);

        log::info!("Data collection complete, processing...");
        self.post_process(&mut out);
        Ok(crate::Dump::new(out))
    }

    /// Runs a single user-supplied filter instead of the registry.
    pub fn run_custom_query(
        &mut self,
        query: &str,
        attributes: Option<Vec<String>>,
    ) -> crate::Result<crate::Dump> {
        let start_time = crate::dump::generate_timestamp();
        log::info!("Running custom query against LDAP");
        log::debug!("Query: {query}");
        let root = self.directory.server_info()?.default_naming_context.clone();
        let attrs = attributes.unwrap_or_else(|| vec!["*".to_string()]);
        let entries =
            self.directory
                .search(&root, query, &attrs, self.config.page_size, &self.pacer)?;
        let records: Vec<Value> = entries
            .into_iter()
            .map(|e| Value::Object(self.normalizer.normalize(e)))
            .collect();

        let whoami = self
            .directory
            .whoami()
            .unwrap_or_else(|e| format!("Exception determining connected user: {e}"));
        let mut out = Map::new();
        out.insert("custom_query_results".to_string(), Value::from(records));
        out.insert(
            "meta".to_string(),
            serde_json::json!({
                "custom_query": query,
                "start_time": start_time,
                "end_time": crate::dump::generate_timestamp(),
                "username": self.username,
                "whoami": whoami,
                "server": self.directory.server_name(),
            }),
        );

        // The domain tables feed post-processing; collect them if the
        // custom query did not.
        if self.domain_lt.is_empty() {
            log::info!("Domain data not collected - collecting domain info...");
            if let Err(e) = self.run_method(Method::Domains) {
                log::debug!("Domain lookup collection failed: {e}");
            }
        }
        self.post_process(&mut out);
        Ok(crate::Dump::new(out))
    }

    fn post_process(&self, out: &mut Map<String, Value>) {
        let processor = PostProcessor {
            sids: &self.sids,
            types: &self.types,
            domain_lt: &self.domain_lt,
            domain_ltnb: &self.domain_ltnb,
        };
        processor.process_dump(out);
    }

    fn run_method(&mut self, method: Method) -> crate::Result<Vec<Record>> {
        log::info!("Querying {} objects from LDAP", method.name());
        let info = self.directory.server_info()?;
        let base = if method.uses_configuration_context() {
            info.configuration_naming_context.clone()
        } else {
            info.default_naming_context.clone()
        };
        let (filter, attributes) = self.configure_query(method.name(), method.filter(), {
            if self.config.all_attributes {
                vec!["*".to_string()]
            } else if let Some(global) = &self.config.attributes {
                with_minimum_attributes(global.clone())
            } else {
                method.attributes()
            }
        });

        let entries =
            self.directory
                .search(&base, &filter, &attributes, self.config.page_size, &self.pacer)?;
        let mut records: Vec<Record> = entries
            .into_iter()
            .map(|e| self.normalizer.normalize(e))
            .collect();

        match method {
            Method::Users | Method::Groups | Method::Computers => self.update_sid_catalog(&records),
            Method::Domains => self.update_domain_tables(&records),
            Method::TrustedDomains => derive_trust_properties(&mut records),
            Method::CertEnrollServices => decode_ca_flags(&mut records),
            _ => {}
        }
        Ok(records)
    }

    fn collect_config_containers(&mut self) -> crate::Result<Vec<Record>> {
        if self.config_containers_collected
            || !self.config.methods.contains(&Method::Containers)
        {
            return Ok(Vec::new());
        }
        log::info!("Querying configuration container objects from LDAP");
        let base = self
            .directory
            .server_info()?
            .configuration_naming_context
            .clone();
        let (filter, attributes) = self.configure_query(
            "containers",
            "(|(objectClass=container)(objectClass=configuration))",
            Method::Containers.attributes(),
        );
        let entries =
            self.directory
                .search(&base, &filter, &attributes, self.config.page_size, &self.pacer)?;
        self.config_containers_collected = true;
        Ok(entries
            .into_iter()
            .map(|e| self.normalizer.normalize(e))
            .collect())
    }

    /// Applies per-method config overrides and schema-aware pruning.
    fn configure_query(
        &self,
        method_name: &str,
        filter: &str,
        attributes: Vec<String>,
    ) -> (String, Vec<String>) {
        let mut filter = filter.to_string();
        let mut attributes = attributes;
        if let Some(overrides) = self
            .config
            .query_config
            .as_ref()
            .and_then(|c| c.get(method_name))
        {
            if let Some(query) = &overrides.query {
                log::debug!("Query override for method \"{method_name}\" from config file: {query}");
                filter = query.clone();
            }
            if let Some(attrs) = &overrides.attributes {
                log::debug!(
                    "Attributes override for method \"{method_name}\" from config file: {}",
                    attrs.join(",")
                );
                attributes = with_minimum_attributes(attrs.clone());
            }
        }
        if !self.schema_attributes.is_empty() && !attributes.iter().any(|a| a == "*") {
            let (present, removed): (Vec<String>, Vec<String>) = attributes
                .into_iter()
                .partition(|a| self.schema_attributes.contains(&a.to_lowercase()));
            if !removed.is_empty() {
                log::debug!(
                    "Removing the following attributes from {method_name} query that were not present in schema: {}",
                    removed.join(", ")
                );
            }
            attributes = present;
        }
        (filter, attributes)
    }

    fn retrieve_schema(&mut self) -> crate::Result<()> {
        let collected = schema::retrieve_schema(
            &mut self.directory,
            self.config.page_size,
            &self.pacer,
            &self.normalizer,
        )?;
        for (guid, name) in collected.object_types {
            self.types.extend(guid, name);
        }
        self.schema_attributes = collected.display_names;
        self.schema = collected.entries;
        Ok(())
    }

    fn update_sid_catalog(&mut self, records: &[Record]) {
        for record in records {
            let (Some(sid), Some(sam)) = (
                get_str(record, "objectSid"),
                get_str(record, "sAMAccountName"),
            ) else {
                continue;
            };
            if get_ci(record, "objectCategory").is_none() {
                continue;
            }
            let (class_name, _) = object_class(record);
            self.sids
                .insert(sid.to_string(), sam.to_string(), class_name);
        }
    }

    fn update_domain_tables(&mut self, records: &[Record]) {
        for record in records {
            let (Some(sid), Some(dn), Some(name)) = (
                get_str(record, "objectSid"),
                get_str(record, "distinguishedName"),
                get_str(record, "name"),
            ) else {
                continue;
            };
            let fqdn = dn
                .split(',')
                .filter_map(|part| part.split('=').nth(1))
                .collect::<Vec<_>>()
                .join(".")
                .to_uppercase();
            self.domain_lt.insert(sid.to_string(), fqdn);
            self.domain_ltnb
                .insert(sid.to_string(), name.to_uppercase());
        }
    }

    pub fn domain_tables(&self) -> (&HashMap<String, String>, &HashMap<String, String>) {
        (&self.domain_lt, &self.domain_ltnb)
    }

    pub fn sid_catalog(&self) -> &SidCatalog {
        &self.sids
    }
}

fn with_minimum_attributes(mut attributes: Vec<String>) -> Vec<String> {
    for required in MINIMUM_ATTRIBUTES {
        if !attributes.iter().any(|a| a.eq_ignore_ascii_case(required)) {
            attributes.push(required.to_string());
        }
    }
    attributes
}

/// Derives the SID-filtering and transitivity properties of a trust from
/// its expanded attribute flags.
pub fn derive_trust_properties(records: &mut [Record]) {
    for record in records {
        let Some(flags) = get_ci(record, "trustAttributesFlags").cloned() else {
            continue;
        };
        let has = |name: &str| {
            flags
                .as_array()
                .is_some_and(|f| f.iter().any(|v| v.as_str() == Some(name)))
        };
        record.insert(
            "sidFiltering".to_string(),
            Value::from(has("QUARANTINED_DOMAIN")),
        );
        record.insert(
            "transitive".to_string(),
            Value::from(!(has("TREAT_AS_EXTERNAL") || has("CROSS_ORGANIZATION"))),
        );
    }
}

/// The enrollment-service `flags` field is too generic for the shared
/// flag expansion; decode it here.
fn decode_ca_flags(records: &mut [Record]) {
    for record in records {
        let Some(value) = get_ci(record, "flags").and_then(Value::as_i64) else {
            continue;
        };
        record.insert("flags_raw".to_string(), Value::from(value));
        record.insert(
            "flags".to_string(),
            Value::from(expand_flags(CA_FLAGS, value as u32)),
        );
    }
}
