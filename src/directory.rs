//! The directory access seam: a small trait the pipeline consumes, and
//! its LDAP implementation covering the supported bind modes.

use std::path::PathBuf;

use ldap3::adapters::{Adapter, EntriesOnly, PagedResults};
use ldap3::controls::RawControl;
use ldap3::exop::{WhoAmI, WhoAmIResp};
use ldap3::{LdapConn, LdapConnSettings, Scope, SearchEntry};
use rand::Rng;
use serde_json::{Map, Value};

/// LDAP_SERVER_SD_FLAGS_OID with flags Owner|Group|DACL: every search
/// asks the server to omit the SACL, which an unprivileged reader could
/// not see anyway.
pub const SD_FLAGS_CONTROL_OID: &str = "1.2.840.113556.1.4.801";
pub const SD_FLAGS_CONTROL_PAYLOAD: &[u8] = &[0x30, 0x03, 0x02, 0x01, 0x07];

/// Cooperative pacing between pages and between methods.
#[derive(Debug, Clone)]
pub struct Pacer {
    delay: u64,
    jitter: u64,
}

impl Pacer {
    pub fn new(delay: u64, jitter: u64) -> Self {
        Self { delay, jitter }
    }

    pub fn enabled(&self) -> bool {
        self.delay > 0
    }

    /// Sleeps `delay` seconds plus up to `jitter` seconds of random slack.
    pub fn pause(&self, what: &str) {
        if self.delay == 0 {
            return;
        }
        let mut total = self.delay;
        if self.jitter > 0 {
            let slack = rand::thread_rng().gen_range(1..=self.jitter);
            log::debug!("Adding {slack} seconds of jitter to delay");
            total += slack;
        }
        log::info!("Sleeping for {total} seconds {what} as per configured setting");
        std::thread::sleep(std::time::Duration::from_secs(total));
    }
}

/// Root-DSE facts the pipeline needs, plus the full attribute map for
/// the dump's server-information section.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub default_naming_context: String,
    pub configuration_naming_context: String,
    pub schema_naming_context: String,
    pub is_global_catalog_ready: bool,
    pub attributes: Map<String, Value>,
}

/// Capability consumed by the collector; keeps the pipeline testable
/// against synthetic directories.
pub trait Directory {
    fn server_info(&mut self) -> crate::Result<&ServerInfo>;

    /// The host this directory was opened against, for the dump meta.
    fn server_name(&self) -> String;

    /// LDAP Who Am I. `Anonymous` for an unauthenticated bind.
    fn whoami(&mut self) -> crate::Result<String>;

    /// Paged subtree search with the SD-flags control attached, pausing
    /// between pages when pacing is configured.
    fn search(
        &mut self,
        base: &str,
        filter: &str,
        attributes: &[String],
        page_size: i32,
        pacer: &Pacer,
    ) -> crate::Result<Vec<SearchEntry>>;
}

#[derive(Debug, Clone)]
pub enum BindMethod {
    Anonymous,
    /// Simple bind; AD accepts both UPN and `DOMAIN\user` names.
    Simple { username: String, password: String },
    /// SASL/GSSAPI from the ambient ticket cache.
    Kerberos,
    /// SASL/EXTERNAL with a TLS client certificate (PEM paths).
    ClientCertificate { cert: PathBuf, key: PathBuf },
}

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Domain controller address; a resolvable name when using Kerberos.
    pub host: String,
    /// Connect address override, when `host` does not resolve.
    pub target_ip: Option<String>,
    pub port: Option<u16>,
    pub ssl: bool,
    pub start_tls: bool,
    pub bind: BindMethod,
}

impl ConnectionConfig {
    fn url(&self) -> String {
        let scheme = if self.ssl { "ldaps" } else { "ldap" };
        let port = self.port.unwrap_or(if self.ssl { 636 } else { 389 });
        let target = self.target_ip.as_deref().unwrap_or(&self.host);
        format!("{scheme}://{target}:{port}")
    }
}

pub struct LdapDirectory {
    conn: LdapConn,
    host: String,
    info: Option<ServerInfo>,
}

impl LdapDirectory {
    /// Opens the connection and binds. A bind failure is fatal.
    pub fn connect(config: &ConnectionConfig) -> crate::Result<Self> {
        if config.host.is_empty() {
            return Err(crate::Error::NoHost);
        }

        let mut settings = LdapConnSettings::new().set_no_tls_verify(true);
        if config.start_tls {
            settings = settings.set_starttls(true);
        }
        if let BindMethod::ClientCertificate { cert, key } = &config.bind {
            let cert_pem = std::fs::read(cert)?;
            let key_pem = std::fs::read(key)?;
            let identity =
                native_tls::Identity::from_pkcs8(&cert_pem, &key_pem).map_err(|e| {
                    crate::Error::Config(format!("Could not load client certificate: {e}"))
                })?;
            let connector = native_tls::TlsConnector::builder()
                .identity(identity)
                .danger_accept_invalid_certs(true)
                .build()
                .map_err(|e| crate::Error::Config(format!("TLS setup failed: {e}")))?;
            settings = settings.set_connector(connector);
        }

        let url = config.url();
        log::debug!("Attempting to perform connection to LDAP server {url}");
        let mut conn = LdapConn::with_settings(settings, &url)?;

        let bind_result = match &config.bind {
            BindMethod::Anonymous => {
                log::debug!(
                    "No username provided, will attempt to perform anonymous bind. \
                     Will likely result in limited output."
                );
                conn.simple_bind("", "")
            }
            BindMethod::Simple { username, password } => conn.simple_bind(username, password),
            BindMethod::Kerberos => {
                log::debug!(
                    "Attempting to perform Kerberos connection to LDAP server with bind host name {}",
                    config.host
                );
                conn.sasl_gssapi_bind(&config.host)
            }
            BindMethod::ClientCertificate { .. } => {
                log::debug!("Attempting to authenticate using the provided client certificate");
                conn.sasl_external_bind()
            }
        };
        bind_result
            .and_then(|r| r.success())
            .map_err(|e| crate::Error::BindFailed(e.to_string()))?;

        let mut directory = Self {
            conn,
            host: config.host.clone(),
            info: None,
        };
        let info = directory.server_info()?;
        if info.is_global_catalog_ready {
            log::info!("Target server is a Global Catalog server");
        } else {
            log::warn!("WARNING: Server is not a global catalog, results may be incomplete...");
        }
        Ok(directory)
    }

    fn sd_flags_control(&self) -> RawControl {
        RawControl {
            ctype: SD_FLAGS_CONTROL_OID.to_string(),
            crit: true,
            val: Some(SD_FLAGS_CONTROL_PAYLOAD.to_vec()),
        }
    }

    fn fetch_root_dse(&mut self) -> crate::Result<ServerInfo> {
        let (entries, _res) = self
            .conn
            .search("", Scope::Base, "(objectClass=*)", vec!["*", "+"])?
            .success()?;
        let entry = entries
            .into_iter()
            .next()
            .map(SearchEntry::construct)
            .ok_or_else(|| crate::Error::BindFailed("Empty root DSE response".to_string()))?;

        let mut attributes = Map::new();
        for (attr, values) in &entry.attrs {
            let value = if values.len() == 1 {
                Value::from(values[0].clone())
            } else {
                Value::from(values.clone())
            };
            attributes.insert(attr.clone(), value);
        }

        let single = |name: &str| {
            entry
                .attrs
                .get(name)
                .and_then(|v| v.first())
                .cloned()
                .unwrap_or_default()
        };
        Ok(ServerInfo {
            default_naming_context: single("defaultNamingContext"),
            configuration_naming_context: single("configurationNamingContext"),
            schema_naming_context: single("schemaNamingContext"),
            is_global_catalog_ready: single("isGlobalCatalogReady").eq_ignore_ascii_case("TRUE"),
            attributes,
        })
    }
}

impl Directory for LdapDirectory {
    fn server_info(&mut self) -> crate::Result<&ServerInfo> {
        if self.info.is_none() {
            self.info = Some(self.fetch_root_dse()?);
        }
        Ok(self.info.as_ref().expect("root DSE cached above"))
    }

    fn server_name(&self) -> String {
        self.host.clone()
    }

    fn whoami(&mut self) -> crate::Result<String> {
        let (exop, _res) = self.conn.extended(WhoAmI)?.success()?;
        let resp: WhoAmIResp = exop.parse();
        let who = resp.authzid;
        if who.is_empty() {
            return Ok("Anonymous".to_string());
        }
        Ok(who.strip_prefix("u:").unwrap_or(&who).to_string())
    }

    fn search(
        &mut self,
        base: &str,
        filter: &str,
        attributes: &[String],
        page_size: i32,
        pacer: &Pacer,
    ) -> crate::Result<Vec<SearchEntry>> {
        let adapters: Vec<Box<dyn Adapter<_, _>>> = vec![
            Box::new(EntriesOnly::new()),
            Box::new(PagedResults::new(page_size)),
        ];
        let mut search = self
            .conn
            .with_controls(self.sd_flags_control())
            .streaming_search_with(adapters, base, Scope::Subtree, filter, attributes.to_vec())?;

        let mut entries = Vec::new();
        let mut in_page = 0i32;
        while let Some(entry) = search.next()? {
            entries.push(SearchEntry::construct(entry));
            in_page += 1;
            if pacer.enabled() && in_page >= page_size {
                pacer.pause("during paging operation");
                in_page = 0;
            }
        }
        search.result().success()?;
        Ok(entries)
    }
}
