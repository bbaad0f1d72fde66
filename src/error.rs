use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("LDAP bind failed: {0}")]
    BindFailed(String),
    #[error("LDAP error: {0}")]
    Ldap(#[from] ldap3::LdapError),
    #[error("Malformed security descriptor: {0}")]
    MalformedDescriptor(#[from] binrw::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No host provided")]
    NoHost,
}
