//! The method registry: one entry per logical object category, each with
//! its fixed filter, base partition and default attribute set.

/// Attributes requested for every category.
const SHARED_ATTRIBUTES: &[&str] = &[
    "description",
    "distinguishedName",
    "isDeleted",
    "nTSecurityDescriptor",
    "name",
    "objectCategory",
    "objectClass",
    "whenCreated",
];

const CERTAUTHORITIES_ATTRIBUTES: &[&str] = &[
    "cACertificate",
    "crossCertificatePair",
    "msPKI-Certificate-Policy",
    "objectGUID",
];

const CERTENROLLSERVICES_ATTRIBUTES: &[&str] = &[
    "cACertificate",
    "certificateTemplates",
    "crossCertificatePair",
    "displayName",
    "dNSHostName",
    "flags",
    "objectGUID",
];

const CERTTEMPLATES_ATTRIBUTES: &[&str] = &[
    "displayName",
    "flags",
    "objectGUID",
    "msDS-OIDToGroupLink",
    "msPKI-Cert-Template-OID",
    "msPKI-Certificate-Application-Policy",
    "msPKI-Certificate-Name-Flag",
    "msPKI-Enrollment-Flag",
    "msPKI-RA-Application-Policies",
    "msPKI-RA-Policies",
    "msPKI-RA-Signature",
    "msPKI-Template-Schema-Version",
    "pKIExpirationPeriod",
    "pKIExtendedKeyUsage",
    "pKIOverlapPeriod",
];

const COMPUTERS_ATTRIBUTES: &[&str] = &[
    "dNSHostName",
    "homeDirectory",
    "lastlogon",
    "lastlogontimestamp",
    "mail",
    "msDS-AllowedToActOnBehalfOfOtherIdentity",
    "msDS-AllowedToDelegateTo",
    "msDS-HostServiceAccount",
    "msDS-GroupMSAMembership",
    "ms-Mcs-AdmPwd",
    "ms-Mcs-AdmPwdExpirationTime",
    "msLAPS-EncryptedPassword",
    "msLAPS-EncryptedPasswordHistory",
    "msLAPS-EncryptedDSRMPassword",
    "msLAPS-EncryptedDSRMPasswordHistory",
    "msLAPS-CurrentPasswordVersion",
    "msLAPS-Password",
    "msLAPS-PasswordExpirationTime",
    "objectSid",
    "operatingSystem",
    "operatingSystemServicePack",
    "primaryGroupID",
    "pwdlastset",
    "sAMAccountName",
    "scriptpath",
    "sIDHistory",
    "servicePrincipalName",
    "userAccountControl",
];

const CONTAINERS_ATTRIBUTES: &[&str] = &["objectGUID"];

const DOMAINS_ATTRIBUTES: &[&str] = &["gPLink", "objectSid", "msDS-Behavior-Version"];

const FORESTS_ATTRIBUTES: &[&str] = &["msDS-Behavior-Version", "objectGUID"];

const GPOS_ATTRIBUTES: &[&str] = &["displayName", "flags", "gPCFileSysPath", "objectGUID"];

const GROUPS_ATTRIBUTES: &[&str] = &["member", "objectSid", "sAMAccountName", "sIDHistory"];

const OUS_ATTRIBUTES: &[&str] = &["gPLink", "gPOptions", "objectGUID", "whenCreated"];

const TRUSTED_DOMAINS_ATTRIBUTES: &[&str] = &[
    "objectGUID",
    "securityIdentifier",
    "trustAttributes",
    "trustDirection",
    "trustPartner",
    "trustType",
];

const USERS_ATTRIBUTES: &[&str] = &[
    "homeDirectory",
    "lastlogon",
    "lastlogontimestamp",
    "mail",
    "msSFU30Password",
    "msDS-AllowedToActOnBehalfOfOtherIdentity",
    "msDS-AllowedToDelegateTo",
    "msDS-GroupMSAMembership",
    "msDS-HostServiceAccount",
    "objectSid",
    "primaryGroupID",
    "pwdlastset",
    "sAMAccountName",
    "scriptPath",
    "sIDHistory",
    "servicePrincipalName",
    "unixUserPassword",
    "unicodePwd",
    "userPassword",
    "userAccountControl",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    CertAuthorities,
    CertEnrollServices,
    CertTemplates,
    Computers,
    Containers,
    Domains,
    Forests,
    Gpos,
    Groups,
    /// Root-DSE server information; works on anonymous binds.
    Info,
    Ous,
    TrustedDomains,
    Users,
}

impl Method {
    /// Every method, in the fixed execution order.
    pub fn all() -> &'static [Method] {
        &[
            Method::CertAuthorities,
            Method::CertEnrollServices,
            Method::CertTemplates,
            Method::Computers,
            Method::Containers,
            Method::Domains,
            Method::Forests,
            Method::Gpos,
            Method::Groups,
            Method::Info,
            Method::Ous,
            Method::TrustedDomains,
            Method::Users,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Method::CertAuthorities => "certauthorities",
            Method::CertEnrollServices => "certenrollservices",
            Method::CertTemplates => "certtemplates",
            Method::Computers => "computers",
            Method::Containers => "containers",
            Method::Domains => "domains",
            Method::Forests => "forests",
            Method::Gpos => "gpos",
            Method::Groups => "groups",
            Method::Info => "info",
            Method::Ous => "ous",
            Method::TrustedDomains => "trusted_domains",
            Method::Users => "users",
        }
    }

    pub fn from_name(name: &str) -> Option<Method> {
        Method::all().iter().copied().find(|m| m.name() == name)
    }

    pub fn filter(&self) -> &'static str {
        match self {
            Method::CertAuthorities => "(objectClass=certificationAuthority)",
            Method::CertEnrollServices => "(objectClass=pKIEnrollmentService)",
            Method::CertTemplates => "(objectClass=pKICertificateTemplate)",
            Method::Containers => "(objectClass=container)",
            Method::Computers => "(objectCategory=computer)",
            Method::Domains => "(objectClass=domain)",
            Method::Forests => "(objectClass=crossRefContainer)",
            Method::Gpos => "(objectClass=groupPolicyContainer)",
            Method::Groups => "(objectClass=group)",
            Method::Info => "(objectClass=*)",
            Method::Ous => "(objectClass=organizationalUnit)",
            Method::TrustedDomains => "(objectClass=trustedDomain)",
            Method::Users => {
                "(&(objectClass=user)(|(objectCategory=person)(objectCategory=msDS-GroupManagedServiceAccount)(objectCategory=msDS-ManagedServiceAccount)))"
            }
        }
    }

    /// PKI and forest objects live under the configuration partition;
    /// everything else is searched from the default naming context.
    pub fn uses_configuration_context(&self) -> bool {
        matches!(
            self,
            Method::CertAuthorities
                | Method::CertEnrollServices
                | Method::CertTemplates
                | Method::Forests
        )
    }

    pub fn is_cert_method(&self) -> bool {
        self.name().starts_with("cert")
    }

    /// Default attribute set: the shared attributes plus the
    /// category-specific additions, sorted.
    pub fn attributes(&self) -> Vec<String> {
        let specific = match self {
            Method::Info => return Vec::new(),
            Method::CertAuthorities => CERTAUTHORITIES_ATTRIBUTES,
            Method::CertEnrollServices => CERTENROLLSERVICES_ATTRIBUTES,
            Method::CertTemplates => CERTTEMPLATES_ATTRIBUTES,
            Method::Containers => CONTAINERS_ATTRIBUTES,
            Method::Computers => COMPUTERS_ATTRIBUTES,
            Method::Domains => DOMAINS_ATTRIBUTES,
            Method::Forests => FORESTS_ATTRIBUTES,
            Method::Gpos => GPOS_ATTRIBUTES,
            Method::Groups => GROUPS_ATTRIBUTES,
            Method::Ous => OUS_ATTRIBUTES,
            Method::TrustedDomains => TRUSTED_DOMAINS_ATTRIBUTES,
            Method::Users => USERS_ATTRIBUTES,
        };
        let mut attributes: Vec<String> = SHARED_ATTRIBUTES
            .iter()
            .chain(specific.iter())
            .map(|a| a.to_string())
            .collect();
        attributes.sort_unstable();
        attributes.dedup();
        attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_names_round_trip() {
        for method in Method::all() {
            assert_eq!(Method::from_name(method.name()), Some(*method));
        }
        assert_eq!(Method::from_name("sessions"), None);
    }

    #[test]
    fn test_attributes_include_shared_set() {
        for method in Method::all() {
            if *method == Method::Info {
                continue;
            }
            let attrs = method.attributes();
            assert!(attrs.iter().any(|a| a == "nTSecurityDescriptor"));
            assert!(attrs.windows(2).all(|w| w[0] <= w[1]), "sorted for {method:?}");
        }
    }
}
