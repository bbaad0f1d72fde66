//! Certificate-services shaping: CA certificate decoding, thumbprints
//! and the derived certificate-template properties.

use serde_json::{Map, Value};
use sha1::{Digest, Sha1};
use x509_parser::oid_registry::asn1_rs::oid;
use x509_parser::prelude::*;

use crate::normalize::{get_ci, get_str, get_str_list, Record};
use crate::postprocess::unhexlify;
use crate::registry::object_types::AUTHENTICATION_OIDS;

use super::common::{remove_properties, update_properties};
use super::GraphAssembler;

fn sha1_hex(data: &[u8]) -> String {
    Sha1::digest(data)
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect()
}

#[derive(Debug, Default, Clone)]
struct CertInfo {
    thumbprint: String,
    has_basic_constraints: bool,
    path_length: i64,
}

fn parse_cert_info(der: &[u8]) -> CertInfo {
    let mut info = CertInfo {
        thumbprint: sha1_hex(der),
        ..Default::default()
    };
    match X509Certificate::from_der(der) {
        Ok((_, cert)) => {
            for ext in cert.extensions() {
                if ext.oid == oid!(2.5.29.19) {
                    if let ParsedExtension::BasicConstraints(bc) = ext.parsed_extension() {
                        // present when the extension carries more than
                        // the bare CA marker
                        info.has_basic_constraints = bc.path_len_constraint.is_some();
                        info.path_length = bc.path_len_constraint.unwrap_or(0) as i64;
                    }
                }
            }
        }
        Err(e) => log::debug!("CA certificate parsing failed: {e}"),
    }
    info
}

/// The DER blobs of a hex-rendered certificate attribute.
fn cert_blobs(record: &Record, attribute: &str) -> Vec<Vec<u8>> {
    get_str_list(record, attribute)
        .iter()
        .filter_map(|hex| unhexlify(hex))
        .collect()
}

fn cert_chain(blobs: &[Vec<u8>]) -> Value {
    Value::from(blobs.iter().map(|der| sha1_hex(der)).collect::<Vec<_>>())
}

fn first_cert_info(blobs: &[Vec<u8>]) -> CertInfo {
    blobs.first().map(|der| parse_cert_info(der)).unwrap_or_default()
}

pub fn map_enterpriseca(asm: &GraphAssembler<'_>, record: &Record) -> Map<String, Value> {
    let dn = get_str(record, "distinguishedName").unwrap_or_default();
    let domain_name = super::common::domain_from_dn(dn);
    let blobs = cert_blobs(record, "cACertificate");
    let cert = first_cert_info(&blobs);

    let mut out = super::common::common_object(asm, record);
    out.insert("HostingComputer".to_string(), Value::Null);
    out.insert("CARegistryData".to_string(), Value::Null);
    let mut enabled_templates = Vec::new();
    for template in get_str_list(record, "certificateTemplates") {
        match asm.cert_template_map.get(&template) {
            Some(reference) => enabled_templates.push(reference.to_value()),
            None => log::debug!("Enabled certificate template {template} was not collected"),
        }
    }
    out.insert("EnabledCertTemplates".to_string(), Value::from(enabled_templates));

    update_properties(
        &mut out,
        vec![
            ("domainsid", Value::from(asm.domain_sid_for(&domain_name))),
            (
                "flags",
                Value::from(get_str_list(record, "flags").join(", ")),
            ),
            ("caname", get_ci(record, "name").cloned().unwrap_or(Value::Null)),
            (
                "dnshostname",
                get_ci(record, "dNSHostName").cloned().unwrap_or(Value::Null),
            ),
            ("certthumbprint", Value::from(cert.thumbprint.clone())),
            ("certname", Value::from(cert.thumbprint.clone())),
            ("certchain", cert_chain(&blobs)),
            ("hasbasicconstraints", Value::from(cert.has_basic_constraints)),
            ("basicconstraintpathlength", Value::from(cert.path_length)),
        ],
    );
    remove_properties(&mut out, &["displayname"]);
    out
}

pub fn map_aiaca(asm: &GraphAssembler<'_>, record: &Record) -> Map<String, Value> {
    let dn = get_str(record, "distinguishedName").unwrap_or_default();
    let domain_name = super::common::domain_from_dn(dn);
    let blobs = cert_blobs(record, "cACertificate");
    let cert = first_cert_info(&blobs);
    let cross_blobs = cert_blobs(record, "crossCertificatePair");

    let mut out = super::common::common_object(asm, record);
    update_properties(
        &mut out,
        vec![
            ("domainsid", Value::from(asm.domain_sid_for(&domain_name))),
            ("certchain", cert_chain(&blobs)),
            ("certthumbprint", Value::from(cert.thumbprint.clone())),
            ("certname", Value::from(cert.thumbprint.clone())),
            (
                "hascrosscertificatepair",
                Value::from(get_ci(record, "crossCertificatePair").is_some()),
            ),
            ("crosscertificatepair", cert_chain(&cross_blobs)),
            ("hasbasicconstraints", Value::from(cert.has_basic_constraints)),
            ("basicconstraintpathlength", Value::from(cert.path_length)),
        ],
    );
    remove_properties(&mut out, &["displayname"]);
    out
}

pub fn map_ntauthstore(asm: &GraphAssembler<'_>, record: &Record) -> Map<String, Value> {
    let dn = get_str(record, "distinguishedName").unwrap_or_default();
    let domain_name = super::common::domain_from_dn(dn);
    let blobs = cert_blobs(record, "cACertificate");

    let mut out = super::common::common_object(asm, record);
    out.insert(
        "DomainSID".to_string(),
        Value::from(asm.domain_sid_for(&domain_name)),
    );
    update_properties(
        &mut out,
        vec![
            ("domainsid", Value::from(asm.domain_sid_for(&domain_name))),
            ("certthumbprints", cert_chain(&blobs)),
        ],
    );
    remove_properties(&mut out, &["displayname"]);
    out
}

pub fn map_rootca(asm: &GraphAssembler<'_>, record: &Record) -> Map<String, Value> {
    let dn = get_str(record, "distinguishedName").unwrap_or_default();
    let domain_name = super::common::domain_from_dn(dn);
    let blobs = cert_blobs(record, "cACertificate");
    let cert = first_cert_info(&blobs);

    let mut out = super::common::common_object(asm, record);
    out.insert(
        "DomainSID".to_string(),
        Value::from(asm.domain_sid_for(&domain_name)),
    );
    update_properties(
        &mut out,
        vec![
            ("domainsid", Value::from(asm.domain_sid_for(&domain_name))),
            ("certchain", cert_chain(&blobs)),
            ("certthumbprint", Value::from(cert.thumbprint.clone())),
            ("certname", Value::from(cert.thumbprint.clone())),
            ("hasbasicconstraints", Value::from(cert.has_basic_constraints)),
            ("basicconstraintpathlength", Value::from(cert.path_length)),
        ],
    );
    remove_properties(&mut out, &["displayname"]);
    out
}

fn strip_ct_flags(flags: &[String]) -> String {
    flags
        .iter()
        .map(|f| f.replace("CT_FLAG_", ""))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn map_certtemplate(asm: &GraphAssembler<'_>, record: &Record) -> Map<String, Value> {
    let dn = get_str(record, "distinguishedName").unwrap_or_default();
    let domain_name = super::common::domain_from_dn(dn);
    let mut out = super::common::common_object(asm, record);

    let application_policies = get_str_list(record, "msPKI-Certificate-Application-Policy");
    let ekus = get_str_list(record, "pKIExtendedKeyUsage");
    let schema_version = get_ci(record, "msPKI-Template-Schema-Version")
        .and_then(Value::as_i64)
        .unwrap_or(0);
    // Version-1 templates predate application policies; their EKUs are
    // authoritative.
    let effective_ekus = if schema_version == 1 && !ekus.is_empty() {
        ekus.clone()
    } else {
        application_policies.clone()
    };
    let authentication_enabled = effective_ekus.is_empty()
        || effective_ekus
            .iter()
            .any(|e| AUTHENTICATION_OIDS.contains(&e.as_str()));

    let enrollment_flags = get_str_list(record, "msPKI-Enrollment-FlagFlags");
    let name_flags = get_str_list(record, "msPKI-Certificate-Name-FlagFlags");
    let has_name_flag = |flag: &str| name_flags.iter().any(|f| f == flag);

    update_properties(
        &mut out,
        vec![
            ("domainsid", Value::from(asm.domain_sid_for(&domain_name))),
            (
                "displayname",
                get_ci(record, "displayName").cloned().unwrap_or(Value::from("")),
            ),
            (
                "validityperiod",
                get_ci(record, "pKIExpirationPeriod").cloned().unwrap_or(Value::from("")),
            ),
            (
                "renewalperiod",
                get_ci(record, "pKIOverlapPeriod").cloned().unwrap_or(Value::from("")),
            ),
            ("schemaversion", Value::from(schema_version)),
            ("enrollmentflag", Value::from(strip_ct_flags(&enrollment_flags))),
            (
                "oid",
                get_ci(record, "msPKI-Cert-Template-OID").cloned().unwrap_or(Value::Null),
            ),
            (
                "requiresmanagerapproval",
                Value::from(enrollment_flags.iter().any(|f| f == "CT_FLAG_PEND_ALL_REQUESTS")),
            ),
            (
                "nosecurityextension",
                Value::from(enrollment_flags.iter().any(|f| f == "CT_FLAG_NO_SECURITY_EXTENSION")),
            ),
            ("certificatenameflag", Value::from(strip_ct_flags(&name_flags))),
            (
                "enrolleesuppliessubject",
                Value::from(has_name_flag("CT_FLAG_ENROLLEE_SUPPLIES_SUBJECT")),
            ),
            (
                "subjectaltrequireupn",
                Value::from(has_name_flag("CT_FLAG_SUBJECT_ALT_REQUIRE_UPN")),
            ),
            (
                "subjectaltrequiredns",
                Value::from(has_name_flag("CT_FLAG_SUBJECT_ALT_REQUIRE_DNS")),
            ),
            (
                "subjectaltrequiredomaindns",
                Value::from(has_name_flag("CT_FLAG_SUBJECT_ALT_REQUIRE_DOMAIN_DNS")),
            ),
            (
                "subjectaltrequireemail",
                Value::from(has_name_flag("CT_FLAG_SUBJECT_ALT_REQUIRE_EMAIL")),
            ),
            (
                "subjectaltrequirespn",
                Value::from(has_name_flag("CT_FLAG_SUBJECT_ALT_REQUIRE_SPN")),
            ),
            (
                "subjectrequireemail",
                Value::from(has_name_flag("CT_FLAG_SUBJECT_REQUIRE_EMAIL")),
            ),
            ("ekus", Value::from(ekus)),
            ("certificateapplicationpolicy", Value::from(application_policies)),
            (
                "authorizedsignatures",
                get_ci(record, "msPKI-RA-Signature").cloned().unwrap_or(Value::from(0)),
            ),
            (
                "applicationpolicies",
                Value::from(get_str_list(record, "msPKI-RA-Application-Policies")),
            ),
            (
                "issuancepolicies",
                Value::from(get_str_list(record, "msPKI-RA-Policies")),
            ),
            ("effectiveekus", Value::from(effective_ekus)),
            ("authenticationenabled", Value::from(authentication_enabled)),
        ],
    );
    out
}
