//! End-to-end checks of the rights translation and graph shaping,
//! running against synthetic directory entries.

use serde_json::{json, Value};

use adenum::acl::{AceRow, AclTranslator};
use adenum::dump::Dump;
use adenum::graph::GraphAssembler;
use adenum::normalize::Record;
use adenum::registry::{expand_flags, SidCatalog, USER_ACCOUNT_CONTROL};

const DOMAIN_SID: &str = "S-1-5-21-1004336348-1177238915-682003330";
const CORE_DOMAIN: &str = "EXAMPLE.LOCAL";

fn record(value: Value) -> Record {
    value.as_object().expect("record literal").clone()
}

fn ace(privs: &[&str], extra: Value) -> Value {
    let mut base = json!({
        "Type": "ACCESS_ALLOWED_OBJECT_ACE",
        "Sid": format!("{DOMAIN_SID}-1104"),
        "Flags": [],
        "Mask": 0,
        "Privs": privs,
        "Ace_Data_Flags": [],
    });
    base.as_object_mut()
        .unwrap()
        .extend(extra.as_object().unwrap().clone());
    base
}

fn entry(category: &str, dacls: Vec<Value>, extra: Value) -> Record {
    let mut base = json!({
        "objectCategory": format!("CN={category},CN=Schema,CN=Configuration,DC=example,DC=local"),
        "distinguishedName": "CN=Target,DC=example,DC=local",
        "name": "Target",
        "nTSecurityDescriptor": {
            "IsACLProtected": false,
            "OwnerSid": format!("{DOMAIN_SID}-512"),
            "Dacls": dacls,
        },
    });
    base.as_object_mut()
        .unwrap()
        .extend(extra.as_object().unwrap().clone());
    record(base)
}

fn translate(entry: &Record) -> Vec<AceRow> {
    let sids = SidCatalog::new();
    let translator = AclTranslator {
        sids: &sids,
        core_domain: CORE_DOMAIN,
    };
    translator.translate(entry)
}

fn rights_of(rows: &[AceRow], sid_suffix: &str) -> Vec<String> {
    rows.iter()
        .filter(|r| r.principal_sid.ends_with(sid_suffix))
        .map(|r| r.right_name.clone())
        .collect()
}

#[test]
fn uac_flag_round_trip() {
    assert_eq!(expand_flags(USER_ACCOUNT_CONTROL, 0x0200), vec!["NORMAL_ACCOUNT"]);
    assert_eq!(
        expand_flags(USER_ACCOUNT_CONTROL, 0x0220),
        vec!["PASSWD_NOTREQD", "NORMAL_ACCOUNT"]
    );
}

#[test]
fn owner_emits_owns() {
    let entry = entry("User", vec![], json!({}));
    let rows = translate(&entry);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].right_name, "Owns");
    assert_eq!(rows[0].principal_sid, format!("{DOMAIN_SID}-512"));
    assert!(!rows[0].is_inherited);
}

#[test]
fn system_owner_is_dropped() {
    let mut e = entry("User", vec![], json!({}));
    let sd = e
        .get_mut("nTSecurityDescriptor")
        .and_then(Value::as_object_mut)
        .unwrap();
    sd.insert("OwnerSid".to_string(), Value::from("S-1-5-18"));
    assert!(translate(&e).is_empty());
}

#[test]
fn generic_all_short_circuits() {
    let e = entry(
        "User",
        vec![ace(&["GENERIC_ALL", "GENERIC_WRITE", "WRITE_DACL", "WRITE_OWNER"], json!({}))],
        json!({}),
    );
    let rows = translate(&e);
    let rights = rights_of(&rows, "-1104");
    assert_eq!(rights, vec!["GenericAll"]);
}

#[test]
fn creator_system_principals_never_emit() {
    for sid in ["S-1-3-0", "S-1-5-18", "S-1-5-10"] {
        let mut a = ace(&["GENERIC_ALL"], json!({}));
        a.as_object_mut().unwrap().insert("Sid".to_string(), Value::from(sid));
        let e = entry("User", vec![a], json!({}));
        let rows = translate(&e);
        assert!(
            rows.iter().all(|r| r.right_name == "Owns"),
            "rows for {sid}: {rows:?}"
        );
    }
}

#[test]
fn principal_sid_rewrite_for_well_known() {
    let mut a = ace(&["WRITE_DACL"], json!({}));
    a.as_object_mut()
        .unwrap()
        .insert("Sid".to_string(), Value::from("S-1-5-32-544"));
    let e = entry("User", vec![a], json!({}));
    let rows = translate(&e);
    let row = rows.iter().find(|r| r.right_name == "WriteDacl").unwrap();
    assert_eq!(row.principal_sid, format!("{CORE_DOMAIN}-S-1-5-32-544"));
    assert_eq!(row.principal_type, "Group");
    assert!(rows.iter().all(|r| r.principal_sid.contains("S-1-")));
}

#[test]
fn inherit_only_without_inherited_is_dropped() {
    let a = ace(&["GENERIC_ALL"], json!({"Flags": ["INHERIT_ONLY_ACE"]}));
    let e = entry("User", vec![a], json!({}));
    assert!(rights_of(&translate(&e), "-1104").is_empty());
}

#[test]
fn inherited_ace_for_other_class_is_dropped() {
    let a = ace(
        &["GENERIC_ALL"],
        json!({
            "Flags": ["INHERITED_ACE"],
            "Ace_Data_Flags": ["ACE_INHERITED_OBJECT_TYPE_PRESENT"],
            "InheritableObjectType": "Computer",
        }),
    );
    let e = entry("User", vec![a], json!({}));
    assert!(rights_of(&translate(&e), "-1104").is_empty());

    // matching class, case-insensitively, passes through
    let a = ace(
        &["GENERIC_ALL"],
        json!({
            "Flags": ["INHERITED_ACE"],
            "Ace_Data_Flags": ["ACE_INHERITED_OBJECT_TYPE_PRESENT"],
            "InheritableObjectType": "user",
        }),
    );
    let e = entry("User", vec![a], json!({}));
    assert_eq!(rights_of(&translate(&e), "-1104"), vec!["GenericAll"]);
}

#[test]
fn laps_read_property() {
    let a = ace(
        &["ADS_RIGHT_DS_READ_PROP"],
        json!({
            "Ace_Data_Flags": ["ACE_OBJECT_TYPE_PRESENT"],
            "ControlObjectType": "ms-Mcs-AdmPwd",
        }),
    );
    let e = entry(
        "Computer",
        vec![a],
        json!({"ms-Mcs-AdmPwdExpirationTime": "2023-05-01 10:00:00.000000 UTC +0000"}),
    );
    assert_eq!(rights_of(&translate(&e), "-1104"), vec!["ReadLAPSPassword"]);
}

#[test]
fn laps_generic_all_carve_out() {
    let a = ace(
        &["GENERIC_ALL", "GENERIC_WRITE", "WRITE_DACL", "WRITE_OWNER", "ADS_RIGHT_DS_READ_PROP"],
        json!({
            "Ace_Data_Flags": ["ACE_OBJECT_TYPE_PRESENT"],
            "ControlObjectType": "ms-Mcs-AdmPwd",
        }),
    );
    let e = entry(
        "Computer",
        vec![a],
        json!({"ms-Mcs-AdmPwdExpirationTime": "2023-05-01 10:00:00.000000 UTC +0000"}),
    );
    let rights = rights_of(&translate(&e), "-1104");
    assert!(rights.contains(&"ReadLAPSPassword".to_string()));
    assert!(!rights.contains(&"GenericAll".to_string()));
    // the carve-out does not suppress the remaining rights
    assert!(rights.contains(&"GenericWrite".to_string()));
    assert!(rights.contains(&"WriteDacl".to_string()));

    // without the expiration attribute the same ACE is a plain GenericAll
    let a = ace(
        &["GENERIC_ALL"],
        json!({
            "Ace_Data_Flags": ["ACE_OBJECT_TYPE_PRESENT"],
            "ControlObjectType": "ms-Mcs-AdmPwd",
        }),
    );
    let e = entry("Computer", vec![a], json!({}));
    assert_eq!(rights_of(&translate(&e), "-1104"), vec!["GenericAll"]);
}

#[test]
fn domain_all_properties_control_access() {
    let a = ace(
        &["ADS_RIGHT_DS_CONTROL_ACCESS"],
        json!({
            "Ace_Data_Flags": ["ACE_OBJECT_TYPE_PRESENT"],
            "ControlObjectType": "AllProperties",
        }),
    );
    let e = entry("Domain-DNS", vec![a], json!({}));
    let rights = rights_of(&translate(&e), "-1104");
    assert_eq!(
        rights,
        vec!["AllExtendedRights", "GetChanges", "GetChangesAll", "GetChangesInFilteredSet"]
    );
}

#[test]
fn group_add_self_and_add_member() {
    let a = ace(
        &["ADS_RIGHT_DS_SELF"],
        json!({
            "Ace_Data_Flags": ["ACE_OBJECT_TYPE_PRESENT"],
            "ControlObjectType": "Member",
        }),
    );
    let e = entry("Group", vec![a], json!({}));
    assert_eq!(rights_of(&translate(&e), "-1104"), vec!["AddSelf"]);

    let a = ace(
        &["ADS_RIGHT_DS_WRITE_PROP"],
        json!({
            "Ace_Data_Flags": ["ACE_OBJECT_TYPE_PRESENT"],
            "ControlObjectType": "Member",
        }),
    );
    let e = entry("Group", vec![a], json!({}));
    assert_eq!(rights_of(&translate(&e), "-1104"), vec!["AddMember"]);
}

#[test]
fn user_force_change_password_and_spn() {
    let a = ace(
        &["ADS_RIGHT_DS_CONTROL_ACCESS"],
        json!({
            "Ace_Data_Flags": ["ACE_OBJECT_TYPE_PRESENT"],
            "ControlObjectType": "User-Force-Change-Password",
        }),
    );
    let e = entry("Person", vec![a], json!({}));
    assert_eq!(rights_of(&translate(&e), "-1104"), vec!["ForceChangePassword"]);

    // both the schema CN spelling and the attribute spelling match
    for spelling in ["Service-Principal-Name", "servicePrincipalName"] {
        let a = ace(
            &["ADS_RIGHT_DS_WRITE_PROP"],
            json!({
                "Ace_Data_Flags": ["ACE_OBJECT_TYPE_PRESENT"],
                "ControlObjectType": spelling,
            }),
        );
        let e = entry("Person", vec![a], json!({}));
        assert_eq!(rights_of(&translate(&e), "-1104"), vec!["WriteSPN"]);
    }
}

#[test]
fn gmsa_membership_emits_read_gmsa_password() {
    let e = entry(
        "Computer",
        vec![],
        json!({
            "msDS-GroupMSAMembership": {
                "IsACLProtected": false,
                "Dacls": [{
                    "Type": "ACCESS_ALLOWED_ACE",
                    "Sid": format!("{DOMAIN_SID}-1110"),
                    "Flags": [],
                    "Mask": 983551,
                    "Privs": ["GENERIC_ALL"],
                }],
            },
        }),
    );
    let rows = translate(&e);
    assert!(rows
        .iter()
        .any(|r| r.right_name == "ReadGMSAPassword" && r.principal_sid.ends_with("-1110")));
}

#[test]
fn enrollment_service_rights() {
    let plain = json!({
        "Type": "ACCESS_ALLOWED_ACE",
        "Sid": format!("{DOMAIN_SID}-1104"),
        "Flags": [],
        "Mask": 0x20028u32,
        "Privs": ["GENERIC_WRITE", "ADS_RIGHT_DS_DELETE_CHILD"],
    });
    let e = entry("PKI-Enrollment-Service", vec![plain], json!({}));
    let rights = rights_of(&translate(&e), "-1104");
    assert!(rights.contains(&"ManageCA".to_string()));
    assert!(rights.contains(&"ManageCertificates".to_string()));

    let a = ace(
        &["ADS_RIGHT_DS_CONTROL_ACCESS"],
        json!({
            "Ace_Data_Flags": ["ACE_OBJECT_TYPE_PRESENT"],
            "ControlObjectType": "Certificate-Enrollment",
        }),
    );
    let e = entry("PKI-Enrollment-Service", vec![a], json!({}));
    assert_eq!(rights_of(&translate(&e), "-1104"), vec!["Enroll"]);
}

fn sample_dump() -> Dump {
    let sections = json!({
        "domains": [{
            "objectSid": DOMAIN_SID,
            "distinguishedName": "DC=example,DC=local",
            "name": "EXAMPLE",
            "objectCategory": "CN=Domain-DNS,CN=Schema,CN=Configuration,DC=example,DC=local",
            "msDS-Behavior-Version": 7,
            "gPLink": "[LDAP://CN={AAAAAAAA-1111-2222-3333-444444444444},CN=POLICIES,CN=SYSTEM,DC=EXAMPLE,DC=LOCAL;0][LDAP://CN={BBBBBBBB-1111-2222-3333-444444444444},CN=POLICIES,CN=SYSTEM,DC=EXAMPLE,DC=LOCAL;2]",
        }],
        "computers": [{
            "objectSid": format!("{DOMAIN_SID}-1105"),
            "distinguishedName": "CN=SQL01,CN=Computers,DC=example,DC=local",
            "name": "SQL01",
            "sAMAccountName": "SQL01$",
            "dNSHostName": "host.example.com",
            "objectCategory": "CN=Computer,CN=Schema,CN=Configuration,DC=example,DC=local",
            "domain": "EXAMPLE.LOCAL",
            "userAccountControlFlags": ["WORKSTATION_TRUST_ACCOUNT"],
        }],
        "users": [{
            "objectSid": format!("{DOMAIN_SID}-1104"),
            "distinguishedName": "CN=Alice,CN=Users,DC=example,DC=local",
            "name": "Alice",
            "sAMAccountName": "alice",
            "objectCategory": "CN=Person,CN=Schema,CN=Configuration,DC=example,DC=local",
            "servicePrincipalName": ["MSSQLSvc/host.example.com:1433", "HTTP/web.example.com"],
            "userAccountControl": 16843264u32,
            "userAccountControlFlags": ["NORMAL_ACCOUNT", "DONT_EXPIRE_PASSWORD", "TRUSTED_TO_AUTH_FOR_DELEGATION"],
            "msDS-AllowedToDelegateTo": ["cifs/host.example.com"],
            "primaryGroupID": 513,
        }],
        "gpos": [{
            "objectGUID": "{aaaaaaaa-1111-2222-3333-444444444444}",
            "distinguishedName": "CN={AAAAAAAA-1111-2222-3333-444444444444},CN=Policies,CN=System,DC=example,DC=local",
            "name": "{AAAAAAAA-1111-2222-3333-444444444444}",
            "displayName": "Default Domain Policy",
            "objectCategory": "CN=Group-Policy-Container,CN=Schema,CN=Configuration,DC=example,DC=local",
        }],
        "ous": [{
            "objectGUID": "{cccccccc-1111-2222-3333-444444444444}",
            "distinguishedName": "OU=Workstations,DC=example,DC=local",
            "name": "Workstations",
            "objectCategory": "CN=Organizational-Unit,CN=Schema,CN=Configuration,DC=example,DC=local",
            "gPLink": "[LDAP://CN={AAAAAAAA-1111-2222-3333-444444444444},CN=POLICIES,CN=SYSTEM,DC=EXAMPLE,DC=LOCAL;0][LDAP://CN={BBBBBBBB-1111-2222-3333-444444444444},CN=POLICIES,CN=SYSTEM,DC=EXAMPLE,DC=LOCAL;2]",
            "gPOptions": 1,
        }],
        "trusted_domains": [{
            "distinguishedName": "CN=partner.local,CN=System,DC=example,DC=local",
            "name": "partner.local",
            "trustPartner": "partner.local",
            "securityIdentifier": "S-1-5-21-111-222-333",
            "trustDirection": 3,
            "trustDirectionResolved": "BIDIRECTIONAL",
            "trustAttributesFlags": ["WITHIN_FOREST"],
            "transitive": true,
            "sidFiltering": false,
            "objectCategory": "CN=Trusted-Domain,CN=Schema,CN=Configuration,DC=example,DC=local",
        }],
        "meta": {"methods": ["domains", "computers", "users", "gpos", "ous", "trusted_domains"]},
    });
    Dump::new(sections.as_object().unwrap().clone())
}

#[test]
fn spn_target_resolution() {
    let dump = sample_dump();
    let asm = GraphAssembler::from_dump(&dump);
    let target =
        adenum::graph::principals::spn_target(&asm, "MSSQLSvc/host.example.com:1433").unwrap();
    assert_eq!(
        target,
        json!({
            "ComputerSID": format!("{DOMAIN_SID}-1105"),
            "Port": 1433,
            "Service": "SQLAdmin",
        })
    );
    assert!(adenum::graph::principals::spn_target(&asm, "HTTP/web.example.com").is_none());
}

#[test]
fn user_mapping_booleans_and_delegation() {
    let dump = sample_dump();
    let asm = GraphAssembler::from_dump(&dump);
    let user = dump.records("users")[0];
    let mapped = adenum::graph::principals::map_user(&asm, user);
    let props = mapped["Properties"].as_object().unwrap();
    assert_eq!(props["enabled"], json!(true));
    assert_eq!(props["unconstraineddelegation"], json!(false));
    assert_eq!(props["trustedtoauth"], json!(true));
    assert_eq!(props["dontreqpreauth"], json!(false));
    assert_eq!(props["pwdneverexpires"], json!(true));
    assert_eq!(props["passwordnotreqd"], json!(false));
    assert_eq!(props["hasspn"], json!(true));
    assert_eq!(
        mapped["PrimaryGroupSID"],
        json!(format!("{DOMAIN_SID}-513"))
    );
    assert_eq!(
        mapped["AllowedToDelegate"],
        json!([{"ObjectIdentifier": format!("{DOMAIN_SID}-1105"), "ObjectType": "Computer"}])
    );
    assert_eq!(
        mapped["SPNTargets"],
        json!([{
            "ComputerSID": format!("{DOMAIN_SID}-1105"),
            "Port": 1433,
            "Service": "SQLAdmin",
        }])
    );
}

#[test]
fn trust_record_mapping() {
    let dump = sample_dump();
    let trust = adenum::graph::structure::map_trusted_domain(dump.records("trusted_domains")[0]);
    assert_eq!(
        trust,
        json!({
            "TargetDomainName": "PARTNER.LOCAL",
            "TargetDomainSid": "S-1-5-21-111-222-333",
            "IsTransitive": true,
            "TrustDirection": "Bidirectional",
            "TrustType": "ParentChild",
            "SidFilteringEnabled": false,
        })
    );
}

#[test]
fn trust_derivation_from_flags() {
    let mut records: Vec<Record> = vec![
        record(json!({"trustAttributesFlags": ["WITHIN_FOREST"]})),
        record(json!({"trustAttributesFlags": ["FOREST_TRANSITIVE", "TREAT_AS_EXTERNAL"]})),
        record(json!({"trustAttributesFlags": ["QUARANTINED_DOMAIN"]})),
    ];
    adenum::collector::derive_trust_properties(&mut records);
    assert_eq!(records[0]["sidFiltering"], json!(false));
    assert_eq!(records[0]["transitive"], json!(true));
    assert_eq!(records[1]["transitive"], json!(false));
    assert_eq!(records[2]["sidFiltering"], json!(true));

    assert_eq!(
        adenum::graph::structure::map_trusted_domain(&records[1])["TrustType"],
        json!("Forest")
    );
    assert_eq!(
        adenum::graph::structure::map_trusted_domain(&records[2])["TrustType"],
        json!("External")
    );
}

#[test]
fn gplink_resolution_drops_missing_gpos() {
    let dump = sample_dump();
    let asm = GraphAssembler::from_dump(&dump);
    let ou = dump.records("ous")[0];
    let mapped = adenum::graph::structure::map_ou(&asm, ou);
    assert_eq!(
        mapped["Links"],
        json!([{"GUID": "AAAAAAAA-1111-2222-3333-444444444444", "IsEnforced": false}])
    );
    assert_eq!(
        mapped["Properties"].as_object().unwrap()["blocksinheritance"],
        json!(true)
    );
}

#[test]
fn domain_mapping_functional_level() {
    let dump = sample_dump();
    let asm = GraphAssembler::from_dump(&dump);
    let domain = dump.records("domains")[0];
    let mapped = adenum::graph::structure::map_domain(&asm, domain);
    let props = mapped["Properties"].as_object().unwrap();
    assert_eq!(props["functionallevel"], json!("2016"));
    assert_eq!(props["name"], json!("EXAMPLE.LOCAL"));
    assert_eq!(props["domainsid"], json!(DOMAIN_SID));
}

#[test]
fn graph_assembly_is_idempotent() {
    let dump = sample_dump();
    let asm = GraphAssembler::from_dump(&dump);
    let base = std::env::temp_dir().join(format!("adenum-test-{}", std::process::id()));
    let dir_a = base.join("a");
    let dir_b = base.join("b");
    std::fs::create_dir_all(&dir_a).unwrap();
    std::fs::create_dir_all(&dir_b).unwrap();

    let written_a = asm.convert(&dir_a, "", "20230501000000").unwrap();
    let written_b = asm.convert(&dir_b, "", "20230501000000").unwrap();
    assert_eq!(written_a.len(), written_b.len());
    for (a, b) in written_a.iter().zip(written_b.iter()) {
        assert_eq!(a.file_name(), b.file_name());
        assert_eq!(std::fs::read(a).unwrap(), std::fs::read(b).unwrap());
    }

    let domains_file = written_a
        .iter()
        .find(|p| p.file_name().unwrap().to_string_lossy().contains("domains"))
        .unwrap();
    let parsed: Value = serde_json::from_str(&std::fs::read_to_string(domains_file).unwrap()).unwrap();
    assert_eq!(parsed["meta"]["version"], json!(6));
    assert_eq!(parsed["meta"]["type"], json!("domains"));
    assert_eq!(parsed["meta"]["count"], json!(1));
    assert_eq!(parsed["data"][0]["Trusts"][0]["TrustType"], json!("ParentChild"));

    let _ = std::fs::remove_dir_all(&base);
}

#[test]
fn group_member_resolution() {
    let mut sections = sample_dump().sections().clone();
    sections.insert(
        "groups".to_string(),
        json!([{
            "objectSid": format!("{DOMAIN_SID}-1120"),
            "distinguishedName": "CN=Ops,CN=Users,DC=example,DC=local",
            "name": "Ops",
            "sAMAccountName": "ops",
            "objectCategory": "CN=Group,CN=Schema,CN=Configuration,DC=example,DC=local",
            "member": [
                "CN=Alice,CN=Users,DC=example,DC=local",
                "CN=S-1-5-21-999-888-777-1000,CN=ForeignSecurityPrincipals,DC=example,DC=local",
                "CN=Ghost,CN=Users,DC=example,DC=local",
            ],
        }]),
    );
    let dump = Dump::new(sections);
    let asm = GraphAssembler::from_dump(&dump);
    let group = dump.records("groups")[0];
    let mapped = adenum::graph::principals::map_group(&asm, group);
    assert_eq!(
        mapped["Members"],
        json!([
            {"ObjectIdentifier": format!("{DOMAIN_SID}-1104"), "ObjectType": "User"},
            {"ObjectIdentifier": "S-1-5-21-999-888-777-1000", "ObjectType": "Group"},
            {"ObjectIdentifier": "CN=Ghost,CN=Users,DC=example,DC=local", "ObjectType": "Unknown"},
        ])
    );
    assert_eq!(mapped["ObjectIdentifier"], json!(format!("{DOMAIN_SID}-1120")));
}

#[test]
fn contained_by_builtin_and_domain_parents() {
    let dump = sample_dump();
    let asm = GraphAssembler::from_dump(&dump);

    let builtin_child = record(json!({
        "objectSid": format!("{DOMAIN_SID}-544"),
        "distinguishedName": "CN=Administrators,CN=Builtin,DC=example,DC=local",
        "name": "Administrators",
        "objectCategory": "CN=Group,CN=Schema,CN=Configuration,DC=example,DC=local",
    }));
    let mapped = adenum::graph::principals::map_group(&asm, &builtin_child);
    assert_eq!(
        mapped["ContainedBy"],
        json!({"ObjectIdentifier": "S-1-5-32", "ObjectType": "Base"})
    );

    // a child of a collected domain head resolves to the domain
    let domain_child = record(json!({
        "objectSid": format!("{DOMAIN_SID}-1190"),
        "distinguishedName": "CN=Orphan,DC=example,DC=local",
        "name": "Orphan",
        "objectCategory": "CN=Group,CN=Schema,CN=Configuration,DC=example,DC=local",
    }));
    let mapped = adenum::graph::principals::map_group(&asm, &domain_child);
    assert_eq!(
        mapped["ContainedBy"],
        json!({"ObjectIdentifier": DOMAIN_SID, "ObjectType": "Domain"})
    );

    // an uncollected domain parent resolves to null
    let foreign_child = record(json!({
        "objectSid": format!("{DOMAIN_SID}-1191"),
        "distinguishedName": "CN=Stray,DC=other,DC=local",
        "name": "Stray",
        "objectCategory": "CN=Group,CN=Schema,CN=Configuration,DC=example,DC=local",
    }));
    let mapped = adenum::graph::principals::map_group(&asm, &foreign_child);
    assert_eq!(mapped["ContainedBy"], Value::Null);
}

#[test]
fn map_record_has_common_shape() {
    let dump = sample_dump();
    let asm = GraphAssembler::from_dump(&dump);
    let user = dump.records("users")[0];
    let mapped = adenum::graph::principals::map_user(&asm, user);
    for key in ["Properties", "IsDeleted", "ObjectIdentifier", "ContainedBy", "Aces"] {
        assert!(mapped.contains_key(key), "missing {key}");
    }
    let props = mapped["Properties"].as_object().unwrap();
    assert_eq!(props["name"], json!("ALICE@EXAMPLE.LOCAL"));
    assert_eq!(props["domain"], json!("EXAMPLE.LOCAL"));
    assert_eq!(props["domainsid"], json!(DOMAIN_SID));
}
