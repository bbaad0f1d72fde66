//! Typed coercion of directory attribute values.
//!
//! The LDAP transport hands back strings and byte blobs; this layer turns
//! them into the dump's JSON shapes: timestamps rendered (or epoch in
//! timestamp mode), intervals stringified, binary decoded to UTF-8 or
//! lowercase hex, known binary attributes to their canonical text form,
//! flag words expanded into `<name>Flags`, lookups into `<name>Resolved`
//! and PKI periods into unit strings.

use ldap3::SearchEntry;
use serde_json::{Map, Value};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time};

use crate::registry::{expand_flags, lookup, FLAG_ATTRIBUTES, LOOKUP_ATTRIBUTES};

/// One enumerated entry, keyed by attribute name.
pub type Record = Map<String, Value>;

/// Seconds between 1601-01-01 and the Unix epoch.
const FILETIME_EPOCH_OFFSET: i64 = 11_644_473_600;

/// Attributes carrying ASN.1 GeneralizedTime values.
const GENERALIZED_TIME_ATTRIBUTES: &[&str] = &[
    "whenCreated",
    "whenChanged",
    "createTimeStamp",
    "modifyTimeStamp",
    "dSCorePropagationData",
];

/// Attributes carrying absolute FILETIME values (100ns since 1601).
const FILETIME_ATTRIBUTES: &[&str] = &[
    "lastLogon",
    "lastLogonTimestamp",
    "pwdLastSet",
    "badPasswordTime",
    "accountExpires",
    "lockoutTime",
    "ms-Mcs-AdmPwdExpirationTime",
    "msLAPS-PasswordExpirationTime",
    "creationTime",
];

/// Attributes carrying negative relative intervals (100ns units).
const INTERVAL_ATTRIBUTES: &[&str] = &[
    "maxPwdAge",
    "minPwdAge",
    "lockoutDuration",
    "lockOutObservationWindow",
    "forceLogoff",
];

/// Attributes that keep list shape even with a single value.
const LIST_ATTRIBUTES: &[&str] = &[
    "objectClass",
    "dSCorePropagationData",
    "description",
    "member",
    "memberOf",
    "servicePrincipalName",
    "msDS-AllowedToDelegateTo",
    "msDS-HostServiceAccount",
    "sIDHistory",
    "cACertificate",
    "crossCertificatePair",
    "certificateTemplates",
    "msPKI-Certificate-Application-Policy",
    "msPKI-Certificate-Policy",
    "msPKI-RA-Application-Policies",
    "msPKI-RA-Policies",
    "pKIExtendedKeyUsage",
    "mayContain",
    "mustContain",
    "systemMayContain",
    "systemMustContain",
];

/// Descriptor-valued attributes; kept as hex until post-processing, which
/// needs the fully populated SID catalog to decode them.
pub const SECURITY_DESCRIPTOR_ATTRIBUTES: &[&str] = &[
    "nTSecurityDescriptor",
    "msDS-GroupMSAMembership",
    "msDS-AllowedToActOnBehalfOfOtherIdentity",
];

const PKI_PERIOD_ATTRIBUTES: &[&str] = &["pKIExpirationPeriod", "pKIOverlapPeriod"];

const TIMESTAMP_FORMAT: &'static [FormatItem<'static>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6] UTC +0000"
);

fn contains(set: &[&str], name: &str) -> bool {
    set.iter().any(|a| a.eq_ignore_ascii_case(name))
}

/// Renders an absolute time the way the dump does, or as a Unix epoch
/// in timestamp mode.
pub fn render_datetime(dt: OffsetDateTime, timestamp_mode: bool) -> Value {
    if timestamp_mode {
        Value::from(dt.unix_timestamp())
    } else {
        match dt.format(TIMESTAMP_FORMAT) {
            Ok(s) => Value::from(s),
            Err(_) => Value::from(dt.unix_timestamp()),
        }
    }
}

/// Parses a dump-rendered timestamp back to a Unix epoch.
pub fn parse_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => PrimitiveDateTime::parse(s, TIMESTAMP_FORMAT)
            .ok()
            .map(|dt| dt.assume_utc().unix_timestamp()),
        _ => None,
    }
}

fn parse_generalized_time(raw: &str) -> Option<OffsetDateTime> {
    if raw.len() < 14 || !raw.as_bytes()[..14].iter().all(u8::is_ascii_digit) {
        return None;
    }
    let num = |r: std::ops::Range<usize>| raw[r].parse::<u32>().ok();
    let date = Date::from_calendar_date(
        num(0..4)? as i32,
        Month::try_from(num(4..6)? as u8).ok()?,
        num(6..8)? as u8,
    )
    .ok()?;
    let time = Time::from_hms(num(8..10)? as u8, num(10..12)? as u8, num(12..14)? as u8).ok()?;
    Some(PrimitiveDateTime::new(date, time).assume_utc())
}

fn filetime_to_datetime(value: i64) -> Option<OffsetDateTime> {
    if value <= 0 || value == i64::MAX {
        return None;
    }
    let secs = value / 10_000_000 - FILETIME_EPOCH_OFFSET;
    let micros = (value % 10_000_000) / 10;
    OffsetDateTime::from_unix_timestamp(secs)
        .ok()
        .map(|dt| dt + time::Duration::microseconds(micros))
}

/// Renders a negative 100ns interval the way `timedelta` stringifies:
/// `[-D days, ]H:MM:SS`.
fn render_interval(value: i64) -> String {
    let total_secs = -value / 10_000_000;
    let (sign, secs) = if total_secs < 0 {
        ("-", -total_secs)
    } else {
        ("", total_secs)
    };
    let days = secs / 86_400;
    let rem = secs % 86_400;
    let (h, m, s) = (rem / 3600, (rem % 3600) / 60, rem % 60);
    if days > 0 {
        format!(
            "{sign}{days} day{}, {h}:{m:02}:{s:02}",
            if days == 1 { "" } else { "s" }
        )
    } else {
        format!("{sign}{h}:{m:02}:{s:02}")
    }
}

/// Converts a PKI period (eight-byte signed LE count of negative 100ns
/// intervals) into the largest exact unit, or an empty string.
pub fn convert_pki_period(raw: &[u8]) -> String {
    let Ok(bytes) = <[u8; 8]>::try_from(raw) else {
        return String::new();
    };
    let seconds = i64::from_le_bytes(bytes) as f64 * -1e-7;
    const UNITS: &[(f64, &str)] = &[
        (31_536_000.0, "year"),
        (2_592_000.0, "month"),
        (604_800.0, "week"),
        (86_400.0, "day"),
        (3_600.0, "hour"),
    ];
    for (unit, name) in UNITS {
        if seconds % unit == 0.0 && seconds / unit >= 1.0 {
            let count = (seconds / unit) as i64;
            return if count == 1 {
                format!("1 {name}")
            } else {
                format!("{count} {name}s")
            };
        }
    }
    String::new()
}

fn hexlify(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}

pub struct Normalizer {
    pub timestamp_mode: bool,
    /// Keep `<name>_raw` fields next to converted binary values.
    pub raw: bool,
}

impl Normalizer {
    pub fn new(timestamp_mode: bool, raw: bool) -> Self {
        Self { timestamp_mode, raw }
    }

    /// Shapes one search entry into a dump record.
    pub fn normalize(&self, entry: SearchEntry) -> Record {
        let mut record = Record::new();

        for (attr, values) in &entry.attrs {
            let converted: Vec<Value> =
                values.iter().map(|v| self.convert_text(attr, v)).collect();
            record.insert(attr.clone(), self.shape(attr, converted));
        }

        for (attr, values) in &entry.bin_attrs {
            let value = self.convert_binary(&mut record, attr, values);
            record.insert(attr.clone(), value);
        }

        self.expand_flag_fields(&mut record);
        self.convert_pki_periods(&mut record, &entry);
        record
    }

    fn shape(&self, attr: &str, mut values: Vec<Value>) -> Value {
        if values.len() == 1 && !contains(LIST_ATTRIBUTES, attr) {
            values.remove(0)
        } else {
            Value::from(values)
        }
    }

    fn convert_text(&self, attr: &str, raw: &str) -> Value {
        // A descriptor blob that happens to decode as UTF-8 still has to
        // reach post-processing as hex.
        if contains(SECURITY_DESCRIPTOR_ATTRIBUTES, attr) {
            return Value::from(hexlify(raw.as_bytes()));
        }
        if contains(GENERALIZED_TIME_ATTRIBUTES, attr) {
            if let Some(dt) = parse_generalized_time(raw) {
                return render_datetime(dt, self.timestamp_mode);
            }
        }
        if contains(FILETIME_ATTRIBUTES, attr) {
            if let Ok(ft) = raw.parse::<i64>() {
                return match filetime_to_datetime(ft) {
                    Some(dt) => render_datetime(dt, self.timestamp_mode),
                    None => Value::from(ft),
                };
            }
        }
        if contains(INTERVAL_ATTRIBUTES, attr) {
            if let Ok(iv) = raw.parse::<i64>() {
                return Value::from(render_interval(iv));
            }
        }
        // The generic folds: digit strings become integers, booleans fold.
        if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(n) = raw.parse::<i64>() {
                return Value::from(n);
            }
        }
        if raw.eq_ignore_ascii_case("true") {
            return Value::from(true);
        }
        if raw.eq_ignore_ascii_case("false") {
            return Value::from(false);
        }
        Value::from(raw)
    }

    fn convert_binary(&self, record: &mut Record, attr: &str, values: &[Vec<u8>]) -> Value {
        if attr.eq_ignore_ascii_case("objectSid") {
            if let Some(first) = values.first() {
                if let Ok(sid) = crate::secdesc::Sid::parse_bytes(first) {
                    return Value::from(sid.to_string());
                }
            }
        }
        if attr.eq_ignore_ascii_case("objectGUID") {
            if let Some(first) = values.first() {
                if let Ok(guid) = crate::secdesc::Guid::parse_bytes(first) {
                    return Value::from(guid.braced());
                }
            }
        }
        if attr.eq_ignore_ascii_case("securityIdentifier") || attr.eq_ignore_ascii_case("sIDHistory")
        {
            let sids: Vec<Value> = values
                .iter()
                .filter_map(|v| crate::secdesc::Sid::parse_bytes(v).ok())
                .map(|s| Value::from(s.to_string()))
                .collect();
            if sids.len() == values.len() {
                return if attr.eq_ignore_ascii_case("sIDHistory") {
                    Value::from(sids)
                } else {
                    sids.into_iter().next().unwrap_or(Value::Null)
                };
            }
            log::debug!("Failed to convert {attr} value to a SID, keeping hex");
        }
        if contains(SECURITY_DESCRIPTOR_ATTRIBUTES, attr) {
            if self.raw {
                record.insert(
                    format!("{attr}_raw"),
                    self.shape(attr, values.iter().map(|v| Value::from(hexlify(v))).collect()),
                );
            }
            return self.shape(attr, values.iter().map(|v| Value::from(hexlify(v))).collect());
        }
        // Everything else: UTF-8 when it decodes, lowercase hex otherwise.
        let converted: Vec<Value> = values
            .iter()
            .map(|v| match std::str::from_utf8(v) {
                Ok(s) => self.convert_text(attr, s),
                Err(_) => Value::from(hexlify(v)),
            })
            .collect();
        self.shape(attr, converted)
    }

    fn expand_flag_fields(&self, record: &mut Record) {
        let mut additions: Vec<(String, Value)> = Vec::new();
        for (attr, table) in FLAG_ATTRIBUTES {
            if let Some(value) = get_ci(record, attr).and_then(Value::as_i64) {
                additions.push((
                    format!("{attr}Flags"),
                    Value::from(expand_flags(table, value as u32)),
                ));
            }
        }
        for (attr, table) in LOOKUP_ATTRIBUTES {
            if let Some(value) = get_ci(record, attr).and_then(Value::as_i64) {
                if let Some(resolved) = lookup(table, value) {
                    additions.push((format!("{attr}Resolved"), Value::from(resolved)));
                }
            }
        }
        for (key, value) in additions {
            record.insert(key, value);
        }
    }

    fn convert_pki_periods(&self, record: &mut Record, entry: &SearchEntry) {
        for attr in PKI_PERIOD_ATTRIBUTES {
            let raw_bytes = entry
                .bin_attrs
                .get(*attr)
                .and_then(|v| v.first().cloned())
                .or_else(|| {
                    entry
                        .attrs
                        .get(*attr)
                        .and_then(|v| v.first())
                        .map(|s| s.as_bytes().to_vec())
                });
            if let Some(bytes) = raw_bytes {
                if self.raw {
                    record.insert(format!("{attr}_raw"), Value::from(hexlify(&bytes)));
                }
                record.insert(attr.to_string(), Value::from(convert_pki_period(&bytes)));
            }
        }
    }
}

/// Case-insensitive attribute fetch.
pub fn get_ci<'a>(record: &'a Record, name: &str) -> Option<&'a Value> {
    record
        .get(name)
        .or_else(|| {
            record
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })
        .filter(|v| !v.is_null())
}

/// Case-insensitive fetch of a string attribute.
pub fn get_str<'a>(record: &'a Record, name: &str) -> Option<&'a str> {
    get_ci(record, name).and_then(Value::as_str)
}

/// Case-insensitive fetch folding singleton handling: returns the first
/// element of list values.
pub fn get_first<'a>(record: &'a Record, name: &str) -> Option<&'a Value> {
    match get_ci(record, name) {
        Some(Value::Array(items)) => items.first(),
        other => other,
    }
}

/// List fetch: a scalar value is treated as a one-element list.
pub fn get_list<'a>(record: &'a Record, name: &str) -> Vec<&'a Value> {
    match get_ci(record, name) {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(value) => vec![value],
        None => Vec::new(),
    }
}

/// String-list fetch for multi-valued text attributes.
pub fn get_str_list(record: &Record, name: &str) -> Vec<String> {
    get_list(record, name)
        .into_iter()
        .filter_map(Value::as_str)
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pki_period_one_year() {
        // -31536000 seconds in 100ns units, little endian
        let raw = (-315_360_000_000_000i64).to_le_bytes();
        assert_eq!(convert_pki_period(&raw), "1 year");
    }

    #[test]
    fn test_pki_period_inexact() {
        let raw: [u8; 8] = [0x80, 0x11, 0x2c, 0xd7, 0x4f, 0x8c, 0x20, 0x00];
        assert_eq!(convert_pki_period(&raw), "");
    }

    #[test]
    fn test_pki_period_units() {
        let weeks = (-6_048_000_000_000i64).to_le_bytes();
        assert_eq!(convert_pki_period(&weeks), "1 week");
        let hours = (-72_000_000_000i64).to_le_bytes();
        assert_eq!(convert_pki_period(&hours), "2 hours");
    }

    #[test]
    fn test_interval_rendering() {
        // -30 minutes
        assert_eq!(render_interval(-18_000_000_000), "0:30:00");
        // -42 days
        assert_eq!(render_interval(-36_288_000_000_000), "42 days, 0:00:00");
    }

    #[test]
    fn test_generalized_time() {
        let dt = parse_generalized_time("20230501100000.0Z").unwrap();
        assert_eq!(
            render_datetime(dt, false),
            Value::from("2023-05-01 10:00:00.000000 UTC +0000")
        );
        assert_eq!(
            parse_timestamp(&Value::from("2023-05-01 10:00:00.000000 UTC +0000")),
            Some(dt.unix_timestamp())
        );
    }

    #[test]
    fn test_filetime() {
        // 2023-05-01 10:00:00 UTC as FILETIME
        let ft = (1_682_935_200i64 + FILETIME_EPOCH_OFFSET) * 10_000_000;
        let dt = filetime_to_datetime(ft).unwrap();
        assert_eq!(dt.unix_timestamp(), 1_682_935_200);
        assert!(filetime_to_datetime(0).is_none());
        assert!(filetime_to_datetime(i64::MAX).is_none());
    }
}
