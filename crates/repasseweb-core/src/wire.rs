//! Deserialization helpers for values as the database views emit them
//!
//! Views return numerics either as numbers or as strings depending on the
//! column type, aggregates come back as `null` when nothing matched, and
//! timestamp columns may lack an offset. These helpers normalise all of that.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parse a timestamp in any of the shapes the database produces
///
/// Accepts RFC 3339, Postgres text output with a short offset, naive
/// timestamps (taken as UTC) and bare dates (midnight UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(value, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Integer(i64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Integer(n) => n.to_string(),
        }
    }
}

/// Identifier columns: uuid text or integer serial, always read as text
pub mod id {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(super::RawId::deserialize(deserializer)?.into())
    }
}

/// Optional identifiers in request bodies, text or number
pub mod id_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<super::RawId>::deserialize(deserializer)?.map(String::from))
    }
}

/// Render a JSON id (text or number) as text
pub fn id_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Money columns: number, numeric string or `null` (read as zero)
pub mod amount {
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<Decimal>::deserialize(deserializer)?.unwrap_or_default())
    }
}

/// Count columns: integer or `null` (read as zero)
pub mod count {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or_default())
    }
}

/// Required timestamp columns
pub mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {}", raw)))
    }
}

/// Nullable timestamp columns
pub mod timestamp_option {
    use chrono::{DateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => super::parse_timestamp(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {}", raw))),
        }
    }
}

/// Date columns that may arrive as full timestamps
pub mod date {
    use chrono::NaiveDate;
    use serde::{de::Error, Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| D::Error::custom(format!("invalid date: {}", raw)))
    }
}

/// Nullable date columns
pub mod date_option {
    use chrono::NaiveDate;
    use serde::{de::Error, Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => super::parse_timestamp(&raw)
                .map(|dt| Some(dt.date_naive()))
                .ok_or_else(|| D::Error::custom(format!("invalid date: {}", raw))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde::Deserialize;

    #[test]
    fn test_parse_timestamp_shapes() {
        let expected = "2024-06-01T12:30:00+00:00";
        for raw in [
            "2024-06-01T12:30:00Z",
            "2024-06-01T09:30:00-03:00",
            "2024-06-01 12:30:00+00",
            "2024-06-01T12:30:00",
            "2024-06-01 12:30:00.000",
        ] {
            let parsed = parse_timestamp(raw).unwrap_or_else(|| panic!("failed on {}", raw));
            assert_eq!(parsed.to_rfc3339(), expected, "input {}", raw);
        }
        assert_eq!(
            parse_timestamp("2024-06-01").unwrap().to_rfc3339(),
            "2024-06-01T00:00:00+00:00"
        );
        assert!(parse_timestamp("ontem").is_none());
    }

    #[derive(Deserialize)]
    struct Row {
        #[serde(with = "amount", default)]
        valor: Decimal,
        #[serde(with = "count", default)]
        qtd: i64,
    }

    #[test]
    fn test_amount_accepts_numbers_strings_and_null() {
        let row: Row = serde_json::from_str(r#"{"valor": 12.5, "qtd": 3}"#).unwrap();
        assert_eq!(row.valor, dec!(12.5));
        assert_eq!(row.qtd, 3);

        let row: Row = serde_json::from_str(r#"{"valor": "99.90", "qtd": null}"#).unwrap();
        assert_eq!(row.valor, dec!(99.90));
        assert_eq!(row.qtd, 0);

        let row: Row = serde_json::from_str(r#"{"valor": null}"#).unwrap();
        assert_eq!(row.valor, Decimal::ZERO);
    }
}
