//! Deserializers for query-string parameters, where an empty value
//! (`?subject=`) must behave like a missing one.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

pub fn deserialize_optional_uuid<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt {
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => Uuid::parse_str(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

pub fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

pub fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

pub fn deserialize_optional_i16<'de, D>(deserializer: D) -> Result<Option<i16>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<i16>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Query {
        #[serde(default, deserialize_with = "deserialize_optional_uuid")]
        id: Option<Uuid>,
        #[serde(default, deserialize_with = "deserialize_optional_string")]
        subject: Option<String>,
        #[serde(default, deserialize_with = "deserialize_optional_date")]
        date: Option<NaiveDate>,
        #[serde(default, deserialize_with = "deserialize_optional_i16")]
        bimester: Option<i16>,
    }

    #[test]
    fn test_empty_values_are_none() {
        let q: Query =
            serde_json::from_str(r#"{"id":"","subject":"  ","date":"","bimester":""}"#).unwrap();
        assert!(q.id.is_none());
        assert!(q.subject.is_none());
        assert!(q.date.is_none());
        assert!(q.bimester.is_none());
    }

    #[test]
    fn test_values_are_parsed() {
        let q: Query = serde_json::from_str(
            r#"{"id":"12345678-1234-1234-1234-123456789abc","subject":" Math ","date":"2024-03-01","bimester":"2"}"#,
        )
        .unwrap();
        assert!(q.id.is_some());
        assert_eq!(q.subject.as_deref(), Some("Math"));
        assert_eq!(q.date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(q.bimester, Some(2));
    }

    #[test]
    fn test_bad_date_is_rejected() {
        assert!(serde_json::from_str::<Query>(r#"{"date":"01/03/2024"}"#).is_err());
    }
}
