//! Column encoding helpers shared by the row models.
//!
//! Ids are stored as hyphenated UUID text, timestamps as naive UTC and enums
//! as their snake_case names.

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

use crate::errors::StorageError;

pub(crate) fn parse_id(table: &'static str, value: &str) -> Result<Uuid, StorageError> {
    Uuid::parse_str(value).map_err(|e| StorageError::corrupt(table, format!("{}: {}", value, e)))
}

pub(crate) fn parse_opt_id(
    table: &'static str,
    value: Option<String>,
) -> Result<Option<Uuid>, StorageError> {
    value.map(|v| parse_id(table, &v)).transpose()
}

pub(crate) fn id_text(value: Option<Uuid>) -> Option<String> {
    value.map(|id| id.to_string())
}

pub(crate) fn parse_enum<T>(table: &'static str, value: &str) -> Result<T, StorageError>
where
    T: FromStr,
    T::Err: Display,
{
    value.parse().map_err(|e| StorageError::corrupt(table, e))
}

pub(crate) fn utc(value: NaiveDateTime) -> DateTime<Utc> {
    value.and_utc()
}

pub(crate) fn opt_utc(value: Option<NaiveDateTime>) -> Option<DateTime<Utc>> {
    value.map(utc)
}

pub(crate) fn naive(value: DateTime<Utc>) -> NaiveDateTime {
    value.naive_utc()
}

pub(crate) fn opt_naive(value: Option<DateTime<Utc>>) -> Option<NaiveDateTime> {
    value.map(naive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rangeops_core::tasks::ResultStatus;

    #[test]
    fn test_parse_id_reports_table() {
        let err = parse_id("tasks", "not-a-uuid").unwrap_err();
        assert!(err.to_string().contains("tasks"));
    }

    #[test]
    fn test_parse_enum_uses_wire_names() {
        let status: ResultStatus = parse_enum("results", "succeeded").unwrap();
        assert_eq!(status, ResultStatus::Succeeded);
        assert!(parse_enum::<ResultStatus>("results", "Succeeded").is_err());
    }
}
