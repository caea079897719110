use serde::{
    Deserializer,
    de::{self, Visitor},
};
use snb_model::Timestamp;

pub struct TimestampVisitor;

impl<'de> Visitor<'de> for TimestampVisitor {
    type Value = Timestamp;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("epoch milliseconds, an RFC 3339 instant or a YYYY-MM-DD date")
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Timestamp::from_millis(value))
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        let millis = i64::try_from(value).map_err(E::custom)?;
        Ok(Timestamp::from_millis(millis))
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        parse(value).ok_or_else(|| E::invalid_value(de::Unexpected::Str(value), &self))
    }
}

/// Epoch milliseconds, an RFC 3339 instant or a `YYYY-MM-DD` date at UTC midnight.
pub fn parse(value: &str) -> Option<Timestamp> {
    if let Ok(millis) = value.parse::<i64>() {
        return Some(Timestamp::from_millis(millis));
    }
    if let Ok(instant) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(Timestamp::from_millis(instant.timestamp_millis()));
    }
    let date = chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?.and_utc();
    Some(Timestamp::from_millis(midnight.timestamp_millis()))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Timestamp, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(TimestampVisitor)
}
