use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{Error, Unexpected},
};
use std::fmt::{Display, Formatter};
use thiserror::Error;
use time::{Duration, UtcDateTime, macros::utc_datetime};

const UNIX_EPOCH: UtcDateTime = utc_datetime!(1970-01-01 00:00);

/// A point in time with millisecond precision, persisted as unix milliseconds.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct Timestamp(UtcDateTime);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The unix timestamp is out of range: {0}ms")]
pub struct InvalidTimestampError(i64);

impl Timestamp {
    /// The current time, truncated to whole milliseconds so it survives persistence unchanged.
    #[must_use]
    pub fn now() -> Self {
        let exact = Self(UtcDateTime::now());
        Self::from_unix_millis(exact.unix_millis()).unwrap_or(exact)
    }

    pub fn from_unix_millis(millis: i64) -> Result<Self, InvalidTimestampError> {
        UNIX_EPOCH
            .checked_add(Duration::milliseconds(millis))
            .map(Self)
            .ok_or(InvalidTimestampError(millis))
    }

    #[must_use]
    pub fn unix_millis(self) -> i64 {
        let millis = (self.0 - UNIX_EPOCH).whole_milliseconds();
        i64::try_from(millis).unwrap_or(if millis < 0 { i64::MIN } else { i64::MAX })
    }

    #[must_use]
    pub fn get(self) -> UtcDateTime {
        self.0
    }
}

impl From<UtcDateTime> for Timestamp {
    fn from(value: UtcDateTime) -> Self {
        Self(value)
    }
}

impl From<Timestamp> for UtcDateTime {
    fn from(value: Timestamp) -> Self {
        value.0
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(self.unix_millis())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = i64::deserialize(deserializer)?;
        Timestamp::from_unix_millis(millis)
            .map_err(|_| Error::invalid_value(Unexpected::Signed(millis), &"Timestamp"))
    }
}
