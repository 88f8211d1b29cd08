use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime, UtcOffset};

/// Body shared by event creation and the `data` part of the PATCH upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub title: String,
    pub description: String,
    pub location: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,
    pub is_public: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must not be blank")]
    Blank(&'static str),

    #[error("endTime is before startTime")]
    EndsBeforeStart,
}

impl EventPayload {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("title", &self.title),
            ("description", &self.description),
            ("location", &self.location),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::Blank(field));
            }
        }

        if self.end_time < self.start_time {
            return Err(ValidationError::EndsBeforeStart);
        }

        Ok(())
    }
}

/// UTC with the sub-second part dropped. Event times are kept as RFC 3339
/// text, which only sorts correctly when every value has the same shape.
pub(crate) fn stored_time(time: OffsetDateTime) -> OffsetDateTime {
    let time = time.to_offset(UtcOffset::UTC);
    time - Duration::nanoseconds(i64::from(time.nanosecond()))
}
