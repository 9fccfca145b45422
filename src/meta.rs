use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// Audit stamp shared by users and sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub is_active: bool,
}

impl Meta {
    /// Stamp for a record that is being written for the first time.
    pub fn fresh(now: OffsetDateTime) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            is_active: true,
        }
    }

    /// Stamp for a rewrite of an existing record. `created_at` is carried over
    /// and `updated_at` always moves past the previous value.
    pub fn touched(previous: Option<Meta>, now: OffsetDateTime) -> Self {
        match previous {
            None => Self::fresh(now),
            Some(prev) => {
                let updated_at = if now > prev.updated_at {
                    now
                } else {
                    prev.updated_at + Duration::microseconds(1)
                };
                Self {
                    created_at: prev.created_at,
                    updated_at,
                    is_active: true,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn fresh_sets_both_stamps_and_activates() {
        let now = datetime!(2024-03-01 10:00 UTC);
        let meta = Meta::fresh(now);
        assert_eq!(meta.created_at, now);
        assert_eq!(meta.updated_at, now);
        assert!(meta.is_active);
    }

    #[test]
    fn touched_keeps_created_at() {
        let created = datetime!(2024-03-01 10:00 UTC);
        let later = datetime!(2024-03-02 08:30 UTC);
        let meta = Meta::touched(Some(Meta::fresh(created)), later);
        assert_eq!(meta.created_at, created);
        assert_eq!(meta.updated_at, later);
    }

    #[test]
    fn touched_advances_when_clock_stalls() {
        let at = datetime!(2024-03-01 10:00 UTC);
        let meta = Meta::touched(Some(Meta::fresh(at)), at);
        assert!(meta.updated_at > at);
    }

    #[test]
    fn serialises_with_wire_attribute_names() {
        let meta = Meta::fresh(datetime!(2024-03-01 10:00 UTC));
        let json = serde_json::to_value(meta).unwrap();
        assert_eq!(json["created_at"], "2024-03-01T10:00:00Z");
        assert_eq!(json["is_active"], true);
        assert!(json.get("updated_at").is_some());
    }
}
