//! Event normalizer
//!
//! Turns one raw tracker notification into a [`ChangeEvent`]. Every tracker
//! header listed in [`REQUIRED_HEADERS`] must be present (an empty value is
//! fine) and the subject must reference a bug number; anything else is a
//! [`MalformedEventError`].

use crate::error::MalformedEventError;
use crate::mail::RawMessage;
use crate::types::{BugId, ChangeEvent, ChangedFields, ClassificationMeta, LifecycleType};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

pub const ASSIGNED_TO: &str = "X-Bugzilla-Assigned-To";
pub const CHANGED_FIELDS: &str = "X-Bugzilla-Changed-Fields";
pub const CLASSIFICATION: &str = "X-Bugzilla-Classification";
pub const COMPONENT: &str = "X-Bugzilla-Component";
pub const FOUND_BY: &str = "X-Bugzilla-Foundby";
pub const KEYWORDS: &str = "X-Bugzilla-Keywords";
pub const PRIORITY: &str = "X-Bugzilla-Priority";
pub const PRODUCT: &str = "X-Bugzilla-Product";
pub const SEVERITY: &str = "X-Bugzilla-Severity";
pub const STATUS: &str = "X-Bugzilla-Status";
pub const TARGET_MILESTONE: &str = "X-Bugzilla-Target-Milestone";
pub const TYPE: &str = "X-Bugzilla-Type";
pub const VERSION: &str = "X-Bugzilla-Version";
pub const WHO: &str = "X-Bugzilla-Who";

/// Tracker headers every notification must carry
pub const REQUIRED_HEADERS: [&str; 14] = [
    ASSIGNED_TO,
    CHANGED_FIELDS,
    CLASSIFICATION,
    COMPONENT,
    FOUND_BY,
    KEYWORDS,
    PRIORITY,
    PRODUCT,
    SEVERITY,
    STATUS,
    TARGET_MILESTONE,
    TYPE,
    VERSION,
    WHO,
];

fn bug_ref() -> &'static Regex {
    static PATTERN: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\[Bug (\d+)\]").expect("Valid bug reference regex"));
    &PATTERN
}

/// Extract the bug number from a notification subject
pub fn bug_id_from_subject(subject: &str) -> Result<BugId, MalformedEventError> {
    bug_ref()
        .captures(subject)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| MalformedEventError::MissingBugId(subject.to_string()))
}

/// Build a change event from a raw notification
pub fn normalize(message: &RawMessage) -> Result<ChangeEvent, MalformedEventError> {
    let required = |name: &str| -> Result<String, MalformedEventError> {
        message
            .header(name)
            .map(str::to_string)
            .ok_or_else(|| MalformedEventError::MissingHeader(name.to_string()))
    };

    // Check the whole header set up front so the error names the first gap
    for name in REQUIRED_HEADERS {
        required(name)?;
    }

    let subject = message
        .header("Subject")
        .ok_or_else(|| MalformedEventError::MissingHeader("Subject".to_string()))?
        .to_string();
    let bug_id = bug_id_from_subject(&subject)?;

    let lifecycle_type = LifecycleType::from(required(TYPE)?.as_str());

    let timestamp = timestamp_of(message)?;

    Ok(ChangeEvent {
        timestamp,
        reporter_name: required(WHO)?,
        subject,
        bug_id,
        lifecycle_type,
        status: required(STATUS)?,
        changed_fields: ChangedFields::parse(&required(CHANGED_FIELDS)?),
        body_text: message.body.clone(),
        assignee: required(ASSIGNED_TO)?,
        classification_meta: ClassificationMeta {
            classification: required(CLASSIFICATION)?,
            component: required(COMPONENT)?,
            found_by: required(FOUND_BY)?,
            keywords: required(KEYWORDS)?,
            priority: required(PRIORITY)?,
            product: required(PRODUCT)?,
            severity: required(SEVERITY)?,
            target_milestone: required(TARGET_MILESTONE)?,
            version: required(VERSION)?,
        },
    })
}

fn timestamp_of(message: &RawMessage) -> Result<DateTime<Utc>, MalformedEventError> {
    if let Some(at) = message.received_at {
        return Ok(at);
    }
    let date = message
        .header("Date")
        .ok_or_else(|| MalformedEventError::InvalidTimestamp(String::new()))?;
    DateTime::parse_from_rfc2822(date)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| MalformedEventError::InvalidTimestamp(date.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(extra: &[(&str, &str)], skip: Option<&str>) -> RawMessage {
        let mut headers: Vec<(String, String)> = vec![
            ("Subject".into(), "[Bug 812345] New: zypper crashes on refresh".into()),
            ("Date".into(), "Fri, 27 Sep 2013 10:15:00 +0200".into()),
        ];
        for name in REQUIRED_HEADERS {
            if Some(name) == skip {
                continue;
            }
            let value = match name {
                TYPE => "new",
                WHO => "alice@example.com",
                STATUS => "NEW",
                CHANGED_FIELDS => "",
                CLASSIFICATION => "openSUSE",
                _ => "x",
            };
            headers.push((name.to_string(), value.to_string()));
        }
        for (k, v) in extra {
            headers.retain(|(name, _)| name != k);
            headers.push((k.to_string(), v.to_string()));
        }
        RawMessage::new(headers, "--- Comment #0 from Alice ---\nIt crashes.")
    }

    #[test]
    fn test_normalize_complete_message() {
        let event = normalize(&notification(&[], None)).unwrap();
        assert_eq!(event.bug_id, BugId(812345));
        assert_eq!(event.reporter_name, "alice@example.com");
        assert_eq!(event.lifecycle_type, LifecycleType::New);
        assert_eq!(event.status, "NEW");
        assert!(event.changed_fields.is_empty());
        assert_eq!(event.classification_meta.classification, "openSUSE");
        assert_eq!(event.timestamp.to_rfc3339(), "2013-09-27T08:15:00+00:00");
        assert_eq!(event.title(), "zypper crashes on refresh");
    }

    #[test]
    fn test_missing_header_is_malformed() {
        let err = normalize(&notification(&[], Some(WHO))).unwrap_err();
        assert_eq!(err, MalformedEventError::MissingHeader(WHO.to_string()));
    }

    #[test]
    fn test_subject_without_bug_id_is_malformed() {
        let msg = notification(&[("Subject", "Your account details")], None);
        assert!(matches!(
            normalize(&msg),
            Err(MalformedEventError::MissingBugId(_))
        ));
    }

    #[test]
    fn test_unknown_type_is_kept() {
        let msg = notification(&[(TYPE, "whine")], None);
        assert_eq!(
            normalize(&msg).unwrap().lifecycle_type,
            LifecycleType::Other("whine".to_string())
        );
    }

    #[test]
    fn test_missing_type_is_malformed() {
        let err = normalize(&notification(&[], Some(TYPE))).unwrap_err();
        assert_eq!(err, MalformedEventError::MissingHeader(TYPE.to_string()));
    }

    #[test]
    fn test_received_at_wins_over_date_header() {
        let at = DateTime::parse_from_rfc3339("2013-09-27T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let msg = notification(&[("Date", "not a date")], None).with_received_at(at);
        assert_eq!(normalize(&msg).unwrap().timestamp, at);
    }

    #[test]
    fn test_unparsable_date_is_malformed() {
        let msg = notification(&[("Date", "yesterday")], None);
        assert_eq!(
            normalize(&msg).unwrap_err(),
            MalformedEventError::InvalidTimestamp("yesterday".to_string())
        );
    }
}
