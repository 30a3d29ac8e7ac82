// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Friendship health classification.
//!
//! Health is never stored. It is derived on every read from the contact's
//! cadence, the timestamp of its most recent interaction, and the current
//! time supplied by the caller.

use crate::models::{Contact, ContactCadence};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Green/yellow boundary as a fraction of the cadence (7/10).
const GREEN_RATIO_NUMERATOR: i64 = 7;
const GREEN_RATIO_DENOMINATOR: i64 = 10;

/// Three-level freshness classification of a relationship.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Green,
    Yellow,
    Red,
    /// Display placeholder before a classification has been computed.
    #[default]
    Unknown,
}

/// Result of classifying one contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthAssessment {
    pub status: HealthStatus,
    /// Whole days since the last interaction; `None` if there never was one.
    pub days_since_contact: Option<i64>,
}

/// Classify a contact given its last interaction, cadence and the current time.
///
/// Both boundaries are inclusive: exactly 70% of the cadence is still green and
/// exactly the cadence is still yellow.
pub fn classify(
    last_interaction_at: Option<DateTime<Utc>>,
    cadence: ContactCadence,
    now: DateTime<Utc>,
) -> HealthAssessment {
    let Some(last) = last_interaction_at else {
        return HealthAssessment {
            status: HealthStatus::Red,
            days_since_contact: None,
        };
    };

    // Whole elapsed days; partial days are truncated. An interaction stamped
    // after `now` counts as today.
    let days_since = now.signed_duration_since(last).num_days().max(0);
    let target_days = cadence.days();

    // Integer comparison keeps the 70% boundary exact (0.7 * 90 is not 63.0 in f64).
    let status = if days_since * GREEN_RATIO_DENOMINATOR <= target_days * GREEN_RATIO_NUMERATOR {
        HealthStatus::Green
    } else if days_since <= target_days {
        HealthStatus::Yellow
    } else {
        HealthStatus::Red
    };

    HealthAssessment {
        status,
        days_since_contact: Some(days_since),
    }
}

/// A contact together with its derived health.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactHealth {
    pub contact: Contact,
    pub last_interaction_at: Option<DateTime<Utc>>,
    pub health: HealthAssessment,
}

impl ContactHealth {
    pub fn evaluate(
        contact: Contact,
        last_interaction_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        let health = classify(last_interaction_at, contact.cadence, now);
        Self {
            contact,
            last_interaction_at,
            health,
        }
    }
}

/// Select contacts that are due (or due within `threshold` days).
///
/// A contact is selected if it was never contacted or if
/// `days_since_contact >= cadence_days - threshold`. Results are ordered by
/// days since contact, longest first, with never-contacted entries leading.
/// Ties keep their input order.
pub fn select_needing_contact(contacts: Vec<ContactHealth>, threshold: i64) -> Vec<ContactHealth> {
    let mut selected: Vec<ContactHealth> = contacts
        .into_iter()
        .filter(|c| match c.health.days_since_contact {
            None => true,
            Some(days) => days >= c.contact.cadence.days().saturating_sub(threshold),
        })
        .collect();

    // sort_by_key is stable
    selected.sort_by_key(|c| Reverse(c.health.days_since_contact.unwrap_or(i64::MAX)));
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RelationKind;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn days_ago(days: i64) -> Option<DateTime<Utc>> {
        Some(now() - Duration::days(days))
    }

    fn contact(id: &str, cadence: ContactCadence) -> Contact {
        Contact {
            id: id.to_string(),
            device_id: "device-1".to_string(),
            name: id.to_string(),
            nickname: None,
            relation: RelationKind::Friend,
            cadence,
            notes: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn test_never_contacted_is_red() {
        for cadence in ContactCadence::ALL {
            let result = classify(None, cadence, now());
            assert_eq!(result.status, HealthStatus::Red);
            assert_eq!(result.days_since_contact, None);
        }
    }

    #[test]
    fn test_weekly_examples() {
        let weekly = ContactCadence::Weekly;
        assert_eq!(classify(days_ago(2), weekly, now()).status, HealthStatus::Green);
        assert_eq!(classify(days_ago(6), weekly, now()).status, HealthStatus::Yellow);
        assert_eq!(classify(days_ago(10), weekly, now()).status, HealthStatus::Red);
        assert_eq!(
            classify(days_ago(10), weekly, now()).days_since_contact,
            Some(10)
        );
    }

    #[test]
    fn test_thresholds_for_every_cadence() {
        for cadence in ContactCadence::ALL {
            let target = cadence.days();
            for d in 0..=target + 5 {
                let expected = if d * 10 <= target * 7 {
                    HealthStatus::Green
                } else if d <= target {
                    HealthStatus::Yellow
                } else {
                    HealthStatus::Red
                };
                assert_eq!(
                    classify(days_ago(d), cadence, now()).status,
                    expected,
                    "cadence {:?}, {} days",
                    cadence,
                    d
                );
            }
        }
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        // 70% of 30 and 90 land on whole days
        assert_eq!(
            classify(days_ago(21), ContactCadence::Monthly, now()).status,
            HealthStatus::Green
        );
        assert_eq!(
            classify(days_ago(63), ContactCadence::Quarterly, now()).status,
            HealthStatus::Green
        );
        assert_eq!(
            classify(days_ago(64), ContactCadence::Quarterly, now()).status,
            HealthStatus::Yellow
        );
        assert_eq!(
            classify(days_ago(30), ContactCadence::Monthly, now()).status,
            HealthStatus::Yellow
        );
        assert_eq!(
            classify(days_ago(31), ContactCadence::Monthly, now()).status,
            HealthStatus::Red
        );
    }

    #[test]
    fn test_partial_days_truncate() {
        let last = now() - Duration::days(4) - Duration::hours(23);
        let result = classify(Some(last), ContactCadence::Weekly, now());
        assert_eq!(result.days_since_contact, Some(4));
        assert_eq!(result.status, HealthStatus::Green);
    }

    #[test]
    fn test_future_interaction_counts_as_today() {
        let ahead = Some(now() + Duration::days(3));
        let result = classify(ahead, ContactCadence::Weekly, now());
        assert_eq!(result.status, HealthStatus::Green);
        assert_eq!(result.days_since_contact, Some(0));
    }

    #[test]
    fn test_select_needing_contact_extreme_thresholds() {
        let late = ContactHealth::evaluate(contact("a", ContactCadence::Weekly), days_ago(8), now());
        let fresh = ContactHealth::evaluate(contact("b", ContactCadence::Weekly), days_ago(0), now());
        let never = ContactHealth::evaluate(contact("c", ContactCadence::Monthly), None, now());
        let all = vec![late, fresh, never];

        let selected = select_needing_contact(all.clone(), i64::MIN);
        let ids: Vec<&str> = selected.iter().map(|s| s.contact.id.as_str()).collect();
        assert_eq!(ids, vec!["c"]);

        let selected = select_needing_contact(all, i64::MAX);
        let ids: Vec<&str> = selected.iter().map(|s| s.contact.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_select_needing_contact_excludes_yellow() {
        let never = ContactHealth::evaluate(contact("never", ContactCadence::Monthly), None, now());
        let recent = ContactHealth::evaluate(
            contact("recent", ContactCadence::Weekly),
            days_ago(5),
            now(),
        );
        assert_eq!(recent.health.status, HealthStatus::Yellow);

        let selected = select_needing_contact(vec![recent, never], 0);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].contact.id, "never");
    }

    #[test]
    fn test_select_needing_contact_threshold_and_order() {
        let a = ContactHealth::evaluate(contact("a", ContactCadence::Weekly), days_ago(8), now());
        let b = ContactHealth::evaluate(contact("b", ContactCadence::Weekly), days_ago(5), now());
        let c = ContactHealth::evaluate(contact("c", ContactCadence::Monthly), None, now());
        let d = ContactHealth::evaluate(contact("d", ContactCadence::Weekly), days_ago(20), now());

        let selected = select_needing_contact(vec![a.clone(), b.clone(), c.clone(), d.clone()], 0);
        let ids: Vec<&str> = selected.iter().map(|s| s.contact.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "d", "a"]);

        // Due within two days: 5 >= 7 - 2
        let selected = select_needing_contact(vec![a, b, c, d], 2);
        let ids: Vec<&str> = selected.iter().map(|s| s.contact.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "d", "a", "b"]);
    }

    #[test]
    fn test_select_needing_contact_is_stable() {
        let first = ContactHealth::evaluate(contact("first", ContactCadence::Weekly), None, now());
        let second = ContactHealth::evaluate(contact("second", ContactCadence::Monthly), None, now());
        let third = ContactHealth::evaluate(contact("third", ContactCadence::Weekly), days_ago(9), now());
        let fourth =
            ContactHealth::evaluate(contact("fourth", ContactCadence::Biweekly), days_ago(9), now());

        let selected = select_needing_contact(vec![first, third, second, fourth], 0);
        let ids: Vec<&str> = selected.iter().map(|s| s.contact.id.as_str()).collect();
        // fourth (9 < 14) is not due
        assert_eq!(ids, vec!["first", "second", "third"]);
    }
}
