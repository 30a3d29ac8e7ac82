// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Contact ("friend") and interaction models for storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Target interval between contacts with a person.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum ContactCadence {
    Weekly,
    Biweekly,
    #[default]
    Monthly,
    Quarterly,
}

impl ContactCadence {
    pub const ALL: [ContactCadence; 4] = [
        ContactCadence::Weekly,
        ContactCadence::Biweekly,
        ContactCadence::Monthly,
        ContactCadence::Quarterly,
    ];

    /// Number of days until a contact is due again.
    pub fn days(self) -> i64 {
        match self {
            ContactCadence::Weekly => 7,
            ContactCadence::Biweekly => 14,
            ContactCadence::Monthly => 30,
            ContactCadence::Quarterly => 90,
        }
    }
}

/// How the user knows the person. Passed through to the starter generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    #[default]
    Friend,
    Family,
    Colleague,
    Acquaintance,
}

impl RelationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RelationKind::Friend => "friend",
            RelationKind::Family => "family",
            RelationKind::Colleague => "colleague",
            RelationKind::Acquaintance => "acquaintance",
        }
    }
}

/// Stored contact record in Firestore.
///
/// Owned by exactly one device; every read and write filters on `device_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Generated ID (also used as document ID)
    pub id: String,
    /// Owning device identifier
    pub device_id: String,
    pub name: String,
    pub nickname: Option<String>,
    #[serde(default)]
    pub relation: RelationKind,
    #[serde(default)]
    pub cadence: ContactCadence,
    pub notes: Option<String>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// A logged interaction with a contact. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    /// Generated ID (also used as document ID)
    pub id: String,
    /// Parent contact; the interaction is deleted with it
    pub contact_id: String,
    /// Owning device (denormalized from the contact)
    pub device_id: String,
    /// When the contact happened
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub contacted_at: DateTime<Utc>,
    pub summary: Option<String>,
    /// Topics to follow up on next time, in the order given
    pub next_topics: Option<Vec<String>>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cadence_days() {
        assert_eq!(ContactCadence::Weekly.days(), 7);
        assert_eq!(ContactCadence::Biweekly.days(), 14);
        assert_eq!(ContactCadence::Monthly.days(), 30);
        assert_eq!(ContactCadence::Quarterly.days(), 90);
    }

    #[test]
    fn test_unknown_cadence_is_rejected() {
        let parsed: Result<ContactCadence, _> = serde_json::from_str("\"daily\"");
        assert!(parsed.is_err());

        let parsed: ContactCadence = serde_json::from_str("\"biweekly\"").unwrap();
        assert_eq!(parsed, ContactCadence::Biweekly);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(ContactCadence::default(), ContactCadence::Monthly);
        assert_eq!(RelationKind::default(), RelationKind::Friend);
        assert_eq!(RelationKind::Colleague.as_str(), "colleague");
    }
}
