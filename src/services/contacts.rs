// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Contact queries that join contacts with their interaction history.

use crate::db::Storage;
use crate::error::Result;
use crate::models::health::ContactHealth;
use crate::models::Contact;
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use std::sync::Arc;

/// Limit on concurrent last-interaction lookups when listing contacts.
const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Interactions included in the generator context.
const CONTEXT_INTERACTIONS: u32 = 5;

/// Characters of context echoed back to the client.
const CONTEXT_PREVIEW_CHARS: usize = 200;

pub const NO_INTERACTIONS_CONTEXT: &str = "No previous interactions recorded.";

#[derive(Clone)]
pub struct ContactService {
    db: Arc<dyn Storage>,
}

impl ContactService {
    pub fn new(db: Arc<dyn Storage>) -> Self {
        Self { db }
    }

    /// All contacts of a device with derived health, in storage order.
    pub async fn list_with_health(
        &self,
        device_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<ContactHealth>> {
        let contacts = self.db.list_contacts(device_id).await?;
        let db = &self.db;

        // `buffered` keeps input order
        stream::iter(contacts)
            .map(|contact| async move {
                let last = db.last_interaction_at(&contact.id).await?;
                Ok(ContactHealth::evaluate(contact, last, now))
            })
            .buffered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<ContactHealth>>>()
            .await
            .into_iter()
            .collect()
    }

    pub async fn with_health(&self, contact: Contact, now: DateTime<Utc>) -> Result<ContactHealth> {
        let last = self.db.last_interaction_at(&contact.id).await?;
        Ok(ContactHealth::evaluate(contact, last, now))
    }

    /// Recent history formatted for the starter generator.
    pub async fn interaction_context(&self, contact_id: &str) -> Result<String> {
        let interactions = self
            .db
            .list_interactions(contact_id, CONTEXT_INTERACTIONS)
            .await?;

        if interactions.is_empty() {
            return Ok(NO_INTERACTIONS_CONTEXT.to_string());
        }

        let mut lines = Vec::with_capacity(interactions.len() * 2);
        for interaction in &interactions {
            lines.push(format!(
                "- {}: {}",
                interaction.contacted_at.format("%Y-%m-%d"),
                interaction.summary.as_deref().unwrap_or("No summary")
            ));

            if let Some(topics) = interaction.next_topics.as_ref().filter(|t| !t.is_empty()) {
                lines.push(format!("  Topics to follow up: {}", topics.join(", ")));
            }
        }

        Ok(lines.join("\n"))
    }
}

/// Shorten a context string for display, marking truncation with `...`.
pub fn context_preview(context: &str) -> String {
    match context.char_indices().nth(CONTEXT_PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &context[..idx]),
        None => context.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;
    use crate::models::{ContactCadence, HealthStatus, Interaction, RelationKind};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn contact(id: &str, cadence: ContactCadence) -> Contact {
        Contact {
            id: id.to_string(),
            device_id: "device-a".to_string(),
            name: format!("Friend {}", id),
            nickname: None,
            relation: RelationKind::Friend,
            cadence,
            notes: None,
            created_at: now() - Duration::days(100),
            updated_at: now() - Duration::days(100),
        }
    }

    fn interaction(
        id: &str,
        contact_id: &str,
        days_ago: i64,
        summary: Option<&str>,
        topics: Option<Vec<&str>>,
    ) -> Interaction {
        Interaction {
            id: id.to_string(),
            contact_id: contact_id.to_string(),
            device_id: "device-a".to_string(),
            contacted_at: now() - Duration::days(days_ago),
            summary: summary.map(str::to_string),
            next_topics: topics.map(|t| t.into_iter().map(str::to_string).collect()),
            created_at: now() - Duration::days(days_ago),
        }
    }

    #[tokio::test]
    async fn test_list_with_health() {
        let db = MemoryDb::new();
        db.insert_contact(&contact("c1", ContactCadence::Weekly))
            .await
            .unwrap();
        db.insert_contact(&contact("c2", ContactCadence::Monthly))
            .await
            .unwrap();
        db.insert_interaction(&interaction("i1", "c1", 10, None, None))
            .await
            .unwrap();

        let service = ContactService::new(Arc::new(db));
        let list = service.list_with_health("device-a", now()).await.unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].contact.id, "c1");
        assert_eq!(list[0].health.status, HealthStatus::Red);
        assert_eq!(list[0].health.days_since_contact, Some(10));
        assert_eq!(list[1].health.status, HealthStatus::Red);
        assert_eq!(list[1].health.days_since_contact, None);
        assert_eq!(list[1].last_interaction_at, None);
    }

    #[tokio::test]
    async fn test_empty_context() {
        let service = ContactService::new(Arc::new(MemoryDb::new()));
        let context = service.interaction_context("c1").await.unwrap();
        assert_eq!(context, NO_INTERACTIONS_CONTEXT);
    }

    #[tokio::test]
    async fn test_context_format() {
        let db = MemoryDb::new();
        db.insert_contact(&contact("c1", ContactCadence::Weekly))
            .await
            .unwrap();
        db.insert_interaction(&interaction(
            "i1",
            "c1",
            3,
            Some("Coffee downtown"),
            Some(vec!["new job", "Lisbon trip"]),
        ))
        .await
        .unwrap();
        db.insert_interaction(&interaction("i2", "c1", 1, None, Some(vec![])))
            .await
            .unwrap();

        let service = ContactService::new(Arc::new(db));
        let context = service.interaction_context("c1").await.unwrap();

        assert_eq!(
            context,
            "- 2026-02-28: No summary\n\
             - 2026-02-26: Coffee downtown\n  Topics to follow up: new job, Lisbon trip"
        );
    }

    #[tokio::test]
    async fn test_context_uses_five_newest() {
        let db = MemoryDb::new();
        db.insert_contact(&contact("c1", ContactCadence::Weekly))
            .await
            .unwrap();
        for day in 1..=7 {
            let summary = format!("day {}", day);
            db.insert_interaction(&interaction(
                &format!("i{}", day),
                "c1",
                day,
                Some(&summary),
                None,
            ))
            .await
            .unwrap();
        }

        let service = ContactService::new(Arc::new(db));
        let context = service.interaction_context("c1").await.unwrap();
        let lines: Vec<&str> = context.lines().collect();

        assert_eq!(lines.len(), 5);
        assert!(lines[0].ends_with("day 1"));
        assert!(lines[4].ends_with("day 5"));
    }

    #[test]
    fn test_context_preview() {
        assert_eq!(context_preview("short"), "short");

        let exact = "a".repeat(200);
        assert_eq!(context_preview(&exact), exact);

        let long = "é".repeat(250);
        let preview = context_preview(&long);
        assert_eq!(preview.chars().count(), 203);
        assert!(preview.ends_with("..."));
    }
}
