// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process storage backend.
//!
//! Used for local development (`STORAGE_BACKEND=memory`) and tests. Each
//! `DashMap` entry is locked for the duration of a read-modify-write, which
//! gives the same per-device serializability as a Firestore transaction.

use crate::db::Storage;
use crate::error::AppError;
use crate::models::{
    Contact, Interaction, LedgerOp, LedgerOutcome, PaymentCompletion, PaymentTransaction,
    TokenAccount,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Record plus insertion sequence, used as a stable tiebreak for ordering.
#[derive(Debug, Clone)]
struct Sequenced<T> {
    seq: u64,
    value: T,
}

#[derive(Default)]
struct Inner {
    next_seq: AtomicU64,
    contacts: DashMap<String, Sequenced<Contact>>,
    interactions: DashMap<String, Sequenced<Interaction>>,
    token_accounts: DashMap<String, TokenAccount>,
    payments: DashMap<String, PaymentTransaction>,
}

/// In-memory database. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryDb {
    inner: Arc<Inner>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&self) -> u64 {
        self.inner.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Number of stored interactions for a contact (including ones beyond any limit).
    pub fn interaction_count(&self, contact_id: &str) -> usize {
        self.inner
            .interactions
            .iter()
            .filter(|entry| entry.value().value.contact_id == contact_id)
            .count()
    }
}

#[async_trait]
impl Storage for MemoryDb {
    async fn insert_contact(&self, contact: &Contact) -> Result<(), AppError> {
        let seq = self.next_seq();
        self.inner.contacts.insert(
            contact.id.clone(),
            Sequenced {
                seq,
                value: contact.clone(),
            },
        );
        Ok(())
    }

    async fn get_contact(
        &self,
        device_id: &str,
        contact_id: &str,
    ) -> Result<Option<Contact>, AppError> {
        Ok(self
            .inner
            .contacts
            .get(contact_id)
            .filter(|entry| entry.value.device_id == device_id)
            .map(|entry| entry.value.clone()))
    }

    async fn list_contacts(&self, device_id: &str) -> Result<Vec<Contact>, AppError> {
        let mut contacts: Vec<Sequenced<Contact>> = self
            .inner
            .contacts
            .iter()
            .filter(|entry| entry.value().value.device_id == device_id)
            .map(|entry| entry.value().clone())
            .collect();

        contacts.sort_by_key(|c| (c.value.created_at, c.seq));
        Ok(contacts.into_iter().map(|c| c.value).collect())
    }

    async fn update_contact(&self, contact: &Contact) -> Result<(), AppError> {
        match self.inner.contacts.get_mut(&contact.id) {
            Some(mut entry) if entry.value.device_id == contact.device_id => {
                entry.value = contact.clone();
                Ok(())
            }
            _ => Err(AppError::NotFound(format!("Contact {} not found", contact.id))),
        }
    }

    async fn delete_contact(&self, device_id: &str, contact_id: &str) -> Result<bool, AppError> {
        let removed = self
            .inner
            .contacts
            .remove_if(contact_id, |_, entry| entry.value.device_id == device_id)
            .is_some();

        if removed {
            self.inner
                .interactions
                .retain(|_, entry| entry.value.contact_id != contact_id);
        }

        Ok(removed)
    }

    async fn insert_interaction(&self, interaction: &Interaction) -> Result<(), AppError> {
        // The contact guard blocks `delete_contact` until the insert is done,
        // so its cascade always sees this interaction.
        let contact = self.inner.contacts.get(&interaction.contact_id);
        match contact {
            Some(entry) if entry.value.device_id == interaction.device_id => {
                let seq = self.next_seq();
                self.inner.interactions.insert(
                    interaction.id.clone(),
                    Sequenced {
                        seq,
                        value: interaction.clone(),
                    },
                );
                Ok(())
            }
            _ => Err(AppError::NotFound(format!(
                "Contact {} not found",
                interaction.contact_id
            ))),
        }
    }

    async fn list_interactions(
        &self,
        contact_id: &str,
        limit: u32,
    ) -> Result<Vec<Interaction>, AppError> {
        let mut interactions: Vec<Sequenced<Interaction>> = self
            .inner
            .interactions
            .iter()
            .filter(|entry| entry.value().value.contact_id == contact_id)
            .map(|entry| entry.value().clone())
            .collect();

        interactions.sort_by(|a, b| {
            b.value
                .contacted_at
                .cmp(&a.value.contacted_at)
                .then_with(|| b.seq.cmp(&a.seq))
        });
        interactions.truncate(limit as usize);
        Ok(interactions.into_iter().map(|i| i.value).collect())
    }

    async fn apply_ledger_op(
        &self,
        device_id: &str,
        op: LedgerOp,
    ) -> Result<(TokenAccount, LedgerOutcome), AppError> {
        // The entry guard holds the shard lock until it is dropped.
        let mut account = self
            .inner
            .token_accounts
            .entry(device_id.to_string())
            .or_insert_with(|| TokenAccount::new(device_id));

        let outcome = account.apply(op);
        Ok((account.clone(), outcome))
    }

    async fn insert_payment(&self, payment: &PaymentTransaction) -> Result<(), AppError> {
        self.inner
            .payments
            .insert(payment.checkout_id.clone(), payment.clone());
        Ok(())
    }

    async fn get_payment(&self, checkout_id: &str) -> Result<Option<PaymentTransaction>, AppError> {
        Ok(self
            .inner
            .payments
            .get(checkout_id)
            .map(|entry| entry.value().clone()))
    }

    async fn complete_payment(
        &self,
        checkout_id: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<PaymentCompletion, AppError> {
        // Lock order is always payment, then account.
        let Some(mut payment) = self.inner.payments.get_mut(checkout_id) else {
            return Ok(PaymentCompletion::UnknownCheckout);
        };

        if !payment.complete(completed_at) {
            return Ok(PaymentCompletion::AlreadyCompleted);
        }

        let mut account = self
            .inner
            .token_accounts
            .entry(payment.device_id.clone())
            .or_insert_with(|| TokenAccount::new(&payment.device_id));
        let tokens_remaining = account.credit(payment.tokens_granted);

        Ok(PaymentCompletion::Credited {
            device_id: payment.device_id.clone(),
            tokens_granted: payment.tokens_granted,
            tokens_remaining,
        })
    }
}
