//! Database layer (Firestore, with an in-memory backend for development and tests).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{
    Contact, Interaction, LedgerOp, LedgerOutcome, PaymentCompletion, PaymentTransaction,
    TokenAccount,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ring::rand::{SecureRandom, SystemRandom};

/// Collection names as constants.
pub mod collections {
    pub const CONTACTS: &str = "contacts";
    pub const INTERACTIONS: &str = "interactions";
    /// Token accounts (keyed by device_id)
    pub const TOKEN_ACCOUNTS: &str = "token_accounts";
    /// Payment transactions (keyed by Creem checkout ID)
    pub const PAYMENT_TRANSACTIONS: &str = "payment_transactions";
}

/// Persistence operations used by the services.
///
/// Contact reads and deletes take the owning `device_id` and behave as if the
/// record does not exist when it belongs to another device.
#[async_trait]
pub trait Storage: Send + Sync {
    // ─── Contacts ────────────────────────────────────────────────

    async fn insert_contact(&self, contact: &Contact) -> Result<(), AppError>;

    async fn get_contact(
        &self,
        device_id: &str,
        contact_id: &str,
    ) -> Result<Option<Contact>, AppError>;

    /// All contacts of a device, oldest first.
    async fn list_contacts(&self, device_id: &str) -> Result<Vec<Contact>, AppError>;

    async fn update_contact(&self, contact: &Contact) -> Result<(), AppError>;

    /// Delete a contact and all of its interactions.
    ///
    /// Returns `false` if the device owns no such contact.
    async fn delete_contact(&self, device_id: &str, contact_id: &str) -> Result<bool, AppError>;

    // ─── Interactions ────────────────────────────────────────────

    /// Store an interaction for an existing contact owned by the same device.
    ///
    /// Fails with `NotFound` when the contact is gone, so a concurrent
    /// `delete_contact` never leaves an orphaned interaction.
    async fn insert_interaction(&self, interaction: &Interaction) -> Result<(), AppError>;

    /// Most recent interactions of a contact, newest first.
    async fn list_interactions(
        &self,
        contact_id: &str,
        limit: u32,
    ) -> Result<Vec<Interaction>, AppError>;

    async fn last_interaction_at(
        &self,
        contact_id: &str,
    ) -> Result<Option<DateTime<Utc>>, AppError> {
        Ok(self
            .list_interactions(contact_id, 1)
            .await?
            .first()
            .map(|i| i.contacted_at))
    }

    // ─── Token Ledger ────────────────────────────────────────────

    /// Atomically apply `op` to the device's account, creating a zeroed
    /// account first if none exists.
    ///
    /// Returns the account as stored after the operation.
    async fn apply_ledger_op(
        &self,
        device_id: &str,
        op: LedgerOp,
    ) -> Result<(TokenAccount, LedgerOutcome), AppError>;

    // ─── Payments ────────────────────────────────────────────────

    async fn insert_payment(&self, payment: &PaymentTransaction) -> Result<(), AppError>;

    async fn get_payment(&self, checkout_id: &str) -> Result<Option<PaymentTransaction>, AppError>;

    /// Complete a pending transaction and credit its tokens in one atomic unit.
    async fn complete_payment(
        &self,
        checkout_id: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<PaymentCompletion, AppError>;
}

/// Generate a random document ID (128 bits, hex).
pub fn generate_id() -> Result<String, AppError> {
    let mut bytes = [0u8; 16];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Random number generator failure")))?;
    Ok(hex::encode(bytes))
}
