// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Contacts and their interactions (per-device)
//! - Token accounts (one document per device)
//! - Payment transactions (one document per Creem checkout)
//!
//! Ledger updates and payment completion run in Firestore transactions.
//! Reads inside a transaction register the documents for conflict detection,
//! and Firestore retries the closure with fresh data if another request
//! commits first.

use crate::db::{collections, Storage};
use crate::error::AppError;
use crate::models::{
    Contact, Interaction, LedgerOp, LedgerOutcome, PaymentCompletion, PaymentTransaction,
    TokenAccount,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::FutureExt;

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    /// Upsert a document by ID.
    async fn set_document<T>(&self, collection: &str, id: &str, object: &T) -> Result<(), AppError>
    where
        T: serde::Serialize + Sync + Send,
        for<'de> T: serde::Deserialize<'de>,
    {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(object)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Helper to batch delete documents using transactions.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction =
                self.client.begin_transaction().await.map_err(|e| {
                    AppError::Database(format!("Failed to begin transaction: {}", e))
                })?;

            for item in chunk {
                let doc_id = id_extractor(item);
                self.client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }
}

#[async_trait]
impl Storage for FirestoreDb {
    // ─── Contact Operations ──────────────────────────────────────

    async fn insert_contact(&self, contact: &Contact) -> Result<(), AppError> {
        self.set_document(collections::CONTACTS, &contact.id, contact)
            .await
    }

    async fn get_contact(
        &self,
        device_id: &str,
        contact_id: &str,
    ) -> Result<Option<Contact>, AppError> {
        let contact: Option<Contact> = self
            .client
            .fluent()
            .select()
            .by_id_in(collections::CONTACTS)
            .obj()
            .one(contact_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(contact.filter(|c| c.device_id == device_id))
    }

    async fn list_contacts(&self, device_id: &str) -> Result<Vec<Contact>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::CONTACTS)
            .filter(|q| q.for_all([q.field("device_id").eq(device_id)]))
            .order_by([("created_at", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn update_contact(&self, contact: &Contact) -> Result<(), AppError> {
        if self.get_contact(&contact.device_id, &contact.id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Contact {} not found",
                contact.id
            )));
        }
        self.set_document(collections::CONTACTS, &contact.id, contact)
            .await
    }

    async fn delete_contact(&self, device_id: &str, contact_id: &str) -> Result<bool, AppError> {
        if self.get_contact(device_id, contact_id).await?.is_none() {
            return Ok(false);
        }

        // Contact first: once it is gone no new interaction can commit, so
        // the sweep below catches every one.
        self.client
            .fluent()
            .delete()
            .from(collections::CONTACTS)
            .document_id(contact_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let interactions: Vec<Interaction> = self
            .client
            .fluent()
            .select()
            .from(collections::INTERACTIONS)
            .filter(|q| q.for_all([q.field("contact_id").eq(contact_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let count = interactions.len();
        self.batch_delete(
            &interactions,
            collections::INTERACTIONS,
            |interaction: &Interaction| interaction.id.clone(),
        )
        .await?;

        tracing::info!(
            device_id,
            contact_id,
            interactions = count,
            "Contact deleted"
        );

        Ok(true)
    }

    // ─── Interaction Operations ──────────────────────────────────

    async fn insert_interaction(&self, interaction: &Interaction) -> Result<(), AppError> {
        let pending = interaction.clone();

        // Reading the contact inside the transaction makes this commit
        // conflict with a delete of that contact.
        let inserted = self
            .client
            .run_transaction(move |db, transaction| {
                let interaction = pending.clone();
                async move {
                    let contact: Option<Contact> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::CONTACTS)
                        .obj()
                        .one(&interaction.contact_id)
                        .await?;

                    if !contact.is_some_and(|c| c.device_id == interaction.device_id) {
                        return Ok(false);
                    }

                    db.fluent()
                        .update()
                        .in_col(collections::INTERACTIONS)
                        .document_id(&interaction.id)
                        .object(&interaction)
                        .add_to_transaction(transaction)?;

                    Ok(true)
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Interaction transaction failed: {}", e)))?;

        if !inserted {
            return Err(AppError::NotFound(format!(
                "Contact {} not found",
                interaction.contact_id
            )));
        }
        Ok(())
    }

    async fn list_interactions(
        &self,
        contact_id: &str,
        limit: u32,
    ) -> Result<Vec<Interaction>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::INTERACTIONS)
            .filter(|q| q.for_all([q.field("contact_id").eq(contact_id)]))
            .order_by([(
                "contacted_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Token Ledger Operations ─────────────────────────────────

    async fn apply_ledger_op(
        &self,
        device_id: &str,
        op: LedgerOp,
    ) -> Result<(TokenAccount, LedgerOutcome), AppError> {
        let device_id = device_id.to_string();

        self.client
            .run_transaction(move |db, transaction| {
                let device_id = device_id.clone();
                async move {
                    let current: Option<TokenAccount> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::TOKEN_ACCOUNTS)
                        .obj()
                        .one(&device_id)
                        .await?;

                    let created = current.is_none();
                    let mut account = current.unwrap_or_else(|| TokenAccount::new(&device_id));
                    let outcome = account.apply(op);

                    // A racing first access conflicts here and is retried,
                    // then reads the winner's document.
                    if created || outcome.mutated() {
                        db.fluent()
                            .update()
                            .in_col(collections::TOKEN_ACCOUNTS)
                            .document_id(&device_id)
                            .object(&account)
                            .add_to_transaction(transaction)?;
                    }

                    Ok((account, outcome))
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Ledger transaction failed: {}", e)))
    }

    // ─── Payment Operations ──────────────────────────────────────

    async fn insert_payment(&self, payment: &PaymentTransaction) -> Result<(), AppError> {
        self.set_document(
            collections::PAYMENT_TRANSACTIONS,
            &payment.checkout_id,
            payment,
        )
        .await
    }

    async fn get_payment(&self, checkout_id: &str) -> Result<Option<PaymentTransaction>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::PAYMENT_TRANSACTIONS)
            .obj()
            .one(checkout_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn complete_payment(
        &self,
        checkout_id: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<PaymentCompletion, AppError> {
        let checkout_id = checkout_id.to_string();

        self.client
            .run_transaction(move |db, transaction| {
                let checkout_id = checkout_id.clone();
                async move {
                    let payment: Option<PaymentTransaction> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::PAYMENT_TRANSACTIONS)
                        .obj()
                        .one(&checkout_id)
                        .await?;

                    let Some(mut payment) = payment else {
                        return Ok(PaymentCompletion::UnknownCheckout);
                    };

                    if !payment.complete(completed_at) {
                        return Ok(PaymentCompletion::AlreadyCompleted);
                    }

                    let account: Option<TokenAccount> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::TOKEN_ACCOUNTS)
                        .obj()
                        .one(&payment.device_id)
                        .await?;

                    let mut account =
                        account.unwrap_or_else(|| TokenAccount::new(&payment.device_id));
                    let tokens_remaining = account.credit(payment.tokens_granted);

                    db.fluent()
                        .update()
                        .in_col(collections::PAYMENT_TRANSACTIONS)
                        .document_id(&checkout_id)
                        .object(&payment)
                        .add_to_transaction(transaction)?;

                    db.fluent()
                        .update()
                        .in_col(collections::TOKEN_ACCOUNTS)
                        .document_id(&payment.device_id)
                        .object(&account)
                        .add_to_transaction(transaction)?;

                    Ok(PaymentCompletion::Credited {
                        device_id: payment.device_id,
                        tokens_granted: payment.tokens_granted,
                        tokens_remaining,
                    })
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Payment transaction failed: {}", e)))
    }
}
