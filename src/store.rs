//! The store seam.
//!
//! Every core operation talks to the single table through [`Store`], which is constructed
//! once by the caller and injected into [`DeckStore`](crate::DeckStore). Two implementations
//! are provided:
//! - [`dynamo::DynamoStore`] over an `aws_sdk_dynamodb::Client`
//! - [`memory::MemoryStore`], an in-process table with DynamoDB's conditional-write and
//!   transaction semantics, for tests and local development

/// DynamoDB-backed store.
pub mod dynamo;

/// In-process store.
pub mod memory;

use crate::common::{Item, condition, key};
use crate::read::{batch_get_item, query};
use crate::write::{batch_write_item, transact_write_items, update_item};

use async_trait::async_trait;
use aws_sdk_dynamodb::error;

/// Errors raised by a [`Store`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A guarded write found its condition false. Nothing was written.
    #[error("conditional check failed")]
    ConditionFailed,
    /// The write raced another transaction on the same rows. Nothing was written.
    #[error("transaction conflicted with a concurrent write")]
    TransactionConflict,
    /// The request was malformed.
    #[error("invalid request: {0}")]
    Validation(String),
    /// An SDK request could not be built.
    #[error("failed to build request: {0}")]
    Build(#[from] error::BuildError),
    /// A row could not be converted to or from its record type.
    #[error("failed to convert item: {0}")]
    Serialization(#[from] serde_dynamo::Error),
    /// A row returned by the store lacks its key attributes.
    #[error("malformed item: {0}")]
    MalformedItem(String),
    /// Batch requests stayed unprocessed after every retry round.
    #[error("{count} batch requests left unprocessed")]
    Unprocessed {
        /// Requests still outstanding.
        count: usize,
    },
    /// Any other DynamoDB failure, after the client's own retries.
    #[error(transparent)]
    Dynamo(Box<aws_sdk_dynamodb::Error>),
}

/// Result alias for store calls.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Access to the single table.
///
/// Implementations own transient retries; callers see either success, a conditional
/// failure, or an unrecoverable error.
#[async_trait]
pub trait Store: Send + Sync {
    /// Read one row.
    async fn get_item(&self, key: key::TableKey) -> Result<Option<Item>>;

    /// Create or replace one row.
    async fn put_item(
        &self,
        item: Item,
        condition: Option<condition::ConditionExpression>,
    ) -> Result<()>;

    /// Modify one row.
    async fn update_item(
        &self,
        key: key::TableKey,
        update: update_item::UpdateExpression,
        condition: Option<condition::ConditionExpression>,
    ) -> Result<()>;

    /// Delete one row. Deleting an absent row succeeds.
    async fn delete_item(
        &self,
        key: key::TableKey,
        condition: Option<condition::ConditionExpression>,
    ) -> Result<()>;

    /// Read one page of a partition query, starting after `exclusive_start_key`.
    async fn query(
        &self,
        query: query::KeyQuery,
        exclusive_start_key: Option<key::TableKey>,
    ) -> Result<query::Page>;

    /// Read up to [`MAX_BATCH_GET_ITEMS`](batch_get_item::MAX_BATCH_GET_ITEMS) rows.
    async fn batch_get_item(
        &self,
        batch_get: batch_get_item::BatchGet,
    ) -> Result<batch_get_item::BatchGetOutput>;

    /// Delete up to [`MAX_BATCH_WRITE_ITEMS`](batch_write_item::MAX_BATCH_WRITE_ITEMS) rows.
    ///
    /// Returns the keys the store left unprocessed.
    async fn batch_delete_item(
        &self,
        batch_delete: batch_write_item::BatchDelete,
    ) -> Result<Vec<key::TableKey>>;

    /// Apply up to [`MAX_TRANSACTION_ITEMS`](transact_write_items::MAX_TRANSACTION_ITEMS)
    /// operations atomically.
    async fn transact_write_items(
        &self,
        items: Vec<transact_write_items::TransactItem>,
    ) -> Result<()>;
}
