use crate::common::{Item, key};
use crate::config;
use crate::read::query;
use crate::store::{self, Store, dynamo::DynamoStore};
use crate::write::{batch_write_item, transact_write_items};

use std::time;

/// Rounds of re-submission for requests a batch call left unprocessed.
pub(crate) const MAX_UNPROCESSED_ROUNDS: u32 = 5;

const UNPROCESSED_BACKOFF: time::Duration = time::Duration::from_millis(50);

/// Entry point for every deck, collaborator, listing and item operation.
///
/// Holds the injected [`Store`]; operations are spread over the modules that implement
/// them (mutations, item CRUD, listings, batch loading, authorization).
///
/// ```rust
/// use deck_access::{DeckStore, store::memory::MemoryStore};
///
/// # async fn example() -> deck_access::Result<()> {
/// let decks = DeckStore::new(MemoryStore::new());
/// let deck = decks.create_deck("auth0|a", "Focus").await?;
/// assert_eq!(decks.get_deck(&deck.deck_id).await?, deck);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct DeckStore<S = DynamoStore> {
    pub(crate) require_email_verified: bool,
    pub(crate) store: S,
}

impl DeckStore<DynamoStore> {
    /// Connect to the table described by `settings`.
    pub async fn from_settings(settings: &config::Settings) -> Self {
        let client = config::create_client(settings).await;
        Self::new(DynamoStore::new(client, settings.table_name.clone()))
            .require_email_verified(settings.require_email_verified)
    }
}

impl<S: Store> DeckStore<S> {
    /// Wrap a store. Collaborator email claims must be verified by default.
    pub fn new(store: S) -> Self {
        Self {
            require_email_verified: true,
            store,
        }
    }

    /// Whether collaborator access requires a verified email claim.
    pub fn require_email_verified(mut self, require: bool) -> Self {
        self.require_email_verified = require;
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read a whole partition, following continuation keys until exhausted.
    pub(crate) async fn query_all(&self, query: query::KeyQuery) -> store::Result<Vec<Item>> {
        let mut items = Vec::new();
        let mut exclusive_start_key = None;
        loop {
            let page = self.store.query(query.clone(), exclusive_start_key).await?;
            items.extend(page.items);
            match page.last_evaluated_key {
                Some(last_evaluated_key) => exclusive_start_key = Some(last_evaluated_key),
                None => return Ok(items),
            }
        }
    }

    /// Apply operations in consecutive transactions of at most
    /// [`MAX_TRANSACTION_ITEMS`](transact_write_items::MAX_TRANSACTION_ITEMS).
    ///
    /// Each chunk is atomic; the sequence is not. Stops at the first failed chunk.
    pub(crate) async fn transact_chunked(
        &self,
        items: Vec<transact_write_items::TransactItem>,
    ) -> store::Result<()> {
        let mut items = items.into_iter().peekable();
        while items.peek().is_some() {
            let chunk: Vec<_> = items
                .by_ref()
                .take(transact_write_items::MAX_TRANSACTION_ITEMS)
                .collect();
            self.store.transact_write_items(chunk).await?;
        }
        Ok(())
    }

    /// Delete rows in batch calls, re-submitting unprocessed keys a bounded number of times.
    pub(crate) async fn batch_delete(&self, keys: Vec<key::TableKey>) -> store::Result<()> {
        let mut pending = keys;
        for round in 0..MAX_UNPROCESSED_ROUNDS {
            if pending.is_empty() {
                return Ok(());
            }
            if round > 0 {
                #[cfg(feature = "tracing")]
                tracing::warn!(round, keys = pending.len(), "retrying unprocessed batch deletes");
                tokio::time::sleep(backoff(round)).await;
            }
            let mut unprocessed = Vec::new();
            for batch_delete in batch_write_item::BatchDelete::chunked(pending) {
                unprocessed.extend(self.store.batch_delete_item(batch_delete).await?);
            }
            pending = unprocessed;
        }
        if pending.is_empty() {
            Ok(())
        } else {
            Err(store::Error::Unprocessed {
                count: pending.len(),
            })
        }
    }
}

/// Lay out `first`, then every group, over as few transactions as possible without
/// splitting a group across two of them.
pub(crate) fn pack(
    first: Vec<transact_write_items::TransactItem>,
    groups: Vec<Vec<transact_write_items::TransactItem>>,
) -> Vec<Vec<transact_write_items::TransactItem>> {
    let mut transactions = vec![first];
    for group in groups {
        match transactions.last_mut() {
            Some(transaction)
                if transaction.len() + group.len()
                    <= transact_write_items::MAX_TRANSACTION_ITEMS =>
            {
                transaction.extend(group)
            }
            _ => transactions.push(group),
        }
    }
    transactions
}

/// Delay before re-submission round `round`, doubling from the first retry.
pub(crate) fn backoff(round: u32) -> time::Duration {
    UNPROCESSED_BACKOFF * 2u32.pow(round.saturating_sub(1))
}
