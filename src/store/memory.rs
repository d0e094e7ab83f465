use crate::common::{Item, condition, key};
use crate::read::{batch_get_item, query};
use crate::store::{Error, Result, Store};
use crate::write::{batch_write_item, transact_write_items, update_item};

use async_trait::async_trait;
use aws_sdk_dynamodb::types;
use parking_lot::Mutex;
use std::collections;

#[derive(Debug, Default)]
struct State {
    batch_deletes: usize,
    failing_batch_deletes: usize,
    failing_transaction: Option<usize>,
    rows: collections::BTreeMap<key::TableKey, Item>,
    transactions: usize,
}

/// In-process [`Store`].
///
/// Rows are kept in key order, so partition queries come back sorted by `SK` exactly as
/// DynamoDB returns them. Writes follow DynamoDB's rules: conditions are evaluated against
/// the current row, transactions apply all of their operations or none, and requests that
/// DynamoDB would reject (oversized batches, two operations on one row in a transaction)
/// fail with [`Error::Validation`].
///
/// ```rust
/// use deck_access::store::memory::MemoryStore;
///
/// let store = MemoryStore::with_page_size(2);
/// assert!(store.keys().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    page_size: Option<usize>,
    state: Mutex<State>,
}

impl MemoryStore {
    /// An empty table returning whole partitions in one page.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty table returning at most `page_size` rows per query page.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size: Some(page_size.max(1)),
            ..Self::default()
        }
    }

    /// Make the next `count` batch deletes fail before deleting anything.
    pub fn fail_batch_deletes(&self, count: usize) {
        self.state.lock().failing_batch_deletes = count;
    }

    /// Make the `nth` transaction from now fail with [`Error::TransactionConflict`], as if
    /// it had raced a concurrent write. Counts from 1.
    pub fn fail_nth_transaction(&self, nth: usize) {
        self.state.lock().failing_transaction = Some(nth.max(1));
    }

    /// Number of transactions committed so far.
    pub fn transaction_count(&self) -> usize {
        self.state.lock().transactions
    }

    /// Number of batch deletes attempted so far.
    pub fn batch_delete_count(&self) -> usize {
        self.state.lock().batch_deletes
    }

    /// Keys of every stored row, in table order.
    pub fn keys(&self) -> Vec<key::TableKey> {
        self.state.lock().rows.keys().cloned().collect()
    }

    /// A copy of one row.
    pub fn row(&self, keys: &key::TableKey) -> Option<Item> {
        self.state.lock().rows.get(keys).cloned()
    }

    /// Store a row directly, bypassing every guard.
    pub fn insert(&self, item: Item) -> Result<()> {
        let keys = key::TableKey::of(&item)
            .ok_or_else(|| Error::Validation("item is missing its key attributes".to_string()))?;
        self.state.lock().rows.insert(keys, item);
        Ok(())
    }
}

fn check(
    condition: Option<&condition::ConditionExpression>,
    existing: Option<&Item>,
) -> Result<()> {
    match condition {
        Some(condition) if !condition.evaluate(existing) => Err(Error::ConditionFailed),
        _ => Ok(()),
    }
}

/// Stage every operation against the current rows, then commit them together.
fn write(
    rows: &mut collections::BTreeMap<key::TableKey, Item>,
    items: Vec<transact_write_items::TransactItem>,
) -> Result<()> {
    let mut seen = collections::HashSet::with_capacity(items.len());
    for item in &items {
        let keys = item
            .key()
            .ok_or_else(|| Error::Validation("item is missing its key attributes".to_string()))?;
        if !seen.insert(keys) {
            return Err(Error::Validation(
                "transaction cannot include multiple operations on one item".to_string(),
            ));
        }
    }
    for item in &items {
        let existing = item.key().and_then(|keys| rows.get(&keys));
        check(item.condition(), existing)?;
    }
    let mut staged = Vec::with_capacity(items.len());
    for item in items {
        match item {
            transact_write_items::TransactItem::Put { item, .. } => {
                let keys = key::TableKey::of(&item).ok_or_else(|| {
                    Error::Validation("item is missing its key attributes".to_string())
                })?;
                staged.push((keys, Some(item)));
            }
            transact_write_items::TransactItem::Update { key, update, .. } => {
                let mut row = rows
                    .get(&key)
                    .cloned()
                    .unwrap_or_else(|| key.clone().into());
                update.apply(&mut row)?;
                staged.push((key, Some(row)));
            }
            transact_write_items::TransactItem::Delete { key, .. } => staged.push((key, None)),
        }
    }
    for (keys, row) in staged {
        match row {
            Some(row) => rows.insert(keys, row),
            None => rows.remove(&keys),
        };
    }
    Ok(())
}

fn ensure_unique(keys: &[key::TableKey], request: &str) -> Result<()> {
    let unique: collections::HashSet<&key::TableKey> = keys.iter().collect();
    if unique.len() == keys.len() {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "{request} cannot include duplicate keys"
        )))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_item(&self, key: key::TableKey) -> Result<Option<Item>> {
        Ok(self.row(&key))
    }

    async fn put_item(
        &self,
        item: Item,
        condition: Option<condition::ConditionExpression>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        write(
            &mut state.rows,
            vec![transact_write_items::TransactItem::Put { item, condition }],
        )
    }

    async fn update_item(
        &self,
        key: key::TableKey,
        update: update_item::UpdateExpression,
        condition: Option<condition::ConditionExpression>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        write(
            &mut state.rows,
            vec![transact_write_items::TransactItem::Update {
                key,
                update,
                condition,
            }],
        )
    }

    async fn delete_item(
        &self,
        key: key::TableKey,
        condition: Option<condition::ConditionExpression>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        write(
            &mut state.rows,
            vec![transact_write_items::TransactItem::Delete { key, condition }],
        )
    }

    async fn query(
        &self,
        query: query::KeyQuery,
        exclusive_start_key: Option<key::TableKey>,
    ) -> Result<query::Page> {
        let state = self.state.lock();
        let start = key::TableKey {
            partition_key: query.partition_key.clone(),
            sort_key: String::new(),
        };
        let mut matching = state
            .rows
            .range(start..)
            .take_while(|(keys, _)| keys.partition_key == query.partition_key)
            .filter(|(keys, _)| query.matches(keys))
            .filter(|(keys, _)| {
                exclusive_start_key
                    .as_ref()
                    .is_none_or(|exclusive_start_key| *keys > exclusive_start_key)
            })
            .peekable();
        let limit = self.page_size.unwrap_or(usize::MAX);
        let mut items = Vec::new();
        let mut last_key = None;
        while items.len() < limit {
            match matching.next() {
                Some((keys, item)) => {
                    items.push(item.clone());
                    last_key = Some(keys.clone());
                }
                None => break,
            }
        }
        let last_evaluated_key = if matching.peek().is_some() {
            last_key
        } else {
            None
        };
        Ok(query::Page {
            items,
            last_evaluated_key,
        })
    }

    async fn batch_get_item(
        &self,
        batch_get: batch_get_item::BatchGet,
    ) -> Result<batch_get_item::BatchGetOutput> {
        if batch_get.keys.len() > batch_get_item::MAX_BATCH_GET_ITEMS {
            return Err(Error::Validation(format!(
                "batch get of {} keys exceeds the limit of {}",
                batch_get.keys.len(),
                batch_get_item::MAX_BATCH_GET_ITEMS
            )));
        }
        ensure_unique(&batch_get.keys, "batch get")?;
        let state = self.state.lock();
        let items = batch_get
            .keys
            .iter()
            .filter_map(|keys| state.rows.get(keys).cloned())
            .collect();
        Ok(batch_get_item::BatchGetOutput {
            items,
            unprocessed_keys: Vec::new(),
        })
    }

    async fn batch_delete_item(
        &self,
        batch_delete: batch_write_item::BatchDelete,
    ) -> Result<Vec<key::TableKey>> {
        if batch_delete.keys.len() > batch_write_item::MAX_BATCH_WRITE_ITEMS {
            return Err(Error::Validation(format!(
                "batch write of {} requests exceeds the limit of {}",
                batch_delete.keys.len(),
                batch_write_item::MAX_BATCH_WRITE_ITEMS
            )));
        }
        ensure_unique(&batch_delete.keys, "batch write")?;
        let mut state = self.state.lock();
        state.batch_deletes += 1;
        if state.failing_batch_deletes > 0 {
            state.failing_batch_deletes -= 1;
            return Err(Error::Dynamo(Box::new(
                aws_sdk_dynamodb::Error::InternalServerError(
                    types::error::InternalServerError::builder()
                        .message("injected batch write failure")
                        .build(),
                ),
            )));
        }
        for keys in &batch_delete.keys {
            state.rows.remove(keys);
        }
        Ok(Vec::new())
    }

    async fn transact_write_items(
        &self,
        items: Vec<transact_write_items::TransactItem>,
    ) -> Result<()> {
        if items.is_empty() || items.len() > transact_write_items::MAX_TRANSACTION_ITEMS {
            return Err(Error::Validation(format!(
                "transaction of {} operations is outside 1..={}",
                items.len(),
                transact_write_items::MAX_TRANSACTION_ITEMS
            )));
        }
        let mut state = self.state.lock();
        match state.failing_transaction {
            Some(1) => {
                state.failing_transaction = None;
                return Err(Error::TransactionConflict);
            }
            Some(remaining) => state.failing_transaction = Some(remaining - 1),
            None => {}
        }
        write(&mut state.rows, items)?;
        state.transactions += 1;
        Ok(())
    }
}
