use crate::common::{attribute, key};
use crate::deck_store::DeckStore;
use crate::error::{Error, Result};
use crate::guard::Guard;
use crate::model::{self, Do, DoPatch};
use crate::read::query;
use crate::store::Store;
use crate::write::update_item::UpdateExpression;

use aws_sdk_dynamodb::types;
use chrono::Utc;
use serde_dynamo::to_attribute_value;

impl<S: Store> DeckStore<S> {
    /// Add an item to a deck.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "deck_access.create_item", skip(self, text), err)
    )]
    pub async fn create_item(&self, deck_id: &str, text: &str) -> Result<Do> {
        let text = model::normalize_text(text)?;
        let now = Utc::now();
        let item = Do {
            do_id: uuid::Uuid::new_v4().to_string(),
            deck_id: deck_id.to_string(),
            text,
            completed: false,
            created_at: now,
            updated_at: now,
        };
        let guard = Guard::FreshDo {
            deck_id: deck_id.to_string(),
        };
        self.store
            .put_item(item.to_item()?, Some(guard.condition()))
            .await
            .map_err(|error| guard.translate(error))?;
        Ok(item)
    }

    /// Read one item.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "deck_access.get_item", skip(self), err)
    )]
    pub async fn get_item(&self, deck_id: &str, do_id: &str) -> Result<Do> {
        match self.store.get_item(key::do_item(deck_id, do_id)).await? {
            Some(item) => Do::from_item(item),
            None => Err(Error::DoNotFound {
                deck_id: deck_id.to_string(),
                do_id: do_id.to_string(),
            }),
        }
    }

    /// Every item of a deck, oldest first.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "deck_access.list_items", skip(self), err)
    )]
    pub async fn list_items(&self, deck_id: &str) -> Result<Vec<Do>> {
        let query = query::KeyQuery::partition(key::deck_partition(deck_id))
            .with_sort_key_prefix(key::do_prefix());
        let mut items = self
            .query_all(query)
            .await?
            .into_iter()
            .map(Do::from_item)
            .collect::<Result<Vec<_>>>()?;
        items.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.do_id.cmp(&b.do_id))
        });
        Ok(items)
    }

    /// Apply the provided fields of `patch` to an item and refresh `updatedAt`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] for an empty patch or empty text, [`Error::DoNotFound`] if the
    /// item was deleted meanwhile.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "deck_access.update_item",
            skip(self, item, patch),
            fields(deck_id = %item.deck_id, do_id = %item.do_id),
            err
        )
    )]
    pub async fn update_item(&self, item: &Do, patch: DoPatch) -> Result<Do> {
        if patch.is_empty() {
            return Err(Error::invalid_input("no updates provided"));
        }
        let mut updated = item.clone();
        let mut update = UpdateExpression::default();
        if let Some(text) = patch.text {
            updated.text = model::normalize_text(&text)?;
            update = update.set(attribute::TEXT, types::AttributeValue::S(updated.text.clone()));
        }
        if let Some(completed) = patch.completed {
            updated.completed = completed;
            update = update.set(attribute::COMPLETED, types::AttributeValue::Bool(completed));
        }
        updated.updated_at = model::touch(item.updated_at);
        update = update.set(attribute::UPDATED_AT, to_attribute_value(updated.updated_at)?);
        let guard = Guard::ExistingDo {
            deck_id: item.deck_id.clone(),
            do_id: item.do_id.clone(),
        };
        self.store
            .update_item(item.key(), update, Some(guard.condition()))
            .await
            .map_err(|error| guard.translate(error))?;
        Ok(updated)
    }

    /// Delete an item. Deleting an absent item succeeds.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "deck_access.delete_item", skip(self), err)
    )]
    pub async fn delete_item(&self, deck_id: &str, do_id: &str) -> Result<()> {
        self.store
            .delete_item(key::do_item(deck_id, do_id), None)
            .await?;
        Ok(())
    }
}
