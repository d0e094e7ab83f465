use crate::access::{self, Principal};
use crate::common::{AttributePath, attribute, key};
use crate::deck_store::{self, DeckStore};
use crate::error::{Error, Result};
use crate::guard::Guard;
use crate::model::{self, Collaborator, Deck};
use crate::read::query;
use crate::store::Store;
use crate::write::transact_write_items::{self, TransactItem};
use crate::write::update_item::UpdateExpression;

use aws_sdk_dynamodb::types;
use chrono::Utc;
use serde_dynamo::to_attribute_value;
use std::collections;

fn string(value: &str) -> types::AttributeValue {
    types::AttributeValue::S(value.to_string())
}

impl<S: Store> DeckStore<S> {
    /// Create a deck owned by `owner_sub`, together with its owner access row.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] for an empty name or owner, [`Error::Conflict`] if the generated
    /// id already exists.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "deck_access.create_deck", skip(self), err)
    )]
    pub async fn create_deck(&self, owner_sub: &str, name: &str) -> Result<Deck> {
        if owner_sub.is_empty() {
            return Err(Error::invalid_input("owner required"));
        }
        let (name, name_lower) = model::normalize_name(name)?;
        let now = Utc::now();
        let deck = Deck {
            deck_id: uuid::Uuid::new_v4().to_string(),
            name,
            name_lower,
            owner_sub: owner_sub.to_string(),
            collaborators: collections::BTreeMap::new(),
            created_at: now,
            updated_at: now,
        };
        let guard = Guard::FreshDeck {
            deck_id: deck.deck_id.clone(),
        };
        let items = vec![
            TransactItem::Put {
                item: deck.to_item()?,
                condition: Some(guard.condition()),
            },
            access::put(&deck, &Principal::Owner(deck.owner_sub.clone()))?,
        ];
        self.store
            .transact_write_items(items)
            .await
            .map_err(|error| guard.translate(error))?;
        Ok(deck)
    }

    /// Read the canonical record of a deck.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "deck_access.get_deck", skip(self), err)
    )]
    pub async fn get_deck(&self, deck_id: &str) -> Result<Deck> {
        self.stored(deck_id)
            .await?
            .ok_or_else(|| Error::DeckNotFound {
                deck_id: deck_id.to_string(),
            })
    }

    /// Rename a deck and move every access row to the new name.
    ///
    /// `deck` must be the current version of the deck: a copy that is out of date, or whose
    /// owner no longer matches, fails with [`Error::Conflict`] and nothing is written. The
    /// access rows moved are those of the stored record, so collaborators added through
    /// another copy are moved too.
    ///
    /// Up to [`MAX_TRANSACTION_ITEMS`](transact_write_items::MAX_TRANSACTION_ITEMS) operations
    /// commit atomically. Beyond that the guarded canonical update commits first and the
    /// remaining principals follow in further transactions, each principal's delete and put
    /// in the same one. A failure past the first transaction therefore leaves some principals
    /// with their row on the old name, never with none or two.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "deck_access.rename_deck",
            skip(self, deck),
            fields(deck_id = %deck.deck_id),
            err
        )
    )]
    pub async fn rename_deck(&self, deck: &Deck, name: &str) -> Result<Deck> {
        let (name, name_lower) = model::normalize_name(name)?;
        let current = match self.stored(&deck.deck_id).await? {
            Some(current)
                if current.owner_sub == deck.owner_sub && current.updated_at == deck.updated_at =>
            {
                current
            }
            _ => {
                return Err(Error::Conflict {
                    deck_id: deck.deck_id.clone(),
                });
            }
        };
        let renamed = Deck {
            name,
            name_lower,
            updated_at: model::touch(current.updated_at),
            ..current.clone()
        };
        let guard = Guard::unchanged(&current)?;
        let update = UpdateExpression::default()
            .set(attribute::NAME, string(&renamed.name))
            .set(attribute::NAME_LOWER, string(&renamed.name_lower))
            .set(attribute::UPDATED_AT, to_attribute_value(renamed.updated_at)?);
        let canonical = TransactItem::Update {
            key: current.key(),
            update,
            condition: Some(guard.condition()),
        };
        let mut transactions =
            deck_store::pack(vec![canonical], access::rewrite(&current, &renamed)?).into_iter();
        if let Some(first) = transactions.next() {
            self.store
                .transact_write_items(first)
                .await
                .map_err(|error| guard.translate(error))?;
        }
        let rest: Vec<Vec<TransactItem>> = transactions.collect();
        if !rest.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                deck_id = %deck.deck_id,
                transactions = rest.len(),
                "rename spans several transactions"
            );
            for transaction in rest {
                self.store.transact_write_items(transaction).await?;
            }
        }
        Ok(renamed)
    }

    /// Delete a deck: its canonical row, every item, and every access row.
    ///
    /// The access rows removed are derived from the stored record, not from `deck`. Small
    /// decks go in one atomic transaction. Larger ones batch-delete the items first, then the
    /// access rows and finally the canonical row, so an interrupted delete leaves a deck that
    /// is still visible and can be deleted again. Deleting a deck that is already gone
    /// removes any item rows left behind and succeeds.
    ///
    /// # Errors
    ///
    /// [`Error::Conflict`] if `deck` names another owner, or if the deck changed while it was
    /// being deleted.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "deck_access.delete_deck",
            skip(self, deck),
            fields(deck_id = %deck.deck_id),
            err
        )
    )]
    pub async fn delete_deck(&self, deck: &Deck) -> Result<()> {
        let canonical = deck.key();
        let partition = query::KeyQuery {
            consistent_read: true,
            ..query::KeyQuery::partition(key::deck_partition(&deck.deck_id))
        };
        let mut current = None;
        let mut item_keys = Vec::new();
        for row in self.query_all(partition).await? {
            match key::TableKey::of(&row) {
                Some(keys) if keys == canonical => current = Some(Deck::from_item(row)?),
                Some(keys) => item_keys.push(keys),
                None => {}
            }
        }
        let Some(current) = current else {
            self.batch_delete(item_keys).await?;
            return Ok(());
        };
        if current.owner_sub != deck.owner_sub {
            return Err(Error::Conflict {
                deck_id: deck.deck_id.clone(),
            });
        }
        let guard = Guard::unchanged(&current)?;
        let mut tail = access::delete_all(&current);
        tail.push(TransactItem::Delete {
            key: canonical,
            condition: Some(guard.condition()),
        });

        if item_keys.len() + tail.len() <= transact_write_items::MAX_TRANSACTION_ITEMS {
            let items: Vec<TransactItem> = item_keys
                .into_iter()
                .map(TransactItem::delete)
                .chain(tail)
                .collect();
            self.store
                .transact_write_items(items)
                .await
                .map_err(|error| guard.translate(error))?;
            return Ok(());
        }

        if let Err(error) = self.batch_delete(item_keys).await {
            #[cfg(feature = "tracing")]
            tracing::warn!(deck_id = %deck.deck_id, %error, "deck partially deleted");
            return Err(error.into());
        }
        if let Err(error) = self.transact_chunked(tail).await {
            #[cfg(feature = "tracing")]
            tracing::warn!(deck_id = %deck.deck_id, %error, "deck partially deleted");
            return Err(guard.translate(error));
        }
        Ok(())
    }

    /// Share a deck with `email`.
    ///
    /// The email is case-normalized. The canonical update and the new access row commit in
    /// one transaction, guarded on the owner, on the stored name the access row is filed
    /// under, and on the email not collaborating yet. The returned record is built from the
    /// stored one, so a stale `deck` only needs the right owner.
    ///
    /// # Errors
    ///
    /// [`Error::DeckNotFound`] if the deck is gone, [`Error::DuplicateCollaborator`] if the
    /// guard fails.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "deck_access.add_collaborator",
            skip(self, deck),
            fields(deck_id = %deck.deck_id),
            err
        )
    )]
    pub async fn add_collaborator(&self, deck: &Deck, email: &str) -> Result<Deck> {
        let email = model::normalize_email(email)?;
        let current = self.get_deck(&deck.deck_id).await?;
        let updated_at = model::touch(current.updated_at);
        let collaborator = Collaborator {
            added_at: updated_at,
        };
        let update = UpdateExpression::default()
            .set(
                AttributePath::nested([attribute::COLLABORATORS, email.as_str()]),
                to_attribute_value(&collaborator)?,
            )
            .set(attribute::UPDATED_AT, to_attribute_value(updated_at)?);
        let mut updated = Deck {
            updated_at,
            ..current
        };
        updated.collaborators.insert(email.clone(), collaborator);
        let principal = Principal::Collaborator(email.clone());
        let guard = Guard::NewCollaborator {
            deck_id: deck.deck_id.clone(),
            owner_sub: deck.owner_sub.clone(),
            name_lower: updated.name_lower.clone(),
            email,
        };
        let items = vec![
            TransactItem::Update {
                key: deck.key(),
                update,
                condition: Some(guard.condition()),
            },
            access::put(&updated, &principal)?,
        ];
        self.store
            .transact_write_items(items)
            .await
            .map_err(|error| guard.translate(error))?;
        Ok(updated)
    }

    /// Revoke `email`'s access to a deck.
    ///
    /// Guarded like [`add_collaborator`](Self::add_collaborator); the access row deleted is
    /// the one filed under the stored name.
    ///
    /// # Errors
    ///
    /// [`Error::DeckNotFound`] if the deck is gone, [`Error::CollaboratorNotFound`] if the
    /// guard fails.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "deck_access.remove_collaborator",
            skip(self, deck),
            fields(deck_id = %deck.deck_id),
            err
        )
    )]
    pub async fn remove_collaborator(&self, deck: &Deck, email: &str) -> Result<Deck> {
        let email = model::normalize_email(email)?;
        let current = self.get_deck(&deck.deck_id).await?;
        let updated_at = model::touch(current.updated_at);
        let update = UpdateExpression::default()
            .remove(AttributePath::nested([attribute::COLLABORATORS, email.as_str()]))
            .set(attribute::UPDATED_AT, to_attribute_value(updated_at)?);
        let mut updated = Deck {
            updated_at,
            ..current
        };
        updated.collaborators.remove(&email);
        let principal = Principal::Collaborator(email.clone());
        let guard = Guard::ExistingCollaborator {
            deck_id: deck.deck_id.clone(),
            owner_sub: deck.owner_sub.clone(),
            name_lower: updated.name_lower.clone(),
            email,
        };
        let items = vec![
            TransactItem::Update {
                key: deck.key(),
                update,
                condition: Some(guard.condition()),
            },
            access::delete(&updated, &principal),
        ];
        self.store
            .transact_write_items(items)
            .await
            .map_err(|error| guard.translate(error))?;
        Ok(updated)
    }

    async fn stored(&self, deck_id: &str) -> Result<Option<Deck>> {
        self.store
            .get_item(key::deck(deck_id))
            .await?
            .map(Deck::from_item)
            .transpose()
    }
}
