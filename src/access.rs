//! Access index maintenance.
//!
//! Derives the access rows a deck needs from its canonical record and emits the transaction
//! operations that bring the index in line. Nothing here talks to the store: callers fold
//! the operations into the same transaction as the canonical write.

use crate::common::{Item, key};
use crate::error::Result;
use crate::model::{Access, AccessRow, Deck};
use crate::write::transact_write_items::TransactItem;

use serde_dynamo::to_item;

/// The identity an access row is filed under.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Principal {
    /// The owner, by subject.
    Owner(String),
    /// A collaborator, by normalized email.
    Collaborator(String),
}

impl Principal {
    /// Key of this principal's access row for a deck named `name_lower`.
    pub fn access_key(&self, name_lower: &str, deck_id: &str) -> key::TableKey {
        match self {
            Self::Owner(owner_sub) => key::owner_access(owner_sub, name_lower, deck_id),
            Self::Collaborator(email) => key::collaborator_access(email, name_lower, deck_id),
        }
    }

    fn access(&self) -> Access {
        match self {
            Self::Owner(_) => Access::Owner,
            Self::Collaborator(_) => Access::Collaborator,
        }
    }
}

/// Every principal that must hold an access row for `deck`: the owner, then each
/// collaborator.
pub fn principals(deck: &Deck) -> Vec<Principal> {
    let mut principals = Vec::with_capacity(deck.collaborators.len() + 1);
    principals.push(Principal::Owner(deck.owner_sub.clone()));
    principals.extend(deck.collaborators.keys().cloned().map(Principal::Collaborator));
    principals
}

/// The access row `principal` holds for `deck`.
pub fn row(deck: &Deck, principal: &Principal) -> AccessRow {
    AccessRow {
        deck_id: deck.deck_id.clone(),
        name: deck.name.clone(),
        name_lower: deck.name_lower.clone(),
        owner_sub: deck.owner_sub.clone(),
        access: principal.access(),
    }
}

fn row_item(deck: &Deck, principal: &Principal) -> Result<Item> {
    let mut item: Item = to_item(row(deck, principal))?;
    principal
        .access_key(&deck.name_lower, &deck.deck_id)
        .stamp(&mut item);
    Ok(item)
}

/// Write the access row of one principal.
pub(crate) fn put(deck: &Deck, principal: &Principal) -> Result<TransactItem> {
    Ok(TransactItem::put(row_item(deck, principal)?))
}

/// Remove the access row of one principal.
pub(crate) fn delete(deck: &Deck, principal: &Principal) -> TransactItem {
    TransactItem::delete(principal.access_key(&deck.name_lower, &deck.deck_id))
}

/// Remove every access row of `deck`.
pub(crate) fn delete_all(deck: &Deck) -> Vec<TransactItem> {
    principals(deck)
        .iter()
        .map(|principal| delete(deck, principal))
        .collect()
}

/// Move every access row of `before` to reflect the name of `after`.
///
/// Yields one group per principal. A group deletes the old row and writes the new one, so it
/// must commit in a single transaction for the principal to keep exactly one row. When
/// `nameLower` is unchanged the sort keys are too, and each row is overwritten in place;
/// a transaction may not touch the same key twice.
pub(crate) fn rewrite(before: &Deck, after: &Deck) -> Result<Vec<Vec<TransactItem>>> {
    let moved = before.name_lower != after.name_lower;
    principals(before)
        .iter()
        .map(|principal| {
            let replacement = put(after, principal)?;
            Ok(if moved {
                vec![delete(before, principal), replacement]
            } else {
                vec![replacement]
            })
        })
        .collect()
}
