use crate::common::key;
use crate::deck_store::{self, DeckStore};
use crate::error::Result;
use crate::model::Deck;
use crate::read::batch_get_item;
use crate::store::{self, Store};

use indexmap::{IndexMap, IndexSet};
use std::collections;

impl<S: Store> DeckStore<S> {
    /// Load the canonical records of `deck_ids` in batch reads.
    ///
    /// Ids are deduplicated and requested in chunks of
    /// [`MAX_BATCH_GET_ITEMS`](batch_get_item::MAX_BATCH_GET_ITEMS). The returned map follows
    /// the order of first appearance in `deck_ids`; ids without a canonical row are left out.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "deck_access.load_decks", skip_all, err)
    )]
    pub async fn load_decks<I, T>(&self, deck_ids: I) -> Result<IndexMap<String, Deck>>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let deck_ids: IndexSet<String> = deck_ids
            .into_iter()
            .map(|deck_id| deck_id.as_ref().to_string())
            .collect();
        let mut found: collections::HashMap<String, Deck> =
            collections::HashMap::with_capacity(deck_ids.len());
        let mut pending: Vec<key::TableKey> =
            deck_ids.iter().map(|deck_id| key::deck(deck_id)).collect();
        for round in 0..deck_store::MAX_UNPROCESSED_ROUNDS {
            if pending.is_empty() {
                break;
            }
            if round > 0 {
                #[cfg(feature = "tracing")]
                tracing::warn!(round, keys = pending.len(), "retrying unprocessed batch reads");
                tokio::time::sleep(deck_store::backoff(round)).await;
            }
            let mut unprocessed = Vec::new();
            for batch_get in batch_get_item::BatchGet::chunked(pending) {
                let output = self.store.batch_get_item(batch_get).await?;
                for item in output.items {
                    let deck = Deck::from_item(item)?;
                    found.insert(deck.deck_id.clone(), deck);
                }
                unprocessed.extend(output.unprocessed_keys);
            }
            pending = unprocessed;
        }
        if !pending.is_empty() {
            return Err(store::Error::Unprocessed {
                count: pending.len(),
            }
            .into());
        }
        Ok(deck_ids
            .into_iter()
            .filter_map(|deck_id| found.remove(&deck_id).map(|deck| (deck_id, deck)))
            .collect())
    }
}
