use crate::common::key;
use crate::deck_store::DeckStore;
use crate::error::{Error, Result};
use crate::model::{Access, AccessRow, Visibility};
use crate::read::query;
use crate::store::Store;

use indexmap::IndexMap;

impl<S: Store> DeckStore<S> {
    /// Decks reachable by a principal, read from its access partitions.
    ///
    /// `mine` reads the owner partition of `subject`, `shared` the collaborator partition of
    /// `email`, `all` both. `name_prefix` restricts to decks whose lowercased name starts with
    /// it. Each partition comes back in name order; a deck reachable both ways is listed once,
    /// as owner.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] for `shared` without an email.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "deck_access.list_accessible_decks", skip(self), err)
    )]
    pub async fn list_accessible_decks(
        &self,
        subject: &str,
        email: Option<&str>,
        visibility: Visibility,
        name_prefix: Option<&str>,
    ) -> Result<Vec<AccessRow>> {
        let mut partitions = Vec::with_capacity(2);
        if visibility.includes_owned() {
            partitions.push(key::owner_access_partition(subject));
        }
        if visibility.includes_shared() {
            match email {
                Some(email) => partitions.push(key::collaborator_access_partition(
                    &email.trim().to_lowercase(),
                )),
                None if visibility == Visibility::Shared => {
                    return Err(Error::invalid_input("shared decks require an email"));
                }
                None => {}
            }
        }
        let sort_key_prefix = name_prefix
            .filter(|prefix| !prefix.is_empty())
            .map(|prefix| key::access_sort_key_prefix(&prefix.to_lowercase()));

        let mut rows: IndexMap<String, AccessRow> = IndexMap::new();
        for partition in partitions {
            let mut query = query::KeyQuery::partition(partition);
            if let Some(prefix) = &sort_key_prefix {
                query = query.with_sort_key_prefix(prefix.clone());
            }
            for item in self.query_all(query).await? {
                let row = AccessRow::from_item(item)?;
                let owned = rows
                    .get(&row.deck_id)
                    .is_some_and(|existing| existing.access == Access::Owner);
                if !owned {
                    rows.insert(row.deck_id.clone(), row);
                }
            }
        }
        Ok(rows.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::access::{self, Principal};
    use crate::store::memory::MemoryStore;
    use rstest::rstest;

    async fn library() -> DeckStore<MemoryStore> {
        let decks = DeckStore::new(MemoryStore::with_page_size(2));
        for name in ["Focus", "focus deck", "Errands", "Zeta"] {
            decks.create_deck("auth0|a", name).await.unwrap();
        }
        let shared = decks.create_deck("auth0|b", "Family").await.unwrap();
        decks.add_collaborator(&shared, "a@x.com").await.unwrap();
        decks
    }

    fn names(rows: &[AccessRow]) -> Vec<&str> {
        rows.iter().map(|row| row.name.as_str()).collect()
    }

    #[rstest]
    // Sort keys embed `nameLower#deckId`, so "focus deck#" sorts before "focus#".
    #[case::mine(Visibility::Mine, None, vec!["Errands", "focus deck", "Focus", "Zeta"])]
    #[case::shared(Visibility::Shared, None, vec!["Family"])]
    #[case::all(Visibility::All, None, vec!["Errands", "focus deck", "Focus", "Zeta", "Family"])]
    #[case::prefix(Visibility::Mine, Some("FOC"), vec!["focus deck", "Focus"])]
    #[case::prefix_all(Visibility::All, Some("f"), vec!["focus deck", "Focus", "Family"])]
    #[case::empty_prefix(Visibility::Shared, Some(""), vec!["Family"])]
    #[case::no_match(Visibility::All, Some("q"), vec![])]
    #[tokio::test]
    async fn test_list_accessible_decks(
        #[case] visibility: Visibility,
        #[case] name_prefix: Option<&str>,
        #[case] expected: Vec<&str>,
    ) {
        let decks = library().await;
        let rows = decks
            .list_accessible_decks("auth0|a", Some("A@x.com"), visibility, name_prefix)
            .await
            .unwrap();
        assert_eq!(names(&rows), expected);
    }

    #[tokio::test]
    async fn test_shared_requires_email() {
        let decks = library().await;
        let result = decks
            .list_accessible_decks("auth0|a", None, Visibility::Shared, None)
            .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        let owned = decks
            .list_accessible_decks("auth0|a", None, Visibility::All, None)
            .await
            .unwrap();
        assert_eq!(owned.len(), 4);
    }

    #[tokio::test]
    async fn test_owner_row_wins() {
        let decks = DeckStore::new(MemoryStore::new());
        let deck = decks.create_deck("auth0|a", "Focus").await.unwrap();
        // A stray collaborator row for the owner's own email.
        let stray = access::put(&deck, &Principal::Collaborator("a@x.com".to_string())).unwrap();
        decks.store().transact_write_items(vec![stray]).await.unwrap();
        let rows = decks
            .list_accessible_decks("auth0|a", Some("a@x.com"), Visibility::All, None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].access, Access::Owner);
    }
}
