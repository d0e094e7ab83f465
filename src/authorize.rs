//! Access checks for callers that act on behalf of an [`Identity`].

use crate::deck_store::DeckStore;
use crate::error::{Error, Result};
use crate::model::{self, Access, Deck, DeckSummary, Identity, Visibility};
use crate::store::Store;

impl Identity {
    /// The identity's email, for reaching decks shared with it.
    ///
    /// # Errors
    ///
    /// [`Error::Forbidden`] without an email claim, or with an unverified one when
    /// `require_verified` is set.
    pub fn require_email(&self, require_verified: bool) -> Result<&str> {
        match self.email.as_deref() {
            None | Some("") => Err(Error::Forbidden("email required".to_string())),
            Some(_) if require_verified && !self.email_verified => {
                Err(Error::Forbidden("email not verified".to_string()))
            }
            Some(email) => Ok(email),
        }
    }

    /// The email to look shared decks up by, if it may be used.
    fn usable_email(&self, require_verified: bool) -> Option<String> {
        self.require_email(require_verified)
            .ok()
            .map(str::to_lowercase)
    }
}

/// How `identity` may reach `deck`.
///
/// The owner always passes. Anyone else passes as collaborator if `require_owner` is unset
/// and their email is a key of the deck's collaborators.
pub fn authorize_deck(
    deck: &Deck,
    identity: &Identity,
    require_owner: bool,
    require_verified: bool,
) -> Result<Access> {
    if deck.is_owner(&identity.subject) {
        return Ok(Access::Owner);
    }
    if require_owner {
        return Err(Error::Forbidden("owner only".to_string()));
    }
    let email = identity.require_email(require_verified)?.to_lowercase();
    if deck.is_collaborator(&email) {
        Ok(Access::Collaborator)
    } else {
        Err(Error::Forbidden("no access to deck".to_string()))
    }
}

impl<S: Store> DeckStore<S> {
    /// [`authorize_deck`] with this store's email verification policy.
    pub fn authorize(&self, deck: &Deck, identity: &Identity, require_owner: bool) -> Result<Access> {
        authorize_deck(deck, identity, require_owner, self.require_email_verified)
    }

    /// Read a deck and check that `identity` may reach it.
    pub async fn open_deck(
        &self,
        identity: &Identity,
        deck_id: &str,
        require_owner: bool,
    ) -> Result<Deck> {
        let deck = self.get_deck(deck_id).await?;
        self.authorize(&deck, identity, require_owner)?;
        Ok(deck)
    }

    /// Share a deck owned by `identity` with `email`.
    ///
    /// # Errors
    ///
    /// [`Error::Forbidden`] unless `identity` owns the deck, [`Error::InvalidInput`] when
    /// sharing with oneself.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "deck_access.add_collaborator_as",
            skip(self, identity),
            fields(subject = %identity.subject),
            err
        )
    )]
    pub async fn add_collaborator_as(
        &self,
        identity: &Identity,
        deck_id: &str,
        email: &str,
    ) -> Result<Deck> {
        let deck = self.open_deck(identity, deck_id, true).await?;
        let email = model::normalize_email(email)?;
        if identity
            .email
            .as_deref()
            .is_some_and(|own| own.to_lowercase() == email)
        {
            return Err(Error::invalid_input("cannot add self as collaborator"));
        }
        self.add_collaborator(&deck, &email).await
    }

    /// Summaries of the decks `identity` can see: owned decks first, then by name.
    ///
    /// Access rows whose deck no longer exists are skipped.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "deck_access.list_deck_summaries",
            skip(self, identity),
            fields(subject = %identity.subject),
            err
        )
    )]
    pub async fn list_deck_summaries(
        &self,
        identity: &Identity,
        visibility: Visibility,
        search: Option<&str>,
    ) -> Result<Vec<DeckSummary>> {
        if visibility.includes_shared() {
            identity.require_email(self.require_email_verified)?;
        }
        let email = identity.usable_email(self.require_email_verified);
        let rows = self
            .list_accessible_decks(&identity.subject, email.as_deref(), visibility, search)
            .await?;
        let decks = self.load_decks(rows.iter().map(|row| &row.deck_id)).await?;
        let mut summaries: Vec<DeckSummary> = rows
            .iter()
            .filter_map(|row| decks.get(&row.deck_id))
            .map(|deck| DeckSummary::of(deck, &identity.subject))
            .collect();
        summaries.sort_by_cached_key(|summary| (!summary.is_owner, summary.name.to_lowercase()));
        Ok(summaries)
    }
}
