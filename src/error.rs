//! Domain error taxonomy.

use crate::store;

/// Errors returned by every deck, collaborator and item operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A name or text was empty after trimming, or an update carried no fields.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// No canonical row exists for the deck.
    #[error("deck {deck_id} not found")]
    DeckNotFound {
        /// The missing deck.
        deck_id: String,
    },
    /// No row exists for the item.
    #[error("do {do_id} not found in deck {deck_id}")]
    DoNotFound {
        /// The deck the item was looked up in.
        deck_id: String,
        /// The missing item.
        do_id: String,
    },
    /// The email is already a collaborator of the deck.
    #[error("{email} already collaborates on deck {deck_id}")]
    DuplicateCollaborator {
        /// The deck.
        deck_id: String,
        /// The normalized collaborator email.
        email: String,
    },
    /// The email is not a collaborator of the deck.
    #[error("{email} does not collaborate on deck {deck_id}")]
    CollaboratorNotFound {
        /// The deck.
        deck_id: String,
        /// The normalized collaborator email.
        email: String,
    },
    /// The record changed underneath the caller, or a fresh id collided.
    ///
    /// Not retried here: re-read the record and try again.
    #[error("deck {deck_id} was modified concurrently")]
    Conflict {
        /// The contended deck.
        deck_id: String,
    },
    /// The identity may not perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Infrastructure failure with no domain meaning.
    #[error(transparent)]
    Store(#[from] store::Error),
}

impl Error {
    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

impl From<serde_dynamo::Error> for Error {
    fn from(error: serde_dynamo::Error) -> Self {
        Self::Store(store::Error::Serialization(error))
    }
}

/// Result alias for domain operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
