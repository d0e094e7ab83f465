#![deny(missing_docs)]

//! # Deck Access
//!
//! Multi-tenant sharing for decks of dos, stored in a single DynamoDB table.
//!
//! ## Overview
//!
//! Every deck has one canonical row, authoritative for its name, owner and collaborators.
//! Listing "decks I can see" without a secondary index is served by access rows: one per
//! principal (the owner by subject, each collaborator by email), keyed so that a single
//! partition query returns that principal's decks sorted by name. The access rows are a
//! materialized view of the canonical rows, and every mutation writes both in one
//! conditional transaction:
//! - creating, renaming and deleting decks
//! - adding and removing collaborators
//! - creating, updating and deleting dos
//!
//! Each transaction carries at most one guard whose failure has a domain meaning, so a
//! cancelled write always maps to exactly one [`Error`].
//!
//! ## Quick Example
//!
//! ```rust
//! use deck_access::{DeckStore, Visibility, store::memory::MemoryStore};
//!
//! # async fn example() -> deck_access::Result<()> {
//! let decks = DeckStore::new(MemoryStore::new());
//! let deck = decks.create_deck("auth0|a", "Focus Deck").await?;
//! let deck = decks.rename_deck(&deck, "Focus Deck v2").await?;
//! let deck = decks.add_collaborator(&deck, "B@x.com").await?;
//!
//! let mine = decks
//!     .list_accessible_decks("auth0|a", None, Visibility::Mine, Some("focus"))
//!     .await?;
//! assert_eq!(mine[0].name, "Focus Deck v2");
//!
//! let shared = decks
//!     .list_accessible_decks("auth0|b", Some("b@x.com"), Visibility::Shared, None)
//!     .await?;
//! assert_eq!(shared[0].deck_id, deck.deck_id);
//! # Ok(())
//! # }
//! ```
//!
//! Against DynamoDB, build the store from [`config::Settings`]:
//!
//! ```rust,no_run
//! use deck_access::{DeckStore, config};
//!
//! # async fn example() -> deck_access::Result<()> {
//! let decks = DeckStore::from_settings(&config::Settings::from_env()).await;
//! let deck = decks.create_deck("auth0|a", "Focus").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`mod@common`] - Key layout and condition expressions
//! - [`mod@read`] - Query and batch read requests
//! - [`mod@write`] - Update expressions, transactions and batch deletes
//! - [`mod@store`] - The [`Store`](store::Store) seam and its DynamoDB and in-memory implementations
//! - [`mod@access`] - Derivation of access rows from canonical decks
//! - [`mod@model`] - Records and caller-facing values
//! - [`mod@config`] - Settings and client construction

/// Key layout and condition expressions.
pub mod common;

/// Read requests: partition queries and batch point reads.
pub mod read;

/// Write requests: update expressions, transactions and batch deletes.
pub mod write;

pub mod access;
pub mod config;
pub mod error;
pub mod model;
pub mod store;

mod authorize;
mod deck_store;
mod guard;
mod items;
mod loader;
mod mutator;
mod planner;

pub use authorize::authorize_deck;
pub use deck_store::DeckStore;
pub use error::{Error, Result};
pub use model::{
    Access, AccessRow, Collaborator, Deck, DeckSummary, Do, DoPatch, Identity, Visibility,
};
