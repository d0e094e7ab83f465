//! Records stored in the single table, and the values callers pass in.

use crate::common::{Item, key};
use crate::error::{Error, Result};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_dynamo::{from_item, to_item};
use std::{collections, str};

/// Metadata kept per collaborator on the canonical deck row.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Collaborator {
    /// When the collaborator was added.
    pub added_at: DateTime<Utc>,
}

/// Canonical deck record: the single authoritative row of a deck.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    /// Opaque id, generated at creation.
    pub deck_id: String,
    /// Display name, trimmed.
    pub name: String,
    /// `name` lowercased; drives access row ordering and prefix search.
    pub name_lower: String,
    /// Identity of the creating principal. Never changes.
    pub owner_sub: String,
    /// Collaborators keyed by lowercased email.
    #[serde(default)]
    pub collaborators: collections::BTreeMap<String, Collaborator>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time. Never moves backwards.
    pub updated_at: DateTime<Utc>,
}

impl Deck {
    /// Primary key of the canonical row.
    pub fn key(&self) -> key::TableKey {
        key::deck(&self.deck_id)
    }

    /// Whether `subject` owns the deck.
    pub fn is_owner(&self, subject: &str) -> bool {
        self.owner_sub == subject
    }

    /// Whether `email` (normalized) collaborates on the deck.
    pub fn is_collaborator(&self, email: &str) -> bool {
        self.collaborators.contains_key(email)
    }

    pub(crate) fn to_item(&self) -> Result<Item> {
        let mut item: Item = to_item(self)?;
        self.key().stamp(&mut item);
        Ok(item)
    }

    pub(crate) fn from_item(item: Item) -> Result<Self> {
        Ok(from_item(item)?)
    }
}

/// How a principal reaches a deck.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    /// The principal owns the deck.
    Owner,
    /// The principal was added as a collaborator.
    Collaborator,
}

/// Denormalized access row: a materialized view of "principal may see deck".
///
/// Never authoritative; always reconstructable from the canonical [`Deck`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRow {
    /// The deck this row points at.
    pub deck_id: String,
    /// Copy of the deck name.
    pub name: String,
    /// Copy of the lowercased deck name, also embedded in the sort key.
    pub name_lower: String,
    /// Copy of the deck owner.
    pub owner_sub: String,
    /// Owner or collaborator.
    pub access: Access,
}

impl AccessRow {
    pub(crate) fn from_item(item: Item) -> Result<Self> {
        Ok(from_item(item)?)
    }
}

/// An item of a deck.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Do {
    /// Opaque id, generated at creation.
    pub do_id: String,
    /// Owning deck. Never changes.
    pub deck_id: String,
    /// Text, trimmed and non-empty.
    pub text: String,
    /// Completion flag.
    #[serde(default)]
    pub completed: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Do {
    /// Primary key of the item row.
    pub fn key(&self) -> key::TableKey {
        key::do_item(&self.deck_id, &self.do_id)
    }

    pub(crate) fn to_item(&self) -> Result<Item> {
        let mut item: Item = to_item(self)?;
        self.key().stamp(&mut item);
        Ok(item)
    }

    pub(crate) fn from_item(item: Item) -> Result<Self> {
        Ok(from_item(item)?)
    }
}

/// Partial update of an item. Only provided fields change.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DoPatch {
    /// New text.
    pub text: Option<String>,
    /// New completion flag.
    pub completed: Option<bool>,
}

impl DoPatch {
    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.completed.is_none()
    }
}

/// Which access partitions a listing reads.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Visibility {
    /// Decks the principal owns.
    Mine,
    /// Decks shared with the principal's email.
    Shared,
    /// Both.
    #[default]
    All,
}

impl Visibility {
    pub(crate) fn includes_owned(self) -> bool {
        matches!(self, Self::Mine | Self::All)
    }

    pub(crate) fn includes_shared(self) -> bool {
        matches!(self, Self::Shared | Self::All)
    }
}

impl str::FromStr for Visibility {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "mine" => Ok(Self::Mine),
            "shared" => Ok(Self::Shared),
            "all" => Ok(Self::All),
            other => Err(Error::invalid_input(format!("unknown visibility {other:?}"))),
        }
    }
}

/// A caller identity, already verified upstream and trusted as is.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Identity {
    /// Stable subject identifier.
    pub subject: String,
    /// Email claim, lowercased.
    pub email: Option<String>,
    /// Whether the identity provider verified the email.
    pub email_verified: bool,
}

/// Listing entry for a deck visible to a caller.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckSummary {
    /// The deck.
    pub deck_id: String,
    /// Its current name.
    pub name: String,
    /// Whether the caller owns it.
    pub is_owner: bool,
    /// Number of collaborators.
    pub collaborators: usize,
}

impl DeckSummary {
    /// Summarize `deck` as seen by `subject`.
    pub fn of(deck: &Deck, subject: &str) -> Self {
        Self {
            deck_id: deck.deck_id.clone(),
            name: deck.name.clone(),
            is_owner: deck.is_owner(subject),
            collaborators: deck.collaborators.len(),
        }
    }
}

/// Trim a deck name and derive its lowercase form.
pub(crate) fn normalize_name(name: &str) -> Result<(String, String)> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::invalid_input("name required"));
    }
    Ok((name.to_string(), name.to_lowercase()))
}

/// Trim item text.
pub(crate) fn normalize_text(text: &str) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::invalid_input("text required"));
    }
    Ok(text.to_string())
}

/// Case-normalize a collaborator email.
pub(crate) fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim();
    if email.is_empty() {
        return Err(Error::invalid_input("email required"));
    }
    Ok(email.to_lowercase())
}

/// The next modification time of a record last modified at `previous`.
///
/// Always later than `previous`, even when the clock is not, so `updatedAt` also serves as
/// the version of a deck row.
pub(crate) fn touch(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + chrono::Duration::microseconds(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::common::attribute;
    use aws_sdk_dynamodb::types;
    use chrono::TimeZone;
    use rstest::rstest;

    fn deck() -> Deck {
        let created_at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        Deck {
            deck_id: "d1".to_string(),
            name: "Focus Deck".to_string(),
            name_lower: "focus deck".to_string(),
            owner_sub: "auth0|a".to_string(),
            collaborators: collections::BTreeMap::from([(
                "b@x.com".to_string(),
                Collaborator {
                    added_at: created_at,
                },
            )]),
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_deck_item_layout() {
        let item = deck().to_item().unwrap();
        assert_eq!(item["PK"], types::AttributeValue::S("DECK#d1".to_string()));
        assert_eq!(item["SK"], types::AttributeValue::S("DECK".to_string()));
        assert_eq!(item[attribute::NAME_LOWER], types::AttributeValue::S("focus deck".to_string()));
        assert_eq!(item[attribute::OWNER_SUB], types::AttributeValue::S("auth0|a".to_string()));
        let collaborators = item[attribute::COLLABORATORS].as_m().unwrap();
        assert!(collaborators["b@x.com"].as_m().unwrap().contains_key("addedAt"));
        for name in [attribute::NAME, attribute::UPDATED_AT] {
            assert!(item.contains_key(name), "{name}");
        }
        assert_eq!(Deck::from_item(item).unwrap(), deck());
    }

    #[test]
    fn test_deck_without_collaborators_attribute() {
        let mut item = deck().to_item().unwrap();
        item.remove(attribute::COLLABORATORS);
        assert!(Deck::from_item(item).unwrap().collaborators.is_empty());
    }

    #[test]
    fn test_access_tag_serialization() {
        let row = AccessRow {
            deck_id: "d1".to_string(),
            name: "Focus".to_string(),
            name_lower: "focus".to_string(),
            owner_sub: "auth0|a".to_string(),
            access: Access::Collaborator,
        };
        let item: Item = to_item(&row).unwrap();
        assert_eq!(item[attribute::ACCESS], types::AttributeValue::S("collaborator".to_string()));
        assert_eq!(AccessRow::from_item(item).unwrap(), row);
    }

    #[rstest]
    #[case::plain("Focus", "Focus", "focus")]
    #[case::padded("  Focus Deck v2 ", "Focus Deck v2", "focus deck v2")]
    #[case::unicode("Ärger", "Ärger", "ärger")]
    fn test_normalize_name(#[case] input: &str, #[case] name: &str, #[case] name_lower: &str) {
        assert_eq!(
            normalize_name(input).unwrap(),
            (name.to_string(), name_lower.to_string())
        );
    }

    #[rstest]
    #[case::empty("")]
    #[case::whitespace(" \t\n")]
    fn test_normalize_name_rejects_blank(#[case] input: &str) {
        assert!(matches!(normalize_name(input), Err(Error::InvalidInput(_))));
        assert!(matches!(normalize_text(input), Err(Error::InvalidInput(_))));
        assert!(matches!(normalize_email(input), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(" B@X.com ").unwrap(), "b@x.com");
    }

    #[rstest]
    #[case::mine("mine", Visibility::Mine)]
    #[case::shared("shared", Visibility::Shared)]
    #[case::all("all", Visibility::All)]
    fn test_visibility_from_str(#[case] input: &str, #[case] expected: Visibility) {
        assert_eq!(input.parse::<Visibility>().unwrap(), expected);
    }

    #[test]
    fn test_visibility_rejects_unknown() {
        assert!(matches!("everyone".parse::<Visibility>(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_touch_always_moves_forward() {
        let future = Utc::now() + chrono::Duration::hours(1);
        assert_eq!(touch(future), future + chrono::Duration::microseconds(1));
        let deck = deck();
        assert!(touch(deck.updated_at) > deck.updated_at);
    }

    #[test]
    fn test_summary() {
        let summary = DeckSummary::of(&deck(), "auth0|b");
        assert!(!summary.is_owner);
        assert_eq!(summary.collaborators, 1);
    }
}
