use crate::common::Item;

use aws_sdk_dynamodb::types;

/// Name of the partition key attribute.
pub const PARTITION_KEY: &str = "PK";

/// Name of the sort key attribute.
pub const SORT_KEY: &str = "SK";

const DECK_PREFIX: &str = "DECK#";
const DECK_SORT_KEY: &str = "DECK";
const DO_PREFIX: &str = "DO#";
const OWNER_ACCESS_PREFIX: &str = "ACCESS#USER#";
const COLLABORATOR_ACCESS_PREFIX: &str = "ACCESS#EMAIL#";

/// Primary key of a row in the single table.
///
/// ```rust
/// use deck_access::common::key;
///
/// let keys = key::deck("d1");
/// assert_eq!(keys.partition_key, "DECK#d1");
/// assert_eq!(keys.sort_key, "DECK");
/// ```
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TableKey {
    /// The `PK` value.
    pub partition_key: String,
    /// The `SK` value.
    pub sort_key: String,
}

impl TableKey {
    /// Read the key attributes of an item.
    ///
    /// Returns `None` when either attribute is missing or not a string.
    pub fn of(item: &Item) -> Option<Self> {
        let partition_key = item.get(PARTITION_KEY)?.as_s().ok()?.clone();
        let sort_key = item.get(SORT_KEY)?.as_s().ok()?.clone();
        Some(Self {
            partition_key,
            sort_key,
        })
    }

    /// Write the key attributes into an item.
    pub(crate) fn stamp(self, item: &mut Item) {
        item.insert(
            PARTITION_KEY.to_string(),
            types::AttributeValue::S(self.partition_key),
        );
        item.insert(SORT_KEY.to_string(), types::AttributeValue::S(self.sort_key));
    }
}

impl From<TableKey> for Item {
    fn from(key: TableKey) -> Self {
        let mut item = Self::with_capacity(2);
        key.stamp(&mut item);
        item
    }
}

/// Partition holding a deck's canonical row and all of its items.
pub fn deck_partition(deck_id: &str) -> String {
    format!("{DECK_PREFIX}{deck_id}")
}

/// Canonical deck row.
pub fn deck(deck_id: &str) -> TableKey {
    TableKey {
        partition_key: deck_partition(deck_id),
        sort_key: DECK_SORT_KEY.to_string(),
    }
}

/// Sort key prefix shared by every item row of a deck.
pub fn do_prefix() -> &'static str {
    DO_PREFIX
}

/// Item (do) row.
pub fn do_item(deck_id: &str, do_id: &str) -> TableKey {
    TableKey {
        partition_key: deck_partition(deck_id),
        sort_key: format!("{DO_PREFIX}{do_id}"),
    }
}

/// Access partition of a deck owner.
pub fn owner_access_partition(owner_sub: &str) -> String {
    format!("{OWNER_ACCESS_PREFIX}{owner_sub}")
}

/// Access partition of a collaborator, keyed by normalized email.
pub fn collaborator_access_partition(email: &str) -> String {
    format!("{COLLABORATOR_ACCESS_PREFIX}{email}")
}

/// Access row sort key. Embeds `nameLower` first so a partition query returns
/// decks sorted by name and can be range-filtered by a name prefix.
pub fn access_sort_key(name_lower: &str, deck_id: &str) -> String {
    format!("{DECK_PREFIX}{name_lower}#{deck_id}")
}

/// Sort key prefix matching every access row whose `nameLower` starts with `prefix_lower`.
pub fn access_sort_key_prefix(prefix_lower: &str) -> String {
    format!("{DECK_PREFIX}{prefix_lower}")
}

/// Owner access row.
pub fn owner_access(owner_sub: &str, name_lower: &str, deck_id: &str) -> TableKey {
    TableKey {
        partition_key: owner_access_partition(owner_sub),
        sort_key: access_sort_key(name_lower, deck_id),
    }
}

/// Collaborator access row.
pub fn collaborator_access(email: &str, name_lower: &str, deck_id: &str) -> TableKey {
    TableKey {
        partition_key: collaborator_access_partition(email),
        sort_key: access_sort_key(name_lower, deck_id),
    }
}
