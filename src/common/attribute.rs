// Must match the camelCase field names the records serialize to.

/// Role tag of an access row.
pub const ACCESS: &str = "access";

/// Map of collaborator email to membership on a deck row.
pub const COLLABORATORS: &str = "collaborators";

/// Completion flag of an item row.
pub const COMPLETED: &str = "completed";

/// Display name of a deck.
pub const NAME: &str = "name";

/// Lowercased deck name, embedded in access sort keys.
pub const NAME_LOWER: &str = "nameLower";

/// Subject of the deck owner.
pub const OWNER_SUB: &str = "ownerSub";

/// Text of an item row.
pub const TEXT: &str = "text";

/// Last modification time; strictly increases with every deck mutation.
pub const UPDATED_AT: &str = "updatedAt";
