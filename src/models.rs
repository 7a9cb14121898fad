// Data models for the character listing API and favorites documents
//
// These structs map to the listing API's JSON format. The same Character
// serialization is used as the body of a favorites document.
//
// `id` and `name` are required: a body without them is a decode error.
// `origin` and `image` fall back to empty values. Unknown fields are ignored.

use serde::{Deserialize, Serialize};

/// A listed (and possibly favorited) character
///
/// Identity is the `id` alone. Two values with the same id are the same
/// entity even if the other fields differ (e.g. a stale favorites document).
/// Use [`Character::same_entity`] for identity, `==` for full value equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub origin: Origin,
    #[serde(default)]
    pub image: String,
}

impl Character {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            origin: Origin::default(),
            image: String::new(),
        }
    }

    /// Builder-style origin setter
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Origin {
            name: origin.into(),
        };
        self
    }

    /// Builder-style image setter
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// True if both values refer to the same character (same id)
    pub fn same_entity(&self, other: &Character) -> bool {
        self.id == other.id
    }
}

/// Where a character comes from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    #[serde(default)]
    pub name: String,
}

/// One page of results from the listing endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub results: Vec<Character>,
    pub info: PageInfo,
}

impl Page {
    /// A page with no results (used for searches without matches)
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            info: PageInfo {
                count: 0,
                pages: 1,
                next: None,
                prev: None,
            },
        }
    }
}

/// Pagination metadata
///
/// Only `pages` drives navigation; the cursors are carried for completeness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub count: u32,
    pub pages: u32,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub prev: Option<String>,
}

/// Keep the first occurrence of every id, preserving order
pub fn dedup_by_id(characters: Vec<Character>) -> Vec<Character> {
    let mut seen = std::collections::HashSet::with_capacity(characters.len());
    characters
        .into_iter()
        .filter(|c| seen.insert(c.id))
        .collect()
}
