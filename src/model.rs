use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::dupes::PendingQueue;
use crate::error::Error;

/// Item priority. Only `low` and `high` are ranked; any other stored value
/// (the app also writes `medium`) is carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Priority {
    #[default]
    Low,
    High,
    Other(String),
}

impl Priority {
    pub fn medium() -> Self {
        Priority::Other("medium".to_string())
    }

    /// Merge rank: `low < high`. Unranked values return `None`.
    pub fn rank(&self) -> Option<u8> {
        match self {
            Priority::Low => Some(0),
            Priority::High => Some(1),
            Priority::Other(_) => None,
        }
    }

    /// Sort key for listing, most urgent first.
    pub fn display_order(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Other(_) => 1,
            Priority::Low => 2,
        }
    }

    fn from_stored(s: &str) -> Self {
        match s {
            "low" => Priority::Low,
            "high" => Priority::High,
            other => Priority::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::High => write!(f, "high"),
            Priority::Other(s) => write!(f, "{s}"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::medium()),
            _ => Err(Error::InvalidPriority(s.to_string())),
        }
    }
}

impl Serialize for Priority {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

// Stored values outside low/high survive a load/save cycle unchanged
impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Priority::from_stored(&s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    ToBuy,
    Bought,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::ToBuy => write!(f, "to-buy"),
            Status::Bought => write!(f, "bought"),
        }
    }
}

impl std::str::FromStr for Status {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "to-buy" | "tobuy" => Ok(Status::ToBuy),
            "bought" => Ok(Status::Bought),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub category: String,
    pub quantity: String,
    pub priority: Priority,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub added_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bought_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bought_at: Option<DateTime<Utc>>,
}

/// A proposed item that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub category: String,
    pub quantity: String,
    pub priority: Priority,
    pub status: Status,
    pub added_by: String,
}

/// Field subset for an item update. `None` leaves the field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub bought_by: Option<Option<String>>,
    pub bought_at: Option<Option<DateTime<Utc>>>,
}

impl ItemUpdate {
    pub fn is_empty(&self) -> bool {
        *self == ItemUpdate::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ItemAdded,
    ItemBought,
    ListShared,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::ItemAdded => write!(f, "item_added"),
            NotificationKind::ItemBought => write!(f, "item_bought"),
            NotificationKind::ListShared => write!(f, "list_shared"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub message: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedListItem {
    pub id: String,
    pub name: String,
    pub quantity: String,
    pub priority: Priority,
    pub status: Status,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedList {
    pub id: String,
    pub name: String,
    pub items: Vec<SharedListItem>,
    pub created_at: DateTime<Utc>,
    pub share_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Store {
    #[serde(default)]
    pub users: BTreeMap<String, User>,
    #[serde(default)]
    pub items: BTreeMap<String, Item>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub shared_lists: BTreeMap<String, SharedList>,
    #[serde(default)]
    pub pending: PendingQueue,
}
