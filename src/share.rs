//! Shareable sub-lists: a named snapshot of items published under a URL,
//! checked off independently of the family list.

use crate::error::{Error, Result};
use crate::id::{LIST_PREFIX, generate_id};
use crate::model::{Priority, SharedList, SharedListItem, Status, Store};
use crate::store::Stats;
use chrono::Utc;
use tracing::info;

/// An item as entered when creating a shared list.
#[derive(Debug, Clone)]
pub struct NewSharedItem {
    pub name: String,
    pub quantity: String,
    pub priority: Priority,
}

pub fn create_shared_list(
    store: &mut Store,
    name: &str,
    items: Vec<NewSharedItem>,
    base_url: &str,
) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Invalid("please enter a list name".to_string()));
    }
    let items: Vec<NewSharedItem> = items
        .into_iter()
        .filter(|i| !i.name.trim().is_empty())
        .collect();
    if items.is_empty() {
        return Err(Error::Invalid("please add at least one item".to_string()));
    }

    let id = generate_id(LIST_PREFIX, name, 6, store.shared_lists.keys());
    let now = Utc::now();
    let list = SharedList {
        id: id.clone(),
        name: name.to_string(),
        items: items
            .into_iter()
            .enumerate()
            .map(|(n, i)| SharedListItem {
                id: format!("{id}-{}", n + 1),
                name: i.name.trim().to_string(),
                quantity: i.quantity,
                priority: i.priority,
                status: Status::ToBuy,
                created_at: now,
            })
            .collect(),
        created_at: now,
        share_url: format!("{}/list/{id}", base_url.trim_end_matches('/')),
    };
    info!(id = %id, items = list.items.len(), "shared list created");
    store.shared_lists.insert(id.clone(), list);
    Ok(id)
}

pub fn resolve_list(store: &Store, prefix: &str) -> Result<String> {
    if store.shared_lists.contains_key(prefix) {
        return Ok(prefix.to_string());
    }
    let matches: Vec<String> = store
        .shared_lists
        .keys()
        .filter(|id| id.starts_with(prefix))
        .cloned()
        .collect();
    match matches.len() {
        0 => Err(Error::not_found("shared list", prefix)),
        1 => Ok(matches[0].clone()),
        _ => Err(Error::AmbiguousId {
            prefix: prefix.to_string(),
            matches,
        }),
    }
}

/// Flip one shared item between to-buy and bought. Accepts the full item
/// id or just its position suffix.
pub fn toggle_shared_item(store: &mut Store, list_id: &str, item_id: &str) -> Result<Status> {
    let list_id = resolve_list(store, list_id)?;
    let list = store
        .shared_lists
        .get_mut(&list_id)
        .ok_or_else(|| Error::not_found("shared list", list_id.as_str()))?;
    let full = format!("{list_id}-{item_id}");
    let item = list
        .items
        .iter_mut()
        .find(|i| i.id == item_id || i.id == full)
        .ok_or_else(|| Error::not_found("shared item", item_id))?;
    item.status = match item.status {
        Status::ToBuy => Status::Bought,
        Status::Bought => Status::ToBuy,
    };
    Ok(item.status)
}

pub fn list_stats(list: &SharedList) -> Stats {
    let total = list.items.len();
    let bought = list
        .items
        .iter()
        .filter(|i| i.status == Status::Bought)
        .count();
    Stats {
        total,
        to_buy: total - bought,
        bought,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_item(name: &str) -> NewSharedItem {
        NewSharedItem {
            name: name.to_string(),
            quantity: "1".to_string(),
            priority: Priority::Low,
        }
    }

    #[test]
    fn create_assigns_ids_and_url() {
        let mut store = Store::default();
        let id = create_shared_list(
            &mut store,
            " Party ",
            vec![new_item("Chips"), new_item(" "), new_item("Soda")],
            "https://example.test/",
        )
        .unwrap();
        let list = &store.shared_lists[&id];
        assert!(id.starts_with("sl-"));
        assert_eq!(list.name, "Party");
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[1].id, format!("{id}-2"));
        assert_eq!(list.share_url, format!("https://example.test/list/{id}"));
    }

    #[test]
    fn create_validates_input() {
        let mut store = Store::default();
        let err = create_shared_list(&mut store, "  ", vec![new_item("x")], "u").unwrap_err();
        assert!(err.to_string().contains("list name"), "{err}");
        let err = create_shared_list(&mut store, "Party", vec![new_item("")], "u").unwrap_err();
        assert!(err.to_string().contains("at least one"), "{err}");
        assert!(store.shared_lists.is_empty());
    }

    #[test]
    fn toggle_flips_status() {
        let mut store = Store::default();
        let id = create_shared_list(&mut store, "Party", vec![new_item("Chips")], "u").unwrap();
        assert_eq!(toggle_shared_item(&mut store, &id, "1").unwrap(), Status::Bought);
        assert_eq!(
            list_stats(&store.shared_lists[&id]),
            Stats {
                total: 1,
                to_buy: 0,
                bought: 1
            }
        );
        let full = format!("{id}-1");
        assert_eq!(toggle_shared_item(&mut store, &id, &full).unwrap(), Status::ToBuy);
        assert!(toggle_shared_item(&mut store, &id, "9").is_err());
    }
}
