use crate::dupes::ResolutionAction;
use crate::error::{Error, Result};
use crate::id::{ITEM_PREFIX, USER_PREFIX, generate_id};
use crate::model::*;
use chrono::Utc;
use tracing::info;

const USER_COLORS: &[&str] = &["#10B981", "#3B82F6", "#F59E0B", "#EF4444", "#8B5CF6"];

pub fn from_json(json: &str) -> Result<Store> {
    Ok(serde_json::from_str(json)?)
}

pub fn to_json(store: &Store) -> Result<String> {
    Ok(serde_json::to_string_pretty(store)?)
}

/// Resolve a prefix like "it-a3" to a full item ID. Errors if ambiguous or not found.
pub fn resolve_id(store: &Store, prefix: &str) -> Result<String> {
    // Exact match first
    if store.items.contains_key(prefix) {
        return Ok(prefix.to_string());
    }
    let matches: Vec<String> = store
        .items
        .keys()
        .filter(|id| id.starts_with(prefix))
        .cloned()
        .collect();
    match matches.len() {
        0 => Err(Error::not_found("item", prefix)),
        1 => Ok(matches[0].clone()),
        _ => Err(Error::AmbiguousId {
            prefix: prefix.to_string(),
            matches,
        }),
    }
}

/// All items, newest first. This is the order duplicate detection scans.
pub fn items_newest_first(store: &Store) -> Vec<Item> {
    let mut items: Vec<Item> = store.items.values().cloned().collect();
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    items
}

/// Split `name` or `name:quantity`. Blank names yield `None`.
pub fn parse_spec(spec: &str) -> Option<(String, Option<String>)> {
    let (name, qty) = match spec.rsplit_once(':') {
        Some((n, q)) => (n, Some(q.trim())),
        None => (spec, None),
    };
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let qty = qty.filter(|q| !q.is_empty()).map(str::to_string);
    Some((name.to_string(), qty))
}

pub fn create_item(store: &mut Store, candidate: Candidate) -> Result<String> {
    let name = candidate.name.trim().to_string();
    if name.is_empty() {
        return Err(Error::Invalid("item name cannot be empty".to_string()));
    }
    let id = generate_id(ITEM_PREFIX, &name, 4, store.items.keys());
    let item = Item {
        id: id.clone(),
        name,
        category: candidate.category,
        quantity: candidate.quantity,
        priority: candidate.priority,
        status: candidate.status,
        created_at: Utc::now(),
        added_by: candidate.added_by,
        bought_by: None,
        bought_at: None,
    };
    info!(id = %id, name = %item.name, "item created");
    store.items.insert(id.clone(), item);
    Ok(id)
}

pub fn create_items(store: &mut Store, candidates: Vec<Candidate>) -> Result<Vec<String>> {
    candidates
        .into_iter()
        .map(|c| create_item(store, c))
        .collect()
}

pub fn update_item(store: &mut Store, id: &str, update: ItemUpdate) -> Result<()> {
    let id = resolve_id(store, id)?;
    let item = store
        .items
        .get_mut(&id)
        .ok_or_else(|| Error::not_found("item", id.as_str()))?;
    if let Some(name) = update.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(Error::Invalid("item name cannot be empty".to_string()));
        }
        item.name = name;
    }
    if let Some(c) = update.category {
        item.category = c;
    }
    if let Some(q) = update.quantity {
        item.quantity = q;
    }
    if let Some(p) = update.priority {
        item.priority = p;
    }
    if let Some(s) = update.status {
        item.status = s;
    }
    if let Some(b) = update.bought_by {
        item.bought_by = b;
    }
    if let Some(b) = update.bought_at {
        item.bought_at = b;
    }
    info!(id = %id, "item updated");
    Ok(())
}

/// Mark bought by `user_id`, stamping the time.
pub fn set_bought(store: &mut Store, id: &str, user_id: &str) -> Result<String> {
    let id = resolve_id(store, id)?;
    update_item(
        store,
        &id,
        ItemUpdate {
            status: Some(Status::Bought),
            bought_by: Some(Some(user_id.to_string())),
            bought_at: Some(Some(Utc::now())),
            ..Default::default()
        },
    )?;
    Ok(id)
}

/// Put an item back on the to-buy list, clearing who bought it.
pub fn set_to_buy(store: &mut Store, id: &str) -> Result<String> {
    let id = resolve_id(store, id)?;
    update_item(
        store,
        &id,
        ItemUpdate {
            status: Some(Status::ToBuy),
            bought_by: Some(None),
            bought_at: Some(None),
            ..Default::default()
        },
    )?;
    Ok(id)
}

pub fn delete_item(store: &mut Store, id: &str) -> Result<String> {
    let id = resolve_id(store, id)?;
    store
        .items
        .remove(&id)
        .ok_or_else(|| Error::not_found("item", id.as_str()))?;
    info!(id = %id, "item deleted");
    Ok(id)
}

pub fn clear_bought(store: &mut Store) -> usize {
    let before = store.items.len();
    store.items.retain(|_, item| item.status != Status::Bought);
    let removed = before - store.items.len();
    info!(removed, "cleared bought items");
    removed
}

/// Hand a duplicate resolution to storage. Returns the id of a newly
/// created item, if any.
pub fn apply_resolution(store: &mut Store, action: &ResolutionAction) -> Result<Option<String>> {
    match action {
        ResolutionAction::MergeInto {
            item_id,
            quantity,
            priority,
        } => {
            // Exact id only: the target was chosen at detection time
            match store.items.get(item_id) {
                None => return Err(Error::not_found("item", item_id.as_str())),
                Some(item) if item.status != Status::ToBuy => {
                    return Err(Error::Invalid(format!(
                        "{item_id} is no longer on the to-buy list"
                    )));
                }
                Some(_) => {}
            }
            update_item(
                store,
                item_id,
                ItemUpdate {
                    quantity: Some(quantity.clone()),
                    priority: Some(priority.clone()),
                    ..Default::default()
                },
            )?;
            Ok(None)
        }
        ResolutionAction::CreateItem(candidate) => create_item(store, candidate.clone()).map(Some),
        ResolutionAction::NoOp => Ok(None),
    }
}

// --- Users ---

pub fn add_user(store: &mut Store, name: &str, color: Option<String>) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Invalid("user name cannot be empty".to_string()));
    }
    if store
        .users
        .values()
        .any(|u| u.name.to_lowercase() == name.to_lowercase())
    {
        return Err(Error::Invalid(format!("user '{name}' already exists")));
    }
    let color = color
        .unwrap_or_else(|| USER_COLORS[store.users.len() % USER_COLORS.len()].to_string());
    let id = generate_id(USER_PREFIX, name, 4, store.users.keys());
    store.users.insert(
        id.clone(),
        User {
            id: id.clone(),
            name: name.to_string(),
            color,
            created_at: Utc::now(),
        },
    );
    info!(id = %id, name, "user added");
    Ok(id)
}

/// Users in the order they joined.
pub fn users_by_age(store: &Store) -> Vec<&User> {
    let mut users: Vec<&User> = store.users.values().collect();
    users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    users
}

/// Find a user by name (ignoring case) or by id prefix.
pub fn resolve_user(store: &Store, key: &str) -> Result<String> {
    let lowered = key.to_lowercase();
    if let Some(u) = store.users.values().find(|u| u.name.to_lowercase() == lowered) {
        return Ok(u.id.clone());
    }
    let matches: Vec<String> = store
        .users
        .keys()
        .filter(|id| id.starts_with(key))
        .cloned()
        .collect();
    match matches.len() {
        0 => Err(Error::not_found("user", key)),
        1 => Ok(matches[0].clone()),
        _ => Err(Error::AmbiguousId {
            prefix: key.to_string(),
            matches,
        }),
    }
}

/// The acting user: `key` if given, otherwise the oldest user.
pub fn acting_user(store: &Store, key: Option<&str>) -> Result<String> {
    match key {
        Some(k) => resolve_user(store, k),
        None => users_by_age(store)
            .first()
            .map(|u| u.id.clone())
            .ok_or_else(|| Error::not_found("user", "<default>")),
    }
}

pub fn user_name<'a>(store: &'a Store, id: &'a str) -> &'a str {
    store.users.get(id).map(|u| u.name.as_str()).unwrap_or(id)
}

// --- Views ---

/// To-buy before bought, then high > medium > low, then newest first.
pub fn sorted_for_display(mut items: Vec<&Item>) -> Vec<&Item> {
    items.sort_by(|a, b| {
        let status = |i: &Item| u8::from(i.status != Status::ToBuy);
        status(*a)
            .cmp(&status(*b))
            .then_with(|| a.priority.display_order().cmp(&b.priority.display_order()))
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    items
}

/// Items whose name or category contains `term`, ignoring case.
pub fn search<'a>(items: Vec<&'a Item>, term: &str) -> Vec<&'a Item> {
    if term.is_empty() {
        return items;
    }
    let term = term.to_lowercase();
    items
        .into_iter()
        .filter(|i| i.name.to_lowercase().contains(&term) || i.category.to_lowercase().contains(&term))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub to_buy: usize,
    pub bought: usize,
}

pub fn stats(store: &Store) -> Stats {
    let total = store.items.len();
    let bought = store
        .items
        .values()
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
    use chrono::Duration;

    fn candidate(name: &str, qty: &str) -> Candidate {
        Candidate {
            name: name.to_string(),
            category: "Groceries".to_string(),
            quantity: qty.to_string(),
            priority: Priority::Low,
            status: Status::ToBuy,
            added_by: "us-mom1".to_string(),
        }
    }

    fn insert_item(store: &mut Store, id: &str, name: &str, status: Status, age_mins: i64) {
        store.items.insert(
            id.to_string(),
            Item {
                id: id.to_string(),
                name: name.to_string(),
                category: "Groceries".to_string(),
                quantity: "1".to_string(),
                priority: Priority::Low,
                status,
                created_at: Utc::now() - Duration::minutes(age_mins),
                added_by: "us-mom1".to_string(),
                bought_by: None,
                bought_at: None,
            },
        );
    }

    // --- Prefix resolution ---

    #[test]
    fn resolve_unique_prefix() {
        let mut store = Store::default();
        insert_item(&mut store, "it-aaaa", "A", Status::ToBuy, 0);
        insert_item(&mut store, "it-bbbb", "B", Status::ToBuy, 0);
        assert_eq!(resolve_id(&store, "it-a").unwrap(), "it-aaaa");
    }

    #[test]
    fn resolve_ambiguous_prefix() {
        let mut store = Store::default();
        insert_item(&mut store, "it-ab01", "A", Status::ToBuy, 0);
        insert_item(&mut store, "it-ab02", "B", Status::ToBuy, 0);
        let err = resolve_id(&store, "it-ab").unwrap_err();
        assert!(err.to_string().contains("ambiguous"), "{err}");
    }

    #[test]
    fn resolve_no_match() {
        let err = resolve_id(&Store::default(), "it-zzzz").unwrap_err();
        assert!(err.to_string().contains("no item"), "{err}");
    }

    // --- Specs ---

    #[test]
    fn parse_spec_variants() {
        assert_eq!(parse_spec("Milk"), Some(("Milk".to_string(), None)));
        assert_eq!(
            parse_spec(" Milk : 2 L "),
            Some(("Milk".to_string(), Some("2 L".to_string())))
        );
        assert_eq!(parse_spec("Milk:"), Some(("Milk".to_string(), None)));
        assert_eq!(parse_spec("   "), None);
        assert_eq!(parse_spec(":3"), None);
    }

    // --- CRUD ---

    #[test]
    fn create_item_basic() {
        let mut store = Store::default();
        let id = create_item(&mut store, candidate("  Milk ", "2")).unwrap();
        assert!(id.starts_with("it-"));
        let item = &store.items[&id];
        assert_eq!(item.name, "Milk");
        assert_eq!(item.quantity, "2");
        assert_eq!(item.status, Status::ToBuy);
        assert!(item.bought_by.is_none());
    }

    #[test]
    fn create_item_rejects_blank_name() {
        let mut store = Store::default();
        assert!(create_item(&mut store, candidate("  ", "1")).is_err());
        assert!(store.items.is_empty());
    }

    #[test]
    fn create_items_batch() {
        let mut store = Store::default();
        let ids = create_items(&mut store, vec![candidate("A", "1"), candidate("B", "2")]).unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(store.items.len(), 2);
    }

    #[test]
    fn update_item_field_subset() {
        let mut store = Store::default();
        let id = create_item(&mut store, candidate("Milk", "2")).unwrap();
        update_item(
            &mut store,
            &id,
            ItemUpdate {
                quantity: Some("3".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        let item = &store.items[&id];
        assert_eq!(item.quantity, "3");
        assert_eq!(item.name, "Milk");
        assert_eq!(item.priority, Priority::Low);
    }

    #[test]
    fn buy_and_unbuy() {
        let mut store = Store::default();
        let id = create_item(&mut store, candidate("Milk", "2")).unwrap();
        set_bought(&mut store, &id, "us-dad1").unwrap();
        let item = &store.items[&id];
        assert_eq!(item.status, Status::Bought);
        assert_eq!(item.bought_by.as_deref(), Some("us-dad1"));
        assert!(item.bought_at.is_some());

        set_to_buy(&mut store, &id).unwrap();
        let item = &store.items[&id];
        assert_eq!(item.status, Status::ToBuy);
        assert!(item.bought_by.is_none());
        assert!(item.bought_at.is_none());
    }

    #[test]
    fn delete_and_clear_bought() {
        let mut store = Store::default();
        insert_item(&mut store, "it-aaaa", "A", Status::ToBuy, 0);
        insert_item(&mut store, "it-bbbb", "B", Status::Bought, 0);
        insert_item(&mut store, "it-cccc", "C", Status::Bought, 0);
        delete_item(&mut store, "it-a").unwrap();
        assert_eq!(clear_bought(&mut store), 2);
        assert!(store.items.is_empty());
        assert!(delete_item(&mut store, "it-aaaa").is_err());
    }

    #[test]
    fn newest_first_ordering() {
        let mut store = Store::default();
        insert_item(&mut store, "it-old1", "Old", Status::ToBuy, 10);
        insert_item(&mut store, "it-new1", "New", Status::ToBuy, 1);
        let ids: Vec<String> = items_newest_first(&store).into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["it-new1", "it-old1"]);
    }

    // --- Resolution hand-off ---

    #[test]
    fn apply_merge_updates_existing() {
        let mut store = Store::default();
        insert_item(&mut store, "it-aaaa", "Milk", Status::ToBuy, 0);
        let created = apply_resolution(
            &mut store,
            &ResolutionAction::MergeInto {
                item_id: "it-aaaa".to_string(),
                quantity: "1 + 2".to_string(),
                priority: Priority::High,
            },
        )
        .unwrap();
        assert!(created.is_none());
        assert_eq!(store.items.len(), 1);
        assert_eq!(store.items["it-aaaa"].quantity, "1 + 2");
        assert_eq!(store.items["it-aaaa"].priority, Priority::High);
    }

    #[test]
    fn apply_merge_into_missing_item_fails() {
        let mut store = Store::default();
        insert_item(&mut store, "it-aaaa1", "Milk", Status::ToBuy, 0);
        let err = apply_resolution(
            &mut store,
            &ResolutionAction::MergeInto {
                item_id: "it-aaaa".to_string(),
                quantity: "1 + 2".to_string(),
                priority: Priority::Low,
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }), "{err}");
        assert_eq!(store.items["it-aaaa1"].quantity, "1");
    }

    #[test]
    fn apply_merge_into_bought_item_fails() {
        let mut store = Store::default();
        insert_item(&mut store, "it-aaaa", "Milk", Status::Bought, 0);
        let err = apply_resolution(
            &mut store,
            &ResolutionAction::MergeInto {
                item_id: "it-aaaa".to_string(),
                quantity: "1 + 2".to_string(),
                priority: Priority::Low,
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::Invalid(_)), "{err}");
        assert_eq!(store.items["it-aaaa"].quantity, "1");
    }

    #[test]
    fn apply_create_and_noop() {
        let mut store = Store::default();
        let id = apply_resolution(&mut store, &ResolutionAction::CreateItem(candidate("Milk", "1")))
            .unwrap()
            .unwrap();
        assert!(store.items.contains_key(&id));
        assert!(apply_resolution(&mut store, &ResolutionAction::NoOp).unwrap().is_none());
        assert_eq!(store.items.len(), 1);
    }

    // --- Users ---

    #[test]
    fn users_resolve_by_name_or_prefix() {
        let mut store = Store::default();
        let mom = add_user(&mut store, "Mom", None).unwrap();
        let dad = add_user(&mut store, "Dad", Some("#000000".to_string())).unwrap();
        assert_eq!(resolve_user(&store, "mom").unwrap(), mom);
        assert_eq!(resolve_user(&store, &dad).unwrap(), dad);
        assert_eq!(store.users[&dad].color, "#000000");
        assert!(resolve_user(&store, "Grandma").is_err());
        assert!(add_user(&mut store, "MOM", None).is_err());
    }

    #[test]
    fn acting_user_defaults_to_oldest() {
        let mut store = Store::default();
        assert!(acting_user(&store, None).is_err());
        let first = add_user(&mut store, "First", None).unwrap();
        if let Some(u) = store.users.get_mut(&first) {
            u.created_at -= Duration::minutes(5);
        }
        add_user(&mut store, "Second", None).unwrap();
        assert_eq!(acting_user(&store, None).unwrap(), first);
    }

    // --- Views ---

    #[test]
    fn display_sort_order() {
        let mut store = Store::default();
        insert_item(&mut store, "it-0001", "bought", Status::Bought, 0);
        insert_item(&mut store, "it-0002", "low-old", Status::ToBuy, 10);
        insert_item(&mut store, "it-0003", "low-new", Status::ToBuy, 1);
        insert_item(&mut store, "it-0004", "high", Status::ToBuy, 20);
        insert_item(&mut store, "it-0005", "medium", Status::ToBuy, 20);
        store.items.get_mut("it-0004").unwrap().priority = Priority::High;
        store.items.get_mut("it-0005").unwrap().priority = Priority::medium();
        let names: Vec<&str> = sorted_for_display(store.items.values().collect())
            .iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(names, vec!["high", "medium", "low-new", "low-old", "bought"]);
    }

    #[test]
    fn search_matches_name_or_category() {
        let mut store = Store::default();
        insert_item(&mut store, "it-0001", "Whole Milk", Status::ToBuy, 0);
        insert_item(&mut store, "it-0002", "Soap", Status::ToBuy, 0);
        store.items.get_mut("it-0002").unwrap().category = "Household".to_string();
        let hits = search(store.items.values().collect(), "MILK");
        assert_eq!(hits.len(), 1);
        let hits = search(store.items.values().collect(), "house");
        assert_eq!(hits[0].name, "Soap");
        assert_eq!(search(store.items.values().collect(), "").len(), 2);
    }

    #[test]
    fn stats_counts() {
        let mut store = Store::default();
        insert_item(&mut store, "it-0001", "A", Status::ToBuy, 0);
        insert_item(&mut store, "it-0002", "B", Status::Bought, 0);
        assert_eq!(
            stats(&store),
            Stats {
                total: 2,
                to_buy: 1,
                bought: 1
            }
        );
    }

    #[test]
    fn from_json_invalid() {
        assert!(matches!(from_json("not json"), Err(Error::Json(_))));
    }
}
