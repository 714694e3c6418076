use crate::error::{Error, Result};
use crate::id::{NOTIFICATION_PREFIX, generate_id};
use crate::model::{Notification, NotificationKind, Store};
use chrono::Utc;

/// Record a notification at the head of the feed, keeping at most `limit`.
pub fn push(
    store: &mut Store,
    kind: NotificationKind,
    message: String,
    user_id: &str,
    limit: usize,
) -> String {
    let existing: Vec<&String> = store.notifications.iter().map(|n| &n.id).collect();
    let id = generate_id(NOTIFICATION_PREFIX, &message, 4, existing);
    store.notifications.insert(
        0,
        Notification {
            id: id.clone(),
            kind,
            message,
            user_id: user_id.to_string(),
            timestamp: Utc::now(),
            is_read: false,
        },
    );
    store.notifications.truncate(limit);
    id
}

/// Mark one notification read, by exact id or unique prefix.
pub fn mark_read(store: &mut Store, id: &str) -> Result<()> {
    let pos = match store.notifications.iter().position(|n| n.id == id) {
        Some(pos) => pos,
        None => {
            let matches: Vec<usize> = store
                .notifications
                .iter()
                .enumerate()
                .filter(|(_, n)| n.id.starts_with(id))
                .map(|(i, _)| i)
                .collect();
            match matches.as_slice() {
                [] => return Err(Error::not_found("notification", id)),
                [pos] => *pos,
                _ => {
                    return Err(Error::AmbiguousId {
                        prefix: id.to_string(),
                        matches: matches
                            .iter()
                            .map(|&i| store.notifications[i].id.clone())
                            .collect(),
                    });
                }
            }
        }
    };
    store.notifications[pos].is_read = true;
    Ok(())
}

pub fn mark_all_read(store: &mut Store) -> usize {
    let mut changed = 0;
    for n in store.notifications.iter_mut().filter(|n| !n.is_read) {
        n.is_read = true;
        changed += 1;
    }
    changed
}

pub fn unread_count(store: &Store) -> usize {
    store.notifications.iter().filter(|n| !n.is_read).count()
}
