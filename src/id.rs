use chrono::Utc;
use sha2::{Digest, Sha256};

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub const ITEM_PREFIX: &str = "it";
pub const USER_PREFIX: &str = "us";
pub const LIST_PREFIX: &str = "sl";
pub const NOTIFICATION_PREFIX: &str = "nt";

fn to_base36(bytes: &[u8], len: usize) -> String {
    let mut result = String::with_capacity(len);
    for i in 0..len {
        let idx = bytes[i % bytes.len()] as usize % 36;
        result.push(BASE36[idx] as char);
    }
    result
}

/// Hash `seed` with the clock and a nonce into `<prefix>-<code>`, retrying
/// until the id is absent from `existing`.
pub fn generate_id<'a, I>(prefix: &str, seed: &str, len: usize, existing: I) -> String
where
    I: IntoIterator<Item = &'a String> + Clone,
{
    let stamp = Utc::now().timestamp_nanos_opt().unwrap_or(0);
    let mut nonce = 0u32;
    loop {
        let mut hasher = Sha256::new();
        hasher.update(seed.as_bytes());
        hasher.update(stamp.to_le_bytes());
        hasher.update(nonce.to_le_bytes());
        let hash = hasher.finalize();
        let id = format!("{prefix}-{}", to_base36(&hash, len));
        if !existing.clone().into_iter().any(|e| *e == id) {
            return id;
        }
        nonce = nonce.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_has_prefix_and_length() {
        let existing: Vec<String> = Vec::new();
        let id = generate_id(ITEM_PREFIX, "Milk", 4, &existing);
        assert!(id.starts_with("it-"), "{id}");
        assert_eq!(id.len(), 7);
        assert!(id[3..].bytes().all(|b| BASE36.contains(&b)));
    }

    #[test]
    fn id_avoids_existing() {
        let mut existing: Vec<String> = Vec::new();
        for _ in 0..50 {
            let id = generate_id(ITEM_PREFIX, "Milk", 4, &existing);
            assert!(!existing.contains(&id));
            existing.push(id);
        }
    }
}
