use crate::model::Store;

const COMMON_ITEMS: &[&str] = &[
    "Milk", "Bread", "Eggs", "Butter", "Cheese", "Yogurt", "Bananas", "Apples", "Oranges",
    "Tomatoes", "Onions", "Garlic", "Carrots", "Potatoes", "Chicken", "Ground Beef", "Salmon",
    "Rice", "Pasta", "Olive Oil", "Salt", "Pepper", "Cereal", "Orange Juice", "Coffee", "Tea",
    "Sugar", "Flour", "Paper Towels",
];

const MAX_SUGGESTIONS: usize = 5;

/// Names from the list, then common groceries, that contain `input` but are
/// not exactly it (ignoring case).
pub fn suggestions(store: &Store, input: &str) -> Vec<String> {
    if input.is_empty() {
        return Vec::new();
    }
    let needle = input.to_lowercase();
    let mut seen: Vec<String> = Vec::new();
    let names = store
        .items
        .values()
        .map(|i| i.name.as_str())
        .chain(COMMON_ITEMS.iter().copied());
    for name in names {
        if seen.len() == MAX_SUGGESTIONS {
            break;
        }
        let lowered = name.to_lowercase();
        if lowered == needle || !lowered.contains(&needle) {
            continue;
        }
        if seen.iter().any(|s| s.to_lowercase() == lowered) {
            continue;
        }
        seen.push(name.to_string());
    }
    seen
}
