use std::collections::HashSet;

/// Returns `items` without any occurrence of `exclude`, keeping only the first
/// occurrence of every remaining value. The input is left untouched.
pub fn filter(items: &[String], exclude: &str) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(items.len());
    items
        .iter()
        .filter(|item| item.as_str() != exclude)
        .filter(|item| seen.insert(item.as_str()))
        .cloned()
        .collect()
}
