/// Post slug: words joined by `-`, lowercased, anything outside
/// `[a-zA-Z0-9-]` dropped.
pub fn slugify(title: &str) -> String {
    title
        .split(' ')
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect()
}
