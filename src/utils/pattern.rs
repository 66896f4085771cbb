use mongodb::bson::{Document, doc};

/// Backslash-escapes regex metacharacters so user input matches literally.
pub fn escape_regex(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(
            c,
            '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Case-insensitive substring match on a field.
pub fn contains_ignore_case(raw: &str) -> Document {
    doc! { "$regex": escape_regex(raw), "$options": "i" }
}
