use ulid::Ulid;

pub fn generate_ulid() -> String {
    Ulid::new().to_string()
}

/// Returns at most `max_chars` leading characters of `content`, with an ellipsis
/// appended when anything was cut. Used for log previews of long text.
pub fn preview(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((byte_pos, _)) => format!("{}…", &content[..byte_pos]),
        None => content.to_string(),
    }
}
