//! Markdown formatting for image replies.

/// Public URL of a cached file under `prefix`.
///
/// Exactly one `/` separates the prefix from the file name; an empty prefix
/// yields a root-relative path.
pub fn public_image_url(prefix: &str, file_name: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), file_name.trim_start_matches('/'))
}

/// Escape characters that would break out of markdown image alt text.
fn escape_alt_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '[' | ']' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' | '\r' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

/// Reply for an image served from the local cache.
pub fn format_cached_image(subject: &str, url: &str) -> String {
    format!(
        "![{}]({})\n\n🎨 Here's your image of *{}*.",
        escape_alt_text(subject),
        url,
        subject.trim()
    )
}

/// Reply for an image that could not be cached; points at the render provider.
pub fn format_remote_image(subject: &str, render_url: &str) -> String {
    format!(
        "![{}]({})\n\n🎨 Here's your image of *{}*. It may take a moment to load.",
        escape_alt_text(subject),
        render_url,
        subject.trim()
    )
}
