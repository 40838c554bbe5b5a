//! Name handling shared by the renderer: package-relative type names,
//! logical file names and string escaping.

/// Shortens a fully-qualified type reference relative to `package`.
///
/// The leading dot is stripped. If what remains starts with `package.`, that
/// prefix is removed; otherwise the full name is returned unchanged. Applied
/// at every reference site independently.
pub fn resolve_type_name(package: &str, type_name: &str) -> String {
    let full = type_name.trim_matches('.');
    if !package.is_empty() {
        if let Some(relative) = full
            .strip_prefix(package)
            .and_then(|rest| rest.strip_prefix('.'))
        {
            return relative.to_string();
        }
    }
    full.to_string()
}

/// Derives the logical name of a recovered file from its descriptor name.
///
/// Parent references (`..`) are dropped, doubled `/` separators collapse to
/// one, and leading or trailing `.`, `/` and `\` characters are trimmed.
pub fn logical_name(descriptor_name: &str) -> String {
    let mut name = descriptor_name.replace("..", "");
    while name.contains("//") {
        name = name.replace("//", "/");
    }
    name.trim_matches(|c| matches!(c, '.' | '/' | '\\')).to_string()
}

/// Last segment of a dotted type reference (`.a.b.Entry` -> `Entry`).
pub(crate) fn local_name(type_name: &str) -> &str {
    type_name.rsplit('.').next().unwrap_or(type_name)
}

/// Escape a string for proto syntax
pub(crate) fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            _ if c.is_ascii_control() => {
                result.push_str(&format!("\\x{:02x}", c as u8));
            }
            _ => result.push(c),
        }
    }
    result
}

/// Convert a snake_case name to lowerCamelCase, the way protoc derives json_name
pub(crate) fn to_lower_camel_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut capitalize_next = false;

    for c in s.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }

    result
}
