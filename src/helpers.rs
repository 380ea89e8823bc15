//! Small string helpers shared by validation messages, storage and filtering.

use deunicode::deunicode;

/// Replace `:placeholder` tokens in `template` positionally with `arguments`.
///
/// A placeholder is a `:` followed by one or more lowercase ASCII letters. Placeholders
/// beyond the number of arguments are left untouched.
///
/// ```rust
/// use resourcecrate::helpers::replace_placeholders;
///
/// let message = replace_placeholders("The :table table already has record \":record\"", &["users", "a@b.c"]);
/// assert_eq!(message, "The users table already has record \"a@b.c\"");
/// ```
#[must_use]
pub fn replace_placeholders(template: &str, arguments: &[&str]) -> String {
    let mut output = String::with_capacity(template.len());
    let mut remaining = arguments.iter();
    let mut chars = template.char_indices().peekable();

    while let Some((index, ch)) = chars.next() {
        if ch != ':' {
            output.push(ch);
            continue;
        }

        let name_len = template[index + 1..]
            .chars()
            .take_while(char::is_ascii_lowercase)
            .count();

        if name_len == 0 {
            output.push(ch);
            continue;
        }

        match remaining.next() {
            Some(argument) => {
                output.push_str(argument);
                for _ in 0..name_len {
                    chars.next();
                }
            }
            None => output.push(ch),
        }
    }

    output
}

/// Uppercase the first character of a string, leaving the rest untouched.
#[must_use]
pub fn ucfirst(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Build a lowercase, URL-safe slug. Non-ASCII text is transliterated first
/// (`é` becomes `e`), then runs of characters outside `[a-zA-Z0-9_-]` collapse
/// into a single `-` and leading/trailing dashes are trimmed.
#[must_use]
pub fn slugify(value: &str) -> String {
    let ascii = deunicode(value);
    let mut slug = String::with_capacity(ascii.len());
    let mut last_dash = false;

    for ch in ascii.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            slug.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }

    slug.trim_matches('-').to_string()
}

/// Interpret an HTML checkbox style value.
#[must_use]
pub fn checkbox_to_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_placeholders_in_order() {
        let message = replace_placeholders(":a and :b", &["first", "second"]);
        assert_eq!(message, "first and second");
    }

    #[test]
    fn test_replace_placeholders_missing_arguments() {
        let message = replace_placeholders(":table has :record", &["users"]);
        assert_eq!(message, "users has :record");
    }

    #[test]
    fn test_replace_placeholders_ignores_bare_colons() {
        let message = replace_placeholders("time: 10:30 :name", &["x"]);
        assert_eq!(message, "time: 10:30 x");
    }

    #[test]
    fn test_ucfirst() {
        assert_eq!(ucfirst("user"), "User");
        assert_eq!(ucfirst("élan"), "Élan");
        assert_eq!(ucfirst(""), "");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My Holiday Photo!.png"), "my-holiday-photo-png");
        assert_eq!(slugify("--already--dashed--"), "already-dashed");
        assert_eq!(slugify("snake_case"), "snake_case");
    }

    #[test]
    fn test_slugify_transliterates_accents() {
        assert_eq!(slugify("Élan"), "elan");
        assert_eq!(slugify("Crème Brûlée"), "creme-brulee");
        assert_eq!(slugify("Straße"), "strasse");
    }

    #[test]
    fn test_checkbox_to_bool() {
        assert!(checkbox_to_bool("1"));
        assert!(checkbox_to_bool("true"));
        assert!(checkbox_to_bool("on"));
        assert!(!checkbox_to_bool("0"));
        assert!(!checkbox_to_bool("TRUE"));
        assert!(!checkbox_to_bool(""));
    }
}
