use serde_json;

/// JSON-style quoting used by every diagnostic that names source text.
pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

/// Converts a string to PascalCase.
/// - If the string contains underscores, it splits on underscores and converts each word
///   so that its first letter is uppercase and the rest lowercase.
/// - If the string does not contain underscores and is fully uppercase, only the first
///   letter stays uppercase.
/// - Otherwise, it ensures only the first letter is uppercase.
pub fn to_pascal_case(s: &str) -> String {
    fn capitalize(word: &str, lower_rest: bool) -> String {
        let mut chars = word.chars();
        match chars.next() {
            None => String::new(),
            Some(first) if lower_rest => {
                first.to_uppercase().to_string() + &chars.as_str().to_lowercase()
            }
            Some(first) => first.to_uppercase().to_string() + chars.as_str(),
        }
    }

    if s.contains('_') {
        s.split('_')
            .filter(|word| !word.is_empty())
            .map(|word| capitalize(word, true))
            .collect::<String>()
    } else {
        capitalize(s, s == s.to_uppercase())
    }
}

/// Converts a string to snake_case.
/// Underscores are not inserted between consecutive uppercase letters,
/// so acronyms stay intact (e.g. "sessionID" becomes "session_id").
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut snake = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                if prev != '_'
                    && (!prev.is_uppercase() || (i + 1 < chars.len() && chars[i + 1].is_lowercase()))
                {
                    snake.push('_');
                }
            }
            snake.extend(c.to_lowercase());
        } else {
            snake.push(c);
        }
    }
    snake
}

pub fn to_upper_snake(s: &str) -> String {
    to_snake_case(s).to_uppercase()
}

pub fn to_lower_camel(s: &str) -> String {
    let pascal = if s.contains('_') { to_pascal_case(s) } else { s.to_owned() };
    let mut chars = pascal.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().to_string() + chars.as_str(),
    }
}

/// Interface name without its conventional `I` prefix (`ISample` -> `Sample`).
pub fn base_name(interface: &str) -> &str {
    let mut chars = interface.chars();
    match (chars.next(), chars.next()) {
        (Some('I'), Some(second)) if second.is_uppercase() => &interface[1..],
        _ => interface,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_conversions() {
        assert_eq!(to_pascal_case("ping"), "Ping");
        assert_eq!(to_pascal_case("GetVersion"), "GetVersion");
        assert_eq!(to_pascal_case("SIGNAL"), "Signal");
        assert_eq!(to_pascal_case("v1_0"), "V10");

        assert_eq!(to_snake_case("ISample"), "i_sample");
        assert_eq!(to_snake_case("GetVersion"), "get_version");
        assert_eq!(to_snake_case("sessionID"), "session_id");
        assert_eq!(to_snake_case("Foo_Bar"), "foo_bar");

        assert_eq!(to_upper_snake("GetVersion"), "GET_VERSION");
        assert_eq!(to_upper_snake("ping"), "PING");

        assert_eq!(to_lower_camel("GetVersion"), "getVersion");
        assert_eq!(to_lower_camel("ping"), "ping");
    }

    #[test]
    fn interface_base_name() {
        assert_eq!(base_name("ISample"), "Sample");
        assert_eq!(base_name("IFooCallback"), "FooCallback");
        assert_eq!(base_name("Info"), "Info");
        assert_eq!(base_name("I"), "I");
    }

    #[test]
    fn quote_escapes() {
        assert_eq!(quote("a\"b"), "\"a\\\"b\"");
    }
}
