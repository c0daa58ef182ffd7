//! Description cleanup and name casing.

use super::rules::patterns::WHITESPACE_RUN;

/// Clean a raw description field.
///
/// Trims, drops control characters and U+FFFD replacement characters left by
/// broken encodings, and collapses whitespace runs to a single space.
pub fn normalize_description(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c == '\t' || c == '\n' || c == '\r' { ' ' } else { c })
        .filter(|c| !c.is_control() && *c != char::REPLACEMENT_CHARACTER)
        .collect();
    WHITESPACE_RUN.replace_all(cleaned.trim(), " ").into_owned()
}

/// Title-case a person name.
///
/// Hyphenated surnames are cased per segment. Short all-uppercase tokens are
/// kept as initials when the name around them is mixed-case, or when they are
/// a single letter or contain a dot.
pub fn title_case_name(name: &str) -> String {
    let tokens: Vec<&str> = name.split_whitespace().collect();
    let shouting = tokens.iter().all(|t| !has_lowercase(t));

    tokens
        .iter()
        .map(|token| {
            if is_initial(token, shouting) {
                (*token).to_string()
            } else {
                token
                    .split('-')
                    .map(capitalize)
                    .collect::<Vec<_>>()
                    .join("-")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_initial(token: &str, shouting: bool) -> bool {
    let letters = token.chars().filter(|c| c.is_alphabetic()).count();
    if letters == 0 || token.chars().count() > 3 || has_lowercase(token) {
        return false;
    }
    letters == 1 || token.contains('.') || !shouting
}

fn has_lowercase(s: &str) -> bool {
    s.chars().any(char::is_lowercase)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(
            normalize_description("  SYLWESTER ŚCIŚLEWSKI   UL.JOLIOT-CURIE\t3 M.4  "),
            "SYLWESTER ŚCIŚLEWSKI UL.JOLIOT-CURIE 3 M.4"
        );
    }

    #[test]
    fn test_normalize_strips_mojibake() {
        assert_eq!(
            normalize_description("Op\u{FFFD}aty eksploatacyjne\u{0007} lokalu 17"),
            "Opaty eksploatacyjne lokalu 17"
        );
        assert_eq!(normalize_description(""), "");
    }

    #[test]
    fn test_title_case_hyphenated() {
        assert_eq!(
            title_case_name("EWA TERESA OSIECKA-CISOWSKA"),
            "Ewa Teresa Osiecka-Cisowska"
        );
        assert_eq!(
            title_case_name("KRZYSZTOF MIECZYSŁAW WAŁBIŃSKI"),
            "Krzysztof Mieczysław Wałbiński"
        );
    }

    #[test]
    fn test_title_case_keeps_initials() {
        assert_eq!(title_case_name("JAN K. KOWALSKI"), "Jan K. Kowalski");
        assert_eq!(title_case_name("ANNA M NOWAK"), "Anna M Nowak");
        assert_eq!(title_case_name("Jan ZG Kowalski"), "Jan ZG Kowalski");
    }

    #[test]
    fn test_title_case_short_names_in_caps() {
        assert_eq!(title_case_name("EWA LI"), "Ewa Li");
    }
}
