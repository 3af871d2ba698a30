#![forbid(unsafe_code)]

/// Builds the `search` text for a row: the non-null values, already rendered
/// and already in column creation order, lowercased and joined by one space.
///
/// A row with no values yields an empty string (never null), so the backfill
/// transition happens exactly once.
pub fn search_text<I, S>(values: I) -> String
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for value in values.into_iter().flatten() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&value.as_ref().to_lowercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::search_text;

    #[test]
    fn skips_nulls_and_lowercases() {
        let text = search_text([Some("Alice Johnson"), None, Some("A@Example.COM"), Some("42")]);
        assert_eq!(text, "alice johnson a@example.com 42");
    }

    #[test]
    fn all_null_is_empty_not_missing() {
        assert_eq!(search_text::<_, &str>([None, None]), "");
        assert_eq!(search_text::<_, &str>(Vec::new()), "");
    }

    #[test]
    fn keeps_input_order() {
        assert_eq!(search_text([Some("b"), Some("a")]), "b a");
    }
}
