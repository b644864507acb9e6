/// A parsed search box query.
///
/// Tokens are whitespace separated and lower-cased. A token starting with `-`
/// that has at least one more character excludes entries containing the
/// rest of the token; every other token must be contained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    positive: Vec<String>,
    negative: Vec<String>,
}

impl Query {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut query = Self::default();
        for token in raw.split_whitespace() {
            let token = token.to_lowercase();
            match token.strip_prefix('-') {
                Some(rest) if !rest.is_empty() => query.negative.push(rest.to_string()),
                _ => query.positive.push(token),
            }
        }
        query
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positive.is_empty() && self.negative.is_empty()
    }

    #[must_use]
    pub fn positive_tokens(&self) -> &[String] {
        &self.positive
    }

    #[must_use]
    pub fn negative_tokens(&self) -> &[String] {
        &self.negative
    }

    /// Test a lower-cased search string against the query.
    #[must_use]
    pub fn matches(&self, search_string: &str) -> bool {
        self.positive.iter().all(|t| search_string.contains(t.as_str()))
            && !self.negative.iter().any(|t| search_string.contains(t.as_str()))
    }
}
