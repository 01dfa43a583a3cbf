//! QueryPlanner — splits a whitespace-tokenized query into structured
//! filters and a term list (spec.md §4.7).

/// Log level filter. Only `Error` is ever matched by the scorer; any other
/// value matches nothing (spec.md §4.7, §7 `InvalidQuery`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelFilter {
    Error,
    Other(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub ext: Option<String>,
    pub level: Option<LevelFilter>,
    pub terms: Vec<String>,
}

impl Query {
    pub fn parse(input: &str) -> Self {
        let mut query = Query::default();
        for token in input.split_whitespace() {
            if let Some(value) = token.strip_prefix("ext:") {
                query.ext = Some(value.to_ascii_lowercase());
            } else if let Some(value) = token.strip_prefix("level:") {
                let upper = value.to_ascii_uppercase();
                query.level = Some(if upper == "ERROR" {
                    LevelFilter::Error
                } else {
                    LevelFilter::Other(upper)
                });
            } else {
                query.terms.push(token.to_string());
            }
        }
        query
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_filters_from_terms() {
        let q = Query::parse("boom ext:.log level:error");
        assert_eq!(q.terms, vec!["boom"]);
        assert_eq!(q.ext, Some(".log".to_string()));
        assert_eq!(q.level, Some(LevelFilter::Error));
    }

    #[test]
    fn unknown_level_value_matches_nothing_but_does_not_abort() {
        let q = Query::parse("boom level:info");
        assert_eq!(q.level, Some(LevelFilter::Other("INFO".to_string())));
    }

    #[test]
    fn empty_query_has_no_terms() {
        let q = Query::parse("   ");
        assert!(q.is_empty());
    }

    #[test]
    fn ext_filter_lowercased() {
        let q = Query::parse("ext:.LOG");
        assert_eq!(q.ext, Some(".log".to_string()));
    }
}
