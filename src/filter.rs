use crate::gateway::QueryError;
use std::collections::BTreeSet;

// Filter grammar evaluated by the in-process repository: whitespace-separated
// terms, bare term = tag match, `path:value` = path substring, `!term` =
// exclusion, double quotes allow spaces in a value. Malformed input
// (unterminated quote, empty term body) is InvalidQuery rather than a
// best-effort match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    pub tag_terms: Vec<String>,
    pub path_terms: Vec<String>,
    pub exclude_tags: Vec<String>,
    pub exclude_paths: Vec<String>,
}

impl QuerySpec {
    pub fn is_empty(&self) -> bool {
        self.tag_terms.is_empty()
            && self.path_terms.is_empty()
            && self.exclude_tags.is_empty()
            && self.exclude_paths.is_empty()
    }

    pub fn matches(&self, path: &str, tags: &BTreeSet<String>) -> bool {
        let path = path.to_ascii_lowercase();

        for term in &self.exclude_tags {
            if has_tag(tags, term) {
                return false;
            }
        }
        for term in &self.exclude_paths {
            if path.contains(term.as_str()) {
                return false;
            }
        }
        for term in &self.tag_terms {
            if !has_tag(tags, term) {
                return false;
            }
        }
        for term in &self.path_terms {
            if !path.contains(term.as_str()) {
                return false;
            }
        }
        true
    }
}

fn has_tag(tags: &BTreeSet<String>, term: &str) -> bool {
    tags.iter().any(|t| t.eq_ignore_ascii_case(term))
}

pub fn parse_query(text: &str) -> Result<QuerySpec, QueryError> {
    let mut spec = QuerySpec::default();
    for token in tokenize(text)? {
        let (negated, body) = match token.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, token.as_str()),
        };
        if body.is_empty() {
            return Err(QueryError::InvalidQuery);
        }
        let (is_path, value) = match body.strip_prefix("path:") {
            Some(rest) => (true, rest),
            None => (false, body),
        };
        if value.is_empty() {
            return Err(QueryError::InvalidQuery);
        }
        let value = value.to_ascii_lowercase();
        match (negated, is_path) {
            (false, false) => spec.tag_terms.push(value),
            (false, true) => spec.path_terms.push(value),
            (true, false) => spec.exclude_tags.push(value),
            (true, true) => spec.exclude_paths.push(value),
        }
    }
    Ok(spec)
}

// Whitespace-separated tokens; double quotes group, and quotes may appear
// mid-token (path:"a b"). Quotes do not nest or escape.
fn tokenize(text: &str) -> Result<Vec<String>, QueryError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in text.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if in_quotes {
        return Err(QueryError::InvalidQuery);
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}
