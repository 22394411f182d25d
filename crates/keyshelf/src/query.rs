//! Derived views over loaded keys
//!
//! Everything here is pure and works on records already read by the store.

use std::collections::BTreeSet;
use std::str::FromStr;

use crate::record::KeyRecord;

/// Shortest id prefix accepted by `resolve`
pub const MIN_ID_PREFIX: usize = 4;

/// Category selection for listings
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

impl CategoryFilter {
    pub fn matches(&self, record: &KeyRecord) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(category) => record.has_category(category),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(CategoryFilter::All)
        } else {
            Ok(CategoryFilter::Only(s.to_string()))
        }
    }
}

/// Search text plus category filter
#[derive(Debug, Clone, Default)]
pub struct KeyQuery {
    pub text: Option<String>,
    pub category: CategoryFilter,
}

impl KeyQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_category(mut self, category: CategoryFilter) -> Self {
        self.category = category;
        self
    }

    /// Search, then filter by category, then sort by last use
    pub fn apply(&self, records: &[KeyRecord]) -> Vec<KeyRecord> {
        let text = self.text.as_deref().unwrap_or("");
        let mut result: Vec<KeyRecord> = records
            .iter()
            .filter(|r| matches_text(r, text))
            .filter(|r| self.category.matches(r))
            .cloned()
            .collect();
        sort_by_last_used(&mut result);
        result
    }
}

/// Case-insensitive substring match on name, service, categories and notes
///
/// The secret is never searched.
pub fn matches_text(record: &KeyRecord, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }

    let needle = query.to_lowercase();
    let hit = |field: &str| field.to_lowercase().contains(&needle);

    hit(&record.name)
        || hit(&record.service)
        || record.categories.iter().any(|c| hit(c))
        || record.notes.as_deref().is_some_and(hit)
}

/// Most recently used first; never-used keys last
pub fn sort_by_last_used(records: &mut [KeyRecord]) {
    // Option orders None below Some, so reversing puts None last.
    // sort_by is stable, so ties keep store order.
    records.sort_by(|a, b| b.last_used_at.cmp(&a.last_used_at));
}

/// Every category in use, sorted and deduplicated
pub fn categories(records: &[KeyRecord]) -> Vec<String> {
    records
        .iter()
        .flat_map(|r| r.categories.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Find a key by exact id or by an unambiguous id prefix
pub fn resolve<'a>(records: &'a [KeyRecord], reference: &str) -> Option<&'a KeyRecord> {
    if let Some(exact) = records.iter().find(|r| r.id == reference) {
        return Some(exact);
    }

    if reference.chars().count() < MIN_ID_PREFIX {
        return None;
    }

    let mut matches = records.iter().filter(|r| r.id.starts_with(reference));
    match (matches.next(), matches.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::NewKey;
    use chrono::{Duration, Utc};

    fn record(service: &str, name: &str, categories: &[&str]) -> KeyRecord {
        KeyRecord::create(
            NewKey::new(service, name, "secret-value").with_categories(categories.iter().copied()),
        )
    }

    #[test]
    fn test_matches_text_fields() {
        let mut r = record("GitHub", "Personal", &["Work"]);
        r.notes = Some("Deploy Token".to_string());

        assert!(matches_text(&r, "git"));
        assert!(matches_text(&r, "PERSON"));
        assert!(matches_text(&r, "work"));
        assert!(matches_text(&r, "deploy"));
        assert!(matches_text(&r, ""));
        assert!(!matches_text(&r, "gitlab"));
        // Secrets are not searchable
        assert!(!matches_text(&r, "secret-value"));
    }

    #[test]
    fn test_category_filter() {
        let r = record("GitHub", "personal", &["work"]);
        assert!(CategoryFilter::All.matches(&r));
        assert!(CategoryFilter::Only("work".to_string()).matches(&r));
        assert!(!CategoryFilter::Only("Work".to_string()).matches(&r));

        assert_eq!("All".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!(
            "work".parse::<CategoryFilter>().unwrap(),
            CategoryFilter::Only("work".to_string())
        );
    }

    #[test]
    fn test_sort_never_used_last() {
        let now = Utc::now();
        let mut older = record("A", "older", &[]);
        older.last_used_at = Some(now - Duration::hours(2));
        let mut newer = record("B", "newer", &[]);
        newer.last_used_at = Some(now);
        let never = record("C", "never", &[]);

        let mut records = vec![never.clone(), older.clone(), newer.clone()];
        sort_by_last_used(&mut records);

        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["newer", "older", "never"]);
    }

    #[test]
    fn test_categories_sorted_unique() {
        let records = vec![
            record("A", "a", &["work"]),
            record("B", "b", &["work", "personal"]),
            record("C", "c", &[]),
        ];
        assert_eq!(categories(&records), vec!["personal", "work"]);
        assert!(categories(&[]).is_empty());
    }

    #[test]
    fn test_search_composition() {
        let now = Utc::now();
        let mut github = record("GitHub", "personal", &["work"]);
        github.last_used_at = Some(now - Duration::minutes(5));
        let gitlab = record("GitLab", "ci", &["work"]);
        let mut gitea = record("Gitea", "home", &["personal"]);
        gitea.last_used_at = Some(now);
        let mut openai = record("OpenAI", "prod", &["work"]);
        openai.last_used_at = Some(now);

        let records = vec![gitlab, github, gitea, openai];
        let result = KeyQuery::new()
            .with_text("git")
            .with_category(CategoryFilter::Only("work".to_string()))
            .apply(&records);

        let services: Vec<&str> = result.iter().map(|r| r.service.as_str()).collect();
        assert_eq!(services, vec!["GitHub", "GitLab"]);
    }

    #[test]
    fn test_empty_query_returns_everything_sorted() {
        let records = vec![record("A", "a", &[]), record("B", "b", &[])];
        let result = KeyQuery::new().apply(&records);
        assert_eq!(result.len(), 2);
        // Ties keep store order
        assert_eq!(result[0].service, "A");
    }

    #[test]
    fn test_resolve() {
        let mut a = record("A", "a", &[]);
        a.id = "abcd1234-0000-4000-8000-000000000001".to_string();
        let mut b = record("B", "b", &[]);
        b.id = "abcd9999-0000-4000-8000-000000000002".to_string();
        let records = vec![a, b];

        assert_eq!(resolve(&records, "abcd1234").unwrap().service, "A");
        assert_eq!(
            resolve(&records, "abcd9999-0000-4000-8000-000000000002").unwrap().service,
            "B"
        );
        // Ambiguous
        assert!(resolve(&records, "abcd").is_none());
        // Too short
        assert!(resolve(&records, "abc").is_none());
        assert!(resolve(&records, "ffff").is_none());
    }
}
