//! Query Descriptor: the search, sort and pagination parameters of one
//! list request, plus the [`QueryKey`] that scopes cached rows.

use serde::{Deserialize, Serialize};

/// Free-text search over a set of columns.
///
/// A row matches when the concatenation of the named columns, as text,
/// contains `search_term` as a case-insensitive substring.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SearchSpec {
    /// Text to look for.
    pub search_term: String,
    /// Columns to concatenate, in order.
    pub columns: Vec<String>,
}

impl SearchSpec {
    /// Creates a search over the given columns.
    pub fn new<I, S>(search_term: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            search_term: search_term.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// An empty search term filters nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.search_term.is_empty()
    }
}

/// Single-column ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    /// Column to order by.
    pub column: String,
    /// Descending when true, ascending otherwise.
    pub descending: bool,
}

impl SortSpec {
    #[must_use]
    pub fn ascending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    #[must_use]
    pub fn descending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }
}

/// Parameters of one list request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryDescriptor {
    /// Name of the row collection to query.
    pub resource: String,
    /// Optional free-text filter. `None` or an empty term means "match all".
    pub search: Option<SearchSpec>,
    /// Requested ordering. Only the first element is honored.
    pub sort: Vec<SortSpec>,
    /// Offset of the first row wanted.
    pub skip: u64,
    /// Maximum number of rows wanted.
    pub take: u64,
    /// Whether the response must carry the total matching row count.
    pub require_total_count: bool,
}

impl QueryDescriptor {
    /// Creates a descriptor for the first `take` rows of `resource`.
    #[must_use]
    pub fn new(resource: impl Into<String>, take: u64) -> Self {
        Self {
            resource: resource.into(),
            search: None,
            sort: Vec::new(),
            skip: 0,
            take,
            require_total_count: false,
        }
    }

    #[must_use]
    pub fn with_search(mut self, search: SearchSpec) -> Self {
        self.search = Some(search);
        self
    }

    #[must_use]
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = vec![sort];
        self
    }

    #[must_use]
    pub fn with_window(mut self, skip: u64, take: u64) -> Self {
        self.skip = skip;
        self.take = take;
        self
    }

    #[must_use]
    pub fn with_total_count(mut self) -> Self {
        self.require_total_count = true;
        self
    }

    /// The search, if it actually filters anything.
    #[must_use]
    pub fn effective_search(&self) -> Option<&SearchSpec> {
        self.search.as_ref().filter(|s| !s.is_empty())
    }

    /// The honored sort (the first element, if any).
    #[must_use]
    pub fn effective_sort(&self) -> Option<&SortSpec> {
        self.sort.first()
    }

    /// The descriptor without its window.
    #[must_use]
    pub fn key(&self) -> QueryKey {
        QueryKey {
            resource: self.resource.clone(),
            search: self.effective_search().cloned(),
            sort: self.effective_sort().cloned(),
        }
    }
}

/// Identity of a query independent of its window: `(resource, search, sort)`.
///
/// Cached rows are only valid for the key they were fetched under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub resource: String,
    pub search: Option<SearchSpec>,
    pub sort: Option<SortSpec>,
}

impl QueryKey {
    /// Rebuilds a full descriptor for the given window.
    #[must_use]
    pub fn descriptor(&self, skip: u64, take: u64, require_total_count: bool) -> QueryDescriptor {
        QueryDescriptor {
            resource: self.resource.clone(),
            search: self.search.clone(),
            sort: self.sort.iter().cloned().collect(),
            skip,
            take,
            require_total_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_ignores_window() {
        let a = QueryDescriptor::new("buildings", 100)
            .with_sort(SortSpec::ascending("city"))
            .with_window(0, 100);
        let b = a.clone().with_window(200, 50);
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn empty_search_term_is_not_part_of_key() {
        let plain = QueryDescriptor::new("buildings", 10);
        let empty = plain
            .clone()
            .with_search(SearchSpec::new("", ["city", "project"]));
        assert_eq!(plain.key(), empty.key());
        assert!(empty.effective_search().is_none());
    }

    #[test]
    fn only_first_sort_is_honored() {
        let mut d = QueryDescriptor::new("buildings", 10);
        d.sort = vec![SortSpec::descending("city"), SortSpec::ascending("project")];
        assert_eq!(d.effective_sort(), Some(&SortSpec::descending("city")));
        assert_eq!(d.key().sort, Some(SortSpec::descending("city")));
    }

    #[test]
    fn key_rebuilds_descriptor() {
        let key = QueryDescriptor::new("materials", 10)
            .with_search(SearchSpec::new("steel", ["name"]))
            .key();
        let d = key.descriptor(100, 200, true);
        assert_eq!(d.skip, 100);
        assert_eq!(d.take, 200);
        assert!(d.require_total_count);
        assert_eq!(d.key(), key);
    }
}
