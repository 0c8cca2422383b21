//! Compilation of list-query descriptors into validated store plans.
//!
//! A [`ListPlan`] only carries catalog identifiers (`&'static str`) and
//! bound values, so every row store can execute it without ever
//! interpolating request text into a command string.

pub mod error;
pub mod sql;

use std::cmp::Ordering;

use lcadash_core::{QueryDescriptor, Row, SearchSpec, Value};

use crate::catalog::{ResourceCatalog, ResourceDef};

pub use error::QueryError;

/// Row filter compiled from a [`SearchSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPredicate {
    /// No filter.
    MatchAll,
    /// The concatenation of `columns`, as text, contains `needle`.
    ///
    /// `needle` is stored lowercased; matching is case-insensitive.
    Contains {
        columns: Vec<&'static str>,
        needle: String,
    },
}

impl SearchPredicate {
    /// Evaluates the predicate against a row. Missing columns count as `NULL`.
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Self::MatchAll => true,
            Self::Contains { columns, needle } => {
                let haystack: String = columns
                    .iter()
                    .filter_map(|c| row.get(*c))
                    .map(Value::as_text)
                    .collect();
                haystack.to_lowercase().contains(needle.as_str())
            }
        }
    }
}

/// One ordering term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTerm {
    pub column: &'static str,
    pub descending: bool,
}

/// Equality condition used for lookups by key or foreign key.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: &'static str,
    pub value: Value,
}

impl Condition {
    #[must_use]
    pub fn new(column: &'static str, value: impl Into<Value>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        row.get(self.column)
            .is_some_and(|v| values_match(v, &self.value))
    }
}

/// A validated, store-executable list query.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPlan {
    pub resource: &'static str,
    pub predicate: SearchPredicate,
    /// Requested ordering followed by the primary key, so the order is total.
    pub order: Vec<OrderTerm>,
    pub skip: u64,
    pub take: u64,
}

impl ListPlan {
    /// Compares two rows under the plan's ordering.
    #[must_use]
    pub fn compare(&self, a: &Row, b: &Row) -> Ordering {
        for term in &self.order {
            let left = a.get(term.column).unwrap_or(&Value::Null);
            let right = b.get(term.column).unwrap_or(&Value::Null);
            let ord = left.cmp_for_sort(right);
            let ord = if term.descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// The same filter with no window, used for counting.
    #[must_use]
    pub fn unwindowed(&self) -> Self {
        Self {
            skip: 0,
            take: u64::MAX,
            ..self.clone()
        }
    }
}

/// Compiles a [`SearchSpec`] against a resource.
///
/// An absent or empty term matches everything. An empty column list falls
/// back to the resource's default searchable columns.
///
/// # Errors
///
/// Returns [`QueryError::UnknownColumn`] for a column the resource lacks.
pub fn compile_search(
    def: &ResourceDef,
    search: Option<&SearchSpec>,
) -> Result<SearchPredicate, QueryError> {
    let Some(search) = search.filter(|s| !s.is_empty()) else {
        return Ok(SearchPredicate::MatchAll);
    };

    let columns = if search.columns.is_empty() {
        def.searchable.to_vec()
    } else {
        search
            .columns
            .iter()
            .map(|c| def.column(c))
            .collect::<Result<Vec<_>, _>>()?
    };

    Ok(SearchPredicate::Contains {
        columns,
        needle: search.search_term.to_lowercase(),
    })
}

/// Compiles a descriptor into a [`ListPlan`], clamping `take` to `max_take`.
///
/// # Errors
///
/// Returns [`QueryError`] if the resource, a search column or the sort
/// column is not allow-listed.
pub fn compile(
    catalog: &ResourceCatalog,
    descriptor: &QueryDescriptor,
    max_take: u64,
) -> Result<ListPlan, QueryError> {
    let def = catalog.resource(&descriptor.resource)?;
    let predicate = compile_search(def, descriptor.search.as_ref())?;

    let mut order = Vec::with_capacity(2);
    if let Some(sort) = descriptor.effective_sort() {
        order.push(OrderTerm {
            column: def.column(&sort.column)?,
            descending: sort.descending,
        });
    }
    if order.first().map(|t| t.column) != Some(def.primary_key) {
        order.push(OrderTerm {
            column: def.primary_key,
            descending: false,
        });
    }

    Ok(ListPlan {
        resource: def.name,
        predicate,
        order,
        skip: descriptor.skip,
        take: descriptor.take.min(max_take),
    })
}

/// Interprets a path segment as a key value: an integer when it parses as
/// one, text otherwise.
#[must_use]
pub fn key_value(id: &str) -> Value {
    id.trim()
        .parse::<i64>()
        .map_or_else(|_| Value::String(id.to_string()), Value::Int)
}

/// Loose equality used for key comparisons: numbers compare numerically,
/// text compares exactly, and an integer matches its decimal text.
#[must_use]
pub fn values_match(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::String(s), other) | (other, Value::String(s)) => other.matches_key(s),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => (x - y).abs() < f64::EPSILON,
            _ => false,
        },
    }
}
