//! In-memory [`RowStore`] implementation backed by [`DashMap`].
//!
//! Holds every resource's rows in process and evaluates plans directly.
//! Suitable for development, demos and tests; seeded from a JSON fixture
//! shaped like `{"buildings": [{...}, ...], "location": [...]}`.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use dashmap::DashMap;
use lcadash_core::Row;

use crate::query::{Condition, ListPlan};
use crate::store::RowStore;

/// In-memory rows keyed by resource name.
pub struct MemoryRowStore {
    tables: DashMap<String, Vec<Row>>,
}

impl MemoryRowStore {
    /// Creates a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
        }
    }

    /// Parses a JSON fixture mapping resource names to arrays of rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a JSON object of row arrays.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let tables: HashMap<String, Vec<Row>> =
            serde_json::from_str(json).context("invalid row fixture")?;
        let store = Self::new();
        for (resource, rows) in tables {
            store.insert_rows(&resource, rows);
        }
        Ok(store)
    }

    /// Reads and parses a JSON fixture file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read seed file {}", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Appends rows to a resource.
    pub fn insert_rows(&self, resource: &str, rows: impl IntoIterator<Item = Row>) {
        self.tables
            .entry(resource.to_string())
            .or_default()
            .extend(rows);
    }

    /// Total number of rows across all resources.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.tables.iter().map(|t| t.value().len()).sum()
    }
}

impl Default for MemoryRowStore {
    fn default() -> Self {
        Self::new()
    }
}

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

#[async_trait]
impl RowStore for MemoryRowStore {
    async fn list(&self, plan: &ListPlan) -> anyhow::Result<Vec<Row>> {
        let Some(table) = self.tables.get(plan.resource) else {
            return Ok(Vec::new());
        };

        let mut matching: Vec<&Row> = table
            .iter()
            .filter(|row| plan.predicate.matches(row))
            .collect();
        matching.sort_by(|a, b| plan.compare(a, b));

        Ok(matching
            .into_iter()
            .skip(to_usize(plan.skip))
            .take(to_usize(plan.take))
            .cloned()
            .collect())
    }

    async fn count(&self, plan: &ListPlan) -> anyhow::Result<u64> {
        let count = self.tables.get(plan.resource).map_or(0, |table| {
            table
                .iter()
                .filter(|row| plan.predicate.matches(row))
                .count()
        });
        Ok(count as u64)
    }

    async fn fetch_where(
        &self,
        resource: &'static str,
        conditions: &[Condition],
        order_by: &'static str,
    ) -> anyhow::Result<Vec<Row>> {
        let Some(table) = self.tables.get(resource) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<Row> = table
            .iter()
            .filter(|row| conditions.iter().all(|c| c.matches(row)))
            .cloned()
            .collect();
        rows.sort_by(|a, b| match (a.get(order_by), b.get(order_by)) {
            (Some(x), Some(y)) => x.cmp_for_sort(y),
            (x, y) => x.is_some().cmp(&y.is_some()),
        });
        Ok(rows)
    }

    async fn initialize(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ResourceCatalog;
    use crate::query::compile;
    use lcadash_core::{QueryDescriptor, SearchSpec, SortSpec, Value};
    use proptest::prelude::*;
    use proptest::test_runner::Config;
    use std::io::Write;

    fn location(id: i64, country: &str, city: &str) -> Row {
        let mut row = Row::new();
        row.insert("idlocation".to_string(), Value::Int(id));
        row.insert("country".to_string(), Value::from(country));
        row.insert("city".to_string(), Value::from(city));
        row
    }

    fn seeded() -> MemoryRowStore {
        let store = MemoryRowStore::new();
        store.insert_rows(
            "location",
            [
                location(3, "Norway", "Oslo"),
                location(1, "Norway", "Bergen"),
                location(2, "Sweden", "Malmo"),
                location(4, "Denmark", "Aarhus"),
            ],
        );
        store
    }

    fn ids(rows: &[Row]) -> Vec<i64> {
        rows.iter()
            .map(|r| match r["idlocation"] {
                Value::Int(i) => i,
                _ => panic!("non-integer id"),
            })
            .collect()
    }

    #[tokio::test]
    async fn unsorted_list_is_ordered_by_primary_key() {
        let catalog = ResourceCatalog::lca();
        let store = seeded();
        let plan = compile(&catalog, &QueryDescriptor::new("location", 10), 100).unwrap();
        assert_eq!(ids(&store.list(&plan).await.unwrap()), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn sorted_window_and_count() {
        let catalog = ResourceCatalog::lca();
        let store = seeded();
        let d = QueryDescriptor::new("location", 2)
            .with_sort(SortSpec::descending("city"))
            .with_window(1, 2);
        let plan = compile(&catalog, &d, 100).unwrap();
        // Oslo(3), Malmo(2), Bergen(1), Aarhus(4)
        assert_eq!(ids(&store.list(&plan).await.unwrap()), vec![2, 1]);
        assert_eq!(store.count(&plan).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn search_filters_list_and_count() {
        let catalog = ResourceCatalog::lca();
        let store = seeded();
        let d = QueryDescriptor::new("location", 10)
            .with_search(SearchSpec::new("NORWAY", ["country"]));
        let plan = compile(&catalog, &d, 100).unwrap();
        assert_eq!(ids(&store.list(&plan).await.unwrap()), vec![1, 3]);
        assert_eq!(store.count(&plan).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn skip_past_end_and_zero_take_are_empty() {
        let catalog = ResourceCatalog::lca();
        let store = seeded();
        let past = compile(
            &catalog,
            &QueryDescriptor::new("location", 10).with_window(50, 10),
            100,
        )
        .unwrap();
        assert!(store.list(&past).await.unwrap().is_empty());

        let zero = compile(
            &catalog,
            &QueryDescriptor::new("location", 0),
            100,
        )
        .unwrap();
        assert!(store.list(&zero).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_where_matches_loosely_on_keys() {
        let store = seeded();
        let rows = store
            .fetch_where(
                "location",
                &[Condition::new("idlocation", Value::from("2"))],
                "idlocation",
            )
            .await
            .unwrap();
        assert_eq!(ids(&rows), vec![2]);

        let none = store
            .fetch_where("typology", &[], "idtypology")
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn json_fixture_loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"location": [{{"idlocation": 1, "country": "Norway", "city": "Oslo"}}]}}"#
        )
        .unwrap();
        let store = MemoryRowStore::from_json_file(file.path()).unwrap();
        assert_eq!(store.row_count(), 1);
    }

    #[test]
    fn malformed_fixture_is_an_error() {
        assert!(MemoryRowStore::from_json_str(r#"{"location": 3}"#).is_err());
        assert!(MemoryRowStore::from_json_file(Path::new("/nonexistent/seed.json")).is_err());
    }

    fn random_store(cities: &[String]) -> MemoryRowStore {
        let store = MemoryRowStore::new();
        store.insert_rows(
            "location",
            cities.iter().enumerate().map(|(i, city)| {
                location(i64::try_from(i).unwrap(), "Norway", city)
            }),
        );
        store
    }

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(f)
    }

    proptest! {
        #![proptest_config(Config::with_cases(64))]

        #[test]
        fn consecutive_windows_reproduce_unwindowed_order(
            cities in proptest::collection::vec("[a-zA-Z]{0,6}", 0..40),
            take in 1_u64..10,
            descending in any::<bool>(),
        ) {
            let catalog = ResourceCatalog::lca();
            let store = random_store(&cities);
            let sort = SortSpec { column: "city".to_string(), descending };
            let all = block_on(store.list(
                &compile(&catalog, &QueryDescriptor::new("location", 1000).with_sort(sort.clone()), 1000).unwrap(),
            )).unwrap();
            let total = all.len() as u64;

            let mut stitched = Vec::new();
            let mut skip = 0;
            while skip < total {
                let d = QueryDescriptor::new("location", take)
                    .with_sort(sort.clone())
                    .with_window(skip, take);
                let page = block_on(store.list(&compile(&catalog, &d, 1000).unwrap())).unwrap();
                if skip + take <= total {
                    prop_assert_eq!(page.len() as u64, take);
                }
                stitched.extend(page);
                skip += take;
            }
            prop_assert_eq!(stitched, all);
        }

        #[test]
        fn sorted_results_are_monotonic(
            cities in proptest::collection::vec("[a-cA-C]{0,3}", 0..30),
            descending in any::<bool>(),
        ) {
            let catalog = ResourceCatalog::lca();
            let store = random_store(&cities);
            let d = QueryDescriptor::new("location", 100)
                .with_sort(SortSpec { column: "city".to_string(), descending });
            let rows = block_on(store.list(&compile(&catalog, &d, 1000).unwrap())).unwrap();
            for pair in rows.windows(2) {
                let ord = pair[0]["city"].cmp_for_sort(&pair[1]["city"]);
                if descending {
                    prop_assert!(ord != std::cmp::Ordering::Less);
                } else {
                    prop_assert!(ord != std::cmp::Ordering::Greater);
                }
            }
            let again = block_on(store.list(&compile(&catalog, &d, 1000).unwrap())).unwrap();
            prop_assert_eq!(rows, again);
        }

        #[test]
        fn search_matches_exactly_the_rows_containing_term(
            cities in proptest::collection::vec("[a-dA-D]{0,5}", 0..30),
            term in "[a-dA-D]{1,2}",
        ) {
            let catalog = ResourceCatalog::lca();
            let store = random_store(&cities);
            let d = QueryDescriptor::new("location", 1000)
                .with_search(SearchSpec::new(term.clone(), ["country", "city"]));
            let rows = block_on(store.list(&compile(&catalog, &d, 1000).unwrap())).unwrap();
            let expected = cities
                .iter()
                .filter(|c| format!("Norway{c}").to_lowercase().contains(&term.to_lowercase()))
                .count();
            prop_assert_eq!(rows.len(), expected);
        }
    }
}
