//! Generic list-query service: search, sort and pagination over any
//! allow-listed resource, plus joined detail rows.

use std::sync::Arc;

use lcadash_core::{Page, QueryDescriptor, Row, SearchSpec, Value};
use tracing::{debug, warn};

use crate::catalog::ResourceCatalog;
use crate::query::{compile, compile_search, key_value, Condition, ListPlan};
use crate::service::{ServiceConfig, ServiceError};
use crate::store::RowStore;

/// Executes list queries against a [`RowStore`].
///
/// Cheap to share: holds only `Arc`s and the paging limits.
pub struct ListQueryService {
    catalog: Arc<ResourceCatalog>,
    store: Arc<dyn RowStore>,
    config: ServiceConfig,
}

impl ListQueryService {
    #[must_use]
    pub fn new(
        catalog: Arc<ResourceCatalog>,
        store: Arc<dyn RowStore>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            catalog,
            store,
            config,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &ResourceCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Returns one page of rows and, when requested, the number of rows
    /// matching the search across all pages.
    ///
    /// Rows are ordered by the requested sort with the primary key as a
    /// tiebreak, so consecutive windows of the same query never overlap.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Query`] for an unknown resource, search column or
    ///   sort column
    /// - [`ServiceError::Backend`] if the row store fails
    pub async fn list_query(&self, descriptor: &QueryDescriptor) -> Result<Page, ServiceError> {
        let plan = compile(&self.catalog, descriptor, self.config.max_page_size)?;
        debug!(
            resource = plan.resource,
            skip = plan.skip,
            take = plan.take,
            total = descriptor.require_total_count,
            "list query"
        );

        let data = if plan.take == 0 {
            Vec::new()
        } else {
            self.store.list(&plan).await.map_err(|e| backend(&plan, e))?
        };

        let total_count = if descriptor.require_total_count {
            Some(self.store.count(&plan).await.map_err(|e| backend(&plan, e))?)
        } else {
            None
        };

        Ok(Page { data, total_count })
    }

    /// Number of rows of `resource` matching `search`.
    ///
    /// # Errors
    ///
    /// Same as [`list_query`](Self::list_query).
    pub async fn count(
        &self,
        resource: &str,
        search: Option<&SearchSpec>,
    ) -> Result<u64, ServiceError> {
        let def = self.catalog.resource(resource)?;
        let plan = ListPlan {
            resource: def.name,
            predicate: compile_search(def, search)?,
            order: Vec::new(),
            skip: 0,
            take: u64::MAX,
        };
        self.store.count(&plan).await.map_err(|e| backend(&plan, e))
    }

    /// Fetches one row by primary key with the resource's detail joins
    /// applied.
    ///
    /// Joined columns overwrite same-named base columns; a join with no
    /// matching row contributes `null` for each of its columns.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Query`] for an unknown resource
    /// - [`ServiceError::NotFound`] if no row has that key
    /// - [`ServiceError::Backend`] if the row store fails
    pub async fn get_detail(&self, resource: &str, id: &str) -> Result<Row, ServiceError> {
        let def = self.catalog.resource(resource)?;
        let key = Condition {
            column: def.primary_key,
            value: key_value(id),
        };
        let mut detail = self
            .fetch_where(def.name, &[key], def.primary_key)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::not_found(def.name, id))?;

        for join in def.joins {
            let local = detail.get(join.local_key).cloned().unwrap_or(Value::Null);
            let joined = if local.is_null() {
                None
            } else {
                let target = self.catalog.resource(join.resource)?;
                let mut conditions = vec![Condition {
                    column: join.remote_key,
                    value: local,
                }];
                if let Some((column, value)) = join.filter {
                    conditions.push(Condition::new(column, value));
                }
                self.fetch_where(target.name, &conditions, target.primary_key)
                    .await?
                    .into_iter()
                    .next()
            };

            for column in join.columns {
                let value = joined
                    .as_ref()
                    .and_then(|row| row.get(*column))
                    .cloned()
                    .unwrap_or(Value::Null);
                detail.insert((*column).to_string(), value);
            }
        }

        Ok(detail)
    }

    pub(crate) async fn fetch_where(
        &self,
        resource: &'static str,
        conditions: &[Condition],
        order_by: &'static str,
    ) -> Result<Vec<Row>, ServiceError> {
        self.store
            .fetch_where(resource, conditions, order_by)
            .await
            .map_err(|e| {
                warn!(resource, error = %e, "row store lookup failed");
                ServiceError::Backend(e)
            })
    }
}

fn backend(plan: &ListPlan, err: anyhow::Error) -> ServiceError {
    warn!(resource = plan.resource, error = %err, "row store query failed");
    ServiceError::Backend(err)
}
