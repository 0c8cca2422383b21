//! Building drill-down: element hierarchy, material inventory and the
//! embodied-carbon chart series of one building.

use std::collections::HashSet;
use std::sync::Arc;

use lcadash_core::{ElementView, GwpChartItem, Row, Value};

use crate::catalog::{BUILDINGS, BUILDING_ELEMENTS, MATERIAL_INVENTORY};
use crate::query::{key_value, Condition, QueryError};
use crate::service::{ListQueryService, ServiceError};

/// Life-cycle phases charted for a building, as `(label, column)`.
const GWP_PHASES: [(&str, &str); 4] = [
    ("A1-A3", "A1A3"),
    ("A4", "A4"),
    ("B4 (m)", "B4_m"),
    ("B4 (t)", "B4_t"),
];

/// Corrupt parent links in a building's element hierarchy.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("element level {level} points at missing parent {parent}")]
    BrokenLink { level: i64, parent: i64 },
    #[error("cycle in element hierarchy through level {level}")]
    Cycle { level: i64 },
}

/// The building elements of one building, linked by `idparent -> idlevels`.
///
/// The root element has `hierarchy == 0` and no parent.
#[derive(Debug, Clone, Default)]
pub struct ElementTree {
    elements: Vec<Row>,
}

fn int_column(row: &Row, column: &str) -> Option<i64> {
    match row.get(column)? {
        Value::Int(n) => Some(*n),
        _ => None,
    }
}

fn is_root(row: &Row) -> bool {
    int_column(row, "hierarchy") == Some(0) || int_column(row, "idparent").is_none()
}

impl ElementTree {
    #[must_use]
    pub fn new(elements: Vec<Row>) -> Self {
        Self { elements }
    }

    #[must_use]
    pub fn root(&self) -> Option<&Row> {
        self.elements.iter().find(|row| is_root(row))
    }

    #[must_use]
    pub fn find(&self, level: i64) -> Option<&Row> {
        self.elements
            .iter()
            .find(|row| int_column(row, "idlevels") == Some(level))
    }

    /// Direct sub-elements of the element at `level`.
    #[must_use]
    pub fn children(&self, level: i64) -> Vec<&Row> {
        self.elements
            .iter()
            .filter(|row| !is_root(row) && int_column(row, "idparent") == Some(level))
            .collect()
    }

    /// Path from the root down to the element at `level`, inclusive.
    ///
    /// Returns an empty route if no element has that level.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError`] if a parent link dangles or loops.
    pub fn route_to(&self, level: i64) -> Result<Vec<&Row>, TreeError> {
        let mut route = Vec::new();
        let mut visited = HashSet::new();
        let mut current = self.find(level);

        while let Some(row) = current {
            let here = int_column(row, "idlevels").unwrap_or(level);
            if !visited.insert(here) {
                return Err(TreeError::Cycle { level: here });
            }
            route.push(row);
            if is_root(row) {
                break;
            }
            let Some(parent) = int_column(row, "idparent") else {
                break;
            };
            current = Some(
                self.find(parent)
                    .ok_or(TreeError::BrokenLink { level: here, parent })?,
            );
        }

        route.reverse();
        Ok(route)
    }
}

/// Per-building views composed from list-query lookups.
pub struct BuildingService {
    lists: Arc<ListQueryService>,
}

impl BuildingService {
    #[must_use]
    pub fn new(lists: Arc<ListQueryService>) -> Self {
        Self { lists }
    }

    /// Resolves a building id to its key value, failing if it does not exist.
    async fn building_key(&self, building_id: &str) -> Result<Value, ServiceError> {
        let key = key_value(building_id);
        let found = self
            .lists
            .fetch_where(
                BUILDINGS.name,
                &[Condition::new(BUILDINGS.primary_key, key.clone())],
                BUILDINGS.primary_key,
            )
            .await?;
        if found.is_empty() {
            return Err(ServiceError::not_found(BUILDINGS.name, building_id));
        }
        Ok(key)
    }

    /// All building elements of a building, ordered by level.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] for an unknown building,
    /// [`ServiceError::Backend`] if the row store fails.
    pub async fn elements(&self, building_id: &str) -> Result<Vec<Row>, ServiceError> {
        let key = self.building_key(building_id).await?;
        self.elements_of(key).await
    }

    async fn elements_of(&self, key: Value) -> Result<Vec<Row>, ServiceError> {
        self.lists
            .fetch_where(
                BUILDING_ELEMENTS.name,
                &[Condition::new("idbuildings", key)],
                "idlevels",
            )
            .await
    }

    /// Drill-down view of the element at `level`.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Query`] if `level` is not an integer
    /// - [`ServiceError::NotFound`] for an unknown building or level
    /// - [`ServiceError::Backend`] if the row store fails or the hierarchy
    ///   is corrupt
    pub async fn element_view(
        &self,
        building_id: &str,
        level: &str,
    ) -> Result<ElementView, ServiceError> {
        let level: i64 = level
            .trim()
            .parse()
            .map_err(|e: std::num::ParseIntError| QueryError::InvalidParameter {
                name: "level",
                reason: e.to_string(),
            })?;

        let key = self.building_key(building_id).await?;
        let tree = ElementTree::new(self.elements_of(key.clone()).await?);
        let element = tree
            .find(level)
            .ok_or_else(|| ServiceError::not_found(BUILDING_ELEMENTS.name, level))?;

        let route = tree
            .route_to(level)
            .map_err(|e| ServiceError::Backend(e.into()))?;

        let materials = match element.get(BUILDING_ELEMENTS.primary_key) {
            Some(element_key) if !element_key.is_null() => {
                self.lists
                    .fetch_where(
                        MATERIAL_INVENTORY.name,
                        &[
                            Condition::new("idbuildings", key),
                            Condition::new("idbuilding_elements", element_key.clone()),
                        ],
                        MATERIAL_INVENTORY.primary_key,
                    )
                    .await?
            }
            _ => Vec::new(),
        };

        Ok(ElementView {
            element: element.clone(),
            route: route.into_iter().cloned().collect(),
            children: tree.children(level).into_iter().cloned().collect(),
            materials,
        })
    }

    /// Material inventory of a building.
    ///
    /// # Errors
    ///
    /// Same as [`elements`](Self::elements).
    pub async fn materials(&self, building_id: &str) -> Result<Vec<Row>, ServiceError> {
        let key = self.building_key(building_id).await?;
        self.lists
            .fetch_where(
                MATERIAL_INVENTORY.name,
                &[Condition::new("idbuildings", key)],
                MATERIAL_INVENTORY.primary_key,
            )
            .await
    }

    /// Embodied-carbon chart series: one item per life-cycle phase, read
    /// from the building's detail row. Missing values chart as `0.0`.
    ///
    /// # Errors
    ///
    /// Same as [`ListQueryService::get_detail`].
    pub async fn gwp_summary(&self, building_id: &str) -> Result<Vec<GwpChartItem>, ServiceError> {
        let detail = self.lists.get_detail(BUILDINGS.name, building_id).await?;
        Ok(GWP_PHASES
            .iter()
            .map(|(label, column)| GwpChartItem {
                lca_phase: (*label).to_string(),
                gwp: detail.get(*column).and_then(Value::as_f64).unwrap_or(0.0),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ResourceCatalog;
    use crate::service::ServiceConfig;
    use crate::store::MemoryRowStore;

    const DEMO: &str = include_str!("../../fixtures/demo.json");

    fn service() -> BuildingService {
        let store = MemoryRowStore::from_json_str(DEMO).unwrap();
        let lists = ListQueryService::new(
            Arc::new(ResourceCatalog::lca()),
            Arc::new(store),
            ServiceConfig::default(),
        );
        BuildingService::new(Arc::new(lists))
    }

    fn element(level: i64, parent: Option<i64>, hierarchy: i64) -> Row {
        Row::from([
            ("idlevels".to_string(), Value::Int(level)),
            ("idparent".to_string(), Value::from(parent)),
            ("hierarchy".to_string(), Value::Int(hierarchy)),
        ])
    }

    fn names(rows: &[Row]) -> Vec<&str> {
        rows.iter()
            .map(|row| match row.get("name") {
                Some(Value::String(s)) => s.as_str(),
                other => panic!("unexpected name {other:?}"),
            })
            .collect()
    }

    // -- ElementTree --

    #[test]
    fn route_walks_parents_up_to_the_root() {
        let tree = ElementTree::new(vec![
            element(0, None, 0),
            element(1, Some(0), 1),
            element(2, Some(1), 2),
        ]);

        let route: Vec<_> = tree
            .route_to(2)
            .unwrap()
            .into_iter()
            .map(|row| int_column(row, "idlevels"))
            .collect();

        assert_eq!(route, vec![Some(0), Some(1), Some(2)]);
        assert_eq!(tree.root().and_then(|r| int_column(r, "idlevels")), Some(0));
    }

    #[test]
    fn dangling_parent_is_a_broken_link() {
        let tree = ElementTree::new(vec![element(0, None, 0), element(5, Some(4), 1)]);

        let err = tree.route_to(5).unwrap_err();

        assert!(matches!(err, TreeError::BrokenLink { level: 5, parent: 4 }));
    }

    #[test]
    fn looping_parents_are_a_cycle() {
        let tree = ElementTree::new(vec![element(1, Some(2), 1), element(2, Some(1), 1)]);

        assert!(matches!(tree.route_to(1), Err(TreeError::Cycle { .. })));
    }

    #[test]
    fn root_is_not_its_own_child() {
        let tree = ElementTree::new(vec![element(0, None, 0), element(1, Some(0), 1)]);

        assert_eq!(tree.children(0).len(), 1);
        assert!(tree.route_to(9).unwrap().is_empty());
    }

    // -- BuildingService --

    #[tokio::test]
    async fn elements_are_ordered_by_level() {
        let rows = service().elements("1").await.unwrap();

        assert_eq!(
            names(&rows),
            vec![
                "Oslo Tower",
                "Substructure",
                "Superstructure",
                "Frame",
                "Exterior walls"
            ]
        );
    }

    #[tokio::test]
    async fn elements_of_unknown_building_is_not_found() {
        let err = service().elements("99").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn element_view_of_a_leaf() {
        let view = service().element_view("1", "3").await.unwrap();

        assert_eq!(view.element.get("name"), Some(&Value::from("Frame")));
        assert_eq!(
            names(&view.route),
            vec!["Oslo Tower", "Superstructure", "Frame"]
        );
        assert!(view.children.is_empty());
        assert_eq!(names(&view.materials), vec!["Glulam beam", "Steel connector"]);
    }

    #[tokio::test]
    async fn element_view_of_the_root() {
        let view = service().element_view("1", "0").await.unwrap();

        assert_eq!(names(&view.route), vec!["Oslo Tower"]);
        assert_eq!(names(&view.children), vec!["Substructure", "Superstructure"]);
        assert!(view.materials.is_empty());
    }

    #[tokio::test]
    async fn element_view_errors() {
        let svc = service();

        assert!(matches!(
            svc.element_view("1", "9").await,
            Err(ServiceError::NotFound { .. })
        ));
        assert!(matches!(
            svc.element_view("3", "0").await,
            Err(ServiceError::NotFound { .. })
        ));
        assert!(matches!(
            svc.element_view("1", "top").await,
            Err(ServiceError::Query(QueryError::InvalidParameter { name: "level", .. }))
        ));
        // building 4 has levels 1 and 2 pointing at each other
        assert!(matches!(
            svc.element_view("4", "1").await,
            Err(ServiceError::Backend(_))
        ));
    }

    #[tokio::test]
    async fn materials_of_a_building() {
        let svc = service();

        let rows = svc.materials("1").await.unwrap();
        assert_eq!(
            names(&rows),
            vec!["Glulam beam", "Steel connector", "Concrete panel"]
        );
        assert!(svc.materials("3").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn gwp_summary_charts_each_phase() {
        let items = service().gwp_summary("1").await.unwrap();

        let expected = [("A1-A3", 250.4), ("A4", 12.1), ("B4 (m)", 30.0), ("B4 (t)", 0.0)];
        assert_eq!(items.len(), expected.len());
        for (item, (phase, gwp)) in items.iter().zip(expected) {
            assert_eq!(item.lca_phase, phase);
            assert!((item.gwp - gwp).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn gwp_summary_without_root_element_is_all_zero() {
        let items = service().gwp_summary("3").await.unwrap();
        assert!(items.iter().all(|item| item.gwp.abs() < f64::EPSILON));
    }
}
