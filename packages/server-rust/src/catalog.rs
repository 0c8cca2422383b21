//! Resource allow-lists derived from the LCA schema.
//!
//! Every identifier that ends up in a store query comes from this catalog,
//! never from request text: resources, columns, primary keys and detail
//! joins are all `&'static str`.

use std::collections::HashMap;

use crate::query::QueryError;

/// A left join applied when fetching the detail view of a row.
///
/// The joined row is the first row of `resource` whose `remote_key` equals
/// the base row's `local_key` (and whose `filter` column equals the given
/// value, if any). Its `columns` are copied onto the detail row; a missing
/// joined row yields `null` for each of them.
#[derive(Debug, Clone, Copy)]
pub struct DetailJoin {
    pub resource: &'static str,
    pub local_key: &'static str,
    pub remote_key: &'static str,
    pub filter: Option<(&'static str, i64)>,
    pub columns: &'static [&'static str],
}

/// Schema metadata of one resource.
#[derive(Debug, Clone, Copy)]
pub struct ResourceDef {
    pub name: &'static str,
    pub primary_key: &'static str,
    pub columns: &'static [&'static str],
    /// Columns searched when a request names none.
    pub searchable: &'static [&'static str],
    pub joins: &'static [DetailJoin],
}

impl ResourceDef {
    /// Resolves a request-supplied column name to its catalog identifier.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownColumn`] if the resource has no such column.
    pub fn column(&self, name: &str) -> Result<&'static str, QueryError> {
        self.columns
            .iter()
            .copied()
            .find(|c| *c == name)
            .ok_or_else(|| QueryError::UnknownColumn {
                resource: self.name.to_string(),
                column: name.to_string(),
            })
    }
}

/// Allow-list of queryable resources.
#[derive(Debug, Clone)]
pub struct ResourceCatalog {
    resources: HashMap<&'static str, ResourceDef>,
}

impl ResourceCatalog {
    #[must_use]
    pub fn new(defs: impl IntoIterator<Item = ResourceDef>) -> Self {
        Self {
            resources: defs.into_iter().map(|d| (d.name, d)).collect(),
        }
    }

    /// The building LCA schema served by the dashboard.
    #[must_use]
    pub fn lca() -> Self {
        Self::new([
            BUILDINGS,
            BUILDING_ELEMENTS,
            MATERIAL_INVENTORY,
            MATERIALS,
            TYPOLOGY,
            CONSTRUCTION_TYPE,
            LOCATION,
        ])
    }

    /// Looks up a resource by name.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownResource`] if the name is not allow-listed.
    pub fn resource(&self, name: &str) -> Result<&ResourceDef, QueryError> {
        self.resources
            .get(name)
            .ok_or_else(|| QueryError::UnknownResource {
                resource: name.to_string(),
            })
    }

    /// Names of all resources, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.resources.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

// ---------------------------------------------------------------------------
// LCA schema
// ---------------------------------------------------------------------------

pub const BUILDINGS: ResourceDef = ResourceDef {
    name: "buildings",
    primary_key: "idbuildings",
    columns: &[
        "idbuildings",
        "building_identifier",
        "building_name",
        "project",
        "country",
        "city",
        "typology",
        "construction_type",
        "idlocation",
        "idtypology",
        "idconstruction_type",
        "built_status",
        "energy_ambition_level",
        "calculation_method",
        "main_data_source",
        "study_type",
        "study_year",
        "lifetime",
        "floor_area",
        "GWP_B6",
        "GWP_B7",
        "heated_volume",
        "area_footprint",
        "area_roof",
        "area_wall",
        "area_windowAndDoor",
        "heatloss_number",
        "comments",
    ],
    searchable: &["building_name", "project", "country", "city"],
    joins: &[
        DetailJoin {
            resource: "location",
            local_key: "idlocation",
            remote_key: "idlocation",
            filter: None,
            columns: &["country", "city"],
        },
        DetailJoin {
            resource: "typology",
            local_key: "idtypology",
            remote_key: "idtypology",
            filter: None,
            columns: &["typology"],
        },
        DetailJoin {
            resource: "constructiontype",
            local_key: "idconstruction_type",
            remote_key: "idconstruction_type",
            filter: None,
            columns: &["construction_type"],
        },
        // Building-level totals live on the root element (idlevels = 0).
        DetailJoin {
            resource: "buildingelements",
            local_key: "idbuildings",
            remote_key: "idbuildings",
            filter: Some(("idlevels", 0)),
            columns: &["A1A3", "A4", "B4_m", "B4_t"],
        },
    ],
};

pub const BUILDING_ELEMENTS: ResourceDef = ResourceDef {
    name: "buildingelements",
    primary_key: "idbuilding_elements",
    columns: &[
        "idbuilding_elements",
        "idbuildings",
        "idlevels",
        "idparent",
        "hierarchy",
        "name",
        "A1A3",
        "A4",
        "B4_m",
        "B4_t",
    ],
    searchable: &["name"],
    joins: &[],
};

pub const MATERIAL_INVENTORY: ResourceDef = ResourceDef {
    name: "materialinventory",
    primary_key: "idmaterialInventory",
    columns: &[
        "idmaterialInventory",
        "idbuildings",
        "idbuilding_elements",
        "idmaterials",
        "buildingElementName",
        "name",
        "materialCat",
        "quantity",
        "FU",
        "A1A3",
        "A4",
        "B4_m",
        "B4_t",
        "RSL_mi",
        "comments",
    ],
    searchable: &["name", "buildingElementName", "materialCat"],
    joins: &[],
};

pub const MATERIALS: ResourceDef = ResourceDef {
    name: "materials",
    primary_key: "idmaterials",
    columns: &[
        "idmaterials",
        "name",
        "materialCat",
        "sourceType",
        "source",
        "dataType",
        "dataYear",
        "density",
        "EEf_A1A3",
        "RSL",
        "country",
        "city",
        "comments",
    ],
    searchable: &["name", "materialCat", "source"],
    joins: &[],
};

pub const TYPOLOGY: ResourceDef = ResourceDef {
    name: "typology",
    primary_key: "idtypology",
    columns: &["idtypology", "typology"],
    searchable: &["typology"],
    joins: &[],
};

pub const CONSTRUCTION_TYPE: ResourceDef = ResourceDef {
    name: "constructiontype",
    primary_key: "idconstruction_type",
    columns: &["idconstruction_type", "construction_type"],
    searchable: &["construction_type"],
    joins: &[],
};

pub const LOCATION: ResourceDef = ResourceDef {
    name: "location",
    primary_key: "idlocation",
    columns: &["idlocation", "country", "city"],
    searchable: &["country", "city"],
    joins: &[],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lca_catalog_lists_all_resources() {
        let catalog = ResourceCatalog::lca();
        assert_eq!(
            catalog.names(),
            vec![
                "buildingelements",
                "buildings",
                "constructiontype",
                "location",
                "materialinventory",
                "materials",
                "typology",
            ]
        );
    }

    #[test]
    fn unknown_resource_is_rejected() {
        let catalog = ResourceCatalog::lca();
        let err = catalog.resource("users; DROP TABLE buildings").unwrap_err();
        assert!(matches!(err, QueryError::UnknownResource { .. }));
    }

    #[test]
    fn column_lookup_returns_catalog_identifier() {
        let catalog = ResourceCatalog::lca();
        let def = catalog.resource("buildings").unwrap();
        assert_eq!(def.column("city").unwrap(), "city");
        assert!(matches!(
            def.column("city`"),
            Err(QueryError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn every_catalog_identifier_is_consistent() {
        let catalog = ResourceCatalog::lca();
        for name in catalog.names() {
            let def = catalog.resource(name).unwrap();
            assert!(def.columns.contains(&def.primary_key), "{name} pk");
            for c in def.searchable {
                assert!(def.columns.contains(c), "{name}.{c} searchable");
            }
            for join in def.joins {
                let target = catalog.resource(join.resource).unwrap();
                assert!(def.columns.contains(&join.local_key), "{name} join key");
                assert!(target.columns.contains(&join.remote_key));
                for c in join.columns {
                    assert!(target.columns.contains(c), "{}.{c}", join.resource);
                }
                if let Some((col, _)) = join.filter {
                    assert!(target.columns.contains(&col));
                }
            }
        }
    }
}
