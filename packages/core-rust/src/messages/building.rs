//! Response bodies of the building drill-down endpoints.

use serde::{Deserialize, Serialize};

use crate::types::Row;

/// One bar of the embodied-carbon chart: a life-cycle phase and its GWP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GwpChartItem {
    /// Display label of the phase (`A1-A3`, `A4`, `B4 (m)`, `B4 (t)`).
    pub lca_phase: String,
    /// Global warming potential in kgCO2e/m2.
    pub gwp: f64,
}

/// A building element together with its neighbourhood in the hierarchy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementView {
    /// The selected element.
    pub element: Row,
    /// Path from the root element down to and including `element`.
    pub route: Vec<Row>,
    /// Direct sub-elements.
    pub children: Vec<Row>,
    /// Material inventory rows attached to the element.
    pub materials: Vec<Row>,
}
