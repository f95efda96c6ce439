//! Serializable description of one chart or table.
//!
//! Artifacts carry the data a renderer needs, not pixels. `kind` is tagged by
//! `type` so NDJSON consumers can dispatch without guessing.

use crate::report::stats::{Bin, BoxStats, DensityPoint};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub caption: String,
    pub kind: ArtifactKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArtifactKind {
    Pie {
        slices: Vec<Slice>,
    },
    Bar {
        orientation: Orientation,
        x_label: String,
        y_label: String,
        bars: Vec<LabeledValue>,
    },
    GroupedBar {
        groups: Vec<String>,
        series: Vec<Series>,
    },
    #[serde(rename = "box")]
    BoxPlot {
        value_label: String,
        groups: Vec<BoxGroup>,
    },
    Violin {
        value_label: String,
        groups: Vec<ViolinGroup>,
    },
    Heatmap {
        rows: Vec<String>,
        columns: Vec<String>,
        cells: Vec<Vec<u64>>,
    },
    Histogram {
        value_label: String,
        bins: Vec<Bin>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        density: Vec<DensityPoint>,
    },
    Scatter {
        x_label: String,
        y_label: String,
        points: Vec<Point>,
    },
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
}

impl ArtifactKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ArtifactKind::Pie { .. } => "pie",
            ArtifactKind::Bar { .. } => "bar",
            ArtifactKind::GroupedBar { .. } => "grouped_bar",
            ArtifactKind::BoxPlot { .. } => "box",
            ArtifactKind::Violin { .. } => "violin",
            ArtifactKind::Heatmap { .. } => "heatmap",
            ArtifactKind::Histogram { .. } => "histogram",
            ArtifactKind::Scatter { .. } => "scatter",
            ArtifactKind::Table { .. } => "table",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Vertical,
    Horizontal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Slice {
    pub label: String,
    pub count: usize,
    pub percent: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabeledValue {
    pub label: String,
    pub value: f64,
}

/// One bar per group for a named series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoxGroup {
    pub label: String,
    pub stats: BoxStats,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViolinGroup {
    pub label: String,
    pub stats: BoxStats,
    pub density: Vec<DensityPoint>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_is_tagged_by_type() {
        let artifact = Artifact {
            name: "top_majors".into(),
            caption: "ME leads".into(),
            kind: ArtifactKind::Bar {
                orientation: Orientation::Horizontal,
                x_label: "Number of Students".into(),
                y_label: "Major".into(),
                bars: vec![LabeledValue {
                    label: "ME".into(),
                    value: 3.0,
                }],
            },
        };
        let value = serde_json::to_value(&artifact).unwrap();
        assert_eq!(value.pointer("/kind/type"), Some(&json!("bar")));
        assert_eq!(value.pointer("/kind/orientation"), Some(&json!("horizontal")));
        assert_eq!(artifact.kind.type_name(), "bar");
    }

    #[test]
    fn box_plot_serializes_as_box() {
        let kind = ArtifactKind::BoxPlot {
            value_label: "GPA".into(),
            groups: Vec::new(),
        };
        let value = serde_json::to_value(&kind).unwrap();
        assert_eq!(value.get("type"), Some(&json!("box")));
        let back: ArtifactKind = serde_json::from_value(value).unwrap();
        assert_eq!(back.type_name(), "box");
    }
}
