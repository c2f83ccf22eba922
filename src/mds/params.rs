//! `run_mds` input.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ObjRef;

const DEFAULT_N_COMPONENTS: i64 = 2;
const DEFAULT_MAX_ITER: i64 = 300;
const DEFAULT_EPS: f64 = 1e-3;
const DEFAULT_DISTANCE_METRIC: &str = "bray";

/// Boolean as the caller encoded it: JSON boolean or integer.
///
/// Serializes back in the same form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    /// Nonzero integers are true.
    pub fn is_set(self) -> bool {
        match self {
            Self::Bool(b) => b,
            Self::Int(n) => n != 0,
        }
    }
}

impl From<bool> for Flag {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Input of `run_mds`.
///
/// Only `input_obj_ref` and `workspace_name` are required. Optional fields keep
/// whatever the caller sent (absent and `null` both read as unset) so the delegate
/// receives the request as written; the accessor methods apply the defaults.
/// Semantic checks belong to the delegate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MdsParams {
    /// Matrix to ordinate.
    pub input_obj_ref: ObjRef,

    /// Workspace that receives the output objects.
    pub workspace_name: String,

    /// Name of the output MDS matrix object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mds_matrix_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_components: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<Flag>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iter: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eps: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_metric: Option<String>,

    /// Post-processing of the ordination (rotate, invert, center).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mds_ordination: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_mapping_obj_ref: Option<ObjRef>,

    /// Plot option: attribute used to scale point size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_size_by: Option<BTreeMap<String, String>>,

    /// Plot option: attribute used to group point colors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_marker_by: Option<BTreeMap<String, String>>,

    /// Keys this module does not know about, passed through to the delegate.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MdsParams {
    /// Params with only the required fields set.
    pub fn new(input_obj_ref: ObjRef, workspace_name: impl Into<String>) -> Self {
        Self {
            input_obj_ref,
            workspace_name: workspace_name.into(),
            mds_matrix_name: None,
            n_components: None,
            metric: None,
            max_iter: None,
            eps: None,
            distance_metric: None,
            mds_ordination: None,
            attribute_mapping_obj_ref: None,
            scale_size_by: None,
            color_marker_by: None,
            extra: Map::new(),
        }
    }

    /// Number of ordination dimensions.
    pub fn n_components(&self) -> i64 {
        self.n_components.unwrap_or(DEFAULT_N_COMPONENTS)
    }

    /// Metric MDS when true, non-metric otherwise.
    pub fn metric(&self) -> bool {
        self.metric.map(Flag::is_set).unwrap_or(false)
    }

    pub fn max_iter(&self) -> i64 {
        self.max_iter.unwrap_or(DEFAULT_MAX_ITER)
    }

    /// Relative stress tolerance for convergence.
    pub fn eps(&self) -> f64 {
        self.eps.unwrap_or(DEFAULT_EPS)
    }

    /// `bray`, `euclidean`, `manhattan`, ...
    pub fn distance_metric(&self) -> &str {
        self.distance_metric
            .as_deref()
            .unwrap_or(DEFAULT_DISTANCE_METRIC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let params: MdsParams =
            serde_json::from_value(json!({"input_obj_ref": "1/2/3", "workspace_name": "ws"}))
                .unwrap();

        assert_eq!(params, MdsParams::new("1/2/3".parse().unwrap(), "ws"));
        assert_eq!(params.n_components(), 2);
        assert!(!params.metric());
        assert_eq!(params.max_iter(), 300);
        assert_eq!(params.eps(), 1e-3);
        assert_eq!(params.distance_metric(), "bray");
        assert!(params.extra.is_empty());
    }

    #[test]
    fn test_defaults_not_written_back() {
        let params = MdsParams::new("1/2/3".parse().unwrap(), "ws");
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({"input_obj_ref": "1/2/3", "workspace_name": "ws"})
        );
    }

    #[test]
    fn test_explicit_nulls_read_as_unset() {
        let params: MdsParams = serde_json::from_value(json!({
            "input_obj_ref": "1/2/3",
            "workspace_name": "ws",
            "n_components": null,
            "metric": null,
            "max_iter": null,
            "eps": null,
            "distance_metric": null,
            "mds_ordination": null
        }))
        .unwrap();

        assert_eq!(params, MdsParams::new("1/2/3".parse().unwrap(), "ws"));
        assert_eq!(params.n_components(), 2);
        assert!(!params.metric());
        assert_eq!(params.distance_metric(), "bray");
    }

    #[test]
    fn test_full_params_serialize_as_received() {
        let raw = json!({
            "input_obj_ref": "10/20/1",
            "workspace_name": "ws",
            "mds_matrix_name": "mds_out",
            "n_components": 3,
            "metric": 1,
            "max_iter": 50,
            "eps": 0.01,
            "distance_metric": "euclidean",
            "mds_ordination": "center",
            "attribute_mapping_obj_ref": "10/21/2",
            "scale_size_by": {"attribute_size": "depth"},
            "color_marker_by": {"attribute_color": "site"}
        });
        let params: MdsParams = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(params.n_components(), 3);
        assert!(params.metric());
        assert_eq!(params.metric, Some(Flag::Int(1)));
        assert_eq!(params.distance_metric(), "euclidean");
        assert_eq!(
            params.color_marker_by.as_ref().and_then(|m| m.get("attribute_color")),
            Some(&"site".to_string())
        );

        assert_eq!(serde_json::to_value(&params).unwrap(), raw);
    }

    #[test]
    fn test_metric_flag_forms() {
        let metric = |value: Value| {
            serde_json::from_value::<MdsParams>(json!({
                "input_obj_ref": "1/2/3",
                "workspace_name": "ws",
                "metric": value
            }))
            .unwrap()
        };
        assert!(metric(json!(true)).metric());
        assert!(!metric(json!(false)).metric());
        assert!(!metric(json!(0)).metric());
        assert!(metric(json!(2)).metric());

        let back = serde_json::to_value(metric(json!(0))).unwrap();
        assert_eq!(back["metric"], json!(0));
        let back = serde_json::to_value(metric(json!(true))).unwrap();
        assert_eq!(back["metric"], json!(true));
    }

    #[test]
    fn test_unknown_keys_pass_through() {
        let raw = json!({
            "input_obj_ref": "1/2/3",
            "workspace_name": "ws",
            "plot_script": "ggplot"
        });
        let params: MdsParams = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(params.extra.get("plot_script"), Some(&json!("ggplot")));
        assert_eq!(serde_json::to_value(&params).unwrap(), raw);
    }

    #[test]
    fn test_required_fields() {
        assert!(serde_json::from_value::<MdsParams>(json!({"workspace_name": "ws"})).is_err());
        assert!(serde_json::from_value::<MdsParams>(json!({"input_obj_ref": "1/2/3"})).is_err());
        assert!(serde_json::from_value::<MdsParams>(
            json!({"input_obj_ref": "not-a-ref", "workspace_name": "ws"})
        )
        .is_err());
    }
}
