//! Request payloads and response interpretation for the feature and parcel
//! fabric services. Everything here is pure; the client supplies version,
//! session and record scoping.

use crate::connection::config::FabricConfig;
use crate::core::{
    FabricError, FabricOperation, GlobalId, ParcelFeatureRef, Record, RequestParams, Result,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};

pub const RECORD_OUT_FIELDS: &str = "OBJECTID,Name,GlobalID";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ParcelFeatureParam<'a> {
    id: &'a str,
    layer_id: String,
}

/// Filter expression matching a record by exact name. Quotes are doubled.
pub fn record_name_filter(name: &str) -> String {
    format!("Name = '{}'", name.replace('\'', "''"))
}

pub fn record_query_params(name: &str, version_name: &str) -> RequestParams {
    RequestParams::json()
        .with("where", record_name_filter(name))
        .with("outFields", RECORD_OUT_FIELDS)
        .with("returnGeometry", false)
        .with("gdbVersion", version_name)
}

/// Records from a feature query response, in service order.
pub fn parse_record_features(response: &Value, queried_name: &str) -> Result<Vec<Record>> {
    if let Some(detail) = remote_error_detail(response) {
        return Err(FabricError::rejected("query records", detail));
    }

    let features = response
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            FabricError::MalformedResponse("record query response has no features".to_string())
        })?;

    features
        .iter()
        .map(|feature| {
            let attributes = feature.get("attributes").ok_or_else(|| {
                FabricError::MalformedResponse("record feature has no attributes".to_string())
            })?;
            let id = attribute(attributes, "GlobalID")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    FabricError::MalformedResponse("record feature has no GlobalID".to_string())
                })?;
            let name = attribute(attributes, "Name")
                .and_then(Value::as_str)
                .unwrap_or(queried_name);
            Ok(Record::new(name, GlobalId::new(id)))
        })
        .collect()
}

/// Field lookup tolerant of the service's field name casing.
fn attribute<'a>(attributes: &'a Value, field: &str) -> Option<&'a Value> {
    attributes.get(field).or_else(|| {
        attributes
            .as_object()?
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(field))
            .map(|(_, value)| value)
    })
}

/// `applyEdits` payload adding one record to the records layer.
///
/// The records layer is non-spatial in practice but its schema requires a
/// polygon, so an empty ring set in the dataset's spatial reference is sent.
pub fn record_add_edits(
    config: &FabricConfig,
    object_id: i64,
    global_id: &GlobalId,
    name: &str,
) -> Value {
    json!([{
        "id": config.records_layer_id,
        "adds": [{
            "attributes": {
                "objectid": object_id,
                "name": name,
                "recordtype": null,
                "recordeddate": null,
                "cogoaccuracy": null,
                "created_user": null,
                "create_date": null,
                "last_edited_user": null,
                "last_edited_date": null,
                "parcelcount": null,
                "globalid": global_id.as_str(),
                "Shape__Area": 0,
                "Shape__Length": 0
            },
            "geometry": {
                "hasZ": true,
                "rings": [],
                "spatialReference": config.spatial_reference
            }
        }]
    }])
}

pub fn record_add_params(
    session_id: &str,
    version_name: &str,
    edits: &Value,
) -> RequestParams {
    RequestParams::json()
        .with("rollbackOnFailure", true)
        .with("sessionId", session_id)
        .with("useGlobalIds", true)
        .with("gdbVersion", version_name)
        .with("returnEditMoment", true)
        .with("returnServiceEditsOption", "originalAndCurrentFeatures")
        .with("usePreviousEditMoment", false)
        .with("edits", edits)
}

/// Global id of the record added by `applyEdits`.
///
/// Falls back to `sent` when the service accepts the add without echoing an id.
pub fn interpret_record_add(response: &Value, sent: &GlobalId) -> Result<GlobalId> {
    const OPERATION: &str = "createRecord";

    if let Some(detail) = remote_error_detail(response) {
        return Err(FabricError::rejected(OPERATION, detail));
    }

    let add = response
        .get(0)
        .and_then(|layer| layer.get("addResults"))
        .and_then(|results| results.get(0))
        .ok_or_else(|| {
            FabricError::MalformedResponse("applyEdits response has no addResults".to_string())
        })?;

    if add.get("success").and_then(Value::as_bool) != Some(true) {
        let detail = add
            .get("error")
            .and_then(|err| err.get("description").or_else(|| err.get("message")))
            .and_then(Value::as_str)
            .unwrap_or("add rejected");
        return Err(FabricError::rejected(OPERATION, detail));
    }

    Ok(add
        .get("globalId")
        .and_then(Value::as_str)
        .map(GlobalId::new)
        .unwrap_or_else(|| sent.clone()))
}

/// JSON list of `{id, layerId}` pairs. Layer ids are sent as strings.
pub fn parcel_features(features: &[ParcelFeatureRef]) -> Result<String> {
    let params: Vec<ParcelFeatureParam<'_>> = features
        .iter()
        .map(|feature| ParcelFeatureParam {
            id: feature.id.as_str(),
            layer_id: feature.layer_id.to_string(),
        })
        .collect();
    Ok(serde_json::to_string(&params)?)
}

pub fn empty_attribute_overrides() -> String {
    json!({"type": "PropertySet", "propertySetItems": []}).to_string()
}

/// Property set naming the merged parcel. The stated area travels as a string.
pub fn merge_attribute_overrides(name: &str, stated_area: f64) -> String {
    json!({
        "type": "PropertySet",
        "propertySetItems": ["name", name, "StatedArea", stated_area.to_string(), "isseed", 0]
    })
    .to_string()
}

/// Current time as whole seconds since the epoch, rounded.
pub fn current_moment() -> i64 {
    (Utc::now().timestamp_millis() as f64 / 1000.0).round() as i64
}

fn async_flag(config: &FabricConfig) -> bool {
    !config.synchronous
}

pub fn assign_params(
    config: &FabricConfig,
    layer_id: u32,
    feature_id: &GlobalId,
) -> Result<RequestParams> {
    let feature = ParcelFeatureRef::new(feature_id.clone(), layer_id);
    Ok(RequestParams::new()
        .with("parcelFeatures", parcel_features(std::slice::from_ref(&feature))?)
        .with("writeAttribute", &config.write_attribute)
        .with("async", async_flag(config)))
}

/// Parameters for operations scoped by record alone (createSeeds, build).
pub fn record_scoped_params(config: &FabricConfig) -> RequestParams {
    RequestParams::new().with("async", async_flag(config))
}

pub fn copy_lines_params(
    config: &FabricConfig,
    selected: &[ParcelFeatureRef],
) -> Result<RequestParams> {
    require_selection(FabricOperation::CopyLinesToParcelType, selected)?;
    Ok(RequestParams::new()
        .with("parentParcels", parcel_features(selected)?)
        .with("markParentAsHistoric", true)
        .with("useSourceLineAttributes", true)
        .with("useSourcePolygonAttributes", true)
        .with("targetParcelType", config.copy_lines_target_parcel_type)
        .with("targetParcelSubtype", config.copy_lines_target_parcel_subtype)
        .with("attributeOverrides", empty_attribute_overrides())
        .with("async", async_flag(config)))
}

/// Merge always creates a new parcel: `mergeInto` is the nil id and the target
/// parcel type is the first selected feature's layer.
pub fn merge_params(
    config: &FabricConfig,
    merged_name: &str,
    stated_area: f64,
    selected: &[ParcelFeatureRef],
    moment: i64,
) -> Result<RequestParams> {
    if merged_name.trim().is_empty() {
        return Err(FabricError::InvalidInput(
            "merged parcel name cannot be empty".to_string(),
        ));
    }
    if !stated_area.is_finite() {
        return Err(FabricError::InvalidInput(format!(
            "stated area must be finite, got {}",
            stated_area
        )));
    }
    let first = require_selection(FabricOperation::Merge, selected)?;

    Ok(RequestParams::new()
        .with("parentParcels", parcel_features(selected)?)
        .with("mergeInto", GlobalId::NIL)
        .with("moment", moment)
        .with("targetParcelType", first.layer_id)
        .with("defaultAreaUnit", config.default_area_unit)
        .with("attributeOverrides", merge_attribute_overrides(merged_name, stated_area)))
}

fn require_selection(
    operation: FabricOperation,
    selected: &[ParcelFeatureRef],
) -> Result<&ParcelFeatureRef> {
    selected.first().ok_or_else(|| {
        FabricError::InvalidInput(format!("{} requires at least one selected feature", operation))
    })
}

/// `serviceEdits` of a parcel fabric response that reported success.
pub fn interpret_operation(operation: FabricOperation, response: &Value) -> Result<Value> {
    if let Some(detail) = remote_error_detail(response) {
        return Err(FabricError::rejected(operation.endpoint(), detail));
    }

    match response.get("success").and_then(Value::as_bool) {
        Some(true) => Ok(response.get("serviceEdits").cloned().unwrap_or(Value::Null)),
        Some(false) => Err(FabricError::rejected(
            operation.endpoint(),
            "operation rejected",
        )),
        None => Err(FabricError::rejected(
            operation.endpoint(),
            "service did not report success",
        )),
    }
}

/// Message of an `{"error": {...}}` envelope, with its details appended.
pub fn remote_error_detail(response: &Value) -> Option<String> {
    let error = response.get("error")?;
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown service error");
    let code = error.get("code").and_then(Value::as_i64);
    let details: Vec<&str> = error
        .get("details")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut detail = match code {
        Some(code) => format!("{} (code {})", message, code),
        None => message.to_string(),
    };
    if !details.is_empty() {
        detail.push_str(": ");
        detail.push_str(&details.join("; "));
    }
    Some(detail)
}
