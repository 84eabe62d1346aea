use crate::core::{FabricError, Result};
use crate::version::SessionMode;
use serde::{Deserialize, Serialize};

/// How a record name that matches several records is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordMatchPolicy {
    /// Take the first match the service returns.
    #[default]
    FirstMatch,
    /// Fail with `AmbiguousRecord` when more than one record matches.
    RejectAmbiguous,
}

/// Spatial reference block attached to the records layer geometry stub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatialReference {
    pub wkid: u32,
    pub latest_wkid: u32,
    pub xy_tolerance: f64,
    pub z_tolerance: f64,
    pub m_tolerance: f64,
    #[serde(rename = "falseX")]
    pub false_x: f64,
    #[serde(rename = "falseY")]
    pub false_y: f64,
    pub xy_units: f64,
    #[serde(rename = "falseZ")]
    pub false_z: f64,
    pub z_units: f64,
    #[serde(rename = "falseM")]
    pub false_m: f64,
    pub m_units: f64,
}

impl SpatialReference {
    /// NAD83(HARN) / Washington North (ftUS) with the dataset's resolution settings.
    pub fn wkid_2926() -> Self {
        Self {
            wkid: 2926,
            latest_wkid: 2926,
            xy_tolerance: 0.0032808333333333331,
            z_tolerance: 0.001,
            m_tolerance: 0.001,
            false_x: -117104300.0,
            false_y: -99539600.0,
            xy_units: 3048.0060960121928,
            false_z: -100000.0,
            z_units: 10000.0,
            false_m: -100000.0,
            m_units: 10000.0,
        }
    }
}

impl Default for SpatialReference {
    fn default() -> Self {
        Self::wkid_2926()
    }
}

/// Parcel fabric service configuration
///
/// `base_url` points at the service root, e.g.
/// `https://host/server/rest/services/Parcels/`; the feature service and the
/// parcel fabric service hang off it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FabricConfig {
    /// Service root, always ending in `/`
    pub base_url: String,

    /// Layer id of the records layer in the feature service
    pub records_layer_id: u32,

    /// Spatial reference sent with the records geometry stub
    pub spatial_reference: SpatialReference,

    /// Kind of edit session opened around each mutation
    pub session_mode: SessionMode,

    /// Handling of duplicate record names
    pub record_match: RecordMatchPolicy,

    /// Attribute assignFeaturesToRecord writes the record id into
    pub write_attribute: String,

    /// Parcel type copyLinesToParcelType targets
    pub copy_lines_target_parcel_type: i32,

    /// Parcel subtype copyLinesToParcelType targets
    pub copy_lines_target_parcel_subtype: i32,

    /// Area unit code merge uses when a stated area carries no unit
    pub default_area_unit: u32,

    /// Run fabric operations synchronously (`async=false`)
    pub synchronous: bool,
}

impl FabricConfig {
    /// Create a configuration for the service rooted at `base_url`
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            ..Self::default()
        }
    }

    /// Load a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: Self =
            serde_json::from_str(json).map_err(|e| FabricError::Config(e.to_string()))?;
        config.base_url = normalize_base_url(&config.base_url);
        config.validate()?;
        Ok(config)
    }

    /// Set the records layer id
    pub fn records_layer_id(mut self, layer_id: u32) -> Self {
        self.records_layer_id = layer_id;
        self
    }

    /// Set the spatial reference
    pub fn spatial_reference(mut self, spatial_reference: SpatialReference) -> Self {
        self.spatial_reference = spatial_reference;
        self
    }

    /// Set the edit session mode
    pub fn session_mode(mut self, mode: SessionMode) -> Self {
        self.session_mode = mode;
        self
    }

    /// Set the duplicate record name policy
    pub fn record_match(mut self, policy: RecordMatchPolicy) -> Self {
        self.record_match = policy;
        self
    }

    /// Set the record attribute written by assignFeaturesToRecord
    pub fn write_attribute(mut self, attribute: &str) -> Self {
        self.write_attribute = attribute.to_string();
        self
    }

    /// Set the copyLinesToParcelType target type and subtype
    pub fn copy_lines_target(mut self, parcel_type: i32, subtype: i32) -> Self {
        self.copy_lines_target_parcel_type = parcel_type;
        self.copy_lines_target_parcel_subtype = subtype;
        self
    }

    /// Set the merge default area unit
    pub fn default_area_unit(mut self, unit: u32) -> Self {
        self.default_area_unit = unit;
        self
    }

    /// Run fabric operations synchronously or not
    pub fn synchronous(mut self, synchronous: bool) -> Self {
        self.synchronous = synchronous;
        self
    }

    pub fn feature_service_url(&self) -> String {
        format!("{}FeatureServer", self.base_url)
    }

    pub fn records_layer_url(&self) -> String {
        format!("{}/{}", self.feature_service_url(), self.records_layer_id)
    }

    pub fn apply_edits_url(&self) -> String {
        format!("{}/applyEdits", self.feature_service_url())
    }

    pub fn parcel_fabric_url(&self) -> String {
        format!("{}ParcelFabricServer", self.base_url)
    }

    pub fn operation_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.parcel_fabric_url(), endpoint)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim_end_matches('/').is_empty() {
            return Err(FabricError::Config("base_url cannot be empty".to_string()));
        }

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(FabricError::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }

        if self.write_attribute.trim().is_empty() {
            return Err(FabricError::Config(
                "write_attribute cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            records_layer_id: 1,
            spatial_reference: SpatialReference::default(),
            session_mode: SessionMode::Reading,
            record_match: RecordMatchPolicy::FirstMatch,
            write_attribute: "CreatedByRecord".to_string(),
            copy_lines_target_parcel_type: 15,
            copy_lines_target_parcel_subtype: -1000,
            default_area_unit: 109405,
            synchronous: true,
        }
    }
}

fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.is_empty() || trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    }
}
