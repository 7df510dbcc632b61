use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder shown when a record carries no detection result.
pub const MISSING_RESULT: &str = "N/A";

/// Alt text used for evidence images without a detection result.
pub const DEFAULT_EVIDENCE_ALT: &str = "Violation";

/// One row of the violation/detection report.
///
/// Serializes with the backend's primary key set so a serialized report can be
/// fed back through decoding unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireDetectionRecord")]
pub struct DetectionRecord {
    #[serde(rename = "Frame")]
    pub frame: i64,
    #[serde(rename = "VehicleID")]
    pub vehicle_id: String,
    #[serde(rename = "Type")]
    pub detection_type: String,
    #[serde(rename = "Plate")]
    pub plate_or_result: Option<String>,
    /// Text recognised on the evidence image; only used as its alt text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_number: Option<String>,
    #[serde(rename = "plate_image")]
    pub crop_image_ref: Option<String>,
    #[serde(rename = "vehicle_image")]
    pub full_image_ref: Option<String>,
}

impl DetectionRecord {
    /// Result text for display, `"N/A"` when absent.
    pub fn display_result(&self) -> &str {
        self.plate_or_result.as_deref().unwrap_or(MISSING_RESULT)
    }

    /// Alt text for the evidence images, `"Violation"` when absent.
    pub fn evidence_alt(&self) -> &str {
        self.extracted_number.as_deref().unwrap_or(DEFAULT_EVIDENCE_ALT)
    }
}

/// Report rows as the backend sends them. Two generations of the backend use
/// different keys for the image fields; the first present, non-empty one wins.
///
/// Every field is taken as a raw JSON value so one off-type row cannot fail
/// the whole snapshot.
#[derive(Debug, Deserialize)]
struct WireDetectionRecord {
    #[serde(rename = "Frame", default)]
    frame: Option<Value>,
    #[serde(rename = "VehicleID", default)]
    vehicle_id: Option<Value>,
    #[serde(rename = "Type", default)]
    detection_type: Option<Value>,
    #[serde(rename = "Plate", default)]
    plate: Option<Value>,
    #[serde(default)]
    extracted_number: Option<Value>,
    #[serde(default)]
    plate_image: Option<Value>,
    #[serde(rename = "CropImgUrl", default)]
    crop_img_url: Option<Value>,
    #[serde(default)]
    vehicle_image: Option<Value>,
    #[serde(rename = "FullImgUrl", default)]
    full_img_url: Option<Value>,
}

/// Non-empty text from a string, number or bool. `null` and empty strings are absent.
fn text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Frame number from an integer, an integer-valued float or a numeric string.
fn frame_number(value: Option<Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        }),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0 && f.is_finite())
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

impl From<WireDetectionRecord> for DetectionRecord {
    fn from(wire: WireDetectionRecord) -> Self {
        Self {
            frame: frame_number(wire.frame).unwrap_or_default(),
            vehicle_id: text(wire.vehicle_id).unwrap_or_default(),
            detection_type: text(wire.detection_type).unwrap_or_default(),
            plate_or_result: text(wire.plate),
            extracted_number: text(wire.extracted_number),
            crop_image_ref: text(wire.plate_image).or_else(|| text(wire.crop_img_url)),
            full_image_ref: text(wire.vehicle_image).or_else(|| text(wire.full_img_url)),
        }
    }
}

/// Complete detection report for a job as of the last successful fetch.
///
/// Order is whatever the backend returned; frames are not guaranteed sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report(Vec<DetectionRecord>);

impl Report {
    pub fn new(records: Vec<DetectionRecord>) -> Self {
        Self(records)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn records(&self) -> &[DetectionRecord] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DetectionRecord> {
        self.0.iter()
    }
}

impl From<Vec<DetectionRecord>> for Report {
    fn from(records: Vec<DetectionRecord>) -> Self {
        Self(records)
    }
}

impl FromIterator<DetectionRecord> for Report {
    fn from_iter<T: IntoIterator<Item = DetectionRecord>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Report {
    type Item = &'a DetectionRecord;
    type IntoIter = std::slice::Iter<'a, DetectionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A report row ready for display, with evidence links resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub frame: i64,
    pub vehicle_id: String,
    pub class: String,
    pub result: String,
    pub crop_url: Option<String>,
    pub full_url: Option<String>,
    pub alt: String,
}
