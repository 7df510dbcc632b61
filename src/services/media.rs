use crate::models::report::{Report, ReportRow};

/// Turns media references from backend payloads into displayable URLs.
///
/// - absent or empty → `None`
/// - `http://` / `https://` (e.g. a pre-signed link) → unchanged
/// - anything else is backend-relative → `base_url + reference`
#[derive(Debug, Clone)]
pub struct MediaResolver {
    base_url: String,
}

impl MediaResolver {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn resolve(&self, reference: Option<&str>) -> Option<String> {
        let reference = reference.filter(|r| !r.is_empty())?;
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return Some(reference.to_string());
        }
        Some(format!("{}{}", self.base_url, reference))
    }

    /// Project a report into display rows with resolved evidence links.
    pub fn report_rows(&self, report: &Report) -> Vec<ReportRow> {
        report
            .iter()
            .map(|record| ReportRow {
                frame: record.frame,
                vehicle_id: record.vehicle_id.clone(),
                class: record.detection_type.clone(),
                result: record.display_result().to_string(),
                crop_url: self.resolve(record.crop_image_ref.as_deref()),
                full_url: self.resolve(record.full_image_ref.as_deref()),
                alt: record.evidence_alt().to_string(),
            })
            .collect()
    }
}
