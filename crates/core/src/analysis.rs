//! Analysis request and result types.

use crate::image_processing::CaptureImage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// What the analysis service said about a captured region.
///
/// Every field may be missing. The service fills unused fields with empty
/// strings; those are read as absent so a present field always has content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisResult {
    #[serde(deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub detected_text: Option<String>,
    #[serde(deserialize_with = "non_empty_list", skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_code: bool,
    /// Language label, e.g. "python".
    #[serde(deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub code_version: Option<String>,
    #[serde(deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub formatted_code: Option<String>,
    #[serde(deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl AnalysisResult {
    /// Detected objects in service order; empty when absent.
    pub fn objects(&self) -> &[String] {
        self.objects.as_deref().unwrap_or_default()
    }

    /// The code to show: the formatted version when the service produced one,
    /// otherwise the raw detected text.
    pub fn code(&self) -> Option<&str> {
        self.formatted_code.as_deref().or(self.detected_text.as_deref())
    }
}

fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

fn non_empty_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Vec<String>>::deserialize(deserializer)?;
    Ok(value.filter(|items| !items.is_empty()))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// One submission to the analysis service.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub image: CaptureImage,
    pub submitted_at: DateTime<Utc>,
}

impl AnalysisRequest {
    pub fn new(image: CaptureImage) -> Self {
        Self {
            image,
            submitted_at: Utc::now(),
        }
    }
}
