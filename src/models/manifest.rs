use super::Deployment;
use crate::ApiError;

/// Encoding of a posted Deployment manifest, derived from `Content-Type`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Json,
    Yaml,
}

impl ManifestFormat {
    /// Accepts any content type mentioning `json` or `yaml`
    /// (`application/json; charset=utf-8`, `application/x-yaml`, `text/yaml`, ...).
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let ct = content_type.to_ascii_lowercase();
        if ct.contains("json") {
            Some(ManifestFormat::Json)
        } else if ct.contains("yaml") {
            Some(ManifestFormat::Yaml)
        } else {
            None
        }
    }
}

pub fn parse_deployment(
    body: &[u8],
    format: ManifestFormat,
) -> Result<Deployment, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::InvalidBody("request body is empty".to_string()));
    }

    let deployment: Deployment = match format {
        ManifestFormat::Json => serde_json::from_slice(body)
            .map_err(|e| ApiError::InvalidBody(format!("failed to parse JSON manifest: {e}")))?,
        ManifestFormat::Yaml => serde_yaml::from_slice(body)
            .map_err(|e| ApiError::InvalidBody(format!("failed to parse YAML manifest: {e}")))?,
    };

    if let Some(kind) = deployment.kind.as_deref() {
        if !kind.is_empty() && kind != "Deployment" {
            return Err(ApiError::InvalidBody(format!(
                "manifest kind must be Deployment, got {kind}"
            )));
        }
    }

    Ok(deployment)
}
