//! Package summaries → asset manifests

use std::collections::BTreeMap;

use serde_json::Value;

use govline_core::FetchError;

use crate::api::GovInfoClient;
use crate::state::AssetKind;

/// Link name (`pdfLink`, ...) → URL, from a summary's `download` object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetManifest {
    links: BTreeMap<String, String>,
    /// Full summary document, kept for the index export
    pub summary: Value,
}

impl AssetManifest {
    pub fn url_for(&self, kind: AssetKind) -> Option<&str> {
        self.links.get(kind.link_key()).map(String::as_str)
    }

    pub fn links(&self) -> &BTreeMap<String, String> {
        &self.links
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Build a manifest from a summary document.
///
/// The body must be an object; a missing `download` object gives an empty
/// manifest and non-string or blank links are dropped.
pub fn manifest_from_summary(summary: Value) -> Result<AssetManifest, FetchError> {
    if !summary.is_object() {
        return Err(FetchError::Decode("summary is not a JSON object".into()));
    }

    let links = summary
        .get("download")
        .and_then(Value::as_object)
        .map(|download| {
            download
                .iter()
                .filter_map(|(name, url)| {
                    let url = url.as_str()?.trim();
                    (!url.is_empty()).then(|| (name.clone(), url.to_string()))
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(AssetManifest { links, summary })
}

/// Fetch `/packages/{id}/summary` and extract its download links
pub fn enrich(client: &GovInfoClient<'_>, record_id: &str) -> Result<AssetManifest, FetchError> {
    let summary = client.get_json(&format!("/packages/{record_id}/summary"), &[])?;
    let manifest = manifest_from_summary(summary)?;
    if manifest.is_empty() {
        log::debug!("{record_id}: summary has no download links");
    }
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn links_from_download_object() {
        let manifest = manifest_from_summary(json!({
            "packageId": "BILLS-116hr34enr",
            "download": {
                "pdfLink": "https://api.govinfo.gov/packages/BILLS-116hr34enr/pdf",
                "xmlLink": "https://api.govinfo.gov/packages/BILLS-116hr34enr/xml",
                "htmLink": "https://api.govinfo.gov/packages/BILLS-116hr34enr/htm"
            }
        }))
        .unwrap();

        assert_eq!(manifest.links().len(), 3);
        assert_eq!(
            manifest.url_for(AssetKind::Pdf),
            Some("https://api.govinfo.gov/packages/BILLS-116hr34enr/pdf")
        );
        assert_eq!(manifest.url_for(AssetKind::Html), manifest.url_for(AssetKind::Htm));
        assert_eq!(manifest.url_for(AssetKind::Zip), None);
    }

    #[test]
    fn missing_download_is_empty() {
        let manifest = manifest_from_summary(json!({"packageId": "X-1"})).unwrap();
        assert!(manifest.is_empty());
        assert_eq!(manifest.summary["packageId"], "X-1");
    }

    #[test]
    fn non_string_links_ignored() {
        let manifest = manifest_from_summary(json!({
            "download": {"pdfLink": 5, "xmlLink": null, "txtLink": " ", "zipLink": "https://x/zip"}
        }))
        .unwrap();
        assert_eq!(manifest.links().keys().collect::<Vec<_>>(), vec!["zipLink"]);
    }

    #[test]
    fn non_object_summary_rejected() {
        let err = manifest_from_summary(json!(["not", "an", "object"])).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }
}
