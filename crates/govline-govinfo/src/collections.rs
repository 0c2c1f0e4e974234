//! Collections service listing

use serde::Deserialize;
use serde_json::Value;

use govline_core::FetchError;

use crate::api::GovInfoClient;

/// One entry of `/collections`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionInfo {
    #[serde(rename = "collectionCode", default)]
    pub code: String,
    #[serde(rename = "collectionName", default)]
    pub name: String,
    #[serde(default)]
    pub package_count: Option<u64>,
    #[serde(default)]
    pub granule_count: Option<u64>,
}

/// Parse a `/collections` body; entries without a code are dropped
pub fn parse_collections(body: &Value) -> Result<Vec<CollectionInfo>, FetchError> {
    let entries = body
        .get("collections")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::Decode("response has no 'collections' array".into()))?;

    let mut collections = Vec::with_capacity(entries.len());
    for entry in entries {
        match CollectionInfo::deserialize(entry) {
            Ok(info) if !info.code.trim().is_empty() => collections.push(info),
            Ok(_) => log::debug!("Skipping collection without code: {entry}"),
            Err(e) => log::debug!("Skipping malformed collection entry ({e}): {entry}"),
        }
    }
    collections.sort_by(|a, b| a.code.cmp(&b.code));
    Ok(collections)
}

pub fn list_collections(client: &GovInfoClient<'_>) -> Result<Vec<CollectionInfo>, FetchError> {
    let body = client.get_json("/collections", &[])?;
    parse_collections(&body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_and_sorts() {
        let body = json!({"collections": [
            {"collectionCode": "CREC", "collectionName": "Congressional Record", "packageCount": 100, "granuleCount": 5000},
            {"collectionCode": "BILLS", "collectionName": "Congressional Bills", "packageCount": 250000, "granuleCount": null},
        ]});
        let collections = parse_collections(&body).unwrap();
        assert_eq!(collections.len(), 2);
        assert_eq!(collections[0].code, "BILLS");
        assert_eq!(collections[0].package_count, Some(250000));
        assert_eq!(collections[0].granule_count, None);
        assert_eq!(collections[1].name, "Congressional Record");
    }

    #[test]
    fn drops_entries_without_code() {
        let body = json!({"collections": [
            {"collectionName": "Nameless"},
            {"collectionCode": " ", "collectionName": "Blank"},
            {"collectionCode": "FR", "packageCount": "many"},
            {"collectionCode": "USCODE"},
        ]});
        let codes: Vec<_> = parse_collections(&body)
            .unwrap()
            .into_iter()
            .map(|c| c.code)
            .collect();
        assert_eq!(codes, vec!["USCODE"]);
    }

    #[test]
    fn missing_array_is_decode_error() {
        assert!(matches!(
            parse_collections(&json!({"message": "API_KEY_INVALID"})),
            Err(FetchError::Decode(_))
        ));
    }
}
