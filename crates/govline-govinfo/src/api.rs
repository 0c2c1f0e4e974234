//! Thin GovInfo API client over a [`Transport`]

use govline_core::{FetchError, Transport};

use crate::config::ApiConfig;

/// Metadata calls (pages, summaries, collections) with the API key attached
#[derive(Clone, Copy)]
pub struct GovInfoClient<'a> {
    transport: &'a dyn Transport,
    api: &'a ApiConfig,
}

impl std::fmt::Debug for GovInfoClient<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GovInfoClient")
            .field("api", self.api)
            .finish_non_exhaustive()
    }
}

impl<'a> GovInfoClient<'a> {
    pub fn new(transport: &'a dyn Transport, api: &'a ApiConfig) -> Self {
        Self { transport, api }
    }

    pub fn api(&self) -> &'a ApiConfig {
        self.api
    }

    pub fn transport(&self) -> &'a dyn Transport {
        self.transport
    }

    /// GET `path` with `query` plus `api_key`, require 2xx and a JSON body
    pub fn get_json(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value, FetchError> {
        let url = self.api.url(path);
        let mut params: Vec<(&str, &str)> = query.to_vec();
        params.push(("api_key", self.api.api_key.as_str()));

        log::debug!("GET {url} {}", fmt_query(query));
        self.transport
            .get(&url, &params, self.api.timeout)?
            .error_for_status()?
            .json()
    }

    /// Extra query parameters needed to fetch `url` (the key, for our own host only)
    pub fn asset_query(&self, url: &str) -> Vec<(&'a str, &'a str)> {
        if self.api.owns(url) {
            vec![("api_key", self.api.api_key.as_str())]
        } else {
            Vec::new()
        }
    }
}

/// Caller's query for debug logs; the key is appended afterwards and never logged
fn fmt_query(query: &[(&str, &str)]) -> String {
    query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}
