//! Bayut listing source (RapidAPI).
//!
//! Searches UAE property listings through the Bayut API hosted on
//! RapidAPI. Location inputs are free-text slugs resolved to Bayut
//! location external ids via the auto-complete endpoint.
//!
//! API: `https://bayut.p.rapidapi.com`
//! Auth: `x-rapidapi-key` / `x-rapidapi-host` headers.
//! Rate limit: plan-dependent (free tier is a few hundred calls/month).

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};

use super::normalize::normalize_batch;
use super::{ListingSource, SearchQuery};
use crate::types::ListingRecord;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const BASE_URL: &str = "https://bayut.p.rapidapi.com";
const RAPIDAPI_HOST: &str = "bayut.p.rapidapi.com";
const SOURCE_NAME: &str = "bayut";

/// Listings requested per page (API maximum is 25 on the free plan).
const HITS_PER_PAGE: u32 = 25;

// ---------------------------------------------------------------------------
// API response types (Bayut JSON → Rust)
// ---------------------------------------------------------------------------

/// Response from `/properties/list`. Hits are kept as raw JSON and
/// handed to the normalizer, which owns all field-level tolerance.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<serde_json::Value>,
    #[serde(default, rename = "nbPages")]
    nb_pages: u32,
}

/// Response from `/auto-complete`.
#[derive(Debug, Deserialize)]
struct AutocompleteResponse {
    #[serde(default)]
    hits: Vec<AutocompleteHit>,
}

#[derive(Debug, Deserialize)]
struct AutocompleteHit {
    #[serde(default, rename = "externalID")]
    external_id: Option<String>,
    #[serde(default)]
    name: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Bayut listing source client.
pub struct BayutClient {
    http: Client,
    api_key: SecretString,
}

impl BayutClient {
    pub fn new(api_key: SecretString) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .user_agent("OUVC/0.1.0")
            .build()
            .context("Failed to build HTTP client for Bayut")?;
        Ok(Self { http, api_key })
    }

    // -- Internal helpers ------------------------------------------------

    /// Whether a location string is already a Bayut external id.
    fn is_external_id(location: &str) -> bool {
        !location.is_empty() && location.chars().all(|c| c.is_ascii_digit())
    }

    /// Query parameters for one search page.
    fn build_params(query: &SearchQuery, location_id: &str, page: u32) -> Vec<(String, String)> {
        let mut params = vec![
            ("locationExternalIDs".to_string(), location_id.to_string()),
            ("purpose".to_string(), query.purpose.to_string()),
            ("hitsPerPage".to_string(), HITS_PER_PAGE.to_string()),
            ("page".to_string(), page.to_string()),
            ("lang".to_string(), "en".to_string()),
            ("sort".to_string(), "date-desc".to_string()),
        ];
        if let Some(p) = query.price_min {
            params.push(("priceMin".to_string(), format!("{}", p.round() as u64)));
        }
        if let Some(p) = query.price_max {
            params.push(("priceMax".to_string(), format!("{}", p.round() as u64)));
        }
        if let Some(a) = query.area_min {
            params.push(("areaMin".to_string(), format!("{}", a.round() as u64)));
        }
        if let Some(a) = query.area_max {
            params.push(("areaMax".to_string(), format!("{}", a.round() as u64)));
        }
        if let Some(r) = query.rooms {
            params.push(("roomsMin".to_string(), r.saturating_sub(1).to_string()));
            params.push(("roomsMax".to_string(), (r + 1).to_string()));
        }
        params
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T> {
        let url = format!("{BASE_URL}{path}");
        debug!(url = %url, "Bayut request");

        let resp = self
            .http
            .get(&url)
            .header("x-rapidapi-key", self.api_key.expose_secret())
            .header("x-rapidapi-host", RAPIDAPI_HOST)
            .query(params)
            .send()
            .await
            .context("Bayut API request failed")?;

        let status = resp.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            anyhow::bail!(
                "Bayut API access denied (403) — check the BAYUT_API_KEY subscription on RapidAPI"
            );
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Bayut API error {status}: {body}");
        }

        resp.json::<T>().await.context("Failed to parse Bayut response")
    }

    /// Resolve a location slug to a Bayut external id. Numeric inputs
    /// pass through unchanged.
    async fn resolve_location(&self, location: &str) -> Result<String> {
        if Self::is_external_id(location) {
            return Ok(location.to_string());
        }

        let term = location.replace('-', " ");
        let params = vec![("query".to_string(), urlencoding::encode(&term).into_owned())];
        let resp: AutocompleteResponse = self.get_json("/auto-complete", &params).await?;

        let hit = resp
            .hits
            .into_iter()
            .find(|h| h.external_id.is_some())
            .with_context(|| format!("No Bayut location found for '{location}'"))?;

        debug!(location, resolved = %hit.name, "Location resolved");
        hit.external_id
            .with_context(|| format!("Bayut location '{location}' has no external id"))
    }

    /// Fetch one search page.
    async fn fetch_page(
        &self,
        query: &SearchQuery,
        location_id: &str,
        page: u32,
    ) -> Result<SearchResponse> {
        let params = Self::build_params(query, location_id, page);
        self.get_json("/properties/list", &params).await
    }
}

#[async_trait]
impl ListingSource for BayutClient {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<ListingRecord>> {
        let location_id = self.resolve_location(&query.location).await?;

        // First page tells us how many pages exist.
        let first = self.fetch_page(query, &location_id, 0).await?;
        let pages = first.nb_pages.min(query.max_pages.max(1));

        let mut raw_hits = first.hits;

        // Remaining pages in parallel.
        if pages > 1 {
            let futures: Vec<_> = (1..pages)
                .map(|p| self.fetch_page(query, &location_id, p))
                .collect();
            for result in join_all(futures).await {
                match result {
                    Ok(resp) => raw_hits.extend(resp.hits),
                    Err(e) => warn!(error = %e, "Bayut page fetch failed, continuing with partial results"),
                }
            }
        }

        let (records, skipped) = normalize_batch(&raw_hits);
        if skipped > 0 {
            warn!(skipped, total = raw_hits.len(), "Skipped malformed Bayut hits");
        }
        debug!(count = records.len(), location = %location_id, "Bayut search complete");

        Ok(records)
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
