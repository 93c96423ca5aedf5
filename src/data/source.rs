//! Element-set source: CelesTrak GP text API with a built-in fallback set

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::join_all;

use super::{parse_element_sets, parse_single_element_set, OrbitalElementRecord};

/// Default CelesTrak general perturbations endpoint
pub const DEFAULT_BASE_URL: &str = "https://celestrak.org/NORAD/elements/gp.php";

/// Category served as a single fixed object rather than a group
pub const STATIONS_CATEGORY: &str = "stations";

/// Catalog number requested for the stations category (ISS)
pub const STATIONS_CATALOG_NUMBER: u32 = 25544;

/// Selectable element-set category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub key: &'static str,
    pub label: &'static str,
}

pub const CATEGORIES: [Category; 8] = [
    Category { key: STATIONS_CATEGORY, label: "Space Stations" },
    Category { key: "visual", label: "100 Brightest" },
    Category { key: "starlink", label: "Starlink" },
    Category { key: "gps-ops", label: "GPS" },
    Category { key: "galileo", label: "Galileo" },
    Category { key: "geo", label: "Geostationary" },
    Category { key: "weather", label: "Weather" },
    Category { key: "science", label: "Science" },
];

/// Label for a category key, falling back to the key itself
pub fn category_label(key: &str) -> &str {
    CATEGORIES
        .iter()
        .find(|c| c.key == key)
        .map(|c| c.label)
        .unwrap_or(key)
}

/// Label and key for messages, e.g. `Starlink [starlink]`
fn describe_category(key: &str) -> String {
    let label = category_label(key);
    if label == key {
        key.to_string()
    } else {
        format!("{} [{}]", label, key)
    }
}

/// Sample records used when no category yields any valid element set
const FALLBACK_ELEMENT_SETS: [(&str, &str, &str); 2] = [
    (
        "ISS (ZARYA)",
        "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927",
        "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537",
    ),
    (
        "DELTA 1 DEB",
        "1 06251U 62025E   06176.82412014  .00008885  00000-0  12808-3 0  3985",
        "2 06251  58.0579  54.0425 0030035 139.1568 221.1854 15.56387291  6774",
    ),
];

/// The fixed fallback sample set
pub fn fallback_records() -> Vec<OrbitalElementRecord> {
    FALLBACK_ELEMENT_SETS
        .iter()
        .filter_map(|(name, l1, l2)| OrbitalElementRecord::new(name, l1, l2).ok())
        .collect()
}

/// Result of fetching one category
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Records(Vec<OrbitalElementRecord>),
    Empty,
    TransportError(String),
}

impl FetchOutcome {
    fn from_records(records: Vec<OrbitalElementRecord>) -> Self {
        if records.is_empty() {
            FetchOutcome::Empty
        } else {
            FetchOutcome::Records(records)
        }
    }
}

/// Anything that can supply element sets for a category key
pub trait ElementSetSource: Send + Sync + 'static {
    fn fetch(&self, category: &str) -> impl Future<Output = FetchOutcome> + Send;
}

/// Fetches element sets over HTTP from a CelesTrak-compatible endpoint
pub struct CelestrakSource {
    client: reqwest::Client,
    base_url: String,
}

impl CelestrakSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("satwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Request URL for a category key
    pub fn request_url(&self, category: &str) -> String {
        if category == STATIONS_CATEGORY {
            format!("{}?CATNR={}&FORMAT=tle", self.base_url, STATIONS_CATALOG_NUMBER)
        } else {
            format!("{}?GROUP={}&FORMAT=tle", self.base_url, category)
        }
    }

    async fn fetch_text(&self, url: &str) -> std::result::Result<String, reqwest::Error> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl ElementSetSource for CelestrakSource {
    async fn fetch(&self, category: &str) -> FetchOutcome {
        let url = self.request_url(category);
        log::info!("Fetching element sets for '{}' from {}", category, url);

        let text = match self.fetch_text(&url).await {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Element set request for '{}' failed: {}", category, e);
                return FetchOutcome::TransportError(e.to_string());
            }
        };

        let outcome = parse_category_response(category, &text);
        match &outcome {
            FetchOutcome::Records(records) => {
                log::info!("Fetched {} element sets for '{}'", records.len(), category)
            }
            _ => log::warn!("No valid element sets in response for '{}'", category),
        }
        outcome
    }
}

/// Parse a response body according to the category's format
pub fn parse_category_response(category: &str, text: &str) -> FetchOutcome {
    if category == STATIONS_CATEGORY {
        FetchOutcome::from_records(parse_single_element_set(text).into_iter().collect())
    } else {
        let report = parse_element_sets(text);
        if report.rejected > 0 {
            log::debug!(
                "Dropped {} malformed element sets for '{}'",
                report.rejected,
                category
            );
        }
        FetchOutcome::from_records(report.records)
    }
}

/// Combined result of a multi-category fetch
#[derive(Debug, Clone, Default)]
pub struct FleetFetch {
    pub records: Vec<OrbitalElementRecord>,
    /// Non-fatal message for the user when some or all categories failed
    pub advisory: Option<String>,
    pub used_fallback: bool,
}

/// Merge per-category outcomes.
///
/// Successful categories are concatenated in request order. If no category
/// produced a record, the fallback sample set is used.
pub fn resolve_outcomes(outcomes: Vec<(String, FetchOutcome)>) -> FleetFetch {
    let mut records = Vec::new();
    let mut failed: Vec<String> = Vec::new();
    let mut empty: Vec<String> = Vec::new();

    for (category, outcome) in outcomes {
        match outcome {
            FetchOutcome::Records(mut found) => records.append(&mut found),
            FetchOutcome::Empty => empty.push(describe_category(&category)),
            FetchOutcome::TransportError(e) => {
                failed.push(format!("{} ({})", describe_category(&category), e))
            }
        }
    }

    if records.is_empty() {
        log::warn!("No element sets available, using fallback sample set");
        let reason = if failed.is_empty() {
            "no valid element sets were returned".to_string()
        } else {
            format!("request failed: {}", failed.join(", "))
        };
        return FleetFetch {
            records: fallback_records(),
            advisory: Some(format!("Showing sample satellites: {}", reason)),
            used_fallback: true,
        };
    }

    let mut problems = failed;
    problems.extend(empty.into_iter().map(|c| format!("{} (empty)", c)));
    let advisory = if problems.is_empty() {
        None
    } else {
        Some(format!("Some categories unavailable: {}", problems.join(", ")))
    };

    FleetFetch {
        records,
        advisory,
        used_fallback: false,
    }
}

/// Fetch every category concurrently and merge once all have completed
pub async fn fetch_categories<S: ElementSetSource>(source: &S, categories: &[String]) -> FleetFetch {
    let requests = categories.iter().map(|category| async move {
        let outcome = source.fetch(category).await;
        (category.clone(), outcome)
    });
    resolve_outcomes(join_all(requests).await)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::Regime;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) const ISS_RESPONSE: &str = "ISS (ZARYA)\n\
        1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927\n\
        2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537\n";

    pub(crate) const GEO_RESPONSE: &str = "XM-3\n\
        1 28626U 05008A   06176.46683397 -.00000205  00000-0  10000-3 0  2190\n\
        2 28626   0.0019 286.9433 0000335  13.7918  55.6504  1.00270176  4891\n";

    /// Canned responses keyed by category; unknown keys fail with a transport error
    pub(crate) struct StubSource {
        pub responses: HashMap<String, String>,
        pub calls: AtomicUsize,
    }

    impl StubSource {
        pub fn new(responses: &[(&str, &str)]) -> Self {
            Self {
                responses: responses
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ElementSetSource for StubSource {
        async fn fetch(&self, category: &str) -> FetchOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.responses.get(category) {
                Some(text) => parse_category_response(category, text),
                None => FetchOutcome::TransportError("connection refused".to_string()),
            }
        }
    }

    #[test]
    fn test_fallback_set() {
        let records = fallback_records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.regime() == Regime::Leo));
    }

    #[test]
    fn test_stations_response_yields_one_record() {
        let outcome = parse_category_response(STATIONS_CATEGORY, ISS_RESPONSE);
        let FetchOutcome::Records(records) = outcome else {
            panic!("expected records");
        };
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name(), "ISS (ZARYA)");
        assert_eq!(records[0].regime(), Regime::Leo);
    }

    #[test]
    fn test_request_urls() {
        let source = CelestrakSource::new(DEFAULT_BASE_URL, Duration::from_secs(5)).unwrap();
        assert_eq!(
            source.request_url("stations"),
            "https://celestrak.org/NORAD/elements/gp.php?CATNR=25544&FORMAT=tle"
        );
        assert_eq!(
            source.request_url("gps-ops"),
            "https://celestrak.org/NORAD/elements/gp.php?GROUP=gps-ops&FORMAT=tle"
        );
    }

    #[test]
    fn test_transport_error_maps_to_fallback() {
        let fetch = resolve_outcomes(vec![(
            "starlink".to_string(),
            FetchOutcome::TransportError("timed out".to_string()),
        )]);
        assert!(fetch.used_fallback);
        assert_eq!(fetch.records.len(), 2);
        assert!(fetch.advisory.unwrap().contains("timed out"));
    }

    #[test]
    fn test_empty_maps_to_fallback() {
        let fetch = resolve_outcomes(vec![("geo".to_string(), FetchOutcome::Empty)]);
        assert!(fetch.used_fallback);
        assert_eq!(fetch.records, fallback_records());
        assert!(fetch.advisory.is_some());
    }

    #[test]
    fn test_partial_failure_keeps_successful_categories() {
        let records = match parse_category_response("geo", GEO_RESPONSE) {
            FetchOutcome::Records(r) => r,
            other => panic!("unexpected outcome: {:?}", other),
        };
        let fetch = resolve_outcomes(vec![
            ("starlink".to_string(), FetchOutcome::TransportError("HTTP 503".to_string())),
            ("geo".to_string(), FetchOutcome::Records(records)),
        ]);
        assert!(!fetch.used_fallback);
        assert_eq!(fetch.records.len(), 1);
        assert_eq!(fetch.records[0].regime(), Regime::Geo);
        let advisory = fetch.advisory.unwrap();
        assert!(advisory.contains("Starlink [starlink]"), "{}", advisory);
        assert!(advisory.contains("HTTP 503"));
    }

    #[test]
    fn test_advisory_names_unknown_and_empty_categories() {
        let records = fallback_records();
        let fetch = resolve_outcomes(vec![
            ("my-group".to_string(), FetchOutcome::TransportError("timed out".to_string())),
            ("geo".to_string(), FetchOutcome::Empty),
            ("stations".to_string(), FetchOutcome::Records(records)),
        ]);
        let advisory = fetch.advisory.unwrap();
        assert!(advisory.contains("my-group (timed out)"), "{}", advisory);
        assert!(advisory.contains("Geostationary [geo] (empty)"), "{}", advisory);
    }

    #[tokio::test]
    async fn test_fetch_categories_concatenates_in_order() {
        let source = StubSource::new(&[("stations", ISS_RESPONSE), ("geo", GEO_RESPONSE)]);
        let keys = vec!["geo".to_string(), "stations".to_string()];

        let fetch = fetch_categories(&source, &keys).await;
        assert_eq!(source.call_count(), 2);
        assert!(fetch.advisory.is_none());
        let names: Vec<&str> = fetch.records.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["XM-3", "ISS (ZARYA)"]);
    }
}
