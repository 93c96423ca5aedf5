//! Fleet selection: which categories are fetched and which regimes are shown

use std::collections::BTreeSet;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use super::{fetch_categories, ElementSetSource, FleetFetch, OrbitalElementRecord, Regime};

/// A refetch the caller must run, tagged with the generation it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub generation: u64,
    pub categories: Vec<String>,
}

/// Filter records by regime
pub fn filter_by_regime(
    records: &[OrbitalElementRecord],
    orbit_types: &BTreeSet<Regime>,
) -> Vec<OrbitalElementRecord> {
    records
        .iter()
        .filter(|r| orbit_types.contains(&r.regime()))
        .cloned()
        .collect()
}

/// Selection criteria plus the fetched and visible fleet.
///
/// Every category change starts a new generation; only the result for the
/// latest generation is ever applied.
pub struct FleetSelection {
    categories: BTreeSet<String>,
    orbit_types: BTreeSet<Regime>,
    all_fetched: Vec<OrbitalElementRecord>,
    visible: Vec<OrbitalElementRecord>,
    generation: u64,
    pending: Option<u64>,
    advisory: Option<String>,
}

impl FleetSelection {
    pub fn new(orbit_types: impl IntoIterator<Item = Regime>) -> Self {
        Self {
            categories: BTreeSet::new(),
            orbit_types: orbit_types.into_iter().collect(),
            all_fetched: Vec::new(),
            visible: Vec::new(),
            generation: 0,
            pending: None,
            advisory: None,
        }
    }

    /// Replace the category set. Returns the fetch to run, or `None` when the
    /// set is empty (the fleet is cleared immediately).
    pub fn set_categories<I, S>(&mut self, keys: I) -> Option<FetchRequest>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = keys.into_iter().map(Into::into).collect();
        self.generation += 1;

        if self.categories.is_empty() {
            self.pending = None;
            self.advisory = None;
            self.all_fetched.clear();
            self.refilter();
            return None;
        }

        self.pending = Some(self.generation);
        Some(FetchRequest {
            generation: self.generation,
            categories: self.categories.iter().cloned().collect(),
        })
    }

    /// Replace the orbit-type filter. Never triggers a fetch.
    pub fn set_orbit_types(&mut self, orbit_types: impl IntoIterator<Item = Regime>) {
        self.orbit_types = orbit_types.into_iter().collect();
        self.refilter();
    }

    /// Apply a completed fetch. Results from superseded generations are
    /// discarded and `false` is returned.
    pub fn apply_fetch(&mut self, generation: u64, fetch: FleetFetch) -> bool {
        if generation != self.generation {
            log::debug!(
                "Discarding stale fleet fetch (generation {}, current {})",
                generation,
                self.generation
            );
            return false;
        }

        self.pending = None;
        self.advisory = fetch.advisory;
        self.all_fetched = fetch.records;
        self.refilter();
        log::info!(
            "Fleet updated: {} fetched, {} visible",
            self.all_fetched.len(),
            self.visible.len()
        );
        true
    }

    fn refilter(&mut self) {
        self.visible = filter_by_regime(&self.all_fetched, &self.orbit_types);
    }

    pub fn visible(&self) -> &[OrbitalElementRecord] {
        &self.visible
    }

    pub fn all_fetched(&self) -> &[OrbitalElementRecord] {
        &self.all_fetched
    }

    pub fn categories(&self) -> &BTreeSet<String> {
        &self.categories
    }

    pub fn orbit_types(&self) -> &BTreeSet<Regime> {
        &self.orbit_types
    }

    pub fn advisory(&self) -> Option<&str> {
        self.advisory.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    #[cfg(test)]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Completed fetch posted back to the UI thread
#[derive(Debug)]
pub struct FleetUpdate {
    pub generation: u64,
    pub fetch: FleetFetch,
}

/// Runs fleet fetches on a tokio runtime and hands results back over a channel
pub struct FleetLoader<S: ElementSetSource> {
    source: Arc<S>,
    runtime: tokio::runtime::Handle,
    sender: Sender<FleetUpdate>,
    receiver: Receiver<FleetUpdate>,
}

impl<S: ElementSetSource> FleetLoader<S> {
    pub fn new(source: S, runtime: tokio::runtime::Handle) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            source: Arc::new(source),
            runtime,
            sender,
            receiver,
        }
    }

    /// Spawn the fetch for `request`. `notify` runs after the result is posted.
    pub fn request<F>(&self, request: FetchRequest, notify: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let source = Arc::clone(&self.source);
        let sender = self.sender.clone();
        self.runtime.spawn(async move {
            let fetch = fetch_categories(source.as_ref(), &request.categories).await;
            let update = FleetUpdate {
                generation: request.generation,
                fetch,
            };
            if sender.send(update).is_ok() {
                notify();
            }
        });
    }

    /// Apply every completed fetch to `selection`. Returns true if the
    /// visible fleet changed.
    pub fn drain(&self, selection: &mut FleetSelection) -> bool {
        let mut changed = false;
        while let Ok(update) = self.receiver.try_recv() {
            changed |= selection.apply_fetch(update.generation, update.fetch);
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::source::tests::{StubSource, GEO_RESPONSE, ISS_RESPONSE};
    use crate::data::{fallback_records, parse_element_sets};
    use std::time::Duration;

    fn mixed_records() -> Vec<OrbitalElementRecord> {
        let mut records = parse_element_sets(ISS_RESPONSE).records;
        records.extend(parse_element_sets(GEO_RESPONSE).records);
        records
    }

    fn fetched(records: Vec<OrbitalElementRecord>) -> FleetFetch {
        FleetFetch {
            records,
            advisory: None,
            used_fallback: false,
        }
    }

    #[test]
    fn test_orbit_type_filter() {
        let mut fleet = FleetSelection::new(Regime::ALL);
        let request = fleet.set_categories(["stations", "geo"]).unwrap();
        assert!(fleet.apply_fetch(request.generation, fetched(mixed_records())));
        assert_eq!(fleet.visible().len(), 2);

        fleet.set_orbit_types([Regime::Geo]);
        assert_eq!(fleet.visible().len(), 1);
        assert_eq!(fleet.visible()[0].regime(), Regime::Geo);
        assert_eq!(fleet.all_fetched().len(), 2);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let records = mixed_records();
        let types: BTreeSet<Regime> = [Regime::Leo, Regime::Other].into_iter().collect();
        let once = filter_by_regime(&records, &types);
        let twice = filter_by_regime(&once, &types);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_orbit_types_hides_everything() {
        let mut fleet = FleetSelection::new(Regime::ALL);
        let request = fleet.set_categories(["stations"]).unwrap();
        fleet.apply_fetch(request.generation, fetched(mixed_records()));
        let generation = fleet.generation();

        fleet.set_orbit_types([]);
        assert!(fleet.visible().is_empty());
        assert_eq!(fleet.all_fetched().len(), 2);
        // Refiltering does not start a new fetch generation
        assert_eq!(fleet.generation(), generation);
        assert!(!fleet.is_loading());
    }

    #[test]
    fn test_empty_categories_clear_without_request() {
        let mut fleet = FleetSelection::new(Regime::ALL);
        let request = fleet.set_categories(["stations"]).unwrap();
        fleet.apply_fetch(request.generation, fetched(mixed_records()));

        assert!(fleet.set_categories(Vec::<String>::new()).is_none());
        assert!(fleet.all_fetched().is_empty());
        assert!(fleet.visible().is_empty());
        assert!(!fleet.is_loading());
    }

    #[test]
    fn test_stale_generation_discarded() {
        let mut fleet = FleetSelection::new(Regime::ALL);
        let first = fleet.set_categories(["stations"]).unwrap();
        let second = fleet.set_categories(["geo"]).unwrap();
        assert!(second.generation > first.generation);

        // Newer request completes first, then the stale one arrives
        let geo = parse_element_sets(GEO_RESPONSE).records;
        assert!(fleet.apply_fetch(second.generation, fetched(geo)));
        assert!(!fleet.apply_fetch(first.generation, fetched(mixed_records())));

        assert_eq!(fleet.all_fetched().len(), 1);
        assert_eq!(fleet.all_fetched()[0].regime(), Regime::Geo);
    }

    #[test]
    fn test_result_after_clearing_categories_is_discarded() {
        let mut fleet = FleetSelection::new(Regime::ALL);
        let request = fleet.set_categories(["stations"]).unwrap();
        fleet.set_categories(Vec::<String>::new());
        assert!(!fleet.apply_fetch(request.generation, fetched(mixed_records())));
        assert!(fleet.visible().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_loader_transport_error_uses_fallback() {
        let loader = FleetLoader::new(StubSource::new(&[]), tokio::runtime::Handle::current());
        let mut fleet = FleetSelection::new(Regime::ALL);
        let request = fleet.set_categories(["starlink"]).unwrap();
        loader.request(request, || {});

        let mut applied = false;
        for _ in 0..200 {
            if loader.drain(&mut fleet) {
                applied = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(applied);
        assert_eq!(fleet.all_fetched(), fallback_records().as_slice());
        assert!(fleet.all_fetched().iter().all(|r| r.regime() == Regime::Leo));
        assert!(fleet.advisory().is_some());
        assert!(!fleet.is_loading());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_loader_stations_category() {
        let loader = FleetLoader::new(
            StubSource::new(&[("stations", ISS_RESPONSE)]),
            tokio::runtime::Handle::current(),
        );
        let mut fleet = FleetSelection::new(Regime::ALL);
        let request = fleet.set_categories(["stations"]).unwrap();
        loader.request(request, || {});

        for _ in 0..200 {
            if loader.drain(&mut fleet) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(fleet.visible().len(), 1);
        assert_eq!(fleet.visible()[0].regime(), Regime::Leo);
        assert!(fleet.advisory().is_none());
    }

    #[test]
    fn test_orbit_type_change_makes_no_fetch() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let source = StubSource::new(&[("stations", ISS_RESPONSE)]);
        let loader = FleetLoader::new(source, runtime.handle().clone());
        let mut fleet = FleetSelection::new(Regime::ALL);

        fleet.set_orbit_types([]);
        fleet.set_orbit_types([Regime::Leo]);
        runtime.block_on(async { tokio::task::yield_now().await });

        assert_eq!(loader.source.call_count(), 0);
        assert!(!loader.drain(&mut fleet));
        assert!(fleet.visible().is_empty());
    }
}
