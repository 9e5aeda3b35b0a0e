//! Client-side list of tracked locations.
//!
//! The store owns the fetched records, the loading/error state and the unit
//! preference. Operations never return errors: failures land in [`LocationStore::error`]
//! for the caller to show and later clear.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    error::WeatherError,
    model::{TemperatureUnit, WeatherRecord},
    provider::WeatherProvider,
    storage::{KeyValueStore, LOCATIONS_KEY, UNIT_KEY},
};

#[derive(Debug)]
pub struct LocationStore {
    provider: Box<dyn WeatherProvider>,
    storage: Arc<dyn KeyValueStore>,
    records: Vec<WeatherRecord>,
    loading: bool,
    error: Option<String>,
    unit: TemperatureUnit,
}

impl LocationStore {
    pub fn new(provider: Box<dyn WeatherProvider>, storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            provider,
            storage,
            records: Vec::new(),
            loading: false,
            error: None,
            unit: TemperatureUnit::default(),
        }
    }

    /// Records in the order they were added.
    pub fn records(&self) -> &[WeatherRecord] {
        &self.records
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Last user-facing error message, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn temperature_unit(&self) -> TemperatureUnit {
        self.unit
    }

    pub fn temperature_symbol(&self) -> &'static str {
        self.unit.symbol()
    }

    /// Reload persisted locations and unit preference.
    ///
    /// Locations that fail to fetch are dropped silently; this never fails.
    pub async fn initialize(&mut self) {
        for name in self.load_saved_locations() {
            if let Err(err) = self.try_add_location(&name).await {
                warn!(location = %name, error = %err, "skipping saved location");
            }
        }

        self.restore_preferences();
        info!(locations = self.records.len(), unit = %self.unit, "location store initialized");
    }

    /// Reload only the persisted unit preference. No fetches are made.
    pub fn restore_preferences(&mut self) {
        self.unit = self.load_unit();
    }

    /// Fetch `name` and append it. Returns `false` and sets the error message on failure.
    pub async fn add_location(&mut self, name: &str) -> bool {
        match self.try_add_location(name).await {
            Ok(()) => true,
            Err(err) => {
                self.error = Some(err.to_string());
                false
            }
        }
    }

    async fn try_add_location(&mut self, name: &str) -> Result<(), WeatherError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WeatherError::EmptyInput);
        }

        self.loading = true;
        self.error = None;
        let fetched = self.provider.fetch_by_location_name(name).await;
        self.loading = false;

        let record = fetched?;
        if self.records.iter().any(|existing| existing.id == record.id) {
            debug!(id = %record.id, location = %record.location, "location already tracked");
            return Err(WeatherError::DuplicateLocation);
        }

        self.records.push(record);
        self.save_locations();
        Ok(())
    }

    /// Drop the record with `id`; unknown ids are ignored.
    pub fn remove_location(&mut self, id: &str) {
        self.records.retain(|record| record.id != id);
        self.save_locations();
    }

    /// Re-fetch every tracked location concurrently.
    ///
    /// The list is emptied up front; only locations that fetch successfully come back.
    pub async fn refresh_all_weather(&mut self) {
        let names: Vec<String> = self.records.iter().map(|r| r.location.clone()).collect();
        self.records.clear();

        let provider = &self.provider;
        let fetches = names.iter().map(|name| provider.fetch_by_location_name(name));
        let results = join_all(fetches).await;

        for (name, result) in names.iter().zip(results) {
            match result {
                Ok(record) => self.records.push(record),
                Err(err) => {
                    warn!(location = %name, error = %err, "refresh failed, dropping location")
                }
            }
        }

        self.save_locations();
    }

    pub fn toggle_temperature_unit(&mut self) {
        self.unit = self.unit.toggled();
        if let Err(err) = self.storage.set(UNIT_KEY, self.unit.as_str()) {
            warn!(error = %err, "failed to save temperature unit");
        }
    }

    /// Convert a stored Celsius value into the current display unit.
    pub fn convert_temperature(&self, celsius: i32) -> i32 {
        self.unit.convert(celsius)
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    fn save_locations(&self) {
        let names: Vec<&str> = self.records.iter().map(|r| r.location.as_str()).collect();

        let result = serde_json::to_string(&names)
            .map_err(anyhow::Error::from)
            .and_then(|json| self.storage.set(LOCATIONS_KEY, &json));

        if let Err(err) = result {
            warn!(error = %err, "failed to save locations");
        }
    }

    fn load_saved_locations(&self) -> Vec<String> {
        let raw = match self.storage.get(LOCATIONS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(error = %err, "failed to load locations from storage");
                return Vec::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!(error = %err, "ignoring malformed saved locations");
            Vec::new()
        })
    }

    fn load_unit(&self) -> TemperatureUnit {
        match self.storage.get(UNIT_KEY) {
            Ok(Some(raw)) => TemperatureUnit::try_from(raw.as_str()).unwrap_or_else(|err| {
                debug!(error = %err, "ignoring saved temperature unit");
                TemperatureUnit::default()
            }),
            Ok(None) => TemperatureUnit::default(),
            Err(err) => {
                warn!(error = %err, "failed to load temperature unit");
                TemperatureUnit::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    /// Canned responses keyed by location name; unknown names are `NotFound`.
    #[derive(Debug, Clone, Default)]
    struct StubProvider {
        responses: Arc<Mutex<HashMap<String, Result<WeatherRecord, WeatherError>>>>,
        calls: Arc<AtomicUsize>,
        delay: Option<Duration>,
    }

    impl StubProvider {
        fn with(self, name: &str, id: &str) -> Self {
            self.respond(name, Ok(record(name, id)));
            self
        }

        fn respond(&self, name: &str, response: Result<WeatherRecord, WeatherError>) {
            self.responses.lock().insert(name.to_string(), response);
        }

        fn delayed(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WeatherProvider for StubProvider {
        async fn fetch_by_location_name(&self, name: &str) -> Result<WeatherRecord, WeatherError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.responses.lock().get(name).cloned().unwrap_or(Err(WeatherError::NotFound))
        }
    }

    fn record(name: &str, id: &str) -> WeatherRecord {
        WeatherRecord {
            id: id.to_string(),
            location: name.to_string(),
            temperature: 20,
            feels_like: 19,
            description: "clear sky".into(),
            icon: "01d".into(),
            humidity: 40,
            wind_speed: 11,
            country: "GB".into(),
            timestamp: 0,
        }
    }

    fn store_with(provider: &StubProvider, storage: &MemoryStore) -> LocationStore {
        LocationStore::new(Box::new(provider.clone()), Arc::new(storage.clone()))
    }

    fn saved_names(storage: &MemoryStore) -> Vec<String> {
        let raw = storage.get(LOCATIONS_KEY).unwrap().expect("locations saved");
        serde_json::from_str(&raw).unwrap()
    }

    #[tokio::test]
    async fn add_location_appends_and_persists() {
        let provider = StubProvider::default().with("London", "1");
        let storage = MemoryStore::new();
        let mut store = store_with(&provider, &storage);

        assert!(store.add_location("London").await);

        assert_eq!(store.records().len(), 1);
        assert_eq!(store.records()[0].id, "1");
        assert_eq!(saved_names(&storage), vec!["London"]);
        assert!(!store.is_loading());
        assert_eq!(store.error(), None);
    }

    #[tokio::test]
    async fn add_location_trims_input() {
        let provider = StubProvider::default().with("Paris", "2");
        let mut store = store_with(&provider, &MemoryStore::new());

        assert!(store.add_location("  Paris \t").await);
        assert_eq!(store.records()[0].location, "Paris");
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let provider = StubProvider::default().with("London", "1");
        provider.respond("london", Ok(record("London", "1")));
        let mut store = store_with(&provider, &MemoryStore::new());

        assert!(store.add_location("London").await);
        assert!(!store.add_location("london").await);

        assert_eq!(store.records().len(), 1);
        assert_eq!(store.error(), Some("This location is already added"));
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn blank_input_never_reaches_provider() {
        let provider = StubProvider::default();
        let mut store = store_with(&provider, &MemoryStore::new());

        assert!(!store.add_location("").await);
        assert!(!store.add_location("   ").await);

        assert_eq!(provider.calls(), 0);
        assert_eq!(store.error(), Some("Please enter a valid location"));
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_sets_error() {
        let provider = StubProvider::default();
        provider.respond("Nowhere", Err(WeatherError::NotFound));
        let mut store = store_with(&provider, &MemoryStore::new());

        assert!(!store.add_location("Nowhere").await);

        assert!(store.records().is_empty());
        assert_eq!(store.error(), Some(WeatherError::NotFound.to_string().as_str()));
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn successful_add_clears_previous_error() {
        let provider = StubProvider::default().with("Oslo", "3");
        let mut store = store_with(&provider, &MemoryStore::new());

        assert!(!store.add_location(" ").await);
        assert!(store.error().is_some());

        assert!(store.add_location("Oslo").await);
        assert_eq!(store.error(), None);
    }

    #[tokio::test]
    async fn remove_location_by_id() {
        let provider = StubProvider::default().with("London", "1").with("Paris", "2");
        let storage = MemoryStore::new();
        let mut store = store_with(&provider, &storage);
        store.add_location("London").await;
        store.add_location("Paris").await;

        store.remove_location("missing");
        assert_eq!(store.records().len(), 2);

        store.remove_location("1");
        assert_eq!(store.records().len(), 1);
        assert_eq!(store.records()[0].id, "2");
        assert_eq!(saved_names(&storage), vec!["Paris"]);
    }

    #[tokio::test]
    async fn refresh_drops_locations_that_fail() {
        let provider = StubProvider::default()
            .with("London", "1")
            .with("Paris", "2")
            .with("Berlin", "3");
        let storage = MemoryStore::new();
        let mut store = store_with(&provider, &storage);
        for name in ["London", "Paris", "Berlin"] {
            assert!(store.add_location(name).await);
        }

        provider.respond("Paris", Err(WeatherError::NetworkError));
        store.refresh_all_weather().await;

        let ids: Vec<&str> = store.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(saved_names(&storage), vec!["London", "Berlin"]);
        assert_eq!(store.error(), None);
    }

    #[tokio::test]
    async fn refresh_fetches_by_name() {
        let provider = StubProvider::default().with("London", "1");
        let mut store = store_with(&provider, &MemoryStore::new());
        store.add_location("London").await;

        let mut updated = record("London", "1");
        updated.temperature = 5;
        provider.respond("London", Ok(updated));
        store.refresh_all_weather().await;

        assert_eq!(provider.calls(), 2);
        assert_eq!(store.records().len(), 1);
        assert_eq!(store.records()[0].temperature, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_fetches_concurrently() {
        let names = ["London", "Paris", "Berlin", "Oslo", "Rome"];
        let provider = names
            .iter()
            .enumerate()
            .fold(StubProvider::default(), |p, (i, name)| p.with(name, &i.to_string()));
        let mut store = store_with(&provider, &MemoryStore::new());
        for name in names {
            assert!(store.add_location(name).await);
        }

        let provider = provider.delayed(Duration::from_millis(200));
        store.provider = Box::new(provider);

        let started = tokio::time::Instant::now();
        store.refresh_all_weather().await;
        let elapsed = started.elapsed();

        assert_eq!(store.records().len(), names.len());
        assert!(
            elapsed < Duration::from_millis(400),
            "fetches should overlap, took {elapsed:?}"
        );
    }

    #[test]
    fn restore_preferences_reads_unit_without_fetching() {
        let provider = StubProvider::default().with("London", "1");
        let storage = MemoryStore::new();
        storage.set(LOCATIONS_KEY, r#"["London"]"#).unwrap();
        storage.set(UNIT_KEY, "fahrenheit").unwrap();

        let mut store = store_with(&provider, &storage);
        store.restore_preferences();

        assert_eq!(store.temperature_unit(), TemperatureUnit::Fahrenheit);
        assert!(store.records().is_empty());
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn convert_temperature_follows_unit() {
        let mut store = store_with(&StubProvider::default(), &MemoryStore::new());

        assert_eq!(store.convert_temperature(0), 0);
        assert_eq!(store.temperature_symbol(), "°C");

        store.toggle_temperature_unit();
        assert_eq!(store.convert_temperature(0), 32);
        assert_eq!(store.convert_temperature(100), 212);
        assert_eq!(store.temperature_symbol(), "°F");
    }

    #[tokio::test]
    async fn toggled_unit_survives_reinitialize() {
        let provider = StubProvider::default();
        let storage = MemoryStore::new();

        let mut store = store_with(&provider, &storage);
        store.initialize().await;
        store.toggle_temperature_unit();
        assert_eq!(store.temperature_unit(), TemperatureUnit::Fahrenheit);

        let mut fresh = store_with(&provider, &storage);
        fresh.initialize().await;
        assert_eq!(fresh.temperature_unit(), TemperatureUnit::Fahrenheit);
    }

    #[tokio::test]
    async fn initialize_restores_locations_and_skips_failures() {
        let provider = StubProvider::default().with("London", "1").with("Berlin", "3");
        let storage = MemoryStore::new();
        storage.set(LOCATIONS_KEY, r#"["London","Atlantis","Berlin"]"#).unwrap();

        let mut store = store_with(&provider, &storage);
        store.initialize().await;

        let names: Vec<&str> = store.records().iter().map(|r| r.location.as_str()).collect();
        assert_eq!(names, vec!["London", "Berlin"]);
        assert_eq!(store.error(), None);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn initialize_ignores_malformed_state() {
        let provider = StubProvider::default();
        let storage = MemoryStore::new();
        storage.set(LOCATIONS_KEY, "not json").unwrap();
        storage.set(UNIT_KEY, "kelvin").unwrap();

        let mut store = store_with(&provider, &storage);
        store.initialize().await;

        assert!(store.records().is_empty());
        assert_eq!(store.temperature_unit(), TemperatureUnit::Celsius);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn clear_error_resets_message() {
        let mut store = store_with(&StubProvider::default(), &MemoryStore::new());
        store.add_location("").await;
        assert!(store.error().is_some());

        store.clear_error();
        assert_eq!(store.error(), None);
    }
}
