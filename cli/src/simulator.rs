// Simulated location backends
//
// Both backends run the same random walk on a tokio task; they differ only in
// the provider name stamped on each fix. Removing updates aborts the task.

use crate::config::SimulatorConfig;
use background_locator_core::platform::PlatformError;
use background_locator_core::{
    LocationAccuracy, LocationBackends, LocationClient, LocationFix, LocationProvider,
    LocationRequest, LocationUpdateListener,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

const METERS_PER_DEGREE: f64 = 111_320.0;

/// Reported horizontal accuracy in meters for each requested level
fn accuracy_meters(accuracy: LocationAccuracy) -> f64 {
    match accuracy {
        LocationAccuracy::Powersave => 1000.0,
        LocationAccuracy::Low => 500.0,
        LocationAccuracy::Balanced => 100.0,
        LocationAccuracy::High => 10.0,
        LocationAccuracy::Navigation => 5.0,
    }
}

// ============================================================================
// RANDOM WALK
// ============================================================================

pub struct RandomWalk {
    latitude: f64,
    longitude: f64,
    max_step_meters: f64,
    /// Distance covered since the last emitted fix
    pending_meters: f64,
    rng: StdRng,
}

/// One step of the walk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub latitude: f64,
    pub longitude: f64,
    pub meters: f64,
    pub heading: f64,
}

impl RandomWalk {
    pub fn new(config: &SimulatorConfig, rng: StdRng) -> Self {
        Self {
            latitude: config.origin_latitude,
            longitude: config.origin_longitude,
            max_step_meters: config.max_step_meters.max(0.0),
            pending_meters: 0.0,
            rng,
        }
    }

    /// Advance; returns the new position once at least `distance_filter`
    /// meters were covered since the last returned step
    pub fn step(&mut self, distance_filter: f64) -> Option<Step> {
        let heading: f64 = self.rng.gen_range(0.0..360.0);
        let meters = if self.max_step_meters > 0.0 {
            self.rng.gen_range(0.0..=self.max_step_meters)
        } else {
            0.0
        };

        let radians = heading.to_radians();
        self.latitude = (self.latitude + meters * radians.cos() / METERS_PER_DEGREE).clamp(-90.0, 90.0);
        let lng_scale = METERS_PER_DEGREE * self.latitude.to_radians().cos().max(1e-6);
        self.longitude += meters * radians.sin() / lng_scale;
        if self.longitude > 180.0 {
            self.longitude -= 360.0;
        } else if self.longitude < -180.0 {
            self.longitude += 360.0;
        }

        self.pending_meters += meters;
        if self.pending_meters < distance_filter {
            return None;
        }

        let covered = self.pending_meters;
        self.pending_meters = 0.0;
        Some(Step {
            latitude: self.latitude,
            longitude: self.longitude,
            meters: covered,
            heading,
        })
    }
}

fn fix_from_step(step: Step, request: &LocationRequest, provider: &str) -> LocationFix {
    let seconds = (request.interval_ms as f64 / 1000.0).max(0.001);
    let fields = json!({
        "latitude": step.latitude,
        "longitude": step.longitude,
        "accuracy": accuracy_meters(request.accuracy),
        "altitude": 0.0,
        "speed": step.meters / seconds,
        "speed_accuracy": 0.0,
        "heading": step.heading,
        "time": chrono::Utc::now().timestamp_millis() as f64,
        "is_mocked": true,
        "provider": provider,
    });

    match fields {
        Value::Object(map) => LocationFix::new(map),
        _ => LocationFix::new(Map::new()),
    }
}

// ============================================================================
// BACKENDS
// ============================================================================

pub struct SimulatedBackends {
    runtime: Handle,
    config: SimulatorConfig,
}

impl SimulatedBackends {
    /// Must be created inside a tokio runtime
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            runtime: Handle::current(),
            config,
        }
    }

    fn create(
        &self,
        client: LocationClient,
        listener: Arc<dyn LocationUpdateListener>,
    ) -> Box<dyn LocationProvider> {
        Box::new(SimulatedProvider {
            client,
            listener,
            runtime: self.runtime.clone(),
            config: self.config.clone(),
            task: None,
        })
    }
}

impl LocationBackends for SimulatedBackends {
    fn platform(&self, listener: Arc<dyn LocationUpdateListener>) -> Box<dyn LocationProvider> {
        self.create(LocationClient::Platform, listener)
    }

    fn third_party(&self, listener: Arc<dyn LocationUpdateListener>) -> Box<dyn LocationProvider> {
        self.create(LocationClient::ThirdParty, listener)
    }
}

struct SimulatedProvider {
    client: LocationClient,
    listener: Arc<dyn LocationUpdateListener>,
    runtime: Handle,
    config: SimulatorConfig,
    task: Option<JoinHandle<()>>,
}

impl LocationProvider for SimulatedProvider {
    fn request_location_updates(&mut self, request: &LocationRequest) -> Result<(), PlatformError> {
        if request.interval_ms == 0 {
            return Err(PlatformError::Location("interval must be positive".to_string()));
        }
        self.remove_location_updates();

        let listener = self.listener.clone();
        let request = request.clone();
        let provider = self.client.to_string();
        let mut walk = RandomWalk::new(&self.config, StdRng::from_entropy());

        tracing::info!(
            "{} simulator emitting every {}ms",
            provider,
            request.interval_ms
        );

        self.task = Some(self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(request.interval_ms));
            loop {
                ticker.tick().await;
                if let Some(step) = walk.step(request.distance_filter) {
                    listener.on_location_updated(Some(fix_from_step(step, &request, &provider)));
                }
            }
        }));
        Ok(())
    }

    fn remove_location_updates(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::info!("{} simulator stopped", self.client);
        }
    }
}

impl Drop for SimulatedProvider {
    fn drop(&mut self) {
        self.remove_location_updates();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Collect {
        fixes: Mutex<Vec<LocationFix>>,
    }

    impl LocationUpdateListener for Collect {
        fn on_location_updated(&self, fix: Option<LocationFix>) {
            if let Some(fix) = fix {
                self.fixes.lock().push(fix);
            }
        }
    }

    fn walk(max_step_meters: f64) -> RandomWalk {
        let config = SimulatorConfig {
            max_step_meters,
            ..SimulatorConfig::default()
        };
        RandomWalk::new(&config, StdRng::seed_from_u64(7))
    }

    #[test]
    fn test_walk_stays_near_origin() {
        let origin = SimulatorConfig::default();
        let mut ten_meters = walk(10.0);

        let mut last = None;
        for _ in 0..100 {
            last = ten_meters.step(0.0);
        }
        let last = last.unwrap();

        // 100 steps of at most 10m stay within a kilometer
        assert!((last.latitude - origin.origin_latitude).abs() < 0.01);
        assert!((last.longitude - origin.origin_longitude).abs() < 0.02);
    }

    #[test]
    fn test_distance_filter_suppresses_small_moves() {
        let mut short_steps = walk(1.0);
        assert!(short_steps.step(1000.0).is_none());

        let mut stationary = walk(0.0);
        assert!(stationary.step(0.0).is_some());
        assert!(stationary.step(0.5).is_none());
    }

    #[test]
    fn test_fix_fields() {
        let step = Step {
            latitude: 1.0,
            longitude: 2.0,
            meters: 10.0,
            heading: 90.0,
        };
        let request = LocationRequest {
            interval_ms: 2000,
            accuracy: LocationAccuracy::High,
            distance_filter: 0.0,
        };

        let fix = fix_from_step(step, &request, "Platform").into_value();
        assert_eq!(fix["latitude"], json!(1.0));
        assert_eq!(fix["accuracy"], json!(10.0));
        assert_eq!(fix["speed"], json!(5.0));
        assert_eq!(fix["provider"], json!("Platform"));
        assert_eq!(fix["is_mocked"], json!(true));
    }

    #[tokio::test]
    async fn test_provider_emits_until_removed() {
        let collect = Arc::new(Collect::default());
        let backends = SimulatedBackends::new(SimulatorConfig::default());
        let mut provider = backends.platform(collect.clone());

        let request = LocationRequest {
            interval_ms: 100,
            ..LocationRequest::default()
        };
        provider.request_location_updates(&request).unwrap();

        tokio::time::sleep(Duration::from_millis(350)).await;
        provider.remove_location_updates();
        let seen = collect.fixes.lock().len();
        assert!(seen >= 3);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(collect.fixes.lock().len(), seen);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let _guard = runtime.enter();

        let backends = SimulatedBackends::new(SimulatorConfig::default());
        let mut provider = backends.third_party(Arc::new(Collect::default()));
        let request = LocationRequest {
            interval_ms: 0,
            ..LocationRequest::default()
        };
        assert!(provider.request_location_updates(&request).is_err());
    }
}
