//! Configuration objects injected at construction time.
//!
//! Nothing in the crate reads process environment; callers build these
//! explicitly and hand them to the optimizer and provider clients.

/// Default cluster radius in kilometres.
pub const DEFAULT_CLUSTER_DISTANCE_KM: f64 = 2.0;

/// Default parking search radius in metres.
pub const DEFAULT_PARKING_RADIUS_M: f64 = 100.0;

/// Options for one optimization run.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerConfig {
    /// Collapse nearby stops into centroid representatives before planning.
    pub enable_clustering: bool,
    pub cluster_distance_km: f64,
    pub parking_radius_m: f64,
    /// Include the learned strategy when a model is supplied.
    pub use_learner: bool,
    /// Seed for fallback parking offsets. `None` derives one from the clock.
    pub seed: Option<u64>,
    /// Simulated departure time, epoch milliseconds. `None` means now.
    pub start_time_ms: Option<i64>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            enable_clustering: false,
            cluster_distance_km: DEFAULT_CLUSTER_DISTANCE_KM,
            parking_radius_m: DEFAULT_PARKING_RADIUS_M,
            use_learner: true,
            seed: None,
            start_time_ms: None,
        }
    }
}

impl OptimizerConfig {
    pub fn with_clustering(mut self, distance_km: f64) -> Self {
        self.enable_clustering = true;
        self.cluster_distance_km = distance_km;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_start_time(mut self, epoch_ms: i64) -> Self {
        self.start_time_ms = Some(epoch_ms);
        self
    }

    pub fn without_learner(mut self) -> Self {
        self.use_learner = false;
        self
    }

    /// Configured seed, or one derived from the wall clock.
    pub fn resolved_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| {
            let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
            nanos.unsigned_abs()
        })
    }

    /// Configured departure time, or now.
    pub fn resolved_start_time(&self) -> i64 {
        self.start_time_ms
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis())
    }
}

/// Capability flag and credentials for an HTTP collaborator client.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    /// When false the client answers `Unavailable` without network access.
    pub enabled: bool,
    pub api_key: Option<String>,
    pub base_url: String,
    pub driving_profile: String,
    pub walking_profile: String,
    pub cycling_profile: String,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: "http://localhost:5000".to_string(),
            driving_profile: "driving".to_string(),
            walking_profile: "walking".to_string(),
            cycling_profile: "cycling".to_string(),
            timeout_secs: 10,
        }
    }
}

impl ProviderConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}
