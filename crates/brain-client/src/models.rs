//! Wire models for the Brain simulation and alpha endpoints.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// SIMULATION SETTINGS
// =============================================================================

/// Neutralization applied to the simulated signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Neutralization {
    /// No neutralization
    None,
    /// Market neutral
    Market,
    /// Sector neutral
    Sector,
    /// Industry neutral
    Industry,
    /// Sub-industry neutral
    #[default]
    Subindustry,
}

/// ON/OFF switch used by several settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Switch {
    /// Enabled
    #[default]
    On,
    /// Disabled
    Off,
}

/// Unit handling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum UnitHandling {
    /// Verify units of the expression
    #[default]
    Verify,
}

/// Expression language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Language {
    /// Fast expression language
    #[default]
    Fastexpr,
}

/// Simulation configuration record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSettings {
    /// Instrument type (always EQUITY)
    pub instrument_type: String,
    /// Market region (USA, CHN, EUR, ...)
    pub region: String,
    /// Universe (TOP3000, TOP500, ...)
    pub universe: String,
    /// Trading delay in days
    pub delay: u32,
    /// Linear decay window
    pub decay: u32,
    /// Neutralization group
    pub neutralization: Neutralization,
    /// Maximum weight of a single instrument
    pub truncation: f64,
    /// Pasteurization
    pub pasteurization: Switch,
    /// Unit handling
    pub unit_handling: UnitHandling,
    /// NaN handling
    pub nan_handling: Switch,
    /// Expression language
    pub language: Language,
    /// Produce visualization data
    pub visualization: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            instrument_type: "EQUITY".to_string(),
            region: "USA".to_string(),
            universe: "TOP3000".to_string(),
            delay: 1,
            decay: 6,
            neutralization: Neutralization::Subindustry,
            truncation: 0.08,
            pasteurization: Switch::On,
            unit_handling: UnitHandling::Verify,
            nan_handling: Switch::On,
            language: Language::Fastexpr,
            visualization: false,
        }
    }
}

/// Caller-supplied overrides merged onto [`SimulationSettings::default`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsOverrides {
    /// Market region
    pub region: Option<String>,
    /// Universe
    pub universe: Option<String>,
    /// Trading delay
    pub delay: Option<u32>,
    /// Decay
    pub decay: Option<u32>,
    /// Neutralization
    pub neutralization: Option<Neutralization>,
    /// Truncation
    pub truncation: Option<f64>,
    /// Pasteurization
    pub pasteurization: Option<Switch>,
    /// Unit handling
    pub unit_handling: Option<UnitHandling>,
    /// NaN handling
    pub nan_handling: Option<Switch>,
    /// Language
    pub language: Option<Language>,
    /// Visualization
    pub visualization: Option<bool>,
}

impl SimulationSettings {
    /// Applies overrides, keeping current values where none is given.
    pub fn merged(mut self, overrides: SettingsOverrides) -> Self {
        if let Some(v) = overrides.region {
            self.region = v;
        }
        if let Some(v) = overrides.universe {
            self.universe = v;
        }
        if let Some(v) = overrides.delay {
            self.delay = v;
        }
        if let Some(v) = overrides.decay {
            self.decay = v;
        }
        if let Some(v) = overrides.neutralization {
            self.neutralization = v;
        }
        if let Some(v) = overrides.truncation {
            self.truncation = v;
        }
        if let Some(v) = overrides.pasteurization {
            self.pasteurization = v;
        }
        if let Some(v) = overrides.unit_handling {
            self.unit_handling = v;
        }
        if let Some(v) = overrides.nan_handling {
            self.nan_handling = v;
        }
        if let Some(v) = overrides.language {
            self.language = v;
        }
        if let Some(v) = overrides.visualization {
            self.visualization = v;
        }
        self
    }
}

// =============================================================================
// SIMULATION REQUEST
// =============================================================================

/// A simulation job: expression plus configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    /// Simulation type (REGULAR)
    #[serde(rename = "type")]
    pub kind: String,
    /// Configuration record
    pub settings: SimulationSettings,
    /// The alpha expression
    pub regular: String,
}

impl SimulationRequest {
    /// Regular simulation of `expression` with default settings.
    pub fn regular(expression: impl Into<String>) -> Self {
        Self {
            kind: "REGULAR".to_string(),
            settings: SimulationSettings::default(),
            regular: expression.into(),
        }
    }

    /// Sets the region.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.settings.region = region.into();
        self
    }

    /// Sets the universe.
    pub fn universe(mut self, universe: impl Into<String>) -> Self {
        self.settings.universe = universe.into();
        self
    }

    /// Sets the trading delay.
    pub fn delay(mut self, delay: u32) -> Self {
        self.settings.delay = delay;
        self
    }

    /// Merges further setting overrides.
    pub fn with_overrides(mut self, overrides: SettingsOverrides) -> Self {
        self.settings = self.settings.merged(overrides);
        self
    }

    /// The expression being simulated.
    pub fn expression(&self) -> &str {
        &self.regular
    }
}

// =============================================================================
// HANDLE AND STATUS
// =============================================================================

/// Identifier of a submitted simulation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimulationHandle(String);

impl SimulationHandle {
    /// Wraps an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parses the handle from a `Location` header value.
    ///
    /// The handle is the last non-empty path segment, so both
    /// `https://host/simulations/abc` and `/simulations/abc/` yield `abc`.
    pub fn from_location(location: &str) -> Option<Self> {
        let path = location.split(['?', '#']).next().unwrap_or_default();
        path.rsplit('/')
            .map(str::trim)
            .find(|segment| !segment.is_empty())
            .filter(|segment| !segment.contains(':'))
            .map(Self::new)
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SimulationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of the simulation status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationStatus {
    /// Simulation id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Status string (e.g. COMPLETE, ERROR)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Produced alpha id, populated on completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<String>,
    /// Progress fraction while running
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    /// Error detail on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Remaining fields, preserved as returned
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const FAILED_STATUSES: [&str; 3] = ["ERROR", "FAIL", "FAILED"];

impl SimulationStatus {
    /// The alpha id, if populated.
    pub fn alpha_id(&self) -> Option<&str> {
        self.alpha.as_deref().filter(|id| !id.trim().is_empty())
    }

    /// Returns true if the service reported a terminal failure.
    pub fn is_failed(&self) -> bool {
        self.status
            .as_deref()
            .map(|s| FAILED_STATUSES.iter().any(|f| s.eq_ignore_ascii_case(f)))
            .unwrap_or(false)
    }

    /// Failure detail, falling back to the status string.
    pub fn failure_message(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.status.clone())
            .unwrap_or_else(|| "unknown failure".to_string())
    }
}

/// Outcome of a completed wait.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    /// The simulation waited on
    pub handle: SimulationHandle,
    /// Final status body
    pub status: SimulationStatus,
    /// Time spent waiting
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
    /// Number of status queries issued
    pub polls: u32,
}

impl SimulationResult {
    /// The produced alpha id.
    pub fn alpha_id(&self) -> Option<&str> {
        self.status.alpha_id()
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }
}

// =============================================================================
// ALPHAS
// =============================================================================

/// A pass/fail check evaluated on an alpha.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Check {
    /// Check name
    pub name: String,
    /// PASS / FAIL / PENDING
    #[serde(default)]
    pub result: Option<String>,
    /// Remaining fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// In-sample evaluation metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlphaMetrics {
    /// Risk-adjusted return
    #[serde(default)]
    pub sharpe: Option<f64>,
    /// Fitness score
    #[serde(default)]
    pub fitness: Option<f64>,
    /// Daily turnover
    #[serde(default)]
    pub turnover: Option<f64>,
    /// Annualised returns
    #[serde(default)]
    pub returns: Option<f64>,
    /// Evaluation checks
    #[serde(default)]
    pub checks: Vec<Check>,
    /// Remaining fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Expression payload of a regular alpha.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlphaCode {
    /// Expression source
    pub code: String,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Remaining fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An evaluated alpha.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alpha {
    /// Alpha id
    pub id: String,
    /// Grade assigned by the platform
    #[serde(default)]
    pub grade: Option<String>,
    /// Submission status
    #[serde(default)]
    pub status: Option<String>,
    /// Expression payload
    #[serde(default)]
    pub regular: Option<AlphaCode>,
    /// In-sample metrics
    #[serde(default)]
    pub is: Option<AlphaMetrics>,
    /// Remaining fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Listing envelope of the alphas endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlphaPage {
    /// Total number of alphas
    #[serde(default)]
    pub count: Option<u64>,
    /// This page
    #[serde(default)]
    pub results: Vec<Alpha>,
}
