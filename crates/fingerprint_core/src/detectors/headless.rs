//! Headless / automated browser detection.
//!
//! Three independent sub-detectors (environment, automation framework,
//! WebDriver) are scored on their own and then combined into one verdict.

use super::{contains_any, Detection, Detector, Signals};
use crate::registry::{BROWSER, ENVIRONMENT, HARDWARE};
use crate::scorer;
use fingerprint_common::{BandTable, ConfigError, DetectorConfig, IndicatorSet};
use std::collections::BTreeMap;

pub const DEFAULT_BANDS: &[(f64, &str)] = &[
    (0.0, "human"),
    (0.3, "suspicious"),
    (0.6, "headless"),
];

/// Indicator names, also the keys of `[detectors.headless.weights]`
pub const INDICATORS: &[&str] = &[
    "headless_user_agent",
    "no_plugins",
    "no_languages",
    "zero_outer_window",
    "missing_chrome_runtime",
    "automation_globals",
    "permissions_inconsistent",
    "software_renderer",
    "navigator_webdriver",
    "webdriver_attributes",
];

/// Sub-detectors, also the keys of `[detectors.headless.components]`
pub const COMPONENTS: &[&str] = &["automation", "environment", "webdriver"];

const SOFTWARE_RENDERERS: &[&str] = &["swiftshader", "llvmpipe", "software", "mesa offscreen"];

pub struct HeadlessDetector {
    config: DetectorConfig,
}

impl HeadlessDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    fn bands(&self) -> Result<BandTable, ConfigError> {
        self.config.bands_or(DEFAULT_BANDS)
    }

    /// Signals of a stripped-down browser environment
    pub fn environment_indicators(&self, signals: &Signals<'_>) -> IndicatorSet {
        let user_agent = signals.str(BROWSER, "user_agent").unwrap_or("");
        let outer_width = signals.f64(ENVIRONMENT, "outer_width");
        let outer_height = signals.f64(ENVIRONMENT, "outer_height");
        let claims_chrome = user_agent.contains("Chrome");

        IndicatorSet::new()
            .weighted(
                "headless_user_agent",
                user_agent.contains("HeadlessChrome"),
                self.config.weight("headless_user_agent", 3.0),
            )
            .weighted(
                "no_plugins",
                signals.f64(BROWSER, "plugins_count") == Some(0.0),
                self.config.weight("no_plugins", 1.0),
            )
            .weighted(
                "no_languages",
                signals.array(BROWSER, "languages").is_some_and(|l| l.is_empty()),
                self.config.weight("no_languages", 1.0),
            )
            .weighted(
                "zero_outer_window",
                outer_width == Some(0.0) || outer_height == Some(0.0),
                self.config.weight("zero_outer_window", 2.0),
            )
            .weighted(
                "missing_chrome_runtime",
                claims_chrome && signals.bool(BROWSER, "chrome_runtime") == Some(false),
                self.config.weight("missing_chrome_runtime", 1.0),
            )
    }

    /// Traces left by automation frameworks
    pub fn automation_indicators(&self, signals: &Signals<'_>) -> IndicatorSet {
        let globals = signals
            .array(ENVIRONMENT, "automation_globals")
            .map(|g| g.len())
            .unwrap_or(0);
        let software_renderer = signals
            .lower(HARDWARE, "webgl_renderer")
            .is_some_and(|r| contains_any(&r, SOFTWARE_RENDERERS));

        IndicatorSet::new()
            .weighted(
                "automation_globals",
                globals > 0,
                self.config.weight("automation_globals", 3.0),
            )
            .weighted(
                "permissions_inconsistent",
                signals.bool(BROWSER, "permissions_inconsistent") == Some(true),
                self.config.weight("permissions_inconsistent", 1.0),
            )
            .weighted(
                "software_renderer",
                software_renderer,
                self.config.weight("software_renderer", 1.0),
            )
    }

    pub fn webdriver_indicators(&self, signals: &Signals<'_>) -> IndicatorSet {
        let attributes = signals
            .array(ENVIRONMENT, "webdriver_attributes")
            .map(|a| a.len())
            .unwrap_or(0);

        IndicatorSet::new()
            .weighted(
                "navigator_webdriver",
                signals.bool(BROWSER, "webdriver") == Some(true),
                self.config.weight("navigator_webdriver", 3.0),
            )
            .weighted(
                "webdriver_attributes",
                attributes > 0,
                self.config.weight("webdriver_attributes", 1.0),
            )
    }
}

impl Detector for HeadlessDetector {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.config.check_keys(self.name(), INDICATORS, COMPONENTS)?;
        self.bands().map(|_| ())
    }

    fn detect(&self, signals: &Signals<'_>) -> Result<Detection, ConfigError> {
        self.validate()?;
        let bands = self.bands()?;

        let mut components = BTreeMap::new();
        components.insert(
            "environment".to_string(),
            scorer::score(&self.environment_indicators(signals), &bands)?,
        );
        components.insert(
            "automation".to_string(),
            scorer::score(&self.automation_indicators(signals), &bands)?,
        );
        components.insert(
            "webdriver".to_string(),
            scorer::score(&self.webdriver_indicators(signals), &bands)?,
        );

        // BTreeMap order matches COMPONENTS
        let weights: Vec<f64> = components
            .keys()
            .map(|name| self.config.component(name, 1.0))
            .collect();
        let parts: Vec<_> = components.values().cloned().collect();
        let verdict = scorer::combine(&parts, Some(weights.as_slice()), &bands)?;

        Ok(Detection {
            verdict,
            label: None,
            components,
            ranking: Vec::new(),
        })
    }
}
