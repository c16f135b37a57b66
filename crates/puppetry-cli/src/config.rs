//! Configuration vault – reads/writes `~/.puppetry/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use puppetry_stream::TransportOptions;
use puppetry_stream::transport::parse_endpoint;
use puppetry_types::PuppetError;
use serde::{Deserialize, Serialize};

/// Rotation axis of the synthetic tracking source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpinAxis {
    X,
    Y,
    #[default]
    Z,
}

impl SpinAxis {
    pub fn unit(self) -> [f64; 3] {
        match self {
            SpinAxis::X => [1.0, 0.0, 0.0],
            SpinAxis::Y => [0.0, 1.0, 0.0],
            SpinAxis::Z => [0.0, 0.0, 1.0],
        }
    }
}

impl std::fmt::Display for SpinAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpinAxis::X => write!(f, "x"),
            SpinAxis::Y => write!(f, "y"),
            SpinAxis::Z => write!(f, "z"),
        }
    }
}

/// Persisted settings stored in `~/.puppetry/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// URL every admitted pose is POSTed to.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Minimum spacing between network sends, in milliseconds.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: f64,

    /// Frame rate of the synthetic tracking source.
    #[serde(default = "default_capture_hz")]
    pub capture_hz: f64,

    /// Refresh rate of the live pose display.
    #[serde(default = "default_display_hz")]
    pub display_hz: f64,

    #[serde(default)]
    pub spin_axis: SpinAxis,

    /// Seconds for one full turn of the synthetic source.
    #[serde(default = "default_spin_period_secs")]
    pub spin_period_secs: f64,

    /// Cap on concurrent in-flight sends; unbounded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_in_flight: Option<usize>,

    /// Per-request timeout; HTTP stack default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,

    /// Begin streaming as soon as the source starts.
    #[serde(default)]
    pub stream_on_start: bool,
}

fn default_endpoint() -> String {
    "http://127.0.0.1:5001/puppetry/pose".to_string()
}
fn default_min_interval_ms() -> f64 {
    1000.0 / 30.0
}
fn default_capture_hz() -> f64 {
    60.0
}
fn default_display_hz() -> f64 {
    4.0
}
fn default_spin_period_secs() -> f64 {
    4.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            min_interval_ms: default_min_interval_ms(),
            capture_hz: default_capture_hz(),
            display_hz: default_display_hz(),
            spin_axis: SpinAxis::default(),
            spin_period_secs: default_spin_period_secs(),
            max_in_flight: None,
            request_timeout_ms: None,
            stream_on_start: false,
        }
    }
}

impl Config {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), PuppetError> {
        parse_endpoint(&self.endpoint)?;
        positive("min_interval_ms", self.min_interval_ms)?;
        positive("capture_hz", self.capture_hz)?;
        positive("display_hz", self.display_hz)?;
        positive("spin_period_secs", self.spin_period_secs)?;
        period("min_interval_ms", self.min_interval_ms / 1000.0)?;
        period("capture_hz", 1.0 / self.capture_hz)?;
        period("display_hz", 1.0 / self.display_hz)?;
        period("spin_period_secs", self.spin_period_secs)?;
        if self.max_in_flight == Some(0) {
            return Err(PuppetError::Config(
                "max_in_flight must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_secs_f64(self.min_interval_ms / 1000.0)
    }

    pub fn capture_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.capture_hz)
    }

    pub fn display_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.display_hz)
    }

    pub fn spin_period(&self) -> Duration {
        Duration::from_secs_f64(self.spin_period_secs)
    }

    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            max_in_flight: self.max_in_flight,
            request_timeout: self.request_timeout_ms.map(Duration::from_millis),
        }
    }
}

fn positive(field: &str, value: f64) -> Result<(), PuppetError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PuppetError::Config(format!(
            "{field} must be a positive number, got {value}"
        )))
    }
}

/// The duration `seconds` must be representable and non-zero.
fn period(field: &str, seconds: f64) -> Result<Duration, PuppetError> {
    match Duration::try_from_secs_f64(seconds) {
        Ok(d) if !d.is_zero() => Ok(d),
        Ok(_) => Err(PuppetError::Config(format!(
            "{field} gives a period too short to schedule"
        ))),
        Err(e) => Err(PuppetError::Config(format!(
            "{field} gives an unusable period: {e}"
        ))),
    }
}

/// Return the path to `~/.puppetry/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".puppetry").join("config.toml")
}

/// Load the config from disk and apply environment overrides.  Returns
/// `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, PuppetError> {
    Ok(load_from(&config_path())?.map(|mut cfg| {
        apply_env_overrides(&mut cfg);
        cfg
    }))
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, PuppetError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        PuppetError::Config(format!("failed to read {}: {e}", path.display()))
    })?;
    let cfg: Config = toml::from_str(&raw)
        .map_err(|e| PuppetError::Config(format!("failed to parse {}: {e}", path.display())))?;
    Ok(Some(cfg))
}

/// Apply `PUPPETRY_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `PUPPETRY_ENDPOINT` | `endpoint` |
/// | `PUPPETRY_CAPTURE_HZ` | `capture_hz` |
/// | `PUPPETRY_MAX_IN_FLIGHT` | `max_in_flight` |
///
/// Unparseable numbers are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("PUPPETRY_ENDPOINT") {
        cfg.endpoint = v;
    }
    if let Ok(v) = std::env::var("PUPPETRY_CAPTURE_HZ")
        && let Ok(hz) = v.parse::<f64>()
    {
        cfg.capture_hz = hz;
    }
    if let Ok(v) = std::env::var("PUPPETRY_MAX_IN_FLIGHT")
        && let Ok(n) = v.parse::<usize>()
    {
        cfg.max_in_flight = Some(n);
    }
}

/// Save the config to disk, creating `~/.puppetry/` if necessary.
pub fn save(cfg: &Config) -> Result<(), PuppetError> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), PuppetError> {
    let io_err = |what: &str, e: std::io::Error| PuppetError::Config(format!("{what}: {e}"));

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err("failed to create config directory", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| io_err("failed to restrict config directory", e))?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| PuppetError::Config(format!("failed to serialize config: {e}")))?;

    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(|e| io_err(&format!("failed to write {}", path.display()), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(|e| io_err(&format!("failed to write {}", path.display()), e))?;
    Ok(())
}
