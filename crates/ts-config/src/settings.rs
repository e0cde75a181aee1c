//! Typed configuration sections with built-in defaults.
//!
//! Every section uses `#[serde(default)]`, so a partial file only overrides
//! the fields it names.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Complete controller configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub channel: ChannelConfig,
    pub robot: RobotConfig,
    pub model: ModelConfig,
    pub inference: InferenceConfig,
    pub sense: SenseConfig,
}

/// Duplex channel between the decision and robot endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelConfig {
    /// Host the decision endpoint listens on and the robot endpoint dials.
    pub host: String,
    /// TCP port. `0` lets a listener pick an ephemeral port.
    pub port: u16,
    /// Receive timeout on either side, in seconds.
    pub timeout_secs: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8081,
            timeout_secs: 10,
        }
    }
}

impl ChannelConfig {
    /// `host:port` form accepted by the std socket APIs.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Robot endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RobotConfig {
    /// Network address of the robot-side device bridge.
    pub address: String,
    pub port: u16,
    /// Number of Act cycles before the termination token is sent.
    pub cycles: u64,
    pub device: DeviceKind,
    /// Raise and lower the arm after each move to help register contact.
    pub probe_after_move: bool,
    /// Artificial motion latency for the simulated actuator.
    pub motion_delay_ms: u64,
    pub speak: bool,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            address: "169.254.66.84".to_string(),
            port: 9559,
            cycles: 60,
            device: DeviceKind::Simulated,
            probe_after_move: true,
            motion_delay_ms: 0,
            speak: true,
        }
    }
}

/// Generative model constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// Position index the arm starts from.
    pub start_position: usize,
    /// Likelihood precision (context-conditioned rows).
    pub zeta: f64,
    /// Context self-transition precision.
    pub omega: f64,
    /// Habit precision.
    pub rho: f64,
    /// Policy precision.
    pub gamma: f64,
    /// Prior preference over the two actions.
    pub habit: Vec<f64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            start_position: 7,
            zeta: 0.5,
            omega: 0.8,
            rho: 0.5,
            gamma: 16.0,
            habit: vec![0.75, 0.25],
        }
    }
}

/// Belief update settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InferenceConfig {
    pub max_iterations: usize,
    /// Free-energy change below which coordinate ascent stops.
    pub tolerance: f64,
    pub prior_mode: PriorMode,
    /// Seed for action sampling. Absent means OS entropy.
    pub seed: Option<u64>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_iterations: 16,
            tolerance: 1e-3,
            prior_mode: PriorMode::Propagate,
            seed: None,
        }
    }
}

/// Touch detection for the Sense task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SenseConfig {
    pub mode: SenseMode,
    /// Per-poll touch probability in `random` mode.
    pub touch_probability: f64,
    /// Target position in `state` mode (its mirror also triggers).
    pub target_position: usize,
    /// Completed cycles at which `list` mode injects a touch.
    pub touch_timesteps: Vec<u64>,
    /// Sleep between touch polls.
    pub poll_interval_ms: u64,
    pub seed: Option<u64>,
}

impl Default for SenseConfig {
    fn default() -> Self {
        Self {
            mode: SenseMode::List,
            touch_probability: 0.02,
            target_position: 3,
            touch_timesteps: vec![12, 14, 20, 22, 24, 26, 38],
            poll_interval_ms: 100,
            seed: None,
        }
    }
}

/// Which Actuator/SensorSource implementation the robot endpoint uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    Simulated,
    Bridge,
}

/// How the control loop supplies priors to each belief update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorMode {
    /// Previous posterior projected through the chosen action's transitions.
    #[default]
    Propagate,
    /// The initial prior every step.
    Static,
}

/// Touch source for the Sense task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenseMode {
    Sensor,
    Random,
    State,
    #[default]
    List,
}

macro_rules! lowercase_enum {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($name => Ok($ty::$variant),)+
                    other => Err(format!(
                        "unknown {} '{}' (expected one of: {})",
                        stringify!($ty),
                        other,
                        [$($name),+].join(", ")
                    )),
                }
            }
        }
    };
}

lowercase_enum!(DeviceKind { Simulated => "simulated", Bridge => "bridge" });
lowercase_enum!(PriorMode { Propagate => "propagate", Static => "static" });
lowercase_enum!(SenseMode {
    Sensor => "sensor",
    Random => "random",
    State => "state",
    List => "list",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.channel.address(), "localhost:8081");
        assert_eq!(cfg.channel.timeout_secs, 10);
        assert_eq!(cfg.robot.cycles, 60);
        assert_eq!(cfg.robot.port, 9559);
        assert_eq!(cfg.model.start_position, 7);
        assert_eq!(cfg.model.habit, vec![0.75, 0.25]);
        assert_eq!(cfg.inference.max_iterations, 16);
        assert_eq!(cfg.inference.prior_mode, PriorMode::Propagate);
        assert_eq!(cfg.sense.mode, SenseMode::List);
        assert_eq!(cfg.sense.poll_interval_ms, 100);
        assert_eq!(cfg.sense.touch_probability, 0.02);
    }

    #[test]
    fn enums_parse_case_insensitively() {
        assert_eq!("Bridge".parse::<DeviceKind>(), Ok(DeviceKind::Bridge));
        assert_eq!("STATIC".parse::<PriorMode>(), Ok(PriorMode::Static));
        assert_eq!("random".parse::<SenseMode>(), Ok(SenseMode::Random));
        let err = "laser".parse::<SenseMode>().unwrap_err();
        assert!(err.contains("sensor, random, state, list"), "{err}");
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let cfg: Config = serde_json::from_str(r#"{"model": {"gamma": 4.0}}"#).unwrap();
        assert_eq!(cfg.model.gamma, 4.0);
        assert_eq!(cfg.model.zeta, 0.5);
        assert_eq!(cfg.channel, ChannelConfig::default());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let res: Result<Config, _> = serde_json::from_str(r#"{"model": {"gama": 4.0}}"#);
        assert!(res.is_err());
    }
}
