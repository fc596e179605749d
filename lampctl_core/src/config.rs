//! Runtime configuration for the control loop.
//!
//! Separate from the TOML-deserialized config in `lampctl_config`; see the
//! `From` impls at the bottom for the mapping.

use std::time::Duration;

/// How several detections in one cycle are turned into dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregation {
    /// Decide and dispatch per detection in report order (last one wins).
    #[default]
    Each,
    /// Decide once per cycle from the nearest measured detection.
    Nearest,
}

/// How the two commands of one device pair are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dispatch {
    /// Device1, then Device2, on the loop thread.
    #[default]
    Sequential,
    /// Both devices at once on scoped threads; joined before settling.
    Parallel,
}

#[derive(Debug, Clone)]
pub struct LoopCfg {
    /// Pause after each device pair is addressed.
    pub settle: Duration,
    pub aggregation: Aggregation,
    pub dispatch: Dispatch,
}

impl Default for LoopCfg {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(300),
            aggregation: Aggregation::Each,
            dispatch: Dispatch::Sequential,
        }
    }
}

impl From<lampctl_config::Aggregation> for Aggregation {
    fn from(a: lampctl_config::Aggregation) -> Self {
        match a {
            lampctl_config::Aggregation::Each => Aggregation::Each,
            lampctl_config::Aggregation::Nearest => Aggregation::Nearest,
        }
    }
}

impl From<lampctl_config::Dispatch> for Dispatch {
    fn from(d: lampctl_config::Dispatch) -> Self {
        match d {
            lampctl_config::Dispatch::Sequential => Dispatch::Sequential,
            lampctl_config::Dispatch::Parallel => Dispatch::Parallel,
        }
    }
}

impl From<&lampctl_config::ControlCfg> for LoopCfg {
    fn from(c: &lampctl_config::ControlCfg) -> Self {
        Self {
            settle: Duration::from_millis(c.settle_ms),
            aggregation: c.aggregation.into(),
            dispatch: c.dispatch.into(),
        }
    }
}
