//! Distance bands to lamp commands.
//!
//! Bands are open intervals. A distance equal to a bound, in the gap between
//! bands, outside every band, NaN, or degenerate resolves to all-off.

use lampctl_traits::{Command, DeviceId};

use crate::error::BuildError;
use crate::estimator::DistanceEstimate;

/// `lower < d < upper` turns `device` on and every other device off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub lower: f64,
    pub upper: f64,
    pub device: DeviceId,
}

impl Band {
    pub const fn new(lower: f64, upper: f64, device: DeviceId) -> Self {
        Self {
            lower,
            upper,
            device,
        }
    }

    #[inline]
    pub fn contains(&self, distance: f64) -> bool {
        distance > self.lower && distance < self.upper
    }
}

/// Lamp placement bands; 249.9..349.9 is a dead zone.
pub const DEFAULT_BANDS: [Band; 2] = [
    Band::new(149.9, 249.9, DeviceId::Device1),
    Band::new(349.9, 449.9, DeviceId::Device2),
];

/// Command for each device, iterated in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actuation {
    pub device1: Command,
    pub device2: Command,
}

impl Actuation {
    pub const ALL_OFF: Actuation = Actuation {
        device1: Command::TurnOff,
        device2: Command::TurnOff,
    };

    /// `device` on, everything else off.
    pub fn only(device: DeviceId) -> Self {
        let mut a = Self::ALL_OFF;
        match device {
            DeviceId::Device1 => a.device1 = Command::TurnOn,
            DeviceId::Device2 => a.device2 = Command::TurnOn,
        }
        a
    }

    pub fn command_for(&self, device: DeviceId) -> Command {
        match device {
            DeviceId::Device1 => self.device1,
            DeviceId::Device2 => self.device2,
        }
    }

    /// `(device, command)` pairs, Device1 first.
    pub fn iter(&self) -> impl Iterator<Item = (DeviceId, Command)> + '_ {
        DeviceId::ALL.into_iter().map(|d| (d, self.command_for(d)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BandPolicy {
    bands: Vec<Band>,
}

impl Default for BandPolicy {
    fn default() -> Self {
        Self {
            bands: DEFAULT_BANDS.to_vec(),
        }
    }
}

impl BandPolicy {
    /// Validate a custom band table. The first matching band wins when
    /// bands overlap.
    pub fn new(bands: Vec<Band>) -> Result<Self, BuildError> {
        for b in &bands {
            if !(b.lower.is_finite() && b.upper.is_finite()) {
                return Err(BuildError::InvalidConfig("band bounds must be finite"));
            }
            if b.lower >= b.upper {
                return Err(BuildError::InvalidConfig("band lower must be < upper"));
            }
        }
        Ok(Self { bands })
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn decide(&self, estimate: DistanceEstimate) -> Actuation {
        decide_with(&self.bands, estimate)
    }
}

/// Decide with the built-in bands.
pub fn decide(estimate: DistanceEstimate) -> Actuation {
    decide_with(&DEFAULT_BANDS, estimate)
}

fn decide_with(bands: &[Band], estimate: DistanceEstimate) -> Actuation {
    let Some(d) = estimate.value() else {
        return Actuation::ALL_OFF;
    };
    bands
        .iter()
        .find(|b| b.contains(d))
        .map_or(Actuation::ALL_OFF, |b| Actuation::only(b.device))
}

impl TryFrom<&lampctl_config::PolicyCfg> for BandPolicy {
    type Error = BuildError;
    fn try_from(c: &lampctl_config::PolicyCfg) -> Result<Self, Self::Error> {
        if c.bands.is_empty() {
            return Ok(Self::default());
        }
        let mut bands = Vec::with_capacity(c.bands.len());
        for b in &c.bands {
            let device = DeviceId::from_number(b.device)
                .ok_or(BuildError::InvalidConfig("band device must be 1 or 2"))?;
            bands.push(Band::new(b.lower, b.upper, device));
        }
        Self::new(bands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DistanceEstimate::*;

    #[test]
    fn all_off_for_degenerate() {
        assert_eq!(decide(Degenerate), Actuation::ALL_OFF);
    }

    #[test]
    fn nan_matches_no_band() {
        assert_eq!(decide(Measured(f64::NAN)), Actuation::ALL_OFF);
    }

    #[test]
    fn iter_is_device_ordered() {
        let a = Actuation::only(DeviceId::Device2);
        let v: Vec<_> = a.iter().collect();
        assert_eq!(
            v,
            vec![
                (DeviceId::Device1, Command::TurnOff),
                (DeviceId::Device2, Command::TurnOn)
            ]
        );
    }

    #[test]
    fn custom_bands_validated() {
        assert!(BandPolicy::new(vec![Band::new(5.0, 5.0, DeviceId::Device1)]).is_err());
        assert!(BandPolicy::new(vec![Band::new(f64::NAN, 5.0, DeviceId::Device1)]).is_err());
        let p = BandPolicy::new(vec![Band::new(0.0, 100.0, DeviceId::Device2)]).unwrap();
        assert_eq!(p.decide(Measured(50.0)), Actuation::only(DeviceId::Device2));
        assert_eq!(p.decide(Measured(200.0)), Actuation::ALL_OFF);
    }

    #[test]
    fn first_matching_band_wins() {
        let p = BandPolicy::new(vec![
            Band::new(0.0, 100.0, DeviceId::Device2),
            Band::new(50.0, 150.0, DeviceId::Device1),
        ])
        .unwrap();
        assert_eq!(p.decide(Measured(75.0)), Actuation::only(DeviceId::Device2));
    }
}
