//! # Helm Equipment Commands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Lower bound of a helm or throttle demand, degrees.
pub const DEM_MIN: i16 = -90;

/// Upper bound of a helm or throttle demand, degrees.
pub const DEM_MAX: i16 = 90;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Demands sent to the helm actuator.
///
/// Both fields are signed degrees of deflection in `[-90, 90]`. Positive
/// helm steers to starboard, positive throttle drives forward.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HelmDems {
    /// The demanded steering deflection in degrees.
    pub helm_deg: i16,

    /// The demanded throttle in degrees of servo travel.
    pub throttle: i16,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors that can occur when commanding the helm.
#[derive(Debug, Error)]
pub enum HelmError {
    /// The transport could not deliver the command within its timeout.
    /// Treated as fatal by the caller.
    #[error("Timed out sending demands to the helm")]
    SendTimeout,

    /// The transport failed outright.
    #[error("Could not send demands to the helm: {0}")]
    SendFailed(String),

    /// The demands were outside the valid range.
    #[error("Demands out of range: helm {0}, throttle {1}")]
    DemsOutOfRange(i16, i16),
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Interface to the helm actuator transport.
///
/// Sends are fire-and-forget. Rate limiting is the caller's responsibility,
/// not the transport's.
pub trait HelmActuator {
    fn send(&mut self, dems: &HelmDems) -> Result<(), HelmError>;
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl HelmDems {
    /// Demands holding the vehicle still with the helm centred.
    pub fn zero() -> Self {
        Self {
            helm_deg: 0,
            throttle: 0,
        }
    }

    /// True if both demands are within the actuator's range.
    pub fn is_valid(&self) -> bool {
        (DEM_MIN..=DEM_MAX).contains(&self.helm_deg)
            && (DEM_MIN..=DEM_MAX).contains(&self.throttle)
    }

    /// Clamp both demands into the actuator's range.
    pub fn clamped(&self) -> Self {
        Self {
            helm_deg: self.helm_deg.max(DEM_MIN).min(DEM_MAX),
            throttle: self.throttle.max(DEM_MIN).min(DEM_MAX),
        }
    }
}

/// Recording actuator used in tests and bench runs.
#[derive(Debug, Default)]
pub struct SimHelm {
    /// All demands sent, in order.
    pub sent: Vec<HelmDems>,
}

impl HelmActuator for SimHelm {
    fn send(&mut self, dems: &HelmDems) -> Result<(), HelmError> {
        if !dems.is_valid() {
            return Err(HelmError::DemsOutOfRange(dems.helm_deg, dems.throttle));
        }

        self.sent.push(*dems);
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_validity() {
        assert!(HelmDems::zero().is_valid());
        assert!(HelmDems {
            helm_deg: 90,
            throttle: -90
        }
        .is_valid());
        assert!(!HelmDems {
            helm_deg: 91,
            throttle: 0
        }
        .is_valid());
    }

    #[test]
    fn test_clamping() {
        let dems = HelmDems {
            helm_deg: 250,
            throttle: -100,
        };
        let clamped = dems.clamped();

        assert_eq!(clamped.helm_deg, 90);
        assert_eq!(clamped.throttle, -90);
    }

    #[test]
    fn test_sim_records_sends() {
        let mut helm = SimHelm::default();

        helm.send(&HelmDems {
            helm_deg: 45,
            throttle: 20,
        })
        .unwrap();
        helm.send(&HelmDems::zero()).unwrap();

        assert_eq!(helm.sent.len(), 2);
        assert_eq!(helm.sent[1], HelmDems::zero());
    }
}
