//! Procamp (brightness / contrast / hue / saturation) parameter table.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CscError;

/// Parameters of one procamp instance.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Procamp {
    pub enabled: bool,
    /// Bumped on every update; CSC matrices record the version they were
    /// computed from.
    pub version: u32,
    /// [-100, 100]
    pub brightness: f32,
    /// [0, 10]
    pub contrast: f32,
    /// Degrees, [-180, 180].
    pub hue: f32,
    /// [0, 10]
    pub saturation: f32,
}

impl Default for Procamp {
    fn default() -> Self {
        Self {
            enabled: false,
            version: 0,
            brightness: 0.0,
            contrast: 1.0,
            hue: 0.0,
            saturation: 1.0,
        }
    }
}

impl Procamp {
    pub fn new(brightness: f32, contrast: f32, hue: f32, saturation: f32) -> Self {
        Self {
            enabled: true,
            version: 0,
            brightness,
            contrast,
            hue,
            saturation,
        }
    }

    pub fn validate(&self) -> Result<(), CscError> {
        check_range("brightness", self.brightness, -100.0, 100.0)?;
        check_range("contrast", self.contrast, 0.0, 10.0)?;
        check_range("hue", self.hue, -180.0, 180.0)?;
        check_range("saturation", self.saturation, 0.0, 10.0)?;
        Ok(())
    }
}

fn check_range(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), CscError> {
    if !(min..=max).contains(&value) {
        return Err(CscError::ProcampOutOfRange { field, value });
    }
    Ok(())
}

/// Fixed-size table of procamp instances addressed by filter entries.
#[derive(Clone, Debug)]
pub struct ProcampTable {
    slots: Vec<Procamp>,
}

impl ProcampTable {
    pub fn new(slots: usize) -> Self {
        Self {
            slots: vec![Procamp::default(); slots],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Store new parameters for `id` and return the new version.
    pub fn set(&mut self, id: u8, params: Procamp) -> Result<u32, CscError> {
        params.validate()?;
        let max = self.slots.len();
        let slot = self
            .slots
            .get_mut(id as usize)
            .ok_or(CscError::InvalidProcampId { id, max })?;
        let version = slot.version.wrapping_add(1);
        *slot = Procamp { version, ..params };
        debug!(id, version, enabled = slot.enabled, "procamp updated");
        Ok(version)
    }

    /// The active procamp for `id`; out-of-range and disabled ids are
    /// treated as "no procamp".
    pub fn active(&self, id: u8) -> Option<&Procamp> {
        match self.slots.get(id as usize) {
            Some(p) if p.enabled => Some(p),
            Some(_) => None,
            None => {
                warn!(id, slots = self.slots.len(), "procamp id out of range, ignored");
                None
            }
        }
    }

    pub fn get(&self, id: u8) -> Option<&Procamp> {
        self.slots.get(id as usize)
    }
}

impl Default for ProcampTable {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_bumps_version() {
        let mut table = ProcampTable::new(1);
        assert_eq!(table.set(0, Procamp::new(10.0, 1.0, 0.0, 1.0)).unwrap(), 1);
        assert_eq!(table.set(0, Procamp::new(20.0, 1.0, 0.0, 1.0)).unwrap(), 2);
        assert_eq!(table.active(0).unwrap().brightness, 20.0);
    }

    #[test]
    fn rejects_out_of_range() {
        let mut table = ProcampTable::new(1);
        let err = table.set(0, Procamp::new(0.0, 11.0, 0.0, 1.0)).unwrap_err();
        assert!(matches!(err, CscError::ProcampOutOfRange { field: "contrast", .. }));
        assert!(matches!(
            table.set(3, Procamp::new(0.0, 1.0, 0.0, 1.0)),
            Err(CscError::InvalidProcampId { id: 3, max: 1 })
        ));
    }

    #[test]
    fn disabled_and_unknown_are_inactive() {
        let mut table = ProcampTable::new(1);
        assert!(table.active(0).is_none());
        table
            .set(0, Procamp { enabled: false, ..Procamp::new(5.0, 1.0, 0.0, 1.0) })
            .unwrap();
        assert!(table.active(0).is_none());
        assert!(table.active(7).is_none());
    }
}
