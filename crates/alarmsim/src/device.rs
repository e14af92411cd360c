//! Simulated alarm devices.
//!
//! A [`Fleet`] is generated once at startup from the fleet configuration.
//! Each device keeps its position for the lifetime of the run; every alarm
//! it raises re-rolls the attached image and status text.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{parse_url, FleetConfig};
use crate::error::{Error, Result};
use crate::geo::{BoundingBox, Coordinates};

/// The set of absolute image URLs alarms may reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCatalog {
    urls: Vec<String>,
}

impl ImageCatalog {
    /// Build a catalog by resolving each name against `root_url`.
    ///
    /// The root is treated as a directory even without a trailing slash, so
    /// `https://host/images` and `https://host/images/` resolve the same way.
    /// Blank names are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the root URL or a resolved image URL is invalid,
    /// or if no usable names remain.
    pub fn new(root_url: &str, names: &[String]) -> Result<Self> {
        let mut root = parse_url(root_url)?;
        if !root.path().ends_with('/') {
            let path = format!("{}/", root.path());
            root.set_path(&path);
        }

        let mut urls = Vec::with_capacity(names.len());
        for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            let url = root.join(name).map_err(|source| Error::InvalidUrl {
                url: name.to_string(),
                source,
            })?;
            urls.push(url.to_string());
        }

        if urls.is_empty() {
            return Err(Error::validation("image catalog has no usable image names"));
        }

        Ok(Self { urls })
    }

    /// Pick one image URL uniformly at random.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        &self.urls[rng.random_range(0..self.urls.len())]
    }

    /// All image URLs in the catalog.
    #[must_use]
    pub fn urls(&self) -> &[String] {
        &self.urls
    }
}

/// One simulated alarm device and its most recent alarm state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Stable device identifier.
    pub id: String,
    /// Fixed location of the device.
    pub coordinates: Coordinates,
    /// Image attached to the latest alarm.
    pub image: String,
    /// Status text of the latest alarm.
    pub status: String,
}

impl Device {
    /// Re-roll the image and status for the next alarm.
    pub fn refresh<R: Rng + ?Sized>(
        &mut self,
        catalog: &ImageCatalog,
        statuses: &[String],
        rng: &mut R,
    ) {
        self.image = catalog.pick(rng).to_string();
        if !statuses.is_empty() {
            self.status = statuses[rng.random_range(0..statuses.len())].clone();
        }
    }
}

/// The full set of simulated devices.
#[derive(Debug, Clone, PartialEq)]
pub struct Fleet {
    devices: Vec<Device>,
    statuses: Vec<String>,
    bounds: BoundingBox,
}

impl Fleet {
    /// Generate `config.device_count` devices placed randomly inside the
    /// configured bounding box.
    ///
    /// Device ids are `{id_prefix}-{n}` with `n` counting from 1 and padded
    /// to three digits.
    ///
    /// # Errors
    ///
    /// Returns an error if the device count is zero, the bounding box is
    /// invalid, or there are no usable status texts.
    pub fn generate<R: Rng + ?Sized>(
        config: &FleetConfig,
        catalog: &ImageCatalog,
        rng: &mut R,
    ) -> Result<Self> {
        if config.device_count == 0 {
            return Err(Error::validation("fleet.device_count must be greater than 0"));
        }
        config.bounds.validate()?;

        let statuses: Vec<String> = config
            .statuses
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if statuses.is_empty() {
            return Err(Error::validation(
                "fleet.statuses must contain at least one non-empty status",
            ));
        }

        let devices = (1..=config.device_count)
            .map(|n| Device {
                id: format!("{}-{n:03}", config.id_prefix),
                coordinates: config.bounds.sample(rng),
                image: catalog.pick(rng).to_string(),
                status: statuses[rng.random_range(0..statuses.len())].clone(),
            })
            .collect();

        Ok(Self {
            devices,
            statuses,
            bounds: config.bounds,
        })
    }

    /// Pick a device uniformly at random, refresh it for a new alarm and
    /// return it.
    pub fn next_alarm<R: Rng + ?Sized>(
        &mut self,
        catalog: &ImageCatalog,
        rng: &mut R,
    ) -> &Device {
        let index = rng.random_range(0..self.devices.len());
        let device = &mut self.devices[index];
        device.refresh(catalog, &self.statuses, rng);
        device
    }

    /// All devices in id order.
    #[must_use]
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// The area the fleet was placed in.
    #[must_use]
    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Number of devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether the fleet has no devices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
