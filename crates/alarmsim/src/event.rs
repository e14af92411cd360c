//! Alarm event payloads.
//!
//! Events use a flat envelope (`id`, `eventType`, `subject`, `eventTime`,
//! `dataVersion`) around the device's alarm data, and are always posted as a
//! JSON array, one event per request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::EventConfig;
use crate::device::Device;

/// Alarm details carried in the event's `data` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmData {
    /// The device that raised the alarm.
    pub device_id: String,
    /// Device latitude in decimal degrees.
    pub latitude: f64,
    /// Device longitude in decimal degrees.
    pub longitude: f64,
    /// Absolute URL of the image captured with the alarm.
    pub image: String,
    /// Human-readable alarm status.
    pub status: String,
}

/// One alarm event as posted to the ingestion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmEvent {
    /// Unique identifier for this event.
    pub id: Uuid,
    /// Event type discriminator.
    pub event_type: String,
    /// Resource path the event is about, e.g. `devices/alarm-device-001`.
    pub subject: String,
    /// When the alarm was raised.
    pub event_time: DateTime<Utc>,
    /// Schema version of `data`.
    pub data_version: String,
    /// The alarm itself.
    pub data: AlarmData,
}

impl AlarmEvent {
    /// Build an event from a device's current alarm state, stamped now.
    #[must_use]
    pub fn from_device(device: &Device, config: &EventConfig) -> Self {
        Self::at(device, config, Utc::now())
    }

    /// Build an event with an explicit timestamp.
    #[must_use]
    pub fn at(device: &Device, config: &EventConfig, event_time: DateTime<Utc>) -> Self {
        let prefix = config.subject_prefix.trim_end_matches('/');
        let subject = if prefix.is_empty() {
            device.id.clone()
        } else {
            format!("{prefix}/{}", device.id)
        };

        Self {
            id: Uuid::new_v4(),
            event_type: config.event_type.clone(),
            subject,
            event_time,
            data_version: config.data_version.clone(),
            data: AlarmData {
                device_id: device.id.clone(),
                latitude: device.coordinates.latitude,
                longitude: device.coordinates.longitude,
                image: device.image.clone(),
                status: device.status.clone(),
            },
        }
    }

    /// Wrap this event in the single-element batch the endpoint expects.
    #[must_use]
    pub fn batch(self) -> Vec<AlarmEvent> {
        vec![self]
    }
}
