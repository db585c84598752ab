//! Audio device enumeration through the cpal host.

use cpal::traits::{DeviceTrait, HostTrait};

use opus_memo_core::{AudioDevice, AudioError, DeviceDirection};

use crate::error::CpalError;

/// Lists input and output devices of one cpal host.
pub struct DeviceEnumerator {
    host: cpal::Host,
}

impl DeviceEnumerator {
    /// Enumerator over the platform's default host.
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    pub fn with_host(host_id: cpal::HostId) -> Result<Self, AudioError> {
        let host = cpal::host_from_id(host_id).map_err(CpalError::from)?;
        Ok(Self { host })
    }

    pub fn host_name(&self) -> &'static str {
        self.host.id().name()
    }

    /// List input (microphone) devices.
    pub fn list_input_devices(&self) -> Result<Vec<AudioDevice>, AudioError> {
        let default = self.host.default_input_device().and_then(|d| d.name().ok());
        let devices = self.host.input_devices().map_err(CpalError::from)?;
        Ok(describe(devices, DeviceDirection::Input, default))
    }

    /// List output (speaker/headphone) devices.
    pub fn list_output_devices(&self) -> Result<Vec<AudioDevice>, AudioError> {
        let default = self.host.default_output_device().and_then(|d| d.name().ok());
        let devices = self.host.output_devices().map_err(CpalError::from)?;
        Ok(describe(devices, DeviceDirection::Output, default))
    }
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

fn describe(
    devices: impl Iterator<Item = cpal::Device>,
    direction: DeviceDirection,
    default: Option<String>,
) -> Vec<AudioDevice> {
    devices
        .filter_map(|device| device.name().ok())
        .map(|name| AudioDevice {
            id: name.clone(),
            is_default: default.as_deref() == Some(name.as_str()),
            name,
            direction,
        })
        .collect()
}

/// Find a device by name, or the host default when `name` is `None`.
pub(crate) fn find_device(
    host: &cpal::Host,
    direction: DeviceDirection,
    name: Option<&str>,
) -> Result<cpal::Device, CpalError> {
    match (direction, name) {
        (DeviceDirection::Input, None) => host.default_input_device().ok_or(CpalError::NoDevice("input")),
        (DeviceDirection::Output, None) => host.default_output_device().ok_or(CpalError::NoDevice("output")),
        (DeviceDirection::Input, Some(wanted)) => host
            .input_devices()?
            .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
            .ok_or_else(|| CpalError::DeviceNotFound(wanted.to_string())),
        (DeviceDirection::Output, Some(wanted)) => host
            .output_devices()?
            .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
            .ok_or_else(|| CpalError::DeviceNotFound(wanted.to_string())),
    }
}
