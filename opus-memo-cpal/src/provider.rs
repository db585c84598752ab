use cpal::traits::{DeviceTrait, HostTrait};

use opus_memo_core::{AudioDevice, AudioDeviceProvider, AudioError, DeviceDirection, InputStream, OutputStream, StreamFormat};

use crate::cpal_input::CpalInputStream;
use crate::cpal_output::CpalOutputStream;
use crate::device_enumerator::find_device;

/// Opens cpal devices for a `VoiceSession`.
///
/// Holds only the host id and device names; every open looks the device up
/// again, so a provider stays valid across hot-plug events.
#[derive(Debug, Clone)]
pub struct CpalDeviceProvider {
    host_id: cpal::HostId,
    input_device: Option<String>,
    output_device: Option<String>,
}

impl CpalDeviceProvider {
    /// Default input and output devices of the platform's default host.
    pub fn default_devices() -> Self {
        Self {
            host_id: cpal::default_host().id(),
            input_device: None,
            output_device: None,
        }
    }

    /// Use the input device with this exact name instead of the default.
    pub fn with_input_device(mut self, name: impl Into<String>) -> Self {
        self.input_device = Some(name.into());
        self
    }

    /// Use the output device with this exact name instead of the default.
    pub fn with_output_device(mut self, name: impl Into<String>) -> Self {
        self.output_device = Some(name.into());
        self
    }

    pub fn host_id(&self) -> cpal::HostId {
        self.host_id
    }

    fn describe(&self, direction: DeviceDirection) -> Option<AudioDevice> {
        let host = cpal::host_from_id(self.host_id).ok()?;
        let wanted = match direction {
            DeviceDirection::Input => self.input_device.as_deref(),
            DeviceDirection::Output => self.output_device.as_deref(),
        };
        let device = find_device(&host, direction, wanted).ok()?;
        let name = device.name().ok()?;
        let default_name = match direction {
            DeviceDirection::Input => host.default_input_device(),
            DeviceDirection::Output => host.default_output_device(),
        }
        .and_then(|d| d.name().ok());

        Some(AudioDevice {
            id: name.clone(),
            is_default: default_name.as_deref() == Some(name.as_str()),
            name,
            direction,
        })
    }
}

impl Default for CpalDeviceProvider {
    fn default() -> Self {
        Self::default_devices()
    }
}

impl AudioDeviceProvider for CpalDeviceProvider {
    fn open_input(&self, format: &StreamFormat) -> Result<Box<dyn InputStream>, AudioError> {
        let stream = CpalInputStream::open(self.host_id, self.input_device.clone(), *format)?;
        log::info!("Input '{}' open", stream.device_name());
        Ok(Box::new(stream))
    }

    fn open_output(&self, format: &StreamFormat) -> Result<Box<dyn OutputStream>, AudioError> {
        let stream = CpalOutputStream::open(self.host_id, self.output_device.clone(), *format)?;
        log::info!("Output '{}' open", stream.device_name());
        Ok(Box::new(stream))
    }

    fn input_info(&self) -> Option<AudioDevice> {
        self.describe(DeviceDirection::Input)
    }

    fn output_info(&self) -> Option<AudioDevice> {
        self.describe(DeviceDirection::Output)
    }
}
