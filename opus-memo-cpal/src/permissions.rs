//! Microphone access probe.
//!
//! cpal has no permission API. Desktop platforms refuse access by failing
//! device or config queries, so querying the default input config is the
//! closest portable check. The real answer only comes from opening a stream.

use cpal::traits::{DeviceTrait, HostTrait};

/// Returns `true` when the host exposes a default input device whose
/// configuration can be read.
pub fn check_microphone_permission(host_id: cpal::HostId) -> bool {
    let host = match cpal::host_from_id(host_id) {
        Ok(host) => host,
        Err(e) => {
            log::warn!("Audio host unavailable: {}", e);
            return false;
        }
    };

    let Some(device) = host.default_input_device() else {
        return false;
    };

    match device.default_input_config() {
        Ok(_) => true,
        Err(e) => {
            log::warn!("Microphone config query failed: {}", e);
            false
        }
    }
}
