//! Audio device selection over cpal. Picks the named device when one is
//! requested, otherwise the host default.

use anyhow::{Context, Result, anyhow};
use cpal::Device;
use cpal::traits::{DeviceTrait, HostTrait};

fn get_host() -> cpal::Host {
    cpal::default_host()
}

/// Returns the input device with the given name, or the host's default
/// input device when no name is provided.
pub fn get_or_default_input(device_name: Option<String>) -> Result<Device> {
    let host = get_host();
    tracing::debug!("Audio host: {:?}", host.id());

    let Some(target) = device_name else {
        return host
            .default_input_device()
            .ok_or_else(|| anyhow!("No default audio input device available"));
    };

    host.input_devices()
        .context("Failed to enumerate input devices")?
        .find(|device| device.name().is_ok_and(|name| name == target))
        .ok_or_else(|| anyhow!("No input device named '{target}' found"))
}

/// Returns the output device with the given name, or the host's default
/// output device when no name is provided.
pub fn get_or_default_output(device_name: Option<String>) -> Result<Device> {
    let host = get_host();
    tracing::debug!("Audio host: {:?}", host.id());

    let Some(target) = device_name else {
        return host
            .default_output_device()
            .ok_or_else(|| anyhow!("No default audio output device available"));
    };

    host.output_devices()
        .context("Failed to enumerate output devices")?
        .find(|device| device.name().is_ok_and(|name| name == target))
        .ok_or_else(|| anyhow!("No output device named '{target}' found"))
}
