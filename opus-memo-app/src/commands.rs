use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};

use opus_memo_core::{AudioDevice, CodecConfiguration, VoiceSession};
use opus_memo_cpal::{permissions, CpalDeviceProvider, DeviceEnumerator};

use crate::delegate::ConsoleDelegate;
use crate::RecordArgs;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub fn list_devices() -> anyhow::Result<()> {
    let enumerator = DeviceEnumerator::new();
    println!("Host: {}", enumerator.host_name());

    let inputs = enumerator.list_input_devices().context("listing input devices")?;
    let outputs = enumerator.list_output_devices().context("listing output devices")?;
    print_devices("Input devices", &inputs);
    print_devices("Output devices", &outputs);
    Ok(())
}

fn print_devices(title: &str, devices: &[AudioDevice]) {
    println!("{}:", title);
    if devices.is_empty() {
        println!("  (none)");
    }
    for device in devices {
        let marker = if device.is_default { " (default)" } else { "" };
        println!("  {}{}", device.name, marker);
    }
}

fn load_config(args: &RecordArgs) -> anyhow::Result<CodecConfiguration> {
    match &args.config {
        Some(path) => CodecConfiguration::from_json_file(path)
            .with_context(|| format!("loading codec configuration from {}", path.display())),
        None => Ok(CodecConfiguration::default()),
    }
}

pub fn record_and_play(args: &RecordArgs) -> anyhow::Result<()> {
    if !(args.seconds > 0.0) {
        bail!("--seconds must be positive, got {}", args.seconds);
    }
    let config = load_config(args)?;

    let mut provider = CpalDeviceProvider::default_devices();
    if let Some(name) = &args.input {
        provider = provider.with_input_device(name.clone());
    }
    if let Some(name) = &args.output {
        provider = provider.with_output_device(name.clone());
    }
    if args.input.is_none() && !permissions::check_microphone_permission(provider.host_id()) {
        log::warn!("Default microphone looks inaccessible; check OS privacy settings");
    }

    let mut session = VoiceSession::new(provider, config).context("creating session")?;
    let delegate = Arc::new(ConsoleDelegate::new(args.events));
    session.set_delegate(delegate.clone());

    if let Some(device) = session.input_device() {
        log::info!("Recording from '{}' for {:.1}s", device.name, args.seconds);
    }
    session.start_recording().context("starting capture")?;

    let deadline = Instant::now() + Duration::from_secs_f64(args.seconds);
    while session.is_recording() && Instant::now() < deadline {
        thread::sleep(POLL_INTERVAL);
    }
    session.stop_recording();

    let stored = session.frame_store().len();
    if stored == 0 {
        bail!("nothing was recorded");
    }

    if let Some(device) = session.output_device() {
        log::info!("Playing {} frames on '{}'", stored, device.name);
    }
    session.start_playback().context("starting playback")?;
    session.wait_for_playback();

    let diagnostics = session.diagnostics();
    log::debug!("Diagnostics: {:?}", diagnostics);

    if !args.events {
        if let Some(summary) = delegate.recording() {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        if let Some(summary) = delegate.playback() {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    let errors = delegate.errors();
    if !errors.is_empty() {
        bail!("session reported {} error(s): {}", errors.len(), errors.join("; "));
    }
    Ok(())
}
