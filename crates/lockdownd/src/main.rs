mod cli;
mod error;
mod idle;
mod locker;
mod logging;

use std::fs;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use crossbeam_channel::{bounded, select, tick};
use lockdown_gamepad::{BindingSet, Hook, HookConfig};

use crate::cli::Cli;
use crate::error::AppError;
use crate::idle::IdleClock;
use crate::locker::Locker;

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::setup(cli.verbose, cli.no_color) {
        log::error!("{e}");
        return ExitCode::FAILURE;
    }
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), AppError> {
    let clock = Arc::new(IdleClock::new(cli.idle_timeout()));
    let locker = Locker::new(cli.lock_command.clone());

    let mut hook = Hook::new();
    hook.set_config(hook_config(cli)?)?;
    install_handlers(&mut hook, &clock);
    hook.start()?;

    // Handle Ctrl+C to exit cleanly
    let (stop_tx, stop_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })?;

    print_info!(
        "lockdownd started. Locking after {} min of inactivity.",
        clock.timeout().as_secs() / 60
    );
    let ticker = tick(Duration::from_secs(1));
    loop {
        select! {
            recv(stop_rx) -> _ => {
                break;
            }
            recv(ticker) -> _ => {
                if clock.is_expired() {
                    print_info!("idle timeout reached, locking");
                    if let Err(e) = locker.lock() {
                        print_error!("{e}");
                    }
                    clock.touch();
                } else {
                    print_debug!("locking in {}s", clock.remaining().as_secs());
                }
            }
        }
    }

    hook.stop();
    print_info!("lockdownd stopped.");
    Ok(())
}

fn hook_config(cli: &Cli) -> Result<HookConfig, AppError> {
    let mut config = HookConfig {
        sleep_time: cli.poll_interval(),
        axis_deadzone: cli.deadzone.clamp(0.0, 1.0),
        ..HookConfig::default()
    };
    match cli.rescan_interval() {
        Some(interval) => config.plug_and_play_interval = interval,
        None => config.plug_and_play = false,
    }
    if let Some(path) = &cli.bindings {
        let document = fs::read_to_string(path).map_err(|source| AppError::ReadBindings {
            path: path.clone(),
            source,
        })?;
        config.bindings = BindingSet::parse(&document).map_err(|source| AppError::Bindings {
            path: path.clone(),
            source,
        })?;
        print_debug!(
            "loaded {} bindings from {}",
            config.bindings.len(),
            path.display()
        );
    }
    Ok(config)
}

/// Buttons and hot-plug count as activity. Sticks drift, so axes are only
/// logged.
fn install_handlers(hook: &mut Hook, clock: &Arc<IdleClock>) {
    let activity = Arc::clone(clock);
    hook.set_button_event_handler(move |device| {
        activity.touch();
        if let Some(event) = device.last_button_event() {
            let phase = if event.is_pressed() { "pressed" } else { "released" };
            print_debug!("{}: button {} {phase}", device.name(), event.vc);
        }
    });

    hook.set_axis_event_handler(|device| {
        if let Some(event) = device.last_axis_event() {
            print_debug!(
                "{}: axis {} at {:.2}",
                device.name(),
                event.vc,
                event.virtual_value
            );
        }
    });

    let activity = Arc::clone(clock);
    hook.set_connect_event_handler(move |device| {
        activity.touch();
        print_info!(
            "gamepad connected: {} ({}, {:?})",
            device.name(),
            device.id(),
            device.kind()
        );
    });

    let activity = Arc::clone(clock);
    hook.set_disconnect_event_handler(move |device| {
        activity.touch();
        print_info!("gamepad disconnected: {} ({})", device.name(), device.id());
    });
}
