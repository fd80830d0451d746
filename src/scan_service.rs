//! # Scan Service Module
//!
//! Runs the scan controller on a dedicated thread and exposes it to the UI
//! through `ScanHandle`, an async command interface.
//!
//! ## Key Components
//! - `ScanService`: owns the controller, its platform and a Tokio runtime
//!   for the BLE stack
//! - `ScanHandle`: cloneable command sender; every command resolves to a
//!   success value or a `ScanError`
//! - `ScanCommand`: messages from handles to the service thread
//!
//! Commands and platform callbacks are multiplexed onto the one thread, so
//! the controller sees them strictly one after another.

use crate::btle::BtlePlatform;
use crate::controller::{ScanController, StartOutcome};
use crate::error::ScanError;
use crate::events::EventBus;
use crate::peripheral::Peripheral;
use crate::platform::{PlatformEvent, ScanPlatform, ScanSettings};
use crossbeam_channel::{never, select, unbounded, Receiver, Sender};
use tokio::runtime::Runtime;
use tokio::sync::oneshot;

#[derive(Debug)]
pub enum ScanCommand {
    Start(oneshot::Sender<Result<StartOutcome, ScanError>>),
    Stop(oneshot::Sender<Result<(), ScanError>>),
    GetDiscovered(oneshot::Sender<Vec<Peripheral>>),
}

/// Client side of the command boundary.
#[derive(Debug, Clone)]
pub struct ScanHandle {
    commands: Sender<ScanCommand>,
}

impl ScanHandle {
    pub async fn start_scan(&self) -> Result<StartOutcome, ScanError> {
        let (reply, response) = oneshot::channel();
        self.send(ScanCommand::Start(reply))?;
        response.await.map_err(|_| service_gone())?
    }

    pub async fn stop_scan(&self) -> Result<(), ScanError> {
        let (reply, response) = oneshot::channel();
        self.send(ScanCommand::Stop(reply))?;
        response.await.map_err(|_| service_gone())?
    }

    pub async fn discovered_peripherals(&self) -> Result<Vec<Peripheral>, ScanError> {
        let (reply, response) = oneshot::channel();
        self.send(ScanCommand::GetDiscovered(reply))?;
        response.await.map_err(|_| service_gone())
    }

    fn send(&self, command: ScanCommand) -> Result<(), ScanError> {
        self.commands.send(command).map_err(|_| service_gone())
    }
}

fn service_gone() -> ScanError {
    ScanError::Unavailable("Scan service is not running.".to_string())
}

/// Owns the scan controller for the lifetime of the application.
pub struct ScanService {
    commands: Receiver<ScanCommand>,
    events: EventBus,
    settings: ScanSettings,
    api_level: u32,
}

impl ScanService {
    /// Creates the service and the handle used to command it.
    pub fn new(events: EventBus, settings: ScanSettings, api_level: u32) -> (Self, ScanHandle) {
        let (command_sender, command_receiver) = unbounded();

        let service = ScanService {
            commands: command_receiver,
            events,
            settings,
            api_level,
        };

        (service, ScanHandle { commands: command_sender })
    }

    /// Runs the service against the system BLE stack.
    ///
    /// Blocks until every `ScanHandle` is dropped; call it from a spawned
    /// thread. The Tokio runtime lives here so btleplug's futures never run
    /// on the UI thread.
    pub fn run(self) {
        let rt = match Runtime::new() {
            Ok(runtime) => runtime,
            Err(e) => {
                log::error!("Scan service: failed to create async runtime: {}", e);
                return;
            }
        };

        let (platform_sender, platform_receiver) = unbounded();
        let platform = BtlePlatform::connect(rt.handle().clone(), platform_sender, self.api_level);
        self.run_with(platform, platform_receiver);
    }

    /// Runs the command loop with an arbitrary platform.
    pub fn run_with<P: ScanPlatform>(self, platform: P, platform_events: Receiver<PlatformEvent>) {
        let mut controller = ScanController::new(platform, self.settings, self.events);
        let mut callbacks_open = true;

        loop {
            let callbacks = if callbacks_open {
                platform_events.clone()
            } else {
                never()
            };

            select! {
                recv(self.commands) -> command => match command {
                    Ok(command) => Self::dispatch(&mut controller, command),
                    Err(_) => break,
                },
                recv(callbacks) -> event => match event {
                    Ok(event) => controller.handle_platform_event(event),
                    Err(_) => {
                        log::warn!("Scan service: platform callback channel closed");
                        callbacks_open = false;
                    }
                },
            }
        }

        if controller.state() == crate::controller::ScanState::Scanning {
            if let Err(e) = controller.stop_scan() {
                log::warn!("Scan service: failed to stop scan on shutdown: {}", e);
            }
        }
        log::info!("Scan service: command channel closed, shutting down");
    }

    fn dispatch<P: ScanPlatform>(controller: &mut ScanController<P>, command: ScanCommand) {
        match command {
            ScanCommand::Start(reply) => {
                let result = controller.start_scan();
                if let Err(e) = &result {
                    log::info!("Scan service: start rejected: {}", e);
                }
                let _ = reply.send(result);
            }
            ScanCommand::Stop(reply) => {
                let _ = reply.send(controller.stop_scan());
            }
            ScanCommand::GetDiscovered(reply) => {
                let _ = reply.send(controller.discovered_peripherals());
            }
        }
    }
}
