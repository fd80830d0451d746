// Hide console window on Windows in release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod advertisement;
mod app;
mod btle;
mod config;
mod controller;
mod error;
mod events;
mod peripheral;
mod permissions;
mod platform;
mod scan_service;
mod ui;

use app::BleScan;
use config::Config;
use events::EventBus;
use iced::Theme;
use scan_service::ScanService;

fn main() -> iced::Result {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load().unwrap_or_else(|e| {
        log::warn!("{}; using default settings", e);
        Config::default()
    });

    // Scan events fan out from the scan service thread to the UI
    let events = EventBus::new();
    let (service, scan) = ScanService::new(events.clone(), config.scan_settings(), config.api_level);

    std::thread::spawn(move || {
        service.run();
    });

    iced::application("BLE Scanner", BleScan::update, BleScan::view)
        .subscription(BleScan::subscription)
        .theme(|_| Theme::Light)
        .window_size((480.0, 720.0))
        .run_with(move || BleScan::new(scan, &events, &config))
}
