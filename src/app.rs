use crate::config::Config;
use crate::controller::StartOutcome;
use crate::error::ScanError;
use crate::events::{EventBus, EventKind, ScanEvent, Subscription as EventSubscription};
use crate::peripheral::Peripheral;
use crate::scan_service::ScanHandle;
use crate::ui::peripheral_list::{row_label, PeripheralList};
use crate::ui::styles;
use iced::widget::{button, column, container, row, scrollable, text};
use iced::{Element, Length, Subscription, Task};

/// Acknowledgment shown when a scan starts or stops.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub title: &'static str,
    pub body: &'static str,
    pub at: String,
}

impl Notice {
    fn new(title: &'static str, body: &'static str) -> Self {
        Self {
            title,
            body,
            at: chrono::Local::now().format("%H:%M:%S").to_string(),
        }
    }
}

/// Events the list view reacts to. Dropping the subscription removes the
/// listener for all of them.
const VIEW_EVENTS: [EventKind; 3] = [
    EventKind::PeripheralDiscovered,
    EventKind::ScanStarted,
    EventKind::ScanStopped,
];

// Iced Application State
pub struct BleScan {
    scan: ScanHandle,
    events: EventSubscription,
    pub peripherals: PeripheralList,
    pub is_scanning: bool,
    pub notice: Option<Notice>,
    config: Config,
}

#[derive(Debug, Clone)]
pub enum Message {
    Tick,
    StartScan,
    StopScan,
    ScanStartResult(Result<StartOutcome, ScanError>),
    ScanStopResult(Result<(), ScanError>),
    SessionSnapshot(Result<Vec<Peripheral>, ScanError>),
    DismissNotice,
    MuteNotices,
}

impl BleScan {
    pub fn new(scan: ScanHandle, events: &EventBus, config: &Config) -> (Self, Task<Message>) {
        (
            BleScan {
                scan,
                events: events.subscribe_all(&VIEW_EVENTS),
                peripherals: PeripheralList::new(),
                is_scanning: false,
                notice: None,
                config: config.clone(),
            },
            Task::none(),
        )
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => {
                for event in self.events.drain() {
                    self.apply_event(event);
                }
                Task::none()
            }
            Message::StartScan => {
                let scan = self.scan.clone();
                Task::perform(async move { scan.start_scan().await }, Message::ScanStartResult)
            }
            Message::StopScan => {
                let scan = self.scan.clone();
                Task::perform(async move { scan.stop_scan().await }, Message::ScanStopResult)
            }
            Message::ScanStartResult(result) => {
                // Rejections are logged, not shown
                match result {
                    Ok(outcome) => log::debug!("Start scan resolved: {:?}", outcome),
                    Err(e) => log::warn!("Failed to start scan: {}", e),
                }
                Task::none()
            }
            Message::ScanStopResult(result) => match result {
                Ok(()) => {
                    let scan = self.scan.clone();
                    Task::perform(
                        async move { scan.discovered_peripherals().await },
                        Message::SessionSnapshot,
                    )
                }
                Err(e) => {
                    log::warn!("Failed to stop scan: {}", e);
                    Task::none()
                }
            },
            Message::SessionSnapshot(result) => {
                match result {
                    Ok(peripherals) => {
                        log::info!("Scan session ended with {} unique peripherals", peripherals.len());
                        for p in &peripherals {
                            log::debug!("  {} {} RSSI {}", p.id, p.name, p.rssi);
                        }
                    }
                    Err(e) => log::warn!("Could not read discovered peripherals: {}", e),
                }
                Task::none()
            }
            Message::DismissNotice => {
                self.notice = None;
                Task::none()
            }
            Message::MuteNotices => {
                self.notice = None;
                self.config.show_scan_notices = false;
                if let Err(e) = self.config.save() {
                    log::warn!("Failed to save settings: {}", e);
                }
                Task::none()
            }
        }
    }

    fn apply_event(&mut self, event: ScanEvent) {
        match event {
            ScanEvent::PeripheralDiscovered(peripheral) => {
                log::debug!("UI: peripheral {:?}", peripheral);
                self.peripherals.insert(peripheral);
            }
            ScanEvent::ScanStarted => {
                self.is_scanning = true;
                if self.config.show_scan_notices {
                    self.notice = Some(Notice::new("Scan Started", "BLE scanning has started."));
                }
            }
            ScanEvent::ScanStopped => {
                self.is_scanning = false;
                if self.config.show_scan_notices {
                    self.notice = Some(Notice::new("Scan Stopped", "BLE scanning has stopped."));
                }
            }
            ScanEvent::ScanFailed { .. } => {}
        }
    }

    pub fn subscription(&self) -> Subscription<Message> {
        iced::time::every(std::time::Duration::from_millis(16)).map(|_| Message::Tick)
    }

    pub fn view(&'_ self) -> Element<'_, Message> {
        let content = match &self.notice {
            Some(notice) => Self::notice_view(notice),
            None => self.list_view(),
        };

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .padding(20)
            .into()
    }

    fn list_view(&self) -> Element<'_, Message> {
        let (label, message) = if self.is_scanning {
            ("Stop Scan", Message::StopScan)
        } else {
            ("Start Scan", Message::StartScan)
        };

        let toggle = button(text(label))
            .on_press(message)
            .padding(10)
            .width(Length::Fill)
            .style(styles::scan_toggle_style(self.is_scanning));

        let status = text(format!("{} device(s) found", self.peripherals.len())).size(14);

        let device_list: Element<'_, Message> = if self.peripherals.is_empty() {
            text("No devices found. Press 'Start Scan' to look for nearby devices.").into()
        } else {
            let rows = self
                .peripherals
                .rows()
                .iter()
                .map(|peripheral| text(row_label(peripheral)).size(16).into());
            scrollable(column(rows).spacing(6)).height(Length::Fill).into()
        };

        column![toggle, status, device_list].spacing(10).into()
    }

    fn notice_view(notice: &Notice) -> Element<'_, Message> {
        let dialog = column![
            text(notice.title).size(20),
            text(notice.body),
            text(&notice.at).size(12),
            row![
                button(text("OK")).on_press(Message::DismissNotice).padding(8),
                button(text("Don't show again"))
                    .on_press(Message::MuteNotices)
                    .padding(8),
            ]
            .spacing(10),
        ]
        .spacing(10);

        container(
            container(dialog)
                .padding(20)
                .max_width(320.0)
                .style(styles::notice_style),
        )
        .center(Length::Fill)
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::ScanSettings;
    use crate::scan_service::ScanService;

    fn app(show_notices: bool) -> (BleScan, EventBus) {
        let bus = EventBus::new();
        let (_service, handle) = ScanService::new(bus.clone(), ScanSettings::default(), 31);
        let config = Config {
            show_scan_notices: show_notices,
            ..Config::default()
        };
        let (app, _) = BleScan::new(handle, &bus, &config);
        (app, bus)
    }

    fn discovered(id: &str, rssi: i32) -> ScanEvent {
        ScanEvent::PeripheralDiscovered(Peripheral {
            id: id.to_string(),
            name: "Tag".to_string(),
            rssi,
            advertisement_data: None,
        })
    }

    #[test]
    fn test_events_update_view_state() {
        let (mut app, bus) = app(false);

        bus.emit(ScanEvent::ScanStarted);
        bus.emit(discovered("AA:BB", -60));
        bus.emit(discovered("AA:BB", -55));
        bus.emit(discovered("CC:DD", -80));
        let _ = app.update(Message::Tick);

        assert!(app.is_scanning);
        assert_eq!(app.peripherals.len(), 2);
        assert_eq!(app.peripherals.rows()[0].rssi, -60);
        assert!(app.notice.is_none());

        bus.emit(ScanEvent::ScanStopped);
        let _ = app.update(Message::Tick);
        assert!(!app.is_scanning);
    }

    #[test]
    fn test_scan_notices_need_acknowledgment() {
        let (mut app, bus) = app(true);

        bus.emit(ScanEvent::ScanStarted);
        let _ = app.update(Message::Tick);
        assert_eq!(app.notice.as_ref().map(|n| n.title), Some("Scan Started"));

        let _ = app.update(Message::DismissNotice);
        assert!(app.notice.is_none());
    }

    #[test]
    fn test_start_rejection_is_not_surfaced() {
        let (mut app, _bus) = app(true);

        let _ = app.update(Message::ScanStartResult(Err(ScanError::PermissionDenied(
            "Permissions denied: [BLUETOOTH_SCAN]".into(),
        ))));

        assert!(app.notice.is_none());
        assert!(!app.is_scanning);
    }

    #[test]
    fn test_teardown_unsubscribes() {
        let (app, bus) = app(false);
        assert_eq!(bus.listener_count(EventKind::PeripheralDiscovered), 1);
        assert_eq!(bus.listener_count(EventKind::ScanStarted), 1);
        assert_eq!(bus.listener_count(EventKind::ScanStopped), 1);

        drop(app);

        assert_eq!(bus.listener_count(EventKind::PeripheralDiscovered), 0);
        assert_eq!(bus.listener_count(EventKind::ScanStarted), 0);
        assert_eq!(bus.listener_count(EventKind::ScanStopped), 0);
    }
}
