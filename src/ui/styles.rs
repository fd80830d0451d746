//! # UI Styling Module
//!
//! Styling for the scan toggle and the scan notice dialog.

use iced::widget::{button, container};
use iced::{Background, Border, Color};

fn toggle_style(base: Color, border: Color) -> button::Style {
    button::Style {
        background: Some(Background::Color(base)),
        text_color: Color::WHITE,
        border: Border {
            color: border,
            width: 1.0,
            radius: 4.0.into(),
        },
        ..Default::default()
    }
}

/// Green while idle ("Start Scan"), red while scanning ("Stop Scan").
pub fn scan_toggle_style(is_scanning: bool) -> impl Fn(&iced::Theme, button::Status) -> button::Style {
    move |_theme: &iced::Theme, status: button::Status| {
        let (r, g, b) = if is_scanning { (0.8, 0.2, 0.2) } else { (0.2, 0.7, 0.2) };
        let shade = match status {
            button::Status::Active => 0.0,
            button::Status::Hovered => 0.1,
            button::Status::Pressed => -0.05,
            button::Status::Disabled => {
                return toggle_style(Color::from_rgb(0.3, 0.3, 0.3), Color::from_rgb(0.4, 0.4, 0.4));
            }
        };
        let tint = |c: f32, extra: f32| (c + shade + extra).clamp(0.0, 1.0);
        toggle_style(
            Color::from_rgb(tint(r, 0.0), tint(g, 0.0), tint(b, 0.0)),
            Color::from_rgb(tint(r, 0.1), tint(g, 0.1), tint(b, 0.1)),
        )
    }
}

pub fn notice_style(_theme: &iced::Theme) -> container::Style {
    container::Style {
        background: Some(Background::Color(Color::WHITE)),
        text_color: Some(Color::BLACK),
        border: Border {
            color: Color::from_rgb(0.5, 0.5, 0.5),
            width: 1.0,
            radius: 8.0.into(),
        },
        ..Default::default()
    }
}
