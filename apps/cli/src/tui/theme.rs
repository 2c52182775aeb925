//! Theme system for the TUI.
//!
//! Provides the RAG Master brand theme and a terminal-adaptive theme that
//! respects the user's terminal color scheme.

use ratatui::style::Color;
use std::env;

/// Check if the terminal supports true color (24-bit RGB).
fn supports_true_color() -> bool {
    if let Ok(colorterm) = env::var("COLORTERM") {
        let ct = colorterm.to_lowercase();
        if ct == "truecolor" || ct == "24bit" {
            return true;
        }
    }

    if let Ok(term) = env::var("TERM") {
        let t = term.to_lowercase();
        if t.contains("truecolor") || t.contains("24bit") || t.contains("direct") {
            return true;
        }
    }

    false
}

/// Theme mode selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThemeMode {
    /// RAG Master brand theme (dark mode)
    #[default]
    RagMaster,
    /// Terminal-adaptive theme using ANSI colors
    Terminal,
}

/// Color palette for the TUI.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    // Backgrounds
    pub bg: Color,
    pub bg_panel: Color,
    pub bg_selection: Color,

    // Borders
    pub border: Color,
    pub border_active: Color,

    // Text
    pub text: Color,
    pub text_secondary: Color,
    pub text_muted: Color,

    pub accent: Color,

    // Semantic colors
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
}

impl Theme {
    /// Brand theme, RGB when the terminal supports it and the 256-color
    /// palette otherwise.
    pub fn ragmaster() -> Self {
        if supports_true_color() {
            Self::ragmaster_rgb()
        } else {
            Self::ragmaster_256()
        }
    }

    fn ragmaster_rgb() -> Self {
        Self {
            bg: Color::Rgb(0x0B, 0x10, 0x1A),
            bg_panel: Color::Rgb(0x16, 0x1D, 0x2B),
            bg_selection: Color::Rgb(0x2A, 0x34, 0x48),

            border: Color::Rgb(0x3D, 0x48, 0x5E),
            border_active: Color::Rgb(0x6C, 0x9E, 0xF8), // brand blue

            text: Color::Rgb(0xFF, 0xFF, 0xFF),
            text_secondary: Color::Rgb(0xD8, 0xDE, 0xE9),
            text_muted: Color::Rgb(0x93, 0x9D, 0xB0),

            accent: Color::Rgb(0x6C, 0x9E, 0xF8),

            success: Color::Rgb(0x7E, 0xD9, 0x9B),
            warning: Color::Rgb(0xF2, 0xC9, 0x4C),
            error: Color::Rgb(0xE8, 0x8E, 0x8E),
            info: Color::Rgb(0x8E, 0xB2, 0xEB),
        }
    }

    /// For terminals like macOS Terminal.app that don't support true color.
    fn ragmaster_256() -> Self {
        // 232-255: grayscale, 16-231: 6x6x6 color cube
        Self {
            bg: Color::Indexed(233),
            bg_panel: Color::Indexed(235),
            bg_selection: Color::Indexed(238),

            border: Color::Indexed(240),
            border_active: Color::Indexed(75),

            text: Color::Indexed(255),
            text_secondary: Color::Indexed(252),
            text_muted: Color::Indexed(246),

            accent: Color::Indexed(75),

            success: Color::Indexed(114),
            warning: Color::Indexed(221),
            error: Color::Indexed(210),
            info: Color::Indexed(111),
        }
    }

    /// Create a terminal-adaptive theme using ANSI colors.
    pub fn terminal() -> Self {
        Self {
            bg: Color::Reset,
            bg_panel: Color::Reset,
            bg_selection: Color::DarkGray,

            border: Color::DarkGray,
            border_active: Color::Blue,

            text: Color::Reset,
            text_secondary: Color::Gray,
            text_muted: Color::DarkGray,

            accent: Color::Blue,

            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            info: Color::Cyan,
        }
    }

    /// Get theme based on mode.
    pub fn from_mode(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::RagMaster => Self::ragmaster(),
            ThemeMode::Terminal => Self::terminal(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::ragmaster()
    }
}
