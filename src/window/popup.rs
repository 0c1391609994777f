//! Popup windows: placement, feature strings and opening
//!
//! A popup is a child context like an iframe. It is opened through a
//! [`WindowOpener`], positioned with [`PopupPlacement`], and then driven by a
//! parent-role [`Channel`].

use super::{Inbox, WindowOpener};
use crate::channel::{Channel, ChannelConfig};
use crate::types::{EventMap, Origin};
use crate::{FrameError, Result};

/// Window name passed to `window.open`
pub const POPUP_WINDOW_NAME: &str = "popupWindow";

/// Screen and opener window geometry, in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenGeometry {
    /// `screen.width`
    pub screen_width: i32,
    /// `screen.height`
    pub screen_height: i32,
    /// `window.screenX`
    pub screen_x: i32,
    /// `window.screenY`
    pub screen_y: i32,
    /// `window.outerWidth`
    pub outer_width: i32,
    /// `window.outerHeight`
    pub outer_height: i32,
}

/// Top-left corner of a popup in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupPosition {
    pub top: i32,
    pub left: i32,
}

/// Centers popups on the screen or on the opener window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupPlacement {
    cross_origin: bool,
}

impl PopupPlacement {
    /// Cross-origin popups center on the full screen, same-origin ones on the opener
    pub fn new(cross_origin: bool) -> Self {
        Self { cross_origin }
    }

    /// Compute the position of a `width` x `height` popup
    pub fn position(&self, width: i32, height: i32, geometry: &ScreenGeometry) -> PopupPosition {
        if self.cross_origin {
            PopupPosition {
                top: (geometry.screen_height - height) / 2,
                left: (geometry.screen_width - width) / 2,
            }
        } else {
            PopupPosition {
                top: geometry.screen_y + (geometry.outer_height - height) / 2,
                left: geometry.screen_x + (geometry.outer_width - width) / 2,
            }
        }
    }
}

/// Popup size and placement options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupOptions {
    pub width: i32,
    pub height: i32,
    pub cross_origin: bool,
}

impl PopupOptions {
    /// Create options for a same-origin popup of the given size
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            cross_origin: false,
        }
    }

    /// Center on the full screen instead of the opener
    pub fn with_cross_origin(mut self, cross_origin: bool) -> Self {
        self.cross_origin = cross_origin;
        self
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if self.width <= 0 || self.height <= 0 {
            return Err(FrameError::config(format!(
                "Popup size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Build the `window.open` feature string for a popup
///
/// Firefox and Chrome after version 99 only open a real popup when the string
/// starts with `popup=true`.
pub fn popup_features(options: &PopupOptions, geometry: &ScreenGeometry, user_agent: &str) -> String {
    let position = PopupPlacement::new(options.cross_origin).position(
        options.width,
        options.height,
        geometry,
    );

    let prefix = if needs_popup_flag(user_agent) {
        "popup=true,"
    } else {
        ""
    };

    format!(
        "{}height={},width={},left={},top={},resizable=yes,scrollbars=yes,toolbar=yes,menubar=true,location=no,directories=no,status=yes",
        prefix, options.height, options.width, position.left, position.top
    )
}

fn needs_popup_flag(user_agent: &str) -> bool {
    is_firefox(user_agent) || chrome_version(user_agent).is_some_and(|v| v > 99)
}

fn is_firefox(user_agent: &str) -> bool {
    user_agent.to_lowercase().contains("firefox")
}

/// Major version from a `Chrome/NN.` or `Chromium/NN.` token
fn chrome_version(user_agent: &str) -> Option<u32> {
    ["Chrome/", "Chromium/"].iter().find_map(|token| {
        let start = user_agent.find(token)? + token.len();
        let rest = &user_agent[start..];
        let end = rest.find('.')?;
        rest[..end].parse().ok()
    })
}

/// Open `url` in a popup and attach a parent-role channel to it
///
/// Without an explicit `config`, the channel targets the url's origin. The
/// returned inbox carries frames the popup posts back; feed it to
/// [`Channel::listen`].
pub fn open_popup<I, O>(
    opener: &dyn WindowOpener,
    url: &str,
    options: &PopupOptions,
    geometry: &ScreenGeometry,
    user_agent: &str,
    config: Option<ChannelConfig>,
) -> Result<(Channel<I, O>, Inbox)>
where
    I: EventMap,
    O: EventMap,
{
    options.validate()?;
    let url_origin = Origin::from_url(url)?;
    let config = match config {
        Some(config) => config,
        None => ChannelConfig::from_origin(url_origin),
    };

    let features = popup_features(options, geometry, user_agent);
    tracing::debug!(url, features = %features, "Opening popup");

    let opened = opener.open(url, POPUP_WINDOW_NAME, &features)?;
    let channel = Channel::parent(config, opened.transport)?;
    Ok((channel, opened.inbox))
}
