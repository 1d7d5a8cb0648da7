//! Layer view configuration

use std::time::Duration;

/// Default quiet window for coalescing change notifications.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(40);

/// Default delay between the expand stage and applying selection/scroll.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1);

/// Timing and behaviour settings for a [`LayerView`](crate::LayerView).
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use layer_view::LayerViewConfig;
///
/// let config = LayerViewConfig::default()
///     .with_debounce_window(Duration::from_millis(100))
///     .with_reveal_selection(false);
/// assert_eq!(config.settle_delay, Duration::from_millis(1));
/// ```
#[derive(Debug, Clone)]
pub struct LayerViewConfig {
    /// How long a burst of non-structural changes is absorbed before a
    /// single reconciliation runs.
    ///
    /// Default: 40 ms
    pub debounce_window: Duration,

    /// Pause after expansion so the widget can settle its layout before
    /// selection and scroll position are applied. Zero still yields once.
    ///
    /// Default: 1 ms
    pub settle_delay: Duration,

    /// Scroll the last selected row into view when finalizing.
    ///
    /// Default: true
    pub reveal_selection: bool,
}

impl Default for LayerViewConfig {
    fn default() -> Self {
        Self {
            debounce_window: DEFAULT_DEBOUNCE_WINDOW,
            settle_delay: DEFAULT_SETTLE_DELAY,
            reveal_selection: true,
        }
    }
}

impl LayerViewConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the debounce window.
    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }

    /// Sets the settle delay.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Enables or disables revealing the selection.
    pub fn with_reveal_selection(mut self, reveal: bool) -> Self {
        self.reveal_selection = reveal;
        self
    }
}
