use std::time::Duration;

/// Timing and paging limits of the application layer
#[derive(Debug, Clone, PartialEq)]
pub struct CoreSettings {
    /// Length of one discovery window
    pub scan_window: Duration,
    /// Upper bound for opening or closing a link
    pub connect_timeout: Duration,
    /// Upper bound for transmitting one face
    pub transmit_timeout: Duration,
    pub max_page_size: u32,
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            scan_window: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
            transmit_timeout: Duration::from_secs(30),
            max_page_size: 100,
        }
    }
}
