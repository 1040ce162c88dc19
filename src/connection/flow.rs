/// Inbound byte accounting for acknowledgements.
///
/// The counter is 32 bits and wraps; an acknowledgement is due once it has
/// moved `window` bytes past the last acknowledged value.
#[derive(Debug, Clone, Default)]
pub struct AckWindow {
    /// 0 disables acknowledgements
    window: u32,
    received: u32,
    last_ack: u32,
    /// Non-wrapping total for statistics
    total: u64,
}

impl AckWindow {
    pub fn new() -> Self {
        AckWindow::default()
    }

    pub fn set_window(&mut self, window: u32) {
        self.window = window;
    }

    pub fn window(&self) -> u32 {
        self.window
    }

    pub fn record(&mut self, bytes: usize) {
        self.received = self.received.wrapping_add(bytes as u32);
        self.total += bytes as u64;
    }

    /// Sequence number to acknowledge, if a full window has accrued
    pub fn take_ack(&mut self) -> Option<u32> {
        if self.window == 0 {
            return None;
        }
        if self.received.wrapping_sub(self.last_ack) >= self.window {
            self.last_ack = self.received;
            return Some(self.received);
        }
        None
    }

    pub fn received(&self) -> u32 {
        self.received
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_ack_per_window() {
        let mut ack = AckWindow::new();
        ack.set_window(1000);

        ack.record(999);
        assert_eq!(ack.take_ack(), None);
        ack.record(1);
        assert_eq!(ack.take_ack(), Some(1000));
        assert_eq!(ack.take_ack(), None);

        ack.record(999);
        assert_eq!(ack.take_ack(), None);
        ack.record(500);
        assert_eq!(ack.take_ack(), Some(2499));
    }

    #[test]
    fn test_disabled_without_window() {
        let mut ack = AckWindow::new();
        ack.record(10_000_000);
        assert_eq!(ack.take_ack(), None);
        assert_eq!(ack.total(), 10_000_000);
    }

    #[test]
    fn test_counter_wraps() {
        let mut ack = AckWindow::new();
        ack.set_window(100);
        ack.record(u32::MAX as usize - 49);
        assert!(ack.take_ack().is_some());

        ack.record(120);
        assert_eq!(ack.received(), 70);
        assert_eq!(ack.take_ack(), Some(70));
        assert_eq!(ack.total(), u32::MAX as u64 - 49 + 120);
    }
}
