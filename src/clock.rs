//! The two-faced clock.
//!
//! TS6 state (`tsinfo`, channel creation times, topic times, watch
//! `lasttime`) uses wall-clock seconds because those values cross servers.
//! Throttles and decay counters (join flood, spambot warnings, WHOIS
//! pacing) use a monotonic second counter that the event loop advances, so
//! a wall-clock step can never confuse them. The engine only ever reads
//! this struct; the embedder owns updating it between messages.

/// Second-resolution time snapshot supplied by the event loop.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    /// Wall-clock seconds since the Unix epoch.
    pub sec_real: i64,
    /// Monotonic seconds since an arbitrary origin.
    pub sec_monotonic: u64,
}

impl Clock {
    /// Snapshot the wall clock; the monotonic counter starts at zero.
    pub fn now() -> Self {
        Clock {
            sec_real: chrono::Utc::now().timestamp(),
            sec_monotonic: 0,
        }
    }

    /// Fixed clock for tests.
    pub fn fixed(sec_real: i64, sec_monotonic: u64) -> Self {
        Clock {
            sec_real,
            sec_monotonic,
        }
    }

    /// Advance both faces by `secs`.
    pub fn advance(&mut self, secs: u64) {
        self.sec_real += secs as i64;
        self.sec_monotonic += secs;
    }
}

impl Default for Clock {
    fn default() -> Self {
        Clock::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_moves_both_faces() {
        let mut clock = Clock::fixed(1_600_000_000, 40);
        clock.advance(10);
        assert_eq!(clock.sec_real, 1_600_000_010);
        assert_eq!(clock.sec_monotonic, 50);
    }
}
