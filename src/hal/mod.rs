//! Hardware Abstraction Layer implementations.
//!
//! This module contains concrete implementations of the traits
//! defined in [`crate::traits`] for various platforms.
//!
//! # Available Implementations
//!
//! - `mock`: Test implementations for desktop development
//! - `embedded`: Adapters for `embedded-hal`/`embedded-io` peripherals (requires `embedded` feature)
//! - [`SystemClock`]: Wall-clock time source (requires `std` feature)

pub mod mock;

#[cfg(feature = "embedded")]
pub mod embedded;

pub use mock::*;

#[cfg(feature = "embedded")]
pub use embedded::*;

#[cfg(feature = "std")]
pub use system::SystemClock;

#[cfg(feature = "std")]
mod system {
    use std::time::Instant;

    use crate::traits::Clock;

    /// [`Clock`] measuring milliseconds since its creation.
    #[derive(Debug, Clone, Copy)]
    pub struct SystemClock {
        start: Instant,
    }

    impl SystemClock {
        /// Starts the clock at 0ms.
        pub fn new() -> Self {
            Self {
                start: Instant::now(),
            }
        }
    }

    impl Default for SystemClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clock for SystemClock {
        fn now_ms(&self) -> u64 {
            u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn system_clock_is_monotonic() {
            let clock = SystemClock::new();
            let a = clock.now_ms();
            let b = clock.now_ms();
            assert!(b >= a);
        }
    }
}
