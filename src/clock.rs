// Copyright 2019 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! The steady-clock capability.
//!
//! Every timer in this crate is keyed by a monotonic millisecond deadline
//! read from a [`Clock`]. Nothing reads wall-clock time directly, which is
//! what allows test harnesses to drive the whole engine with a
//! [`VirtualClock`].

use std::cell::Cell;
use std::time::Instant;

/// A source of monotonic time, measured in milliseconds from an arbitrary
/// epoch.
pub trait Clock {
    /// The current monotonic time in milliseconds.
    fn now(&self) -> u64;
}

/// A [`Clock`] backed by [`std::time::Instant`], measuring from the moment
/// of construction.
#[derive(Debug)]
pub struct SteadyClock {
    epoch: Instant,
}

impl SteadyClock {
    /// Creates a new `SteadyClock` whose epoch is now.
    pub fn new() -> SteadyClock {
        SteadyClock {
            epoch: Instant::now(),
        }
    }
}

impl Default for SteadyClock {
    fn default() -> Self {
        SteadyClock::new()
    }
}

impl Clock for SteadyClock {
    fn now(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

/// A settable [`Clock`] for tests. Time only moves when the test moves it.
#[derive(Debug, Default)]
pub struct VirtualClock {
    now: Cell<u64>,
}

impl VirtualClock {
    /// Creates a new `VirtualClock` at time zero.
    pub fn new() -> VirtualClock {
        VirtualClock { now: Cell::new(0) }
    }

    /// Moves the clock forward to the given absolute time.
    ///
    /// Panics if `t` is in the past; a monotonic clock cannot run backwards.
    pub fn set(&self, t: u64) {
        assert!(
            t >= self.now.get(),
            "virtual clock moved backwards: {} -> {}",
            self.now.get(),
            t
        );
        self.now.set(t);
    }

    /// Moves the clock forward by the given number of milliseconds.
    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> u64 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_clock_advances() {
        let clock = VirtualClock::new();
        assert_eq!(0, clock.now());
        clock.advance(250);
        assert_eq!(250, clock.now());
        clock.set(1000);
        assert_eq!(1000, clock.now());
    }

    #[test]
    #[should_panic(expected = "backwards")]
    fn virtual_clock_refuses_to_rewind() {
        let clock = VirtualClock::new();
        clock.set(100);
        clock.set(50);
    }

    #[test]
    fn steady_clock_is_monotonic() {
        let clock = SteadyClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
