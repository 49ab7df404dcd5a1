//! Timer manager - one-shot and repeating timers driven by `update()`
//!
//! Time only advances through [`TimerManager::tick`], so a host that stops
//! calling `update()` also stops every timer.

use crate::core::{SlotArray, SlotKey};
use std::fmt;
use std::time::Duration;

/// Smallest repeat interval; a zero interval still fires at most once per tick
const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId {
    index: u32,
    generation: u32,
}

impl SlotKey for TimerId {
    #[inline]
    fn from_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    #[inline]
    fn index(self) -> u32 {
        self.index
    }

    #[inline]
    fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}v{}", self.index, self.generation)
    }
}

struct Timer {
    deadline: Duration,
    interval: Option<Duration>,
    callback: Box<dyn FnMut()>,
}

#[derive(Default)]
pub struct TimerManager {
    timers: SlotArray<Timer, TimerId>,
    now: Duration,
}

impl TimerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `callback` once after `delay`
    pub fn set_timeout(&mut self, delay: Duration, callback: impl FnMut() + 'static) -> TimerId {
        self.timers.insert(Timer {
            deadline: self.now.saturating_add(delay),
            interval: None,
            callback: Box::new(callback),
        })
    }

    /// Fire `callback` every `interval`
    pub fn set_interval(&mut self, interval: Duration, callback: impl FnMut() + 'static) -> TimerId {
        let interval = interval.max(MIN_INTERVAL);
        self.timers.insert(Timer {
            deadline: self.now.saturating_add(interval),
            interval: Some(interval),
            callback: Box::new(callback),
        })
    }

    /// Cancel a timer, false if it already fired or was cleared
    pub fn clear(&mut self, id: TimerId) -> bool {
        self.timers.remove(id).is_some()
    }

    /// Advance the clock by `elapsed` and run due timers in deadline order
    ///
    /// Returns how many callbacks ran.
    pub fn tick(&mut self, elapsed: Duration) -> usize {
        self.now = self.now.saturating_add(elapsed);
        let now = self.now;

        let mut due: Vec<(Duration, TimerId)> = self
            .timers
            .iter()
            .filter(|(_, timer)| timer.deadline <= now)
            .map(|(id, timer)| (timer.deadline, id))
            .collect();
        due.sort_by_key(|&(deadline, id)| (deadline, id.index));

        let mut fired = 0;
        for (_, id) in due {
            let Some(timer) = self.timers.get_mut(id) else {
                continue;
            };
            (timer.callback)();
            fired += 1;

            match timer.interval {
                // skip intervals that were missed entirely
                Some(interval) => timer.deadline = now.saturating_add(interval),
                None => {
                    self.timers.remove(id);
                }
            }
        }
        fired
    }

    /// Time accumulated through `tick`
    #[inline]
    pub fn now(&self) -> Duration {
        self.now
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
