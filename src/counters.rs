//! Definition of counters, used for message IDs and debouncing.

/// Counter errors.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The counter wrapped around to zero.
    Overrun,
}

/// A wrapping counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Counter {
    value: u8,
    max_value: u8,
}

/// The kind of counter, which determines its range.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CounterType {
    /// The 3 bit message ID of transmitted frames.
    MessageId,
}

impl Counter {
    /// Create a new counter at zero.
    pub fn new(counter_type: CounterType) -> Self {
        let max_value = match counter_type {
            CounterType::MessageId => 7,
        };

        Self { value: 0, max_value }
    }

    /// Set the counter, modulo its range.
    pub fn set(&mut self, value: u8) {
        self.value = value % (self.max_value + 1);
    }

    /// The current value.
    pub fn value(&self) -> u8 {
        self.value
    }

    /// Advance by one. Returns an error if the counter wrapped to zero, the counter is advanced anyway.
    pub fn increment(&mut self) -> Result<(), Error> {
        self.set(self.value.wrapping_add(1));

        if self.value == 0 { Err(Error::Overrun) } else { Ok(()) }
    }

    /// Reset to zero.
    pub fn reset(&mut self) {
        self.value = 0;
    }
}

/// Saturating count of consecutive samples that agree with a pending transition.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Debounce {
    count: u8,
}

impl Debounce {
    /// Count one more agreeing sample.
    pub fn increment(&mut self) {
        self.count = self.count.saturating_add(1);
    }

    /// Start over.
    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Number of agreeing samples so far.
    pub fn count(&self) -> u8 {
        self.count
    }

    /// Whether at least `threshold` samples agreed.
    pub fn reached(&self, threshold: u8) -> bool {
        self.count >= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_id_wraps_within_three_bits() {
        let mut counter = Counter::new(CounterType::MessageId);

        for expected in 1..=7 {
            assert!(counter.increment().is_ok());
            assert_eq!(counter.value(), expected);
        }

        assert_eq!(counter.increment(), Err(Error::Overrun));
        assert_eq!(counter.value(), 0);
    }


    #[test]
    fn debounce_saturates() {
        let mut debounce = Debounce::default();
        for _ in 0..300 {
            debounce.increment();
        }
        assert_eq!(debounce.count(), u8::MAX);
        assert!(debounce.reached(10));

        debounce.reset();
        assert!(!debounce.reached(1));
    }
}
