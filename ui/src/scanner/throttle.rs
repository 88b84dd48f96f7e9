/// Lets through every Nth tick.
#[derive(Clone, Debug)]
pub struct DecodeThrottle {
    every: u32,
    counter: u32,
}

impl DecodeThrottle {
    pub fn new(every: u32) -> Self {
        Self {
            every: every.max(1),
            counter: 0,
        }
    }

    /// Counts one tick. Returns true when this tick should be decoded.
    pub fn tick(&mut self) -> bool {
        self.counter += 1;
        if self.counter >= self.every {
            self.counter = 0;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.counter = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thirty_ticks_decode_ten_times() {
        let mut throttle = DecodeThrottle::new(3);
        let decoded = (0..30).filter(|_| throttle.tick()).count();
        assert_eq!(decoded, 10);
    }

    #[test]
    fn zero_is_treated_as_every_tick() {
        let mut throttle = DecodeThrottle::new(0);
        assert!((0..5).all(|_| throttle.tick()));
    }
}
