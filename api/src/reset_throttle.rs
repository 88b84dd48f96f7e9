//! Rate limiting for password reset emails.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, OnceCell};

use crate::prefs::env_or;

const DEFAULT_COOLDOWN_SECS: u64 = 60;
const DEFAULT_MAX_TRACKED: usize = 10_000;

/// Remembers when a reset was last sent to each address.
///
/// Entries older than the cooldown are swept on every call. When the table is
/// full the oldest address is forgotten.
#[derive(Debug)]
pub(crate) struct ResetThrottle {
    cooldown: Duration,
    capacity: usize,
    last_sent: HashMap<String, Instant>,
}

impl ResetThrottle {
    pub fn new(cooldown: Duration, capacity: usize) -> Self {
        Self {
            cooldown,
            capacity: capacity.max(1),
            last_sent: HashMap::new(),
        }
    }

    fn from_env() -> Self {
        Self::new(
            Duration::from_secs(env_or("RESET_COOLDOWN_SECS", DEFAULT_COOLDOWN_SECS)),
            env_or("RESET_MAX_TRACKED", DEFAULT_MAX_TRACKED),
        )
    }

    /// Claims a send slot for `email`.
    ///
    /// On refusal returns how long the caller must wait.
    pub fn try_acquire(&mut self, email: &str, now: Instant) -> Result<(), Duration> {
        let cooldown = self.cooldown;
        self.last_sent
            .retain(|_, sent| now.saturating_duration_since(*sent) < cooldown);

        let key = normalize(email);
        if let Some(sent) = self.last_sent.get(&key) {
            return Err(cooldown.saturating_sub(now.saturating_duration_since(*sent)));
        }

        if self.last_sent.len() >= self.capacity {
            if let Some(oldest) = self
                .last_sent
                .iter()
                .min_by_key(|(_, sent)| **sent)
                .map(|(k, _)| k.clone())
            {
                self.last_sent.remove(&oldest);
            }
        }
        self.last_sent.insert(key, now);
        Ok(())
    }

    /// Gives back the slot claimed for `email`, e.g. when the email could not
    /// be sent.
    pub fn release(&mut self, email: &str) {
        self.last_sent.remove(&normalize(email));
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.last_sent.len()
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

async fn shared() -> &'static Mutex<ResetThrottle> {
    static THROTTLE: OnceCell<Mutex<ResetThrottle>> = OnceCell::const_new();

    THROTTLE
        .get_or_init(|| async { Mutex::new(ResetThrottle::from_env()) })
        .await
}

/// Claims a slot in the process-wide throttle.
pub(crate) async fn acquire(email: &str) -> Result<(), Duration> {
    shared().await.lock().await.try_acquire(email, Instant::now())
}

/// Releases a slot claimed with [`acquire`].
pub(crate) async fn release(email: &str) {
    shared().await.lock().await.release(email);
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn second_request_inside_cooldown_is_refused() {
        let mut throttle = ResetThrottle::new(MINUTE, 10);
        let t0 = Instant::now();

        assert_eq!(throttle.try_acquire("ana@school.edu", t0), Ok(()));
        let wait = throttle
            .try_acquire("ana@school.edu", t0 + Duration::from_secs(20))
            .unwrap_err();
        assert_eq!(wait, Duration::from_secs(40));
    }

    #[test]
    fn addresses_are_compared_case_insensitively() {
        let mut throttle = ResetThrottle::new(MINUTE, 10);
        let t0 = Instant::now();

        throttle.try_acquire("Ana@School.edu", t0).unwrap();
        assert!(throttle.try_acquire("  ana@school.edu ", t0).is_err());
    }

    #[test]
    fn cooldown_expiry_allows_another_send() {
        let mut throttle = ResetThrottle::new(MINUTE, 10);
        let t0 = Instant::now();

        throttle.try_acquire("ana@school.edu", t0).unwrap();
        assert_eq!(throttle.try_acquire("ana@school.edu", t0 + MINUTE), Ok(()));
    }

    #[test]
    fn expired_entries_are_swept() {
        let mut throttle = ResetThrottle::new(MINUTE, 10);
        let t0 = Instant::now();

        throttle.try_acquire("a@x.edu", t0).unwrap();
        throttle.try_acquire("b@x.edu", t0).unwrap();
        throttle
            .try_acquire("c@x.edu", t0 + Duration::from_secs(90))
            .unwrap();
        assert_eq!(throttle.tracked(), 1);
    }

    #[test]
    fn full_table_forgets_the_oldest_address() {
        let mut throttle = ResetThrottle::new(MINUTE, 2);
        let t0 = Instant::now();

        throttle.try_acquire("a@x.edu", t0).unwrap();
        throttle
            .try_acquire("b@x.edu", t0 + Duration::from_secs(1))
            .unwrap();
        throttle
            .try_acquire("c@x.edu", t0 + Duration::from_secs(2))
            .unwrap();

        assert_eq!(throttle.tracked(), 2);
        let later = t0 + Duration::from_secs(3);
        assert!(throttle.try_acquire("a@x.edu", later).is_ok());
        assert!(throttle.try_acquire("c@x.edu", later).is_err());
    }

    #[test]
    fn released_slot_can_be_claimed_again() {
        let mut throttle = ResetThrottle::new(MINUTE, 10);
        let t0 = Instant::now();

        throttle.try_acquire("ana@school.edu", t0).unwrap();
        throttle.release(" Ana@School.edu ");

        assert_eq!(throttle.tracked(), 0);
        assert_eq!(throttle.try_acquire("ana@school.edu", t0 + Duration::from_secs(1)), Ok(()));
    }

    #[tokio::test]
    async fn failed_send_does_not_hold_the_cooldown() {
        let email = "release-after-failure@school.edu";
        assert_eq!(acquire(email).await, Ok(()));
        assert!(acquire(email).await.is_err());

        release(email).await;
        assert_eq!(acquire(email).await, Ok(()));
    }
}
