use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{Local, NaiveDateTime, TimeDelta};

/// Source de l'instant "maintenant" pour l'horodatage des mesures.
///
/// Le collecteur ne lit jamais l'horloge système directement, ce qui rend
/// le repli "now" du parseur testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Horloge murale locale.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Horloge manuelle : une origine fixe plus un décalage atomique en ms.
///
/// `Send + Sync`, sans verrou, partageable entre collecteur et tests.
///
/// # Example
/// ```
/// use bd_core::clock::{Clock, ManualClock};
/// use chrono::NaiveDate;
/// let origin = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(8, 0, 0).unwrap();
/// let clock = ManualClock::new(origin);
/// clock.advance_ms(1500);
/// assert_eq!((clock.now() - origin).num_milliseconds(), 1500);
/// ```
pub struct ManualClock {
    origin: NaiveDateTime,
    offset_ms: AtomicI64,
}

impl ManualClock {
    #[must_use]
    pub fn new(origin: NaiveDateTime) -> Self {
        Self {
            origin,
            offset_ms: AtomicI64::new(0),
        }
    }

    #[inline]
    pub fn advance_ms(&self, ms: i64) {
        self.offset_ms.fetch_add(ms, Ordering::Relaxed);
    }

    #[inline]
    pub fn set_offset_ms(&self, ms: i64) {
        self.offset_ms.store(ms, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        let offset = TimeDelta::milliseconds(self.offset_ms.load(Ordering::Relaxed));
        self.origin.checked_add_signed(offset).unwrap_or(self.origin)
    }
}
