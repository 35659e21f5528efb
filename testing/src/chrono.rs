//! A stand-in for `chrono::Utc` with a settable clock, so that stored
//! timestamps are predictable.

use std::cell::Cell;

thread_local! {
    static TIMESTAMP: Cell<i64> = const { Cell::new(1234567890) };
}

pub fn set_timestamp(timestamp: i64) {
    TIMESTAMP.with(|ts| ts.set(timestamp));
}

pub struct Utc;

impl Utc {
    pub fn now() -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp(TIMESTAMP.with(Cell::get), 0)
            .expect("timestamp within range")
    }
}
