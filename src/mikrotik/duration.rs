// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! RouterOS elapsed-time tokens
//!
//! The device reports "time since event" values such as `last-handshake`
//! as compact tokens like `1w4d9h15m7s`. Each unit is optional, and the
//! sum of all units is the elapsed time. Older firmware reports a bare
//! number of seconds instead.

use chrono::{DateTime, TimeDelta, Utc};

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;

/// Converts an elapsed-time token into the absolute time of the event
///
/// Returns `None` for empty, `never`, or malformed tokens. Never panics.
#[must_use]
pub fn parse_elapsed(token: &str) -> Option<DateTime<Utc>> {
    elapsed_before(token, Utc::now())
}

/// Same as [`parse_elapsed`] with an explicit reference time
#[must_use]
pub fn elapsed_before(token: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let secs = duration_secs(token)?;
    let delta = TimeDelta::try_seconds(i64::try_from(secs).ok()?)?;
    now.checked_sub_signed(delta)
}

/// Sums a duration token into whole seconds
///
/// Sub-second `ms` components are accepted and dropped. A repeated unit
/// or any character outside `[0-9wdhms]` makes the token malformed.
#[must_use]
pub fn duration_secs(token: &str) -> Option<u64> {
    let token = token.trim();
    if token.is_empty() || token == "never" {
        return None;
    }

    if token.bytes().all(|b| b.is_ascii_digit()) {
        return token.parse::<u64>().ok();
    }

    let mut total: u64 = 0;
    let mut seen = [false; 6];
    let mut number: Option<u64> = None;
    let mut chars = token.chars().peekable();

    while let Some(ch) = chars.next() {
        if let Some(digit) = ch.to_digit(10) {
            let value = number
                .unwrap_or(0)
                .saturating_mul(10)
                .saturating_add(u64::from(digit));
            number = Some(value);
            continue;
        }

        let value = number.take()?;
        let (slot, unit) = match ch {
            'w' => (0, WEEK),
            'd' => (1, DAY),
            'h' => (2, HOUR),
            'm' if chars.peek() == Some(&'s') => {
                chars.next();
                (5, 0)
            }
            'm' => (3, MINUTE),
            's' => (4, 1),
            _ => return None,
        };
        if seen[slot] {
            return None;
        }
        seen[slot] = true;
        total = total.saturating_add(value.saturating_mul(unit));
    }

    // trailing digits without a unit
    if number.is_some() {
        return None;
    }

    Some(total)
}
