// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Bounded busy-waiting on hardware flags.

use crate::ErrorCode;

/// Number of times a condition is sampled before giving up.
pub const POLL_LIMIT: usize = 100_000;

/// Spin until `condition` holds, or fail with `BUSY` after [`POLL_LIMIT`]
/// samples.
pub fn poll_until<F: FnMut() -> bool>(condition: F) -> Result<(), ErrorCode> {
    poll_until_limit(POLL_LIMIT, condition)
}

/// Spin until `condition` holds, sampling it at most `limit` times.
pub fn poll_until_limit<F: FnMut() -> bool>(
    limit: usize,
    mut condition: F,
) -> Result<(), ErrorCode> {
    for _ in 0..limit {
        if condition() {
            return Ok(());
        }
        core::hint::spin_loop();
    }
    Err(ErrorCode::BUSY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_once_condition_holds() {
        let mut samples = 0;
        let result = poll_until(|| {
            samples += 1;
            samples == 3
        });
        assert_eq!(result, Ok(()));
        assert_eq!(samples, 3);
    }

    #[test]
    fn times_out_with_busy() {
        let mut samples = 0;
        let result = poll_until_limit(10, || {
            samples += 1;
            false
        });
        assert_eq!(result, Err(ErrorCode::BUSY));
        assert_eq!(samples, 10);
    }
}
