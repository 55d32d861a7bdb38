//! Bounded optimistic-concurrency retry.

use tracing::debug;

use berth_state::StateError;

use crate::error::{BindError, BindResult};

/// Attempt cap for version-conflicted read-modify-write loops.
pub const MAX_ATTEMPTS: u32 = 3;

/// Run a read-modify-write closure, retrying on version conflict.
///
/// The closure must re-read current state on every attempt and apply an
/// idempotent delta. Only [`StateError::Conflict`] is retried; every
/// other error surfaces immediately. Exhaustion surfaces as the distinct
/// [`BindError::RetriesExhausted`] so a dropped update is never silent.
pub fn retry_on_conflict<T>(
    op_label: &str,
    mut op: impl FnMut() -> Result<T, StateError>,
) -> BindResult<T> {
    for attempt in 1..=MAX_ATTEMPTS {
        match op() {
            Ok(value) => return Ok(value),
            Err(StateError::Conflict { key, .. }) => {
                debug!(%key, attempt, op = op_label, "version conflict, retrying");
            }
            Err(other) => return Err(BindError::State(other)),
        }
    }
    Err(BindError::RetriesExhausted {
        op: op_label.to_string(),
        attempts: MAX_ATTEMPTS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conflict() -> StateError {
        StateError::Conflict {
            key: "ns/x".to_string(),
            expected: 1,
            actual: 2,
        }
    }

    #[test]
    fn first_success_returns() {
        let result: BindResult<u32> = retry_on_conflict("test", || Ok(7));
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn conflicts_are_retried_until_success() {
        let mut calls = 0;
        let result = retry_on_conflict("test", || {
            calls += 1;
            if calls < 3 { Err(conflict()) } else { Ok(calls) }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn exhaustion_is_a_distinct_error() {
        let mut calls = 0;
        let result: BindResult<()> = retry_on_conflict("append bound workload", || {
            calls += 1;
            Err(conflict())
        });
        assert_eq!(calls, MAX_ATTEMPTS);
        match result.unwrap_err() {
            BindError::RetriesExhausted { op, attempts } => {
                assert_eq!(op, "append bound workload");
                assert_eq!(attempts, MAX_ATTEMPTS);
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }

    #[test]
    fn non_conflict_errors_surface_immediately() {
        let mut calls = 0;
        let result: BindResult<()> = retry_on_conflict("test", || {
            calls += 1;
            Err(StateError::NotFound("ns/x".to_string()))
        });
        assert_eq!(calls, 1);
        assert!(matches!(result.unwrap_err(), BindError::State(StateError::NotFound(_))));
    }
}
