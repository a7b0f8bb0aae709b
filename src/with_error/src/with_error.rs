// Copyright © Roundtable 2026-present

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at

//    https://www.apache.org/licenses/LICENSE-2.0

// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error handling helpers shared across the game server crates.
//!
//! Most internal code returns `anyhow::Result` and attaches context with the
//! [WithError] extension trait or the [fail!] / [verify!] macros. The wire
//! and coordinator boundary instead deals in [CoordinatorError], a small
//! tagged union that the rest of the server can match on to decide how to
//! surface a failure to a client.

use std::fmt::Display;

use anyhow::{Context, Result};
use thiserror::Error;

/// Extension trait for attaching a lazily-constructed error message to a
/// `Result` or `Option`, matching the shape of `anyhow::Context` but with a
/// name that reads better at call sites: `value.with_error(|| "message")?`.
pub trait WithError<T> {
    fn with_error<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Display + Send + Sync + 'static;
}

impl<T> WithError<T> for Option<T> {
    fn with_error<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Display + Send + Sync + 'static,
    {
        self.ok_or_else(|| anyhow::anyhow!("{}", f()))
    }
}

impl<T, E> WithError<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_error<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Display + Send + Sync + 'static,
    {
        self.with_context(f)
    }
}

/// Returns early with an `anyhow` error, formatted like `format!`.
#[macro_export]
macro_rules! fail {
    ($($arg:tt)*) => {
        return Err(anyhow::anyhow!($($arg)*))
    };
}

/// Returns early with an `anyhow` error unless `condition` holds.
#[macro_export]
macro_rules! verify {
    ($condition:expr, $($arg:tt)*) => {
        if !($condition) {
            $crate::fail!($($arg)*);
        }
    };
}

/// Errors that can cross the coordinator boundary. Every command handler
/// eventually collapses its `anyhow::Result` into one of these kinds; the
/// wire layer then decides how (or whether) to surface it to a client.
///
/// The wire layer translates a kind into a user-visible chat message, or
/// ignores it (`Conflict`, which is an idempotent no-op).
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The command violates an aggregate invariant: wrong role, wrong round
    /// status, already played, not enough players. Also covers unknown game,
    /// card, or player ids (treated as validation, not a distinct kind).
    #[error("{0}")]
    Validation(String),

    /// A referenced game, player, or card id does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A `JoinedGame` for a user who is already in the game. Not really an
    /// error: the caller just gets the current snapshot back.
    #[error("already joined")]
    Conflict,

    /// The event log or used-card store failed to read or write.
    #[error("storage error: {0}")]
    Io(#[source] anyhow::Error),

    /// An unknown event type, or the aggregate was left inconsistent after
    /// applying an event. The process keeps running; the game may need to
    /// be rebuilt from its log.
    #[error("fatal error: {0}")]
    Fatal(#[source] anyhow::Error),
}

impl CoordinatorError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Whether this error is safe to ignore rather than tell the client
    /// about (currently only `Conflict`, which is an idempotent no-op).
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::Conflict)
    }
}

pub type CoordinatorResult<T> = std::result::Result<T, CoordinatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_error_on_option() {
        let value: Option<u32> = None;
        let result = value.with_error(|| "missing value");
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().to_string(), "missing value");
    }

    #[test]
    fn verify_macro_short_circuits() {
        fn check(n: u32) -> Result<()> {
            verify!(n > 0, "n must be positive, got {n}");
            Ok(())
        }

        assert!(check(1).is_ok());
        assert!(check(0).is_err());
    }

    #[test]
    fn fail_macro_formats_message() {
        fn always_fails() -> Result<()> {
            fail!("boom: {}", 42);
        }

        assert_eq!(always_fails().unwrap_err().to_string(), "boom: 42");
    }
}
