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

//! Initializes global logging behavior for the `tracing` crate.

use std::env;

use tracing_subscriber::filter::EnvFilter;

/// Installs a `tracing_subscriber` with an `EnvFilter` once at process
/// start. Respects `RUST_LOG`; otherwise defaults to `info` with noisy
/// library targets turned down.
pub fn initialize() {
    let env_filter = if let Ok(v) = env::var("RUST_LOG") {
        EnvFilter::new(v)
    } else {
        EnvFilter::new("info,tower=warn,hyper=warn,h2=warn")
    };

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}
