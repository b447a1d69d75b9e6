// Copyright 2024, The Android Open Source Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Utilities that are not specific to a particular module

use std::sync::Once;

static LOG_PANICS: Once = Once::new();

/// Inits logging from `RUST_LOG`, and routes panics from any thread to the log.
pub fn init_logging() {
    env_logger::Builder::new().parse_default_env().try_init().ok();
    LOG_PANICS.call_once(log_panics::init);
}
