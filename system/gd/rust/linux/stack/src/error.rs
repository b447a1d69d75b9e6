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

use thiserror::Error;

use crate::codec::LeAudioCodecType;

/// Errors returned synchronously to callers of the LE Audio API.
#[derive(Debug, Error, PartialEq)]
pub enum LeAudioError {
    #[error("invalid broadcast code length {0}, expected 4 to 16 octets")]
    InvalidBroadcastCode(usize),

    #[error("input codec {input:?} does not match output codec {output:?}")]
    CodecTypeMismatch { input: LeAudioCodecType, output: LeAudioCodecType },

    #[error("group {0} has no codec status yet")]
    NoCodecStatus(i32),

    #[error("configuration error: {0}")]
    Config(String),
}
