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

//! Codec configuration negotiated per group.

use num_derive::{FromPrimitive, ToPrimitive};

#[derive(Clone, Copy, Debug, Default, Eq, FromPrimitive, Hash, PartialEq, ToPrimitive)]
#[repr(i32)]
pub enum LeAudioCodecType {
    Lc3 = 0,
    #[default]
    Invalid = 1_000_000,
}

/// Sample rate bits; a configuration holds a single bit, a capability may hold several.
pub mod sample_rate {
    pub const NONE: u32 = 0;
    pub const RATE_8000: u32 = 0x01 << 0;
    pub const RATE_16000: u32 = 0x01 << 2;
    pub const RATE_24000: u32 = 0x01 << 4;
    pub const RATE_32000: u32 = 0x01 << 5;
    pub const RATE_44100: u32 = 0x01 << 6;
    pub const RATE_48000: u32 = 0x01 << 7;
}

pub mod frame_duration {
    pub const NONE: u32 = 0;
    pub const DURATION_7500: u32 = 0x01 << 0;
    pub const DURATION_10000: u32 = 0x01 << 1;
}

#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct LeAudioCodecConfig {
    pub codec_type: LeAudioCodecType,
    pub sample_rate: u32,
    pub bits_per_sample: u32,
    pub channel_count: u32,
    pub frame_duration: u32,
    pub octets_per_frame: u32,
}

impl LeAudioCodecConfig {
    pub fn new(codec_type: LeAudioCodecType) -> Self {
        Self { codec_type, ..Default::default() }
    }

    /// Whether every parameter bit of `self` is offered by `capability`.
    /// Unset parameters match anything.
    fn is_covered_by(&self, capability: &LeAudioCodecConfig) -> bool {
        fn covered(bits: u32, by: u32) -> bool {
            bits == 0 || (bits & by) == bits
        }

        self.codec_type == capability.codec_type
            && covered(self.sample_rate, capability.sample_rate)
            && covered(self.bits_per_sample, capability.bits_per_sample)
            && covered(self.channel_count, capability.channel_count)
            && covered(self.frame_duration, capability.frame_duration)
    }
}

/// Immutable snapshot of the codec state of a group, as reported by the native stack.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LeAudioCodecStatus {
    pub input_codec_config: LeAudioCodecConfig,
    pub output_codec_config: LeAudioCodecConfig,
    pub input_codec_local_capabilities: Vec<LeAudioCodecConfig>,
    pub output_codec_local_capabilities: Vec<LeAudioCodecConfig>,
    pub input_codec_selectable_capabilities: Vec<LeAudioCodecConfig>,
    pub output_codec_selectable_capabilities: Vec<LeAudioCodecConfig>,
}

impl LeAudioCodecStatus {
    pub fn is_input_codec_config_selectable(&self, config: &LeAudioCodecConfig) -> bool {
        self.input_codec_selectable_capabilities.iter().any(|cap| config.is_covered_by(cap))
    }

    pub fn is_output_codec_config_selectable(&self, config: &LeAudioCodecConfig) -> bool {
        self.output_codec_selectable_capabilities.iter().any(|cap| config.is_covered_by(cap))
    }
}
