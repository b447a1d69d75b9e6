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

//! LE Audio client and broadcaster, as seen from the native stack.
//!
//! The native stack reports everything through [`LeAudioClientCallbacks`] and is driven
//! through [`LeAudioNativeInterface`].

use bitflags::bitflags;
use num_derive::{FromPrimitive, ToPrimitive};

use crate::broadcast::BroadcastMetadata;
use crate::btif::RawAddress;
use crate::codec::LeAudioCodecConfig;

/// Group id used by the native stack for "no group".
pub const LE_AUDIO_GROUP_ID_INVALID: i32 = -1;

#[derive(Clone, Copy, Debug, Eq, FromPrimitive, Hash, PartialEq, ToPrimitive)]
#[repr(u32)]
pub enum BtLeAudioConnectionState {
    Disconnected = 0,
    Connecting,
    Connected,
    Disconnecting,
}

#[derive(Clone, Copy, Debug, Default, Eq, FromPrimitive, PartialEq, ToPrimitive)]
#[repr(u32)]
pub enum BtLeAudioGroupStatus {
    #[default]
    Inactive = 0,
    Active,
    TurnedIdleDuringCall,
}

#[derive(Clone, Copy, Debug, Eq, FromPrimitive, PartialEq, ToPrimitive)]
#[repr(u32)]
pub enum BtLeAudioGroupNodeStatus {
    Added = 1,
    Removed,
}

#[derive(Clone, Copy, Debug, Eq, FromPrimitive, Hash, PartialEq, ToPrimitive)]
#[repr(u32)]
pub enum BtLeBroadcastState {
    Stopped = 0,
    Configuring,
    Paused,
    Stopping,
    Streaming,
}

bitflags! {
    /// Audio directions a device or group can currently serve.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct AudioDirection: u8 {
        const OUTPUT = 0x01;
        const INPUT = 0x02;
    }
}

bitflags! {
    /// Audio context types, as advertised by the remote Published Audio Capabilities.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct AudioContext: u16 {
        const UNSPECIFIED = 0x0001;
        const CONVERSATIONAL = 0x0002;
        const MEDIA = 0x0004;
        const GAME = 0x0008;
        const INSTRUCTIONAL = 0x0010;
        const VOICE_ASSISTANTS = 0x0020;
        const LIVE = 0x0040;
        const SOUND_EFFECTS = 0x0080;
        const NOTIFICATIONS = 0x0100;
        const RINGTONE = 0x0200;
        const ALERTS = 0x0400;
        const EMERGENCY_ALARM = 0x0800;
    }
}

/// Every event the native stack can emit, in delivery order.
#[derive(Clone, Debug)]
pub enum LeAudioClientCallbacks {
    Initialized,
    ConnectionStateChanged(RawAddress, BtLeAudioConnectionState),
    GroupNodeStatusChanged(RawAddress, i32, BtLeAudioGroupNodeStatus),
    AudioLocalCodecCapabilitiesChanged(Vec<LeAudioCodecConfig>, Vec<LeAudioCodecConfig>),
    AudioGroupCodecConfigChanged(
        i32,
        LeAudioCodecConfig,
        LeAudioCodecConfig,
        Vec<LeAudioCodecConfig>,
        Vec<LeAudioCodecConfig>,
    ),
    /// Direction, group id, sink location, source location, available contexts.
    AudioConfChanged(AudioDirection, i32, u32, u32, AudioContext),
    SinkAudioLocationAvailable(RawAddress, u32),
    GroupStatusChanged(i32, BtLeAudioGroupStatus),
    BroadcastCreated(i32, bool),
    BroadcastDestroyed(i32),
    BroadcastState(i32, BtLeBroadcastState),
    BroadcastMetadataChanged(i32, Option<BroadcastMetadata>),
}

/// Receives native events; usually forwards them onto the stack's message channel.
pub struct LeAudioClientCallbacksDispatcher {
    pub dispatch: Box<dyn Fn(LeAudioClientCallbacks) + Send>,
}

/// Commands understood by the native LE Audio client and broadcaster.
///
/// Calls are expected to return promptly; results arrive later as
/// [`LeAudioClientCallbacks`].
pub trait LeAudioNativeInterface: Send + Sync {
    fn connect(&self, addr: RawAddress) -> bool;
    fn disconnect(&self, addr: RawAddress) -> bool;
    fn group_add_node(&self, group_id: i32, addr: RawAddress) -> bool;
    fn group_remove_node(&self, group_id: i32, addr: RawAddress) -> bool;

    /// Activates `group_id`, or deactivates everything with [`LE_AUDIO_GROUP_ID_INVALID`].
    fn group_set_active(&self, group_id: i32);
    fn set_in_call(&self, in_call: bool);
    fn set_codec_config_preference(
        &self,
        group_id: i32,
        input_codec_config: &LeAudioCodecConfig,
        output_codec_config: &LeAudioCodecConfig,
    );
    fn set_ccid_information(&self, ccid: i32, context_type: i32);

    fn create_broadcast(&self, metadata: Vec<u8>, broadcast_code: Option<Vec<u8>>);
    fn start_broadcast(&self, broadcast_id: i32);
    fn update_metadata(&self, broadcast_id: i32, metadata: Vec<u8>);
    fn stop_broadcast(&self, broadcast_id: i32);
    fn destroy_broadcast(&self, broadcast_id: i32);
    fn get_broadcast_metadata(&self, broadcast_id: i32);
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::{FromPrimitive, ToPrimitive};

    #[test]
    fn native_enums_from_raw() {
        assert_eq!(
            BtLeAudioGroupStatus::from_u32(2),
            Some(BtLeAudioGroupStatus::TurnedIdleDuringCall)
        );
        assert_eq!(BtLeAudioGroupNodeStatus::from_u32(0), None);
        assert_eq!(BtLeBroadcastState::Streaming.to_u32(), Some(4));
        assert_eq!(
            BtLeAudioConnectionState::from_u32(3),
            Some(BtLeAudioConnectionState::Disconnecting)
        );
    }

    #[test]
    fn direction_bits() {
        let both = AudioDirection::from_bits_truncate(0x03);
        assert!(both.contains(AudioDirection::OUTPUT | AudioDirection::INPUT));
        assert_eq!(AudioDirection::from_bits_truncate(0x04), AudioDirection::empty());
    }
}
