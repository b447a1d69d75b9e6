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

//! LE Audio broadcast sessions.

use log::warn;
use num_derive::{FromPrimitive, ToPrimitive};
use std::collections::HashMap;

use crate::btif::RawAddress;
use crate::codec::LeAudioCodecConfig;
use crate::error::LeAudioError;
use crate::profiles::le_audio::BtLeBroadcastState;

/// Routing identity used while a broadcast owns the audio output.
pub const BROADCAST_PLACEHOLDER_DEVICE: RawAddress = RawAddress::new([0xFF; 6]);

pub const BROADCAST_CODE_MIN_LEN: usize = 4;
pub const BROADCAST_CODE_MAX_LEN: usize = 16;

/// Why a broadcast changed state, reported to broadcast listeners.
#[derive(Clone, Copy, Debug, Eq, FromPrimitive, PartialEq, ToPrimitive)]
#[repr(i32)]
pub enum BroadcastReason {
    LocalAppRequest = 1100,
    LocalStackRequest = 1101,
    RemoteRequest = 1102,
    InvalidBroadcastId = 1103,
    InvalidBroadcastCode = 1104,
    Unknown = 1105,
}

/// An empty code disables encryption; anything else must be 4 to 16 octets.
pub fn validate_broadcast_code(code: &[u8]) -> Result<(), LeAudioError> {
    match code.len() {
        0 | BROADCAST_CODE_MIN_LEN..=BROADCAST_CODE_MAX_LEN => Ok(()),
        len => Err(LeAudioError::InvalidBroadcastCode(len)),
    }
}

const LTV_TYPE_PROGRAM_INFO: u8 = 0x03;
const LTV_TYPE_LANGUAGE: u8 = 0x04;

/// Content description attached to a broadcast, as length-type-value records.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ContentMetadata {
    pub program_info: Option<String>,
    /// ISO 639-3 language code.
    pub language: Option<String>,
}

impl ContentMetadata {
    pub fn to_raw(&self) -> Vec<u8> {
        let mut raw = Vec::new();
        for (ltv_type, value) in [
            (LTV_TYPE_PROGRAM_INFO, &self.program_info),
            (LTV_TYPE_LANGUAGE, &self.language),
        ] {
            let Some(value) = value else {
                continue;
            };
            // Length covers the type octet, so values are capped at 254 bytes on a char boundary.
            let mut end = value.len().min(u8::MAX as usize - 1);
            while !value.is_char_boundary(end) {
                end -= 1;
            }
            let bytes = &value.as_bytes()[..end];
            raw.push(bytes.len() as u8 + 1);
            raw.push(ltv_type);
            raw.extend_from_slice(bytes);
        }
        raw
    }

    /// Returns `None` when a record runs past the end of `raw`. Unknown types are skipped.
    pub fn from_raw(raw: &[u8]) -> Option<Self> {
        let mut metadata = Self::default();
        let mut rest = raw;
        while let Some((&len, tail)) = rest.split_first() {
            let len = len as usize;
            if len == 0 {
                rest = tail;
                continue;
            }
            if tail.len() < len {
                warn!("Truncated metadata record, {} of {} bytes", tail.len(), len);
                return None;
            }
            let (record, tail) = tail.split_at(len);
            let value = String::from_utf8_lossy(&record[1..]).into_owned();
            match record[0] {
                LTV_TYPE_PROGRAM_INFO => metadata.program_info = Some(value),
                LTV_TYPE_LANGUAGE => metadata.language = Some(value),
                _ => (),
            }
            rest = tail;
        }
        Some(metadata)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BroadcastSubgroup {
    pub codec_config: LeAudioCodecConfig,
    pub content_metadata: ContentMetadata,
    pub channel_count: u8,
}

/// Everything a broadcast sink needs to find and sync to a broadcast.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BroadcastMetadata {
    pub broadcast_id: i32,
    pub source_address: RawAddress,
    pub advertising_sid: u8,
    pub pa_sync_interval: u16,
    pub encrypted: bool,
    pub broadcast_code: Option<Vec<u8>>,
    pub presentation_delay_micros: u32,
    pub subgroups: Vec<BroadcastSubgroup>,
}

/// State, playback and metadata caches, all keyed by broadcast id.
#[derive(Default)]
pub struct BroadcastSessions {
    states: HashMap<i32, BtLeBroadcastState>,
    playback: HashMap<i32, bool>,
    metadata: HashMap<i32, BroadcastMetadata>,
}

impl BroadcastSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks a freshly created broadcast that has not reported a state yet.
    pub fn register(&mut self, broadcast_id: i32) {
        self.playback.entry(broadcast_id).or_insert(false);
    }

    pub fn is_known(&self, broadcast_id: i32) -> bool {
        self.states.contains_key(&broadcast_id) || self.playback.contains_key(&broadcast_id)
    }

    /// Caches `state` and returns true if no state was known for this id before.
    pub fn update_state(&mut self, broadcast_id: i32, state: BtLeBroadcastState) -> bool {
        self.states.insert(broadcast_id, state).is_none()
    }

    pub fn state(&self, broadcast_id: i32) -> Option<BtLeBroadcastState> {
        self.states.get(&broadcast_id).copied()
    }

    pub fn set_playing(&mut self, broadcast_id: i32, playing: bool) {
        self.playback.insert(broadcast_id, playing);
    }

    pub fn is_playing(&self, broadcast_id: i32) -> bool {
        self.playback.get(&broadcast_id).copied().unwrap_or(false)
    }

    pub fn playing_count(&self) -> usize {
        self.playback.values().filter(|playing| **playing).count()
    }

    pub fn set_metadata(&mut self, broadcast_id: i32, metadata: BroadcastMetadata) {
        self.metadata.insert(broadcast_id, metadata);
    }

    pub fn metadata(&self, broadcast_id: i32) -> Option<&BroadcastMetadata> {
        self.metadata.get(&broadcast_id)
    }

    /// Cached metadata, ordered by broadcast id.
    pub fn all_metadata(&self) -> Vec<BroadcastMetadata> {
        let mut all: Vec<_> = self.metadata.values().cloned().collect();
        all.sort_by_key(|m| m.broadcast_id);
        all
    }

    /// Known broadcast ids, ascending.
    pub fn ids(&self) -> Vec<i32> {
        let mut ids: Vec<_> = self.states.keys().chain(self.playback.keys()).copied().collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Forgets everything about `broadcast_id`.
    pub fn purge(&mut self, broadcast_id: i32) {
        self.states.remove(&broadcast_id);
        self.playback.remove(&broadcast_id);
        self.metadata.remove(&broadcast_id);
    }

    pub fn has_entries(&self, broadcast_id: i32) -> bool {
        self.is_known(broadcast_id) || self.metadata.contains_key(&broadcast_id)
    }

    pub fn clear(&mut self) {
        self.states.clear();
        self.playback.clear();
        self.metadata.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_code_lengths() {
        for len in [0, 4, 10, 16] {
            assert_eq!(validate_broadcast_code(&vec![0x30; len]), Ok(()), "len {}", len);
        }
        for len in [1, 2, 3, 17, 32] {
            assert_eq!(
                validate_broadcast_code(&vec![0x30; len]),
                Err(LeAudioError::InvalidBroadcastCode(len))
            );
        }
    }

    #[test]
    fn content_metadata_ltv() {
        let metadata = ContentMetadata {
            program_info: Some("News".to_string()),
            language: Some("eng".to_string()),
        };
        let raw = metadata.to_raw();
        assert_eq!(
            raw,
            vec![0x05, 0x03, b'N', b'e', b'w', b's', 0x04, 0x04, b'e', b'n', b'g']
        );
        assert_eq!(ContentMetadata::from_raw(&raw), Some(metadata));
    }

    #[test]
    fn content_metadata_skips_unknown_and_rejects_truncated() {
        let raw = [0x02, 0x01, 0x04, 0x03, 0x03, b'H', b'i'];
        assert_eq!(
            ContentMetadata::from_raw(&raw),
            Some(ContentMetadata { program_info: Some("Hi".to_string()), language: None })
        );
        assert_eq!(ContentMetadata::from_raw(&[0x05, 0x03, b'x']), None);
        assert_eq!(ContentMetadata::to_raw(&ContentMetadata::default()), Vec::<u8>::new());
    }

    #[test]
    fn content_metadata_truncates_on_char_boundary() {
        let program_info = format!("a{}", "é".repeat(127));
        assert_eq!(program_info.len(), 255);
        let metadata = ContentMetadata { program_info: Some(program_info), language: None };

        let raw = metadata.to_raw();
        assert_eq!(raw[0], 254);
        assert_eq!(raw.len(), 255);
        let decoded = ContentMetadata::from_raw(&raw).unwrap();
        assert_eq!(decoded.program_info, Some(format!("a{}", "é".repeat(126))));
    }

    #[test]
    fn sessions_track_and_purge() {
        let mut sessions = BroadcastSessions::new();
        assert!(!sessions.is_known(7));

        sessions.register(7);
        assert!(sessions.is_known(7));
        assert!(sessions.update_state(7, BtLeBroadcastState::Streaming));
        assert!(!sessions.update_state(7, BtLeBroadcastState::Streaming));
        sessions.set_playing(7, true);
        sessions.set_metadata(7, BroadcastMetadata { broadcast_id: 7, ..Default::default() });
        sessions.update_state(8, BtLeBroadcastState::Paused);
        assert_eq!(sessions.playing_count(), 1);
        assert_eq!(sessions.ids(), vec![7, 8]);

        sessions.purge(7);
        assert!(!sessions.has_entries(7));
        assert!(sessions.all_metadata().is_empty());
        assert_eq!(sessions.playing_count(), 0);
    }
}
