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

//! LE Audio group and broadcast coordination for the Floss Bluetooth stack.
//!
//! The native LE Audio client reports events through
//! [`profiles::le_audio::LeAudioClientCallbacks`]. They travel over a single
//! [`Message`] channel to [`Stack::dispatch`], which applies them to the shared
//! [`le_audio::LeAudio`] one at a time.

pub mod audio;
pub mod broadcast;
pub mod btif;
pub mod callbacks;
pub mod codec;
pub mod config;
pub mod error;
pub mod le_audio;
pub mod profiles;
pub mod registry;
pub mod state_machine;
pub mod utils;


use log::{debug, warn};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{channel, Receiver, Sender};

use crate::le_audio::{LeAudio, LeAudioActions};
use crate::profiles::le_audio::LeAudioClientCallbacks;

/// Message types that are sent to the stack main dispatch loop.
#[derive(Debug)]
pub enum Message {
    /// Event from the native LE Audio client or broadcaster.
    LeAudio(LeAudioClientCallbacks),
    /// Timer expiry and other deferred work.
    LeAudioActions(LeAudioActions),
}

/// Depth of the stack message channel.
const MESSAGE_CHANNEL_DEPTH: usize = 100;

/// Umbrella class for the LE Audio stack.
pub struct Stack {}

impl Stack {
    /// Creates an mpsc channel for passing messages to the main dispatch loop.
    pub fn create_channel() -> (Sender<Message>, Receiver<Message>) {
        channel::<Message>(MESSAGE_CHANNEL_DEPTH)
    }

    /// Runs the main dispatch loop until every sender is gone.
    pub async fn dispatch(mut rx: Receiver<Message>, le_audio: Arc<Mutex<LeAudio>>) {
        while let Some(m) = rx.recv().await {
            let mut le_audio = match le_audio.lock() {
                Ok(guard) => guard,
                Err(poisoned) => {
                    warn!("LE Audio lock poisoned, recovering");
                    poisoned.into_inner()
                }
            };

            match m {
                Message::LeAudio(cb) => le_audio.dispatch_le_audio_callbacks(cb),
                Message::LeAudioActions(action) => le_audio.handle_action(action),
            }
        }
        debug!("Message dispatch loop quit");
    }
}
