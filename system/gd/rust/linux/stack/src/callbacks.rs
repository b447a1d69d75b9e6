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

//! Collections of registered listeners.

use log::warn;
use thiserror::Error;

/// Failure reported by a single listener invocation.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CallbackError {
    /// The listener went away; it is dropped from the collection.
    #[error("listener disconnected")]
    Disconnected,
    /// The listener failed this one delivery; it stays registered.
    #[error("listener failed: {0}")]
    Failed(String),
}

pub type CallbackResult = Result<(), CallbackError>;

/// Listeners keyed by the id returned at registration, kept in registration order.
pub struct Callbacks<T: ?Sized + Send> {
    name: &'static str,
    callbacks: Vec<(u32, Box<T>)>,
    next_id: u32,
}

impl<T: ?Sized + Send> Callbacks<T> {
    pub fn new(name: &'static str) -> Self {
        Self { name, callbacks: Vec::new(), next_id: 1 }
    }

    /// Stores `callback` and returns its id.
    pub fn add_callback(&mut self, callback: Box<T>) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.callbacks.push((id, callback));
        id
    }

    /// Returns false if `id` is not registered.
    pub fn remove_callback(&mut self, id: u32) -> bool {
        let len = self.callbacks.len();
        self.callbacks.retain(|(cb_id, _)| *cb_id != id);
        self.callbacks.len() != len
    }

    pub fn get_by_id_mut(&mut self, id: u32) -> Option<&mut Box<T>> {
        self.callbacks.iter_mut().find(|(cb_id, _)| *cb_id == id).map(|(_, cb)| cb)
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Delivers to every listener. A failing listener never prevents delivery to the others.
    pub fn for_all_callbacks<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut Box<T>) -> CallbackResult,
    {
        let mut disconnected = Vec::new();
        for (id, callback) in self.callbacks.iter_mut() {
            match f(callback) {
                Ok(()) => (),
                Err(CallbackError::Disconnected) => {
                    warn!("{} callback {} disconnected, removing it", self.name, id);
                    disconnected.push(*id);
                }
                Err(e) => warn!("{} callback {}: {}", self.name, id, e),
            }
        }
        if !disconnected.is_empty() {
            self.callbacks.retain(|(id, _)| !disconnected.contains(id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    trait Listener: Send {
        fn ping(&mut self, value: u32) -> CallbackResult;
    }

    struct Recorder {
        seen: Arc<Mutex<Vec<u32>>>,
        result: CallbackResult,
    }

    impl Listener for Recorder {
        fn ping(&mut self, value: u32) -> CallbackResult {
            self.seen.lock().unwrap().push(value);
            self.result.clone()
        }
    }

    fn recorder(result: CallbackResult) -> (Box<dyn Listener>, Arc<Mutex<Vec<u32>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (Box::new(Recorder { seen: seen.clone(), result }), seen)
    }

    #[test]
    fn failure_does_not_block_other_listeners() {
        let mut callbacks: Callbacks<dyn Listener> = Callbacks::new("test");
        let (failing, failing_seen) = recorder(Err(CallbackError::Failed("boom".into())));
        let (healthy, healthy_seen) = recorder(Ok(()));
        callbacks.add_callback(failing);
        callbacks.add_callback(healthy);

        callbacks.for_all_callbacks(|cb| cb.ping(7));
        callbacks.for_all_callbacks(|cb| cb.ping(8));

        assert_eq!(*failing_seen.lock().unwrap(), vec![7, 8]);
        assert_eq!(*healthy_seen.lock().unwrap(), vec![7, 8]);
        assert_eq!(callbacks.len(), 2);
    }

    #[test]
    fn disconnected_listener_is_dropped() {
        let mut callbacks: Callbacks<dyn Listener> = Callbacks::new("test");
        let (gone, gone_seen) = recorder(Err(CallbackError::Disconnected));
        let (healthy, healthy_seen) = recorder(Ok(()));
        callbacks.add_callback(gone);
        let healthy_id = callbacks.add_callback(healthy);

        callbacks.for_all_callbacks(|cb| cb.ping(1));
        callbacks.for_all_callbacks(|cb| cb.ping(2));

        assert_eq!(*gone_seen.lock().unwrap(), vec![1]);
        assert_eq!(*healthy_seen.lock().unwrap(), vec![1, 2]);
        assert!(callbacks.get_by_id_mut(healthy_id).is_some());
        assert_eq!(callbacks.len(), 1);
    }

    #[test]
    fn remove_unknown_id() {
        let mut callbacks: Callbacks<dyn Listener> = Callbacks::new("test");
        let (listener, _) = recorder(Ok(()));
        let id = callbacks.add_callback(listener);
        assert!(!callbacks.remove_callback(id + 1));
        assert!(callbacks.remove_callback(id));
        assert!(callbacks.is_empty());
    }
}
