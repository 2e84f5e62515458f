//! Transport resources held by a live session.
//!
//! Everything acquired during `start()` lands here as soon as it exists, so a
//! failure at any step releases exactly what was acquired. [`release`] is the
//! one teardown routine for every exit path.
//!
//! [`release`]: SessionResources::release

use std::sync::Arc;
use tracing::debug;

use crate::core::transport::{ChannelState, DataChannel, LocalAudioTrack, PeerConnection};

#[derive(Default)]
pub struct SessionResources {
    pub peer: Option<Arc<dyn PeerConnection>>,
    pub channel: Option<Arc<dyn DataChannel>>,
    pub track: Option<Arc<dyn LocalAudioTrack>>,
}

impl SessionResources {
    pub fn is_empty(&self) -> bool {
        self.peer.is_none() && self.channel.is_none() && self.track.is_none()
    }

    pub fn has_peer(&self) -> bool {
        self.peer.is_some()
    }

    /// The data channel, only while it is open.
    pub fn open_channel(&self) -> Option<&Arc<dyn DataChannel>> {
        self.channel
            .as_ref()
            .filter(|c| c.state() == ChannelState::Open)
    }

    /// Mute or unmute the microphone. Returns false without a track.
    pub fn set_mic_enabled(&self, enabled: bool) -> bool {
        match &self.track {
            Some(track) => {
                track.set_enabled(enabled);
                true
            }
            None => false,
        }
    }

    /// Close the channel, close the peer connection and stop the local track.
    /// Safe to call repeatedly.
    pub async fn release(&mut self) {
        if self.is_empty() {
            return;
        }
        if let Some(channel) = self.channel.take() {
            channel.close();
        }
        if let Some(peer) = self.peer.take() {
            peer.close().await;
        }
        if let Some(track) = self.track.take() {
            track.stop();
        }
        debug!("Session resources released");
    }
}

impl Drop for SessionResources {
    fn drop(&mut self) {
        if let Some(channel) = self.channel.take() {
            channel.close();
        }
        if let Some(track) = self.track.take() {
            track.stop();
        }
        // Closing the peer is async; hand it to the runtime when one is around.
        if let Some(peer) = self.peer.take()
            && let Ok(handle) = tokio::runtime::Handle::try_current()
        {
            handle.spawn(async move {
                peer.close().await;
            });
        }
    }
}
