//! Query a collaborator, format its answer, publish it.
//!
//! Shared by the periodic refresh tasks and by the command worker's
//! republish step. Nothing here awaits a publish outcome.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::host::{
    BatteryError, BatteryReader, MediaController, MediaError, MusicSnapshot, PresenceClient,
    PresenceError, PresenceSnapshot,
};
use crate::mqtt::{GatewayHandle, Suffix};

const UNKNOWN_STATE: &str = "unknown";

/// Upper bounds for each collaborator call
#[derive(Debug, Clone, Copy)]
pub struct QueryTimeouts {
    pub music: Duration,
    pub presence: Duration,
    pub battery: Duration,
}

#[derive(Clone)]
pub struct StatePublisher {
    gateway: GatewayHandle,
    media: Arc<dyn MediaController>,
    battery: Arc<dyn BatteryReader>,
    presence: Option<Arc<dyn PresenceClient>>,
    timeouts: QueryTimeouts,
}

impl StatePublisher {
    pub fn new(
        gateway: GatewayHandle,
        media: Arc<dyn MediaController>,
        battery: Arc<dyn BatteryReader>,
        presence: Option<Arc<dyn PresenceClient>>,
        timeouts: QueryTimeouts,
    ) -> Self {
        Self {
            gateway,
            media,
            battery,
            presence,
            timeouts,
        }
    }

    pub fn media(&self) -> &dyn MediaController {
        self.media.as_ref()
    }

    pub fn timeouts(&self) -> QueryTimeouts {
        self.timeouts
    }

    pub fn has_presence(&self) -> bool {
        self.presence.is_some()
    }

    /// Publishes volume, state and the current track. If the player cannot
    /// be queried only `status/music/state = "unknown"` goes out.
    pub async fn publish_music(&self) -> Result<MusicSnapshot, MediaError> {
        let limit = self.timeouts.music;
        let queried = tokio::time::timeout(limit, self.media.query())
            .await
            .unwrap_or(Err(MediaError::Timeout(limit)));

        let snapshot = match queried {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Failed to query music player: {}", e);
                drop(
                    self.gateway
                        .publish_and_wait(Suffix::MusicState, false, UNKNOWN_STATE),
                );
                return Err(e);
            }
        };

        let track = |field: &Option<String>| field.clone().unwrap_or_default();
        for (suffix, payload) in [
            (Suffix::MusicVolume, snapshot.volume.to_string()),
            (Suffix::MusicState, snapshot.player_state.to_string()),
            (Suffix::MusicTrackId, track(&snapshot.track_id)),
            (Suffix::MusicTrackName, track(&snapshot.track_name)),
            (Suffix::MusicTrackArtist, track(&snapshot.track_artist)),
        ] {
            drop(self.gateway.publish_and_wait(suffix, false, payload));
        }
        debug!(
            "Music: {} at volume {}",
            snapshot.player_state, snapshot.volume
        );
        Ok(snapshot)
    }

    /// Publishes meeting and mute flags. Failures are logged and nothing is
    /// published; without a presence client this does nothing.
    pub async fn publish_presence(&self) -> Option<Result<PresenceSnapshot, PresenceError>> {
        let presence = self.presence.as_ref()?;
        let limit = self.timeouts.presence;
        let queried = tokio::time::timeout(limit, presence.query())
            .await
            .unwrap_or(Err(PresenceError::Timeout(limit)));

        match &queried {
            Ok(snapshot) => {
                drop(self.gateway.publish_and_wait(
                    Suffix::MuteSyncInMeeting,
                    false,
                    snapshot.in_meeting.to_string(),
                ));
                drop(self.gateway.publish_and_wait(
                    Suffix::MuteSyncMuted,
                    false,
                    snapshot.muted.to_string(),
                ));
            }
            Err(e) => warn!("Failed to query mutesync: {}", e),
        }
        Some(queried)
    }

    /// Publishes the charge in percent. Errors go back to the caller, which
    /// decides whether they are fatal.
    pub async fn publish_battery(&self) -> Result<u8, BatteryError> {
        let limit = self.timeouts.battery;
        let percent = tokio::time::timeout(limit, self.battery.read())
            .await
            .unwrap_or(Err(BatteryError::Timeout(limit)))?;

        debug!("Battery at {}%", percent);
        drop(
            self.gateway
                .publish_and_wait(Suffix::Battery, false, percent.to_string()),
        );
        Ok(percent)
    }
}
