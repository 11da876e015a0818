use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use shared::UserRecord;
use tracing::{error, info, warn};

use crate::gateway::AdminBackend;
use crate::workflow::roster::RosterController;

/// Shortest period `watch_roster` will poll at.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl RosterDiff {
    pub fn between(previous: &[UserRecord], current: &[UserRecord]) -> Self {
        let before: HashSet<&str> = previous.iter().map(|u| u.username.as_str()).collect();
        let after: HashSet<&str> = current.iter().map(|u| u.username.as_str()).collect();

        Self {
            added: current
                .iter()
                .filter(|u| !before.contains(u.username.as_str()))
                .map(|u| u.username.clone())
                .collect(),
            removed: previous
                .iter()
                .filter(|u| !after.contains(u.username.as_str()))
                .map(|u| u.username.clone())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Reloads the roster on a fixed interval until `shutdown` resolves,
/// reporting every change to `on_change`.
pub async fn watch_roster<B, F, S>(
    roster: &RosterController<B>,
    interval: Duration,
    mut on_change: F,
    shutdown: S,
) where
    B: AdminBackend,
    F: FnMut(&RosterDiff, &[UserRecord]),
    S: Future<Output = ()>,
{
    if interval < MIN_REFRESH_INTERVAL {
        warn!(
            requested_ms = interval.as_millis() as u64,
            "Refresh interval too short, using {:?}",
            MIN_REFRESH_INTERVAL
        );
    }
    let interval = interval.max(MIN_REFRESH_INTERVAL);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    info!(interval_ms = interval.as_millis() as u64, "Watching roster");

    let mut previous = roster.users();
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Roster watch stopped");
                break;
            }
            _ = ticker.tick() => {
                match roster.load().await {
                    Ok(current) => {
                        let diff = RosterDiff::between(&previous, &current);
                        if !diff.is_empty() {
                            on_change(&diff, &current);
                        }
                        previous = current;
                    }
                    Err(e) => {
                        error!(error = %e, "Roster refresh failed");
                    }
                }
            }
        }
    }
}
