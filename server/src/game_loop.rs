//! The fixed-interval simulation loop and snapshot broadcasting.

use crate::client_manager::{ClientManager, Frame};
use crate::game::GameSession;
use crate::network::wait_for_shutdown;
use log::{debug, error, info};
use shared::codec::{encode_server, frame, CodecError};
use shared::{ServerMessage, TickSnapshot, WireFormat};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::time::{interval, interval_at, sleep_until, Instant, MissedTickBehavior};

/// Encodes snapshots once and fans them out to every connected client.
pub struct Broadcaster {
    clients: Arc<RwLock<ClientManager>>,
    format: WireFormat,
}

impl Broadcaster {
    pub fn new(clients: Arc<RwLock<ClientManager>>, format: WireFormat) -> Self {
        Self { clients, format }
    }

    pub fn encode(&self, snapshot: TickSnapshot) -> Result<Frame, CodecError> {
        let payload = encode_server(self.format, ServerMessage::TickSnapshot(snapshot))?;
        Ok(Arc::new(frame(&payload)?))
    }

    /// Returns how many clients the snapshot was queued for.
    pub async fn send_snapshot(&self, snapshot: TickSnapshot) -> usize {
        match self.encode(snapshot) {
            Ok(frame) => self.clients.read().await.broadcast(&frame),
            Err(e) => {
                error!("Failed to encode snapshot: {}", e);
                0
            }
        }
    }
}

/// Drives ticks at the session's current interval, the difficulty ramp and
/// the power-up spawn checks until shutdown.
pub struct ServerLoop {
    session: Arc<Mutex<GameSession>>,
    broadcaster: Broadcaster,
    shutdown: watch::Receiver<bool>,
}

impl ServerLoop {
    pub fn new(
        session: Arc<Mutex<GameSession>>,
        clients: Arc<RwLock<ClientManager>>,
        format: WireFormat,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            session,
            broadcaster: Broadcaster::new(clients, format),
            shutdown,
        }
    }

    pub async fn run(mut self) {
        let (speed_up_period, check_period, first_interval) = {
            let session = self.session.lock().await;
            let config = session.config();
            (
                config.speed_up_period,
                config.powerup_check_interval,
                session.tick_interval(),
            )
        };

        // The ramp starts counting when play starts, not at its first tick.
        let mut speed_up = interval_at(Instant::now() + speed_up_period, speed_up_period);
        speed_up.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut powerup_checks = interval(check_period);
        powerup_checks.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut next_tick = Instant::now() + first_interval;
        let mut ticks: u64 = 0;

        loop {
            tokio::select! {
                _ = sleep_until(next_tick) => {
                    let now = Instant::now();
                    let (delivered, tick_interval) = self.tick(now).await;
                    next_tick = now + tick_interval;

                    ticks += 1;
                    if ticks % 100 == 0 {
                        debug!("Tick {}: snapshot sent to {} clients, interval {:?}",
                               ticks, delivered, tick_interval);
                    }
                },

                _ = speed_up.tick() => {
                    let tick_interval = self.session.lock().await.speed_up();
                    info!("Speeding up! Tick interval now {:?}", tick_interval);
                },

                _ = powerup_checks.tick() => {
                    let now = Instant::now().into_std();
                    let events = self.session.lock().await.update_powerups(now);
                    if !events.is_empty() {
                        debug!("Power-up events: {:?}", events);
                    }
                },

                _ = wait_for_shutdown(&mut self.shutdown) => {
                    info!("Game loop stopped after {} ticks", ticks);
                    break;
                }
            }
        }
    }

    /// Advances and resolves one tick under the session lock, then
    /// broadcasts the copied snapshot after releasing it.
    async fn tick(&self, now: Instant) -> (usize, std::time::Duration) {
        let (snapshot, tick_interval) = {
            let mut session = self.session.lock().await;
            let snapshot = session.step(now.into_std());
            (snapshot, session.tick_interval())
        };
        let delivered = self.broadcaster.send_snapshot(snapshot).await;
        (delivered, tick_interval)
    }
}
