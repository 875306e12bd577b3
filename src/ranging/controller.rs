use anyhow::{bail, Context, Result};
use log::{info, trace};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::config::SharedRangingConfig;
use super::distance::CurrentDistance;
use super::engine::RangingEngine;
use super::frame::DepthFrame;
use super::loop_worker::ranging_loop;

/// One frame in flight at a time; the source drops frames while the engine is busy.
const FRAME_QUEUE_DEPTH: usize = 1;

/// Handed to the frame source; each callback offers its frame here.
#[derive(Debug, Clone)]
pub struct FrameSender {
    tx: mpsc::Sender<DepthFrame>,
}

impl FrameSender {
    /// Returns `false` when the frame was dropped because another one is still
    /// queued or ranging has stopped.
    pub fn offer(&self, frame: DepthFrame) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                trace!("dropping depth frame: engine busy");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Waits for room instead of dropping.
    pub async fn send(&self, frame: DepthFrame) -> bool {
        self.tx.send(frame).await.is_ok()
    }
}

/// Starts and stops the task that feeds frames through a `RangingEngine`.
pub struct RangingController {
    config: SharedRangingConfig,
    distance: CurrentDistance,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl RangingController {
    pub fn new(config: SharedRangingConfig, distance: CurrentDistance) -> Self {
        Self {
            config,
            distance,
            handle: None,
            cancel_token: None,
        }
    }

    pub fn distance(&self) -> &CurrentDistance {
        &self.distance
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Spawns the ranging loop with a fresh moving average.
    pub fn start_ranging(&mut self) -> Result<FrameSender> {
        if self.handle.is_some() {
            bail!("ranging already active");
        }

        let (tx, rx) = mpsc::channel(FRAME_QUEUE_DEPTH);
        let engine = RangingEngine::new(self.config.clone(), self.distance.clone());
        let cancel_token = CancellationToken::new();

        let handle = tokio::spawn(ranging_loop(engine, rx, cancel_token.clone()));
        info!("Ranging started");

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(FrameSender { tx })
    }

    /// Stops the loop and clears the published distance so no stale reading survives
    /// the pause.
    pub async fn stop_ranging(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        let joined = match self.handle.take() {
            Some(handle) => handle.await.context("ranging loop task failed to join"),
            None => Ok(()),
        };

        self.distance.clear();
        info!("Ranging stopped");
        joined
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::ranging::config::RangingConfig;
    use crate::ranging::frame::{ConfidenceLevel, DepthMap, Grid};

    fn uniform(depth: f32) -> DepthFrame {
        DepthFrame::new(DepthMap::new(
            Grid::filled(4, 4, depth),
            Grid::filled(4, 4, ConfidenceLevel::High),
        ))
    }

    fn controller(smoothing_window: usize) -> RangingController {
        let config = SharedRangingConfig::new(RangingConfig {
            roi_fraction: 1.0,
            smoothing_window,
            ..RangingConfig::default()
        });
        RangingController::new(config, CurrentDistance::new())
    }

    async fn wait_for(distance: &CurrentDistance, expected: f32) {
        let mut rx = distance.subscribe();
        tokio::time::timeout(Duration::from_secs(2), async {
            while *rx.borrow_and_update() != Some(expected) {
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
        .expect("distance never reached expected value");
    }

    #[tokio::test]
    async fn frames_flow_into_current_distance() {
        let mut controller = controller(2);
        let sender = controller.start_ranging().unwrap();

        assert!(sender.send(uniform(2.0)).await);
        wait_for(controller.distance(), 2.0).await;
        assert!(sender.send(uniform(4.0)).await);
        wait_for(controller.distance(), 3.0).await;

        controller.stop_ranging().await.unwrap();
    }

    #[tokio::test]
    async fn stop_clears_distance_and_restart_warms_up_fresh() {
        let mut controller = controller(3);
        let sender = controller.start_ranging().unwrap();
        assert!(sender.send(uniform(1.0)).await);
        wait_for(controller.distance(), 1.0).await;

        controller.stop_ranging().await.unwrap();
        assert_eq!(controller.distance().get(), None);
        assert!(!sender.offer(uniform(9.0)));

        let sender = controller.start_ranging().unwrap();
        assert!(sender.send(uniform(5.0)).await);
        // A carried-over average would have published 3.0.
        wait_for(controller.distance(), 5.0).await;
        controller.stop_ranging().await.unwrap();
    }

    #[tokio::test]
    async fn double_start_is_rejected() {
        let mut controller = controller(1);
        let _sender = controller.start_ranging().unwrap();
        assert!(controller.start_ranging().is_err());
        controller.stop_ranging().await.unwrap();
        assert!(!controller.is_running());
    }
}
