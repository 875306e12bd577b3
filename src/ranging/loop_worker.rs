use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::engine::RangingEngine;
use super::frame::DepthFrame;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

const PROGRESS_LOG_EVERY_FRAMES: u64 = 300;

pub async fn ranging_loop(
    mut engine: RangingEngine,
    mut frames: mpsc::Receiver<DepthFrame>,
    cancel_token: CancellationToken,
) {
    let mut processed: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("ranging loop shutting down after {} frames", processed);
                break;
            }
            frame = frames.recv() => {
                let Some(frame) = frame else {
                    log_info!("frame source closed after {} frames", processed);
                    break;
                };

                let reading = engine.ingest_frame(&frame);
                processed = processed.wrapping_add(1);
                if processed % PROGRESS_LOG_EVERY_FRAMES == 0 {
                    match engine.last_sample() {
                        Some(sample) => {
                            log_debug!(
                                "processed {} frames, current distance {:?} ({:?} depth, {} pixels, frame avg {:.3} m)",
                                processed,
                                reading,
                                sample.source,
                                sample.pixels_used,
                                sample.average
                            );
                        }
                        None => {
                            log_debug!("processed {} frames, no reading yet", processed);
                        }
                    }
                }
            }
        }
    }
}
