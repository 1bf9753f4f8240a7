//! Dedicated decode thread.
//!
//! [`WorkerDecoder`] moves JPEG decoding off the async runtime onto one
//! long-lived thread. Jobs travel over an mpsc channel and results come
//! back on a per-job oneshot; the decoded buffer is moved across, never
//! copied. Dropping the decoder closes the channel and the thread exits.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::bitmap::Bitmap;
use crate::decode::{decode_jpeg, FrameDecode, FrameError};

/// Queued jobs. The pipeline keeps at most one decode in flight, so a
/// small buffer is enough.
const JOB_QUEUE_CAPACITY: usize = 2;

struct DecodeJob {
    payload: String,
    reply: oneshot::Sender<Result<Bitmap, FrameError>>,
}

/// Frame decoder backed by a dedicated worker thread.
pub struct WorkerDecoder {
    job_tx: mpsc::Sender<DecodeJob>,
}

impl WorkerDecoder {
    /// Spawn the decode thread.
    pub fn spawn() -> std::io::Result<Self> {
        let (job_tx, mut job_rx) = mpsc::channel::<DecodeJob>(JOB_QUEUE_CAPACITY);

        std::thread::Builder::new()
            .name("frame-decode".to_string())
            .spawn(move || {
                while let Some(job) = job_rx.blocking_recv() {
                    let result = decode_jpeg(&job.payload);
                    // The requester may have gone away; nothing to do then.
                    let _ = job.reply.send(result);
                }
                tracing::debug!("Decode worker thread exiting");
            })?;

        Ok(Self { job_tx })
    }
}

#[async_trait]
impl FrameDecode for WorkerDecoder {
    async fn decode(&self, payload: &str) -> Result<Bitmap, FrameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.job_tx
            .send(DecodeJob {
                payload: payload.to_owned(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| FrameError::WorkerUnavailable)?;

        reply_rx.await.map_err(|_| FrameError::WorkerUnavailable)?
    }

    fn name(&self) -> &'static str {
        "worker"
    }
}
