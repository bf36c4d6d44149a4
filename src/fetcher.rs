use log::{info, warn};
use std::time::Duration;

use crate::board::Board;
use crate::config::Config;
use crate::fault::{Fault, RestartReason};
use crate::net::{redact, HttpClient, Radio};
use crate::prediction::{parse_predictions, predictions_url, Prediction};
use crate::session::SessionManager;
use crate::views::{flash_status, Screen, STATUS_REBUILDING};

/// Fetches the prediction set for the configured stop, rebuilding the network
/// once between two attempts.
pub struct PredictionFetcher {
    url: String,
    retry_cooldown: Duration,
}

impl PredictionFetcher {
    pub fn new(cfg: &Config) -> Self {
        Self {
            url: predictions_url(cfg),
            retry_cooldown: cfg.retry_cooldown,
        }
    }

    /// Out-of-memory on either attempt restarts the device. Any other fault
    /// on the second attempt is returned to the caller.
    pub fn fetch<R, B, S>(
        &self,
        session: &mut SessionManager<R>,
        board: &mut B,
        screen: &mut S,
    ) -> Result<Vec<Prediction>, Fault>
    where
        R: Radio,
        B: Board + ?Sized,
        S: Screen + ?Sized,
    {
        match self.attempt(session) {
            Ok(preds) => return Ok(self.succeed(session, board, preds)),
            Err(e) if e.is_fatal() => board.restart(RestartReason::OutOfMemory(e.to_string())),
            Err(e) => warn!("Fetch failed: {}; rebuilding network", e),
        }

        flash_status(screen, STATUS_REBUILDING);
        session.reset_network(board, screen);
        board.sleep(self.retry_cooldown);

        match self.attempt(session) {
            Ok(preds) => Ok(self.succeed(session, board, preds)),
            Err(e) if e.is_fatal() => board.restart(RestartReason::OutOfMemory(e.to_string())),
            Err(e) => {
                warn!("Fetch retry failed: {}", e);
                Err(e)
            }
        }
    }

    fn attempt<R: Radio>(&self, session: &mut SessionManager<R>) -> Result<Vec<Prediction>, Fault> {
        let client = session
            .client()
            .ok_or_else(|| Fault::Transport("no network session".into()))?;
        info!("GET {}", redact(&self.url));
        let body = client.get(&self.url)?;
        Ok(parse_predictions(&body)?.predictions)
    }

    fn succeed<R, B>(
        &self,
        session: &mut SessionManager<R>,
        board: &mut B,
        preds: Vec<Prediction>,
    ) -> Vec<Prediction>
    where
        R: Radio,
        B: Board + ?Sized,
    {
        info!("Fetched {} prediction(s)", preds.len());
        session.record_success();
        board.reclaim_memory();
        preds
    }
}
