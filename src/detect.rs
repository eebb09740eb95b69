//! Polling clock for an external detection/recognition job.
//!
//! The ML collaborator is a black box behind a job-submission call and a
//! progress query. This poller is the cancellable task bound to the editing
//! session: the editor's tick asks [`DetectionPoller::due`] whether it is
//! time to query again (fixed 1 s interval, no backoff), and navigation
//! cancels the poller outright so a stale completion can never touch the
//! wrong image.

use std::time::Duration;
use web_time::Instant;

use crate::constants::DETECTION_POLL_INTERVAL;

#[derive(Debug)]
struct PollJob {
    image: String,
    last_poll: Option<Instant>,
}

/// Tick-driven poll scheduler for one detection job at a time.
#[derive(Debug)]
pub struct DetectionPoller {
    interval: Duration,
    job: Option<PollJob>,
}

impl DetectionPoller {
    pub fn new() -> Self {
        Self::with_interval(DETECTION_POLL_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self { interval, job: None }
    }

    /// Start polling for the given image's job. Replaces any previous job.
    pub fn start(&mut self, image: impl Into<String>) {
        let image = image.into();
        log::debug!("Detection: polling started for '{}'", image);
        self.job = Some(PollJob {
            image,
            last_poll: None,
        });
    }

    pub fn is_active(&self) -> bool {
        self.job.is_some()
    }

    /// Image the active job belongs to, if any.
    pub fn image(&self) -> Option<&str> {
        self.job.as_ref().map(|j| j.image.as_str())
    }

    /// Whether a progress query should be issued now. The first poll after
    /// [`Self::start`] is due immediately.
    pub fn due(&self) -> bool {
        match &self.job {
            Some(job) => match job.last_poll {
                Some(t) => t.elapsed() >= self.interval,
                None => true,
            },
            None => false,
        }
    }

    /// Record that a progress query was just issued.
    pub fn note_polled(&mut self) {
        if let Some(job) = &mut self.job {
            job.last_poll = Some(Instant::now());
        }
    }

    /// The job reached a terminal state; stop polling.
    pub fn finish(&mut self) {
        if let Some(job) = self.job.take() {
            log::debug!("Detection: polling finished for '{}'", job.image);
        }
    }

    /// Cancel without completion (navigation, error).
    pub fn cancel(&mut self) {
        if let Some(job) = self.job.take() {
            log::debug!("Detection: polling cancelled for '{}'", job.image);
        }
    }
}

impl Default for DetectionPoller {
    fn default() -> Self {
        Self::new()
    }
}
