//! Polls an asynchronous change until the daemon reports a terminal status.

use crate::client::SnapdClient;
use crate::config::PollConfig;
use crate::error::{Error, Result};
use crate::transport::Transport;
use snapkit_proto::{is_known_pending_status, Change, ChangePhase};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Blocks between polls. Injected so tests can run without delay.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Waits for one change at a time.
pub struct ChangeTracker<'a> {
    client: SnapdClient<'a>,
    poll: PollConfig,
    sleeper: &'a dyn Sleeper,
}

impl<'a> ChangeTracker<'a> {
    #[must_use]
    pub fn new(transport: &'a dyn Transport, poll: PollConfig, sleeper: &'a dyn Sleeper) -> Self {
        Self {
            client: SnapdClient::new(transport),
            poll,
            sleeper,
        }
    }

    /// Poll `change_id` until it is Done, fails, or the attempt ceiling is hit.
    ///
    /// Abort, Hold and Error fail immediately with [`Error::OperationFailed`].
    /// Every other status, including ones this crate does not know, counts
    /// as pending and uses up one attempt. At most `max_attempts` queries are
    /// issued (at least one), and there is no sleep after the last.
    pub fn wait(&self, change_id: &str) -> Result<Change> {
        let max_attempts = self.poll.max_attempts.max(1);
        let mut attempts = 0;
        debug!(change_id, max_attempts, ceiling = ?self.poll.ceiling(), "tracking change");

        loop {
            let change = self.client.change(change_id)?;
            attempts += 1;

            match change.phase() {
                ChangePhase::Succeeded => {
                    debug!(change_id, attempts, kind = %change.kind, "change done");
                    return Ok(change);
                }
                ChangePhase::Failed => {
                    debug!(change_id, attempts, status = %change.status, "change failed");
                    let detail = serde_json::to_value(&change).unwrap_or_default();
                    return Err(Error::OperationFailed {
                        change_id: change_id.to_string(),
                        status: change.status,
                        message: change.err,
                        detail,
                    });
                }
                ChangePhase::Pending => {
                    if !is_known_pending_status(&change.status) {
                        warn!(change_id, status = %change.status, "unrecognized change status, still waiting");
                    }
                    trace!(change_id, attempts, status = %change.status, "change pending");
                }
            }

            if attempts >= max_attempts {
                return Err(Error::OperationTimeout {
                    change_id: change_id.to_string(),
                    attempts,
                });
            }
            self.sleeper.sleep(self.poll.interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::codes;
    use crate::testing::{CountingSleeper, ScriptedTransport};

    fn poll(max_attempts: u32) -> PollConfig {
        PollConfig::new(Duration::ZERO, max_attempts)
    }

    #[test]
    fn test_done_after_three_queries() {
        let transport = ScriptedTransport::new().statuses(&["Doing", "Doing", "Done"]);
        let sleeper = CountingSleeper::default();
        let tracker = ChangeTracker::new(&transport, poll(300), &sleeper);

        let change = tracker.wait("1").unwrap();
        assert_eq!(change.status, "Done");
        assert_eq!(transport.calls().len(), 3);
        assert_eq!(sleeper.sleeps.get(), 2);
        assert!(transport.paths().iter().all(|p| p == "/v2/changes/1"));
    }

    #[test]
    fn test_abort_fails_after_two_queries() {
        let transport = ScriptedTransport::new().statuses(&["Do", "Abort"]);
        let sleeper = CountingSleeper::default();
        let tracker = ChangeTracker::new(&transport, poll(300), &sleeper);

        let err = tracker.wait("1").unwrap_err();
        assert_eq!(err.code(), codes::OPERATION_FAILED);
        match err {
            Error::OperationFailed { status, detail, .. } => {
                assert_eq!(status, "Abort");
                assert_eq!(detail["status"], "Abort");
            }
            other => panic!("Expected OperationFailed, got {other:?}"),
        }
        assert_eq!(transport.calls().len(), 2);
    }

    #[test]
    fn test_hold_and_error_are_terminal() {
        for status in ["Hold", "Error"] {
            let transport = ScriptedTransport::new().statuses(&[status, "Done"]);
            let sleeper = CountingSleeper::default();
            let err = ChangeTracker::new(&transport, poll(10), &sleeper)
                .wait("1")
                .unwrap_err();
            assert_eq!(err.code(), codes::OPERATION_FAILED);
            assert_eq!(transport.calls().len(), 1);
            assert_eq!(sleeper.sleeps.get(), 0);
        }
    }

    #[test]
    fn test_failure_message_comes_from_change_err() {
        let transport = ScriptedTransport::new().reply(serde_json::json!({
            "type": "sync",
            "status-code": 200,
            "result": {"id": "4", "status": "Error", "err": "cannot perform the following tasks:\n- Mount snap \"hello\""}
        }));
        let sleeper = CountingSleeper::default();
        let err = ChangeTracker::new(&transport, poll(10), &sleeper)
            .wait("4")
            .unwrap_err();
        assert!(err.to_string().contains("Mount snap"));
    }

    #[test]
    fn test_timeout_after_max_attempts() {
        let transport = ScriptedTransport::new().statuses(&["Doing"; 5]);
        let sleeper = CountingSleeper::default();
        let tracker = ChangeTracker::new(&transport, poll(4), &sleeper);

        let err = tracker.wait("1").unwrap_err();
        match err {
            Error::OperationTimeout { attempts, change_id } => {
                assert_eq!(attempts, 4);
                assert_eq!(change_id, "1");
            }
            other => panic!("Expected OperationTimeout, got {other:?}"),
        }
        assert_eq!(transport.calls().len(), 4);
        assert_eq!(sleeper.sleeps.get(), 3);
    }

    #[test]
    fn test_unknown_status_counts_as_pending() {
        let transport = ScriptedTransport::new().statuses(&["Wait", "Doing", "Done"]);
        let sleeper = CountingSleeper::default();
        let change = ChangeTracker::new(&transport, poll(3), &sleeper)
            .wait("1")
            .unwrap();
        assert_eq!(change.status, "Done");

        let transport = ScriptedTransport::new().statuses(&["Wait", "Wait"]);
        let err = ChangeTracker::new(&transport, poll(2), &sleeper)
            .wait("1")
            .unwrap_err();
        assert_eq!(err.code(), codes::OPERATION_TIMEOUT);
    }

    #[test]
    fn test_sleeps_use_configured_interval() {
        let transport = ScriptedTransport::new().statuses(&["Do", "Doing", "Done"]);
        let sleeper = CountingSleeper::default();
        ChangeTracker::new(
            &transport,
            PollConfig::new(Duration::from_millis(250), 10),
            &sleeper,
        )
        .wait("1")
        .unwrap();
        assert_eq!(sleeper.total.get(), Duration::from_millis(500));
    }

    #[test]
    fn test_timeout_sleeps_exactly_the_ceiling() {
        let transport = ScriptedTransport::new().statuses(&["Doing"; 4]);
        let sleeper = CountingSleeper::default();
        let poll = PollConfig::new(Duration::from_millis(250), 4);

        assert!(ChangeTracker::new(&transport, poll, &sleeper).wait("1").is_err());
        assert_eq!(sleeper.total.get(), poll.ceiling());
    }

    #[test]
    fn test_zero_attempts_still_queries_once() {
        let transport = ScriptedTransport::new().statuses(&["Done"]);
        let sleeper = CountingSleeper::default();
        assert!(ChangeTracker::new(&transport, poll(0), &sleeper).wait("1").is_ok());
    }

    #[test]
    fn test_error_envelope_stops_polling() {
        let transport = ScriptedTransport::new().reply(serde_json::json!({
            "type": "error",
            "status-code": 404,
            "status": "Not Found",
            "result": {"message": "cannot find change with id \"99\""}
        }));
        let sleeper = CountingSleeper::default();
        let err = ChangeTracker::new(&transport, poll(10), &sleeper)
            .wait("99")
            .unwrap_err();
        assert_eq!(err.code(), codes::DAEMON_ERROR);
    }

    #[test]
    fn test_sequences_terminate_within_ceiling() {
        let sequences: [&[&str]; 5] = [
            &["Do", "Doing", "Undoing", "Undo", "Done"],
            &["Doing", "Error", "Done"],
            &["Done", "Abort"],
            &["Doing", "Doing", "Doing", "Doing", "Doing", "Doing"],
            &["Hold"],
        ];
        for (max_attempts, seq) in (1..=6).zip(sequences) {
            let transport = ScriptedTransport::new().statuses(seq);
            let sleeper = CountingSleeper::default();
            let result = ChangeTracker::new(&transport, poll(max_attempts), &sleeper).wait("1");

            let calls = transport.calls().len();
            assert!(calls <= max_attempts as usize, "{seq:?} issued {calls} polls");

            let window = &seq[..seq.len().min(max_attempts as usize)];
            let first_terminal = window
                .iter()
                .find(|s| matches!(**s, "Done" | "Abort" | "Hold" | "Error"));
            assert_eq!(result.is_ok(), first_terminal == Some(&"Done"), "{seq:?}");
        }
    }
}
