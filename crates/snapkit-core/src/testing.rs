//! In-memory fakes shared by the unit tests.

use crate::error::{Error, Result};
use crate::local::{CliOutput, LocalCli};
use crate::tracker::Sleeper;
use crate::transport::Transport;
use snapkit_proto::{Envelope, Method};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

/// Transport that answers from a fixed queue of envelopes.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: RefCell<VecDeque<Envelope>>,
    calls: RefCell<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, value: serde_json::Value) -> Self {
        let envelope: Envelope = serde_json::from_value(value).expect("scripted envelope");
        self.replies.borrow_mut().push_back(envelope);
        self
    }

    /// Queue one `GET /v2/changes` reply per status.
    pub fn statuses(mut self, statuses: &[&str]) -> Self {
        for status in statuses {
            self = self.reply(serde_json::json!({
                "type": "sync",
                "status-code": 200,
                "result": {"id": "1", "kind": "install-snap", "status": status, "ready": *status == "Done"}
            }));
        }
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.path.clone()).collect()
    }
}

impl Transport for ScriptedTransport {
    fn call(&self, method: Method, path: &str, body: Option<&serde_json::Value>) -> Result<Envelope> {
        self.calls.borrow_mut().push(RecordedCall {
            method,
            path: path.to_string(),
            body: body.cloned(),
        });
        self.replies
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| Error::malformed(format!("no scripted reply for {method} {path}")))
    }
}

/// Local CLI that returns canned output and records its arguments.
#[derive(Default)]
pub struct ScriptedCli {
    outputs: RefCell<VecDeque<CliOutput>>,
    invocations: RefCell<Vec<Vec<String>>>,
}

impl ScriptedCli {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(self, code: i32, stdout: &str, stderr: &str) -> Self {
        self.outputs.borrow_mut().push_back(CliOutput {
            code: Some(code),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        });
        self
    }

    pub fn invocations(&self) -> Vec<Vec<String>> {
        self.invocations.borrow().clone()
    }
}

impl LocalCli for ScriptedCli {
    fn run(&self, args: &[String]) -> Result<CliOutput> {
        self.invocations.borrow_mut().push(args.to_vec());
        Ok(self
            .outputs
            .borrow_mut()
            .pop_front()
            .expect("scripted cli output"))
    }

    fn describe(&self, args: &[String]) -> String {
        format!("snap {}", args.join(" "))
    }
}

/// Sleeper that returns immediately and counts how often it was asked to wait.
#[derive(Default)]
pub struct CountingSleeper {
    pub sleeps: Cell<u32>,
    pub total: Cell<Duration>,
}

impl Sleeper for CountingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.set(self.sleeps.get() + 1);
        self.total.set(self.total.get() + duration);
    }
}
