//! Scripted backend
//!
//! Records every request and answers from a queue. Once the queue is
//! empty, requests are acknowledged without data, or, in dry-run mode,
//! answered the way a healthy chip would answer them.

use std::collections::VecDeque;

use crate::backend::{BackendType, TestmodeBackend};
use crate::error::{CalError, Result};
use crate::target::Target;
use crate::testmode::{describe, dry_run_answer, encode_data_answer, encode_fw_answer};
use wl_chip::testmode::FW_STATUS_SUCCESS;

/// One recorded request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Target the request was addressed to
    pub target: Target,
    /// Encoded testmode attribute stream
    pub testdata: Vec<u8>,
}

/// Backend replaying canned replies
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    requests: Vec<Request>,
    replies: VecDeque<Result<Option<Vec<u8>>>>,
    synthesize: bool,
}

impl ScriptedBackend {
    /// Create a backend with an empty reply queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that answers requests like a healthy chip
    ///
    /// Queued replies still take precedence.
    pub fn dry_run() -> Self {
        Self {
            synthesize: true,
            ..Self::default()
        }
    }

    /// Queue a bare ACK
    pub fn push_ack(&mut self) -> &mut Self {
        self.replies.push_back(Ok(None));
        self
    }

    /// Queue a successful firmware answer to `test_id`
    pub fn push_fw_answer(&mut self, test_id: u8, params: &[u8]) -> &mut Self {
        let reply = encode_fw_answer(FW_STATUS_SUCCESS, test_id, params);
        self.replies.push_back(Ok(Some(reply)));
        self
    }

    /// Queue a firmware answer with an explicit status
    pub fn push_fw_status(&mut self, test_id: u8, status: u16) -> &mut Self {
        let reply = encode_fw_answer(status, test_id, &[]);
        self.replies.push_back(Ok(Some(reply)));
        self
    }

    /// Queue a reply carrying raw `TM_ATTR_DATA`
    pub fn push_data(&mut self, data: &[u8]) -> &mut Self {
        self.replies.push_back(Ok(Some(encode_data_answer(data))));
        self
    }

    /// Queue a failure
    pub fn push_error(&mut self, error: CalError) -> &mut Self {
        self.replies.push_back(Err(error));
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    /// Human-readable form of every request, in order
    pub fn transcript(&self) -> Vec<String> {
        self.requests.iter().map(|r| describe(&r.testdata)).collect()
    }

    /// Replies still queued
    pub fn pending(&self) -> usize {
        self.replies.len()
    }
}

impl TestmodeBackend for ScriptedBackend {
    fn testmode(&mut self, target: &Target, testdata: &[u8]) -> Result<Option<Vec<u8>>> {
        tracing::info!("{target}: {}", describe(testdata));
        self.requests.push(Request {
            target: target.clone(),
            testdata: testdata.to_vec(),
        });
        match self.replies.pop_front() {
            Some(reply) => reply,
            None if self.synthesize => Ok(dry_run_answer(testdata)),
            None => Ok(None),
        }
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Scripted
    }
}
