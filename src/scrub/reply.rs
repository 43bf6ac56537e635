//! Scrub start and status replies
//!
//! `scrub start` answers with
//! `{"return_code": 0, "scrub_tag": "...", "mode": "asynchronous"}`.
//! `scrub status` answers with a status string and a `scrubs` map keyed by
//! tag, or with `"no active scrubs running"` once the MDS is idle.

use crate::error::ProtocolError;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Status string reported by an idle MDS
pub const NO_ACTIVE_SCRUBS: &str = "no active scrubs running";

/// The only acceptable start mode
pub const ASYNC_MODE: &str = "asynchronous";

const START_COMMAND: &str = "scrub start";
const STATUS_COMMAND: &str = "scrub status";

#[derive(Debug, Deserialize)]
struct StartReply {
    scrub_tag: Option<String>,
    return_code: Option<i64>,
    mode: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusReply {
    status: Option<String>,
    scrubs: Option<HashMap<String, Value>>,
}

/// Validated reply to `scrub start`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrubStarted {
    pub tag: String,
}

/// What one status poll says about a tag
#[derive(Debug, Clone, PartialEq)]
pub enum ScrubProgress {
    /// The MDS has nothing running
    NoneActive,
    /// The tag is gone (or listed with a null status)
    Finished,
    /// Still running, with the reported status
    Running(Value),
}

/// Validate a `scrub start` reply and extract its tag
pub fn parse_start_reply(reply: Option<&Value>) -> Result<ScrubStarted, ProtocolError> {
    let reply = reply.ok_or_else(|| ProtocolError::MissingResponse {
        command: START_COMMAND.into(),
    })?;

    let reply: StartReply =
        serde_json::from_value(reply.clone()).map_err(|e| ProtocolError::MalformedResponse {
            command: START_COMMAND.into(),
            reason: e.to_string(),
        })?;

    let tag = reply.scrub_tag.ok_or(ProtocolError::MissingTag)?;

    match reply.return_code {
        Some(0) => {}
        Some(code) => return Err(ProtocolError::NonZeroReturnCode { code }),
        None => {
            return Err(ProtocolError::MalformedResponse {
                command: START_COMMAND.into(),
                reason: "missing return_code".into(),
            })
        }
    }

    match reply.mode.as_deref() {
        Some(ASYNC_MODE) => {}
        Some(mode) => {
            return Err(ProtocolError::UnexpectedMode {
                mode: mode.to_string(),
            })
        }
        None => {
            return Err(ProtocolError::MalformedResponse {
                command: START_COMMAND.into(),
                reason: "missing mode".into(),
            })
        }
    }

    Ok(ScrubStarted { tag })
}

/// Interpret a `scrub status` reply for one tag
pub fn parse_status_reply(reply: Option<&Value>, tag: &str) -> Result<ScrubProgress, ProtocolError> {
    let reply = reply.ok_or_else(|| ProtocolError::MissingResponse {
        command: STATUS_COMMAND.into(),
    })?;

    let reply: StatusReply =
        serde_json::from_value(reply.clone()).map_err(|e| ProtocolError::MalformedResponse {
            command: STATUS_COMMAND.into(),
            reason: e.to_string(),
        })?;

    if reply.status.as_deref() == Some(NO_ACTIVE_SCRUBS) {
        return Ok(ScrubProgress::NoneActive);
    }

    match reply.scrubs.and_then(|mut scrubs| scrubs.remove(tag)) {
        Some(Value::Null) | None => Ok(ScrubProgress::Finished),
        Some(status) => Ok(ScrubProgress::Running(status)),
    }
}
