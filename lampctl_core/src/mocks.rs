//! Test and helper mocks for lampctl_core

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use lampctl_traits::{
    Command, Detection, Detector, DeviceChannel, DeviceId, Frame, FrameSource, Reply,
};

use crate::error::ChannelError;

/// Blank frames; endless unless a limit is given.
pub struct BlankFrames {
    seq: u64,
    limit: Option<u64>,
}

impl BlankFrames {
    pub fn endless() -> Self {
        Self {
            seq: 0,
            limit: None,
        }
    }

    pub fn limited(n: u64) -> Self {
        Self {
            seq: 0,
            limit: Some(n),
        }
    }
}

impl FrameSource for BlankFrames {
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error + Send + Sync>> {
        if self.limit.is_some_and(|n| self.seq >= n) {
            return Ok(None);
        }
        let frame = Frame {
            seq: self.seq,
            width: 640,
            height: 480,
            pixels: Vec::new(),
        };
        self.seq += 1;
        Ok(Some(frame))
    }
}

/// Detector returning one scripted result per call; empty once exhausted.
#[derive(Default)]
pub struct ScriptedDetector {
    script: VecDeque<Result<Vec<Detection>, String>>,
}

impl ScriptedDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, detections: Vec<Detection>) -> Self {
        self.script.push_back(Ok(detections));
        self
    }

    pub fn then_fail(mut self, reason: &str) -> Self {
        self.script.push_back(Err(reason.to_string()));
        self
    }
}

impl Detector for ScriptedDetector {
    fn detect(
        &mut self,
        _frame: &Frame,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error + Send + Sync>> {
        match self.script.pop_front() {
            Some(Ok(d)) => Ok(d),
            Some(Err(reason)) => Err(reason.into()),
            None => Ok(Vec::new()),
        }
    }
}

/// Channel that records every command and can refuse chosen devices.
///
/// Clones share the same log.
#[derive(Clone, Default)]
pub struct RecordingChannel {
    sent: Arc<Mutex<Vec<(DeviceId, Command)>>>,
    unreachable: Arc<Mutex<Vec<DeviceId>>>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send to `device` fails with `ConnectFailed` (and is not recorded).
    pub fn refuse(self, device: DeviceId) -> Self {
        if let Ok(mut u) = self.unreachable.lock() {
            u.push(device);
        }
        self
    }

    pub fn sent(&self) -> Vec<(DeviceId, Command)> {
        self.sent.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Last command delivered to `device`, if any.
    pub fn last_for(&self, device: DeviceId) -> Option<Command> {
        self.sent()
            .into_iter()
            .rev()
            .find(|(d, _)| *d == device)
            .map(|(_, c)| c)
    }
}

impl DeviceChannel for RecordingChannel {
    fn send(
        &self,
        device: DeviceId,
        command: Command,
    ) -> Result<Reply, Box<dyn std::error::Error + Send + Sync>> {
        let refused = self
            .unreachable
            .lock()
            .map(|u| u.contains(&device))
            .unwrap_or(false);
        if refused {
            return Err(Box::new(ChannelError::ConnectFailed {
                device,
                reason: "refused by mock".to_string(),
            }));
        }
        if let Ok(mut s) = self.sent.lock() {
            s.push((device, command));
        }
        Ok(Reply(b"ok".to_vec()))
    }
}
