//! Common test utilities shared by the integration tests
//!
//! Provides a codec with a predictable size model, an in-memory remote list, and
//! scripted devices for driving the coordinator without a terminal.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use field_capture::capture::{BarcodeEditor, BarcodeScanner, Camera, DeviceOutcome};
use field_capture::config::SessionIdentity;
use field_capture::core::position::RemoteBaseline;
use field_capture::core::record::ImageSide;
use field_capture::error::{CaptureError, CaptureResult};
use field_capture::processing::codec::EncodedFrame;
use field_capture::processing::{CompressionEngine, CompressionOptions, ImageCodec};
use field_capture::session::CaptureCoordinator;
use field_capture::sync::{RemoteSync, SubmitAck, SubmitRequest};

pub fn session() -> SessionIdentity {
    SessionIdentity::new("store-17").unwrap()
}

/// Codec whose output is `width * quality / 10` bytes; the raw input is ignored
/// apart from being non-empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct SizeModelCodec;

impl ImageCodec for SizeModelCodec {
    type Source = usize;

    fn decode(&self, raw: &[u8]) -> CaptureResult<usize> {
        if raw.is_empty() {
            return Err(CaptureError::compression("decode photo", "empty input"));
        }
        Ok(raw.len())
    }

    fn encode(&self, _source: &usize, width: u32, quality: u8) -> CaptureResult<EncodedFrame> {
        let len = width as usize * quality as usize / 10;
        Ok(EncodedFrame {
            bytes: vec![0xAB; len],
            width,
            height: width * 3 / 4,
        })
    }
}

pub fn engine(budget_bytes: usize) -> CompressionEngine<SizeModelCodec> {
    CompressionEngine::new(SizeModelCodec, CompressionOptions::with_budget(budget_bytes))
}

#[derive(Debug, Default)]
struct RemoteState {
    seeded: u64,
    accepted: Vec<SubmitRequest>,
    fail_submits: usize,
    fail_fetches: usize,
    stall_submits: usize,
    fetches: usize,
}

/// In-memory append-only list. The baseline it reports is the seeded count plus
/// every accepted submission.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRemote {
    state: Arc<Mutex<RemoteState>>,
}

impl InMemoryRemote {
    pub fn with_existing(count: u64) -> Self {
        let remote = Self::default();
        remote.state.lock().unwrap().seeded = count;
        remote
    }

    /// Fail the next `n` submissions with a network error.
    pub fn fail_next_submits(&self, n: usize) {
        self.state.lock().unwrap().fail_submits = n;
    }

    /// Never answer the next `n` submissions.
    pub fn stall_next_submits(&self, n: usize) {
        self.state.lock().unwrap().stall_submits = n;
    }

    /// Fail the next `n` baseline fetches with a network error.
    pub fn fail_next_fetches(&self, n: usize) {
        self.state.lock().unwrap().fail_fetches = n;
    }

    pub fn accepted(&self) -> Vec<SubmitRequest> {
        self.state.lock().unwrap().accepted.clone()
    }

    pub fn fetches(&self) -> usize {
        self.state.lock().unwrap().fetches
    }

    pub fn shared(&self) -> Arc<dyn RemoteSync> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl RemoteSync for InMemoryRemote {
    async fn fetch_baseline(&self, _session: &SessionIdentity) -> CaptureResult<RemoteBaseline> {
        let mut state = self.state.lock().unwrap();
        state.fetches += 1;
        if state.fail_fetches > 0 {
            state.fail_fetches -= 1;
            return Err(CaptureError::network("fetch baseline")
                .with_address("memory")
                .with_reason("injected failure"));
        }
        Ok(RemoteBaseline::new(state.seeded + state.accepted.len() as u64))
    }

    async fn submit(&self, request: &SubmitRequest) -> CaptureResult<SubmitAck> {
        let stalled = {
            let mut state = self.state.lock().unwrap();
            let stalled = state.stall_submits > 0;
            state.stall_submits = state.stall_submits.saturating_sub(1);
            stalled
        };
        if stalled {
            return std::future::pending().await;
        }

        let mut state = self.state.lock().unwrap();
        if state.fail_submits > 0 {
            state.fail_submits -= 1;
            return Err(CaptureError::network("submit record")
                .with_address("memory")
                .with_status(503));
        }
        state.accepted.push(request.clone());
        Ok(SubmitAck::from_body(200, r#"{"message": "saved"}"#))
    }
}

pub async fn coordinator(remote: &InMemoryRemote) -> CaptureCoordinator<SizeModelCodec> {
    CaptureCoordinator::start(session(), remote.shared(), engine(50 * 1024))
        .await
        .unwrap()
}

/// Scanner that replays a script; `None` entries cancel. An exhausted script cancels.
pub struct ScriptedScanner(VecDeque<Option<String>>);

impl ScriptedScanner {
    pub fn new(script: &[Option<&str>]) -> Self {
        Self(script.iter().map(|s| s.map(str::to_string)).collect())
    }
}

#[async_trait]
impl BarcodeScanner for ScriptedScanner {
    async fn scan(&mut self) -> CaptureResult<DeviceOutcome<String>> {
        Ok(match self.0.pop_front().flatten() {
            Some(code) => DeviceOutcome::Captured(code),
            None => DeviceOutcome::Cancelled,
        })
    }
}

/// Camera that replays raw photos; `None` entries cancel.
#[derive(Default)]
pub struct ScriptedCamera {
    script: VecDeque<Option<Vec<u8>>>,
    pub requested: Vec<ImageSide>,
}

impl ScriptedCamera {
    pub fn new(script: Vec<Option<Vec<u8>>>) -> Self {
        Self {
            script: script.into(),
            requested: Vec::new(),
        }
    }
}

#[async_trait]
impl Camera for ScriptedCamera {
    async fn take_photo(&mut self, side: ImageSide) -> CaptureResult<DeviceOutcome<Vec<u8>>> {
        self.requested.push(side);
        Ok(match self.script.pop_front().flatten() {
            Some(raw) => DeviceOutcome::Captured(raw),
            None => DeviceOutcome::Cancelled,
        })
    }
}

/// Editor that replays entries and records every prompt it was shown.
#[derive(Default)]
pub struct ScriptedEditor {
    script: VecDeque<Option<String>>,
    pub prompts: Vec<(Option<String>, Option<String>)>,
}

impl ScriptedEditor {
    pub fn new(script: &[Option<&str>]) -> Self {
        Self {
            script: script.iter().map(|s| s.map(str::to_string)).collect(),
            prompts: Vec::new(),
        }
    }
}

#[async_trait]
impl BarcodeEditor for ScriptedEditor {
    async fn edit(
        &mut self,
        current: Option<&str>,
        rejection: Option<&str>,
    ) -> CaptureResult<DeviceOutcome<String>> {
        self.prompts
            .push((current.map(str::to_string), rejection.map(str::to_string)));
        Ok(match self.script.pop_front().flatten() {
            Some(value) => DeviceOutcome::Captured(value),
            None => DeviceOutcome::Cancelled,
        })
    }
}
