//! # Capture Session Coordination
//!
//! The coordinator drives one capture session: it owns the [`RowBuffer`], the
//! compression engine and the remote client, and moves through a small state
//! machine while the operator scans, photographs, edits and submits records.
//!
//! ## States
//!
//! ```text
//!            begin scan(i)              scan result / cancel
//!   Idle ───────────────────▶ Scanning(i) ─────────────────────▶ Idle
//!   Idle ───────────────────▶ Capturing(i, side) ──────────────▶ Idle
//!   Idle ───────────────────▶ Editing(i) ── cancel ────────────▶ Idle
//!                                 └── confirm ─▶ Submitting(i) ─▶ Idle
//!   Idle ───────────────────▶ Submitting(i) ── finished ───────▶ Idle
//! ```
//!
//! Every activity starts from `Idle`, so scanning, capturing and editing can never
//! be active at the same time. Transitions are computed by the pure
//! [`CaptureState::next`]; the coordinator only commits the result. Cancelling an
//! activity, or failing it, returns to `Idle` without touching the buffer.
//!
//! The coordinator takes `&mut self` for every operation, so buffer mutations are
//! never interleaved. It suspends only while waiting on a device or the network.
//! If such a future is dropped before it completes, the next operation (or an
//! explicit [`CaptureCoordinator::abort`]) returns to `Idle` and releases the
//! row it was submitting.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::capture::{BarcodeEditor, BarcodeScanner, Camera, DeviceOutcome};
use crate::config::session::SessionIdentity;
use crate::core::position::RemoteBaseline;
use crate::core::record::{ImageSide, RecordField};
use crate::core::row_buffer::{RowBuffer, SubmitReceipt};
use crate::error::{CaptureError, CaptureResult};
use crate::processing::{CompressionEngine, CompressionOutcome, ImageCodec, JpegCodec};
use crate::sync::RemoteSync;

/// Message shown when a manually edited barcode is blank.
pub const EMPTY_BARCODE_MESSAGE: &str = "Barcode cannot be empty";

/// Current activity of the coordinator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CaptureState {
    #[default]
    Idle,
    Scanning(usize),
    Capturing { index: usize, side: ImageSide },
    Editing(usize),
    Submitting(usize),
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureEvent {
    BeginScan(usize),
    ScanCompleted,
    ScanCancelled,
    BeginCapture { index: usize, side: ImageSide },
    CaptureCompleted,
    CaptureCancelled,
    BeginEdit(usize),
    EditConfirmed,
    EditCancelled,
    BeginSubmit(usize),
    SubmitFinished,
}

impl CaptureState {
    /// The state after `event`, or a `State` error if `event` is not allowed here.
    pub fn next(&self, event: &CaptureEvent) -> CaptureResult<CaptureState> {
        use CaptureEvent as E;
        use CaptureState as S;

        match (*self, *event) {
            (S::Idle, E::BeginScan(index)) => Ok(S::Scanning(index)),
            (S::Idle, E::BeginCapture { index, side }) => Ok(S::Capturing { index, side }),
            (S::Idle, E::BeginEdit(index)) => Ok(S::Editing(index)),
            (S::Idle, E::BeginSubmit(index)) => Ok(S::Submitting(index)),

            (S::Scanning(_), E::ScanCompleted | E::ScanCancelled) => Ok(S::Idle),
            (S::Capturing { .. }, E::CaptureCompleted | E::CaptureCancelled) => Ok(S::Idle),
            (S::Editing(index), E::EditConfirmed) => Ok(S::Submitting(index)),
            (S::Editing(_), E::EditCancelled) => Ok(S::Idle),
            (S::Submitting(_), E::SubmitFinished) => Ok(S::Idle),

            (state, event) => Err(CaptureError::state(
                state.to_string(),
                format!("{event:?}"),
                "event is not allowed in this state",
            )),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, CaptureState::Idle)
    }

    /// Buffer index the current activity applies to.
    pub fn index(&self) -> Option<usize> {
        match *self {
            CaptureState::Idle => None,
            CaptureState::Scanning(i)
            | CaptureState::Capturing { index: i, .. }
            | CaptureState::Editing(i)
            | CaptureState::Submitting(i) => Some(i),
        }
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureState::Idle => write!(f, "idle"),
            CaptureState::Scanning(i) => write!(f, "scanning row {i}"),
            CaptureState::Capturing { index, side } => {
                write!(f, "capturing {side} photo for row {index}")
            }
            CaptureState::Editing(i) => write!(f, "editing row {i}"),
            CaptureState::Submitting(i) => write!(f, "submitting row {i}"),
        }
    }
}

/// Operator's answer to a refresh prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

/// What a refresh would throw away. Obtained from
/// [`CaptureCoordinator::request_refresh`] and handed back with the answer.
///
/// A prompt only confirms the buffer it was taken from: if rows change before
/// the answer arrives, [`CaptureCoordinator::refresh`] refuses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshPrompt {
    unsent_rows: usize,
    rows: usize,
    generation: u64,
}

impl RefreshPrompt {
    /// Rows holding captured data not yet submitted
    pub fn unsent_rows(&self) -> usize {
        self.unsent_rows
    }

    /// Total rows in the buffer when the prompt was taken
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn message(&self) -> String {
        if self.unsent_rows == 0 {
            "Refresh the list? All rows will be cleared.".to_string()
        } else {
            format!(
                "Refresh the list? {} unsent row(s) will be lost.",
                self.unsent_rows
            )
        }
    }
}

/// Result of [`CaptureCoordinator::refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Declined,
    Refreshed { baseline: RemoteBaseline },
}

/// Orchestrates one capture session.
pub struct CaptureCoordinator<C: ImageCodec = JpegCodec> {
    state: CaptureState,
    buffer: RowBuffer,
    engine: CompressionEngine<C>,
    remote: Arc<dyn RemoteSync>,
    session: SessionIdentity,
}

impl<C: ImageCodec> CaptureCoordinator<C> {
    /// Fetch the initial baseline and create a coordinator with one blank record.
    pub async fn start(
        session: SessionIdentity,
        remote: Arc<dyn RemoteSync>,
        engine: CompressionEngine<C>,
    ) -> CaptureResult<Self> {
        let baseline = remote.fetch_baseline(&session).await?;
        info!(session = %session, baseline = baseline.count(), "capture session started");
        Ok(Self::with_buffer(session, remote, engine, RowBuffer::new(baseline)))
    }

    /// Create a coordinator around an existing buffer.
    pub fn with_buffer(
        session: SessionIdentity,
        remote: Arc<dyn RemoteSync>,
        engine: CompressionEngine<C>,
        buffer: RowBuffer,
    ) -> Self {
        Self {
            state: CaptureState::Idle,
            buffer,
            engine,
            remote,
            session,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn buffer(&self) -> &RowBuffer {
        &self.buffer
    }

    pub fn session(&self) -> &SessionIdentity {
        &self.session
    }

    /// Scan a barcode into the record at `index`.
    pub async fn scan(
        &mut self,
        index: usize,
        scanner: &mut dyn BarcodeScanner,
    ) -> CaptureResult<DeviceOutcome<String>> {
        self.begin(index, CaptureEvent::BeginScan(index))?;

        let outcome = match scanner.scan().await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.transition(CaptureEvent::ScanCancelled)?;
                return Err(e);
            }
        };

        match &outcome {
            DeviceOutcome::Captured(code) => {
                let applied = self.buffer.update(index, RecordField::Barcode(code.clone()));
                self.settle(&applied, CaptureEvent::ScanCompleted, CaptureEvent::ScanCancelled)?;
                applied?;
                debug!(row = index, barcode = %code, "barcode scanned");
            }
            DeviceOutcome::Cancelled => self.transition(CaptureEvent::ScanCancelled)?,
        }
        Ok(outcome)
    }

    /// Photograph one side of the record at `index` and store the compressed result.
    pub async fn photograph(
        &mut self,
        index: usize,
        side: ImageSide,
        camera: &mut dyn Camera,
    ) -> CaptureResult<DeviceOutcome<CompressionOutcome>> {
        self.begin(index, CaptureEvent::BeginCapture { index, side })?;

        let raw = match camera.take_photo(side).await {
            Ok(DeviceOutcome::Captured(raw)) => raw,
            Ok(DeviceOutcome::Cancelled) => {
                self.transition(CaptureEvent::CaptureCancelled)?;
                return Ok(DeviceOutcome::Cancelled);
            }
            Err(e) => {
                self.transition(CaptureEvent::CaptureCancelled)?;
                return Err(e);
            }
        };

        let outcome = match self.engine.compress(&raw) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(row = index, %side, error = %e, "photo could not be compressed");
                self.transition(CaptureEvent::CaptureCancelled)?;
                return Err(e);
            }
        };

        let applied = self
            .buffer
            .update(index, RecordField::Image(side, outcome.image.clone()));
        self.settle(
            &applied,
            CaptureEvent::CaptureCompleted,
            CaptureEvent::CaptureCancelled,
        )?;
        applied?;
        Ok(DeviceOutcome::Captured(outcome))
    }

    /// Edit the barcode of the record at `index` by hand, then submit the record.
    ///
    /// A blank entry is refused and the editor is asked again with
    /// [`EMPTY_BARCODE_MESSAGE`]. Cancelling leaves the record untouched.
    pub async fn edit_barcode(
        &mut self,
        index: usize,
        editor: &mut dyn BarcodeEditor,
    ) -> CaptureResult<DeviceOutcome<SubmitReceipt>> {
        self.begin(index, CaptureEvent::BeginEdit(index))?;

        let current = self
            .buffer
            .get(index)
            .and_then(|record| record.barcode.clone());
        let mut rejection: Option<&str> = None;

        let value = loop {
            match editor.edit(current.as_deref(), rejection).await {
                Ok(DeviceOutcome::Captured(value)) if value.trim().is_empty() => {
                    rejection = Some(EMPTY_BARCODE_MESSAGE);
                }
                Ok(DeviceOutcome::Captured(value)) => break value,
                Ok(DeviceOutcome::Cancelled) => {
                    self.transition(CaptureEvent::EditCancelled)?;
                    return Ok(DeviceOutcome::Cancelled);
                }
                Err(e) => {
                    self.transition(CaptureEvent::EditCancelled)?;
                    return Err(e);
                }
            }
        };

        self.buffer.update(index, RecordField::Barcode(value))?;
        self.transition(CaptureEvent::EditConfirmed)?;
        self.run_submission(index).await.map(DeviceOutcome::Captured)
    }

    /// Submit the record at `index`.
    pub async fn submit(&mut self, index: usize) -> CaptureResult<SubmitReceipt> {
        self.begin(index, CaptureEvent::BeginSubmit(index))?;
        self.run_submission(index).await
    }

    /// Describe what a refresh would discard.
    pub fn request_refresh(&mut self) -> CaptureResult<RefreshPrompt> {
        self.abort();
        Ok(RefreshPrompt {
            unsent_rows: self.buffer.unsent_count(),
            rows: self.buffer.len(),
            generation: self.buffer.generation(),
        })
    }

    /// Apply the operator's answer to a refresh prompt.
    ///
    /// When confirmed, the buffer is cleared and the baseline fetched again. If
    /// that fetch fails the buffer stays cleared, the previous baseline is kept,
    /// and the error is returned.
    pub async fn refresh(
        &mut self,
        prompt: RefreshPrompt,
        answer: Confirmation,
    ) -> CaptureResult<RefreshOutcome> {
        if self.request_refresh()? != prompt {
            return Err(CaptureError::state(
                self.state.to_string(),
                "refresh",
                "the rows changed since the prompt was shown; ask again",
            ));
        }
        if answer == Confirmation::Declined {
            debug!("refresh declined");
            return Ok(RefreshOutcome::Declined);
        }

        match self.remote.fetch_baseline(&self.session).await {
            Ok(baseline) => {
                self.buffer.reset(baseline);
                info!(
                    discarded = prompt.unsent_rows,
                    baseline = baseline.count(),
                    "buffer refreshed"
                );
                Ok(RefreshOutcome::Refreshed { baseline })
            }
            Err(e) => {
                self.buffer.clear_rows();
                warn!(
                    discarded = prompt.unsent_rows,
                    baseline = self.buffer.baseline().count(),
                    error = %e,
                    "buffer cleared but baseline could not be fetched"
                );
                Err(e)
            }
        }
    }

    /// Return to idle from an activity that will never finish.
    ///
    /// Operations take `&mut self`, so a non-idle state at the start of a call is
    /// left over from a future that was dropped mid-activity, e.g. by a timeout.
    /// Every operation settles it first; callers may also do so right away. A row
    /// abandoned while submitting stays unsent. Returns the abandoned state.
    pub fn abort(&mut self) -> Option<CaptureState> {
        if self.state.is_idle() {
            return None;
        }
        let abandoned = self.state;
        if let CaptureState::Submitting(index) = abandoned {
            self.buffer.abandon_submission(index);
        }
        warn!(state = %abandoned, "activity abandoned, returning to idle");
        self.state = CaptureState::Idle;
        Some(abandoned)
    }

    fn begin(&mut self, index: usize, event: CaptureEvent) -> CaptureResult<()> {
        self.abort();
        let next = self.state.next(&event)?;
        if index >= self.buffer.len() {
            return Err(CaptureError::validation(
                "index",
                format!("must be below {}", self.buffer.len()),
                index.to_string(),
            ));
        }
        self.state = next;
        Ok(())
    }

    fn transition(&mut self, event: CaptureEvent) -> CaptureResult<()> {
        self.state = self.state.next(&event)?;
        Ok(())
    }

    /// Finish the current activity with `done` when `applied` succeeded, else `abandoned`.
    fn settle<T>(
        &mut self,
        applied: &CaptureResult<T>,
        done: CaptureEvent,
        abandoned: CaptureEvent,
    ) -> CaptureResult<()> {
        self.transition(if applied.is_ok() { done } else { abandoned })
    }

    async fn run_submission(&mut self, index: usize) -> CaptureResult<SubmitReceipt> {
        let prepared = match self.buffer.begin_submission(index, &self.session) {
            Ok(prepared) => prepared,
            Err(e) => {
                self.transition(CaptureEvent::SubmitFinished)?;
                return Err(e);
            }
        };
        let outcome = self.remote.submit(&prepared.request).await;
        let result = self.buffer.finish_submission(prepared, outcome);
        self.transition(CaptureEvent::SubmitFinished)?;
        result.map_err(|e| {
            warn!(row = index, error = %e, "submission failed");
            e.with_operation(format!("submit row {index}"))
        })
    }
}
