//! # Row Buffer
//!
//! Ordered, append-only list of capture records for one session window, together
//! with the remote baseline their positions are computed against.
//!
//! ## Lifecycle
//!
//! - Created with a single blank record and a freshly fetched baseline
//! - Each successful submission appends exactly one blank record at the tail
//! - [`RowBuffer::reset`] returns to a single blank record under a new baseline;
//!   unsent edits are discarded
//!
//! ## Submission
//!
//! Submission is split in two phases so calls for different rows may be in flight
//! at once. [`RowBuffer::begin_submission`] snapshots the record, computes its
//! position and marks the row in flight; [`RowBuffer::finish_submission`] clears
//! the mark and, on success, appends the blank record. A failed submission changes
//! nothing. While a row is in flight it cannot be edited or submitted again.
//! A submission that will never be finished is released with
//! [`RowBuffer::abandon_submission`]; the row stays unsent.

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::config::session::SessionIdentity;
use crate::core::position::{RemoteBaseline, ResolvedIdentifier, resolve_identifier};
use crate::core::record::{CaptureRecord, RecordField};
use crate::error::{CaptureError, CaptureResult};
use crate::sync::RemoteSync;
use crate::sync::schema::{SubmitAck, SubmitRequest};

#[derive(Debug, Clone)]
struct Row {
    record: CaptureRecord,
    /// Set after a successful submission, cleared by any later edit
    submitted: bool,
}

impl Row {
    fn blank() -> Self {
        Self {
            record: CaptureRecord::blank(),
            submitted: false,
        }
    }
}

/// A submission that has been started but not finished.
#[derive(Debug, Clone)]
pub struct PreparedSubmission {
    pub index: usize,
    pub position: u64,
    pub identifier: ResolvedIdentifier,
    pub request: SubmitRequest,
    generation: u64,
}

/// Outcome of a successful submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitReceipt {
    pub index: usize,
    pub position: u64,
    pub identifier: ResolvedIdentifier,
    pub ack: SubmitAck,
}

/// Explicitly owned buffer of capture records.
#[derive(Debug, Clone)]
pub struct RowBuffer {
    rows: Vec<Row>,
    baseline: RemoteBaseline,
    in_flight: BTreeSet<usize>,
    generation: u64,
}

impl RowBuffer {
    /// A buffer holding one blank record.
    pub fn new(baseline: RemoteBaseline) -> Self {
        Self {
            rows: vec![Row::blank()],
            baseline,
            in_flight: BTreeSet::new(),
            generation: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Always false: the buffer holds at least one record.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn baseline(&self) -> RemoteBaseline {
        self.baseline
    }

    pub fn get(&self, index: usize) -> Option<&CaptureRecord> {
        self.rows.get(index).map(|row| &row.record)
    }

    pub fn records(&self) -> impl Iterator<Item = &CaptureRecord> {
        self.rows.iter().map(|row| &row.record)
    }

    pub fn last(&self) -> Option<&CaptureRecord> {
        self.rows.last().map(|row| &row.record)
    }

    /// True once the row was submitted successfully and not edited since.
    pub fn is_submitted(&self, index: usize) -> bool {
        self.rows.get(index).is_some_and(|row| row.submitted)
    }

    pub fn is_in_flight(&self, index: usize) -> bool {
        self.in_flight.contains(&index)
    }

    /// Rows holding captured data that has not been submitted since its last edit.
    pub fn unsent_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| !row.submitted && !row.record.is_blank())
            .count()
    }

    /// Append a record at the tail.
    pub fn append(&mut self, record: CaptureRecord) {
        self.rows.push(Row {
            record,
            submitted: false,
        });
    }

    /// Append a blank record at the tail.
    pub fn append_blank(&mut self) {
        self.rows.push(Row::blank());
    }

    /// Mutate one field of the record at `index`.
    pub fn update(&mut self, index: usize, field: RecordField) -> CaptureResult<()> {
        self.check_index(index)?;
        if self.in_flight.contains(&index) {
            return Err(CaptureError::state(
                format!("submitting row {index}"),
                format!("update {}", field.name()),
                "row is being submitted",
            ));
        }
        let row = &mut self.rows[index];
        row.record.apply(field);
        row.submitted = false;
        Ok(())
    }

    /// Position the record at `index` would be submitted at right now.
    pub fn position_for(&self, index: usize) -> CaptureResult<u64> {
        self.check_index(index)?;
        Ok(self.baseline.position_of(index))
    }

    /// Start submitting the record at `index` for `session`.
    pub fn begin_submission(
        &mut self,
        index: usize,
        session: &SessionIdentity,
    ) -> CaptureResult<PreparedSubmission> {
        self.check_index(index)?;
        if !self.in_flight.insert(index) {
            return Err(CaptureError::state(
                format!("submitting row {index}"),
                "submit",
                "row is already being submitted",
            ));
        }

        let record = &self.rows[index].record;
        let position = self.baseline.position_of(index);
        let identifier = resolve_identifier(record, position);
        let request = SubmitRequest {
            folder_name: session.as_str().to_string(),
            row: position.to_string(),
            barcode: identifier.value.clone(),
            front_image: payload_or_empty(record.front_image.as_ref()),
            back_image: payload_or_empty(record.back_image.as_ref()),
        };

        Ok(PreparedSubmission {
            index,
            position,
            identifier,
            request,
            generation: self.generation,
        })
    }

    /// Finish a submission started with [`RowBuffer::begin_submission`].
    pub fn finish_submission(
        &mut self,
        prepared: PreparedSubmission,
        outcome: CaptureResult<SubmitAck>,
    ) -> CaptureResult<SubmitReceipt> {
        if prepared.generation != self.generation {
            // The buffer was reset while the call was running; the row it
            // belonged to no longer exists.
            warn!(
                row = prepared.index,
                position = prepared.position,
                "submission finished after buffer reset"
            );
            return outcome.map(|ack| SubmitReceipt {
                index: prepared.index,
                position: prepared.position,
                identifier: prepared.identifier,
                ack,
            });
        }

        self.in_flight.remove(&prepared.index);
        let ack = outcome?;
        self.rows[prepared.index].submitted = true;
        self.append_blank();
        info!(
            row = prepared.index,
            position = prepared.position,
            barcode = %prepared.identifier.value,
            synthetic = prepared.identifier.synthetic,
            "record submitted"
        );
        Ok(SubmitReceipt {
            index: prepared.index,
            position: prepared.position,
            identifier: prepared.identifier,
            ack,
        })
    }

    /// Release `index` from a submission that will never be finished.
    ///
    /// The row keeps its data and stays unsent. Whether the remote received the
    /// request is unknown. Returns `false` when the row was not in flight.
    pub fn abandon_submission(&mut self, index: usize) -> bool {
        let released = self.in_flight.remove(&index);
        if released {
            warn!(row = index, "submission abandoned before it finished");
        }
        released
    }

    /// Submit the record at `index` through `remote`.
    pub async fn submit(
        &mut self,
        index: usize,
        remote: &dyn RemoteSync,
        session: &SessionIdentity,
    ) -> CaptureResult<SubmitReceipt> {
        let prepared = self.begin_submission(index, session)?;
        let outcome = remote.submit(&prepared.request).await;
        self.finish_submission(prepared, outcome)
    }

    /// Discard every record and start over with one blank record under `baseline`.
    pub fn reset(&mut self, baseline: RemoteBaseline) {
        self.rows = vec![Row::blank()];
        self.baseline = baseline;
        self.in_flight.clear();
        self.generation += 1;
    }

    /// Bumped by every reset.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Discard every record but keep the current baseline.
    pub(crate) fn clear_rows(&mut self) {
        self.reset(self.baseline);
    }

    fn check_index(&self, index: usize) -> CaptureResult<()> {
        if index >= self.rows.len() {
            return Err(CaptureError::validation(
                "index",
                format!("must be below {}", self.rows.len()),
                index.to_string(),
            ));
        }
        Ok(())
    }
}

fn payload_or_empty(image: Option<&crate::processing::EncodedImage>) -> String {
    image.map(|img| img.payload.clone()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::ImageSide;
    use crate::processing::EncodedImage;

    fn session() -> SessionIdentity {
        SessionIdentity::new("store-17").unwrap()
    }

    fn ok_ack() -> CaptureResult<SubmitAck> {
        Ok(SubmitAck::from_body(200, "{}"))
    }

    #[test]
    fn test_new_buffer_has_one_blank_record() {
        let buffer = RowBuffer::new(RemoteBaseline::new(3));
        assert_eq!(buffer.len(), 1);
        assert!(buffer.get(0).unwrap().is_blank());
        assert_eq!(buffer.position_for(0).unwrap(), 4);
    }

    #[test]
    fn test_successful_submissions_grow_by_one() {
        let mut buffer = RowBuffer::new(RemoteBaseline::new(0));
        for i in 0..4 {
            let prepared = buffer.begin_submission(i, &session()).unwrap();
            buffer.finish_submission(prepared, ok_ack()).unwrap();
        }
        assert_eq!(buffer.len(), 5);
        assert!(buffer.last().unwrap().is_blank());
    }

    #[test]
    fn test_failed_submission_leaves_buffer_unchanged() {
        let mut buffer = RowBuffer::new(RemoteBaseline::new(0));
        buffer
            .update(0, RecordField::Barcode("123".into()))
            .unwrap();
        let prepared = buffer.begin_submission(0, &session()).unwrap();
        let err = buffer
            .finish_submission(prepared, Err(CaptureError::network("submit record")))
            .unwrap_err();
        assert_eq!(err.category(), "network");
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.get(0).unwrap().barcode.as_deref(), Some("123"));
        assert!(!buffer.is_in_flight(0));
        assert_eq!(buffer.unsent_count(), 1);
    }

    #[test]
    fn test_update_rejected_while_in_flight() {
        let mut buffer = RowBuffer::new(RemoteBaseline::new(0));
        let prepared = buffer.begin_submission(0, &session()).unwrap();

        let err = buffer
            .update(0, RecordField::Barcode("late".into()))
            .unwrap_err();
        assert_eq!(err.category(), "state");
        assert_eq!(
            buffer.begin_submission(0, &session()).unwrap_err().category(),
            "state"
        );

        buffer.finish_submission(prepared, ok_ack()).unwrap();
        buffer.update(0, RecordField::Barcode("late".into())).unwrap();
        assert!(!buffer.is_submitted(0));
    }

    #[test]
    fn test_request_uses_synthetic_identifier_and_bare_payloads() {
        let mut buffer = RowBuffer::new(RemoteBaseline::new(5));
        buffer.append_blank();
        buffer.append_blank();
        let image = EncodedImage::from_bytes(b"front-jpeg", 10, 10, 50);
        buffer
            .update(2, RecordField::Image(ImageSide::Front, image.clone()))
            .unwrap();

        let prepared = buffer.begin_submission(2, &session()).unwrap();
        assert_eq!(prepared.position, 8);
        assert_eq!(prepared.request.row, "8");
        assert_eq!(prepared.request.barcode, "INDEX_8");
        assert_eq!(prepared.request.front_image, image.payload);
        assert_eq!(prepared.request.back_image, "");
        assert_eq!(prepared.request.folder_name, "store-17");
        // synthetic identifier is not stored back
        assert_eq!(buffer.get(2).unwrap().barcode, None);
    }

    #[test]
    fn test_out_of_range_index_is_validation_error() {
        let mut buffer = RowBuffer::new(RemoteBaseline::new(0));
        assert_eq!(
            buffer
                .update(3, RecordField::Barcode("x".into()))
                .unwrap_err()
                .category(),
            "validation"
        );
        assert_eq!(
            buffer.begin_submission(1, &session()).unwrap_err().category(),
            "validation"
        );
    }

    #[test]
    fn test_reset_uses_new_baseline_and_drops_stale_submissions() {
        let mut buffer = RowBuffer::new(RemoteBaseline::new(2));
        buffer.append_blank();
        let stale = buffer.begin_submission(1, &session()).unwrap();
        assert_eq!(stale.position, 4);

        buffer.reset(RemoteBaseline::new(10));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.position_for(0).unwrap(), 11);

        // the stale call still reports its own outcome but does not grow the buffer
        let receipt = buffer.finish_submission(stale, ok_ack()).unwrap();
        assert_eq!(receipt.position, 4);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_abandoned_submission_releases_row() {
        let mut buffer = RowBuffer::new(RemoteBaseline::new(0));
        buffer.update(0, RecordField::Barcode("kept".into())).unwrap();
        let _prepared = buffer.begin_submission(0, &session()).unwrap();
        assert!(buffer.is_in_flight(0));

        assert!(buffer.abandon_submission(0));
        assert!(!buffer.is_in_flight(0));
        assert!(!buffer.abandon_submission(0));
        assert_eq!(buffer.unsent_count(), 1);
        assert_eq!(buffer.len(), 1);

        buffer.update(0, RecordField::Barcode("edited".into())).unwrap();
        assert!(buffer.begin_submission(0, &session()).is_ok());
    }

    #[test]
    fn test_resubmission_recomputes_position() {
        let mut buffer = RowBuffer::new(RemoteBaseline::new(1));
        let first = buffer.begin_submission(0, &session()).unwrap();
        buffer.finish_submission(first, ok_ack()).unwrap();
        assert!(buffer.is_submitted(0));

        buffer.baseline = RemoteBaseline::new(7);
        let again = buffer.begin_submission(0, &session()).unwrap();
        assert_eq!(again.position, 8);
    }
}
