use crate::domain::submission::PendingSubmission;
use crate::error::Result;
use std::io::Write;

/// Writes queued submissions as CSV, one row per record.
pub struct PendingWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> PendingWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_pending(&mut self, pending: &[PendingSubmission]) -> Result<()> {
        self.writer.write_record([
            "id",
            "createdAt",
            "studentId",
            "amount",
            "type",
            "description",
            "schoolId",
        ])?;
        for submission in pending {
            let payload = &submission.payload;
            let created_at = submission.created_at.to_rfc3339();
            let amount = payload.amount.to_string();
            self.writer.write_record([
                submission.id.as_str(),
                created_at.as_str(),
                payload.student_id.as_str(),
                amount.as_str(),
                payload.r#type.as_str(),
                payload.description.as_deref().unwrap_or_default(),
                payload.school_id.as_deref().unwrap_or_default(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
