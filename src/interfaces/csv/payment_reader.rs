use crate::domain::payment::PaymentPayload;
use crate::error::{QueueError, Result};
use std::io::Read;

/// Reads payment reports from a CSV source.
///
/// Expects the header `studentId,amount,type,description,schoolId`; the last two
/// columns may be empty or missing. Whitespace is trimmed.
pub struct PaymentReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> PaymentReader<R> {
    /// Creates a new `PaymentReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes payments.
    pub fn payments(self) -> impl Iterator<Item = Result<PaymentPayload>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(QueueError::from))
    }
}
