pub mod payment_reader;
pub mod pending_writer;
