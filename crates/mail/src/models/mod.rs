//! Domain models produced by the retrieval pipeline

mod message;

pub use message::{EmailAddress, MessageId, NormalizedMessage};
