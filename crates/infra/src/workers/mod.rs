//! Background order retrieval.

pub mod retrieval;
pub mod retrieval_worker;

pub use retrieval::{OrderIdPage, OrderRetrieval, RetrievalOutcome, SinceId};
pub use retrieval_worker::{RetrievalWorker, WorkerHandle};
