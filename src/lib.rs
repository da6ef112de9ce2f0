//! Reconciliation engine for eventually consistent cloud resource APIs.
//!
//! The crate turns a declared desired state for a single remote resource
//! into a sequence of create/read/update/delete calls: it retries transient
//! failures without duplicating side effects, waits for asynchronous
//! propagation to converge, reconciles remote tag sets against desired
//! ones, and performs multi-step compensating sequences safely under
//! partial failure. Each resource reconciles independently; mutations of a
//! shared parent's relationship set are serialised through a per-parent
//! lock registry.
//!
//! The remote API itself is an abstract capability ([`RemoteApi`]);
//! transport, authentication, and the declarative schema layer that decides
//! *what* the desired state is live outside this crate.

pub mod classify;
pub mod config;
pub mod engine;
pub mod ident;
pub mod poll;
pub mod remote;
pub mod retry;
pub mod tags;
pub mod test_support;

pub use classify::{ClassifierRule, ErrorClass, ErrorClassifier, OperationClassifiers};
pub use config::{ConfigError, EngineConfig};
pub use engine::{
    AssociationSpec, CreateOutcome, DesiredResource, EngineError, LockRegistry, Operation,
    Orchestrator, ResourcePhase, ResourceProfile,
};
pub use ident::{IdScheme, IdentifierError};
pub use poll::{ConvergenceCriteria, PollError, PollSchedule};
pub use remote::{
    CreateRequest, CreateResponse, ParameterSet, RemoteApi, RemoteError, RemoteFuture, RemoteState,
    StatusTag,
};
pub use retry::{RetryError, RetryPolicy};
pub use tags::{TagDiff, TagError, TagReconciler, TagSet};
