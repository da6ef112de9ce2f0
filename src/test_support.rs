//! Test support utilities shared across unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::remote::{
    CreateRequest, CreateResponse, ParameterSet, RemoteApi, RemoteError, RemoteFuture, RemoteState,
};
use crate::tags::TagSet;

/// Scripted remote API double returning pre-seeded responses in FIFO order.
///
/// Responses are shared across all operations, so a script reads as the
/// exact sequence of remote calls a scenario expects. Every invocation is
/// recorded for order and count assertions. An exhausted script answers
/// with a `ScriptExhausted` error rather than panicking, so a test failure
/// surfaces as an assertion on the result.
#[derive(Clone, Debug, Default)]
pub struct FakeRemote {
    responses: Arc<Mutex<VecDeque<ScriptedResponse>>>,
    calls: Arc<Mutex<Vec<RemoteCall>>>,
}

/// Response queued into a [`FakeRemote`].
#[derive(Clone, Debug, PartialEq)]
pub enum ScriptedResponse {
    /// Successful create returning identifier components.
    Created(CreateResponse),
    /// Successful fetch observing a state.
    State(RemoteState),
    /// Successful fetch observing absence.
    Absent,
    /// Successful call with no payload.
    Done,
    /// Successful tag listing.
    Tags(TagSet),
    /// Remote failure.
    Fail(RemoteError),
}

/// Records a single invocation made through [`FakeRemote`].
#[derive(Clone, Debug, PartialEq)]
pub enum RemoteCall {
    /// `create_resource` invocation.
    Create {
        /// Resource kind requested.
        kind: String,
        /// Parameters passed through.
        parameters: ParameterSet,
        /// Tags attached at creation.
        tags: TagSet,
    },
    /// `read_resource` invocation.
    Read {
        /// Identifier components targeted.
        components: Vec<String>,
    },
    /// `update_resource` invocation.
    Update {
        /// Identifier components targeted.
        components: Vec<String>,
        /// Changed fields sent remotely.
        changes: ParameterSet,
    },
    /// `delete_resource` invocation.
    Delete {
        /// Identifier components targeted.
        components: Vec<String>,
    },
    /// `list_tags` invocation.
    ListTags {
        /// Identifier components targeted.
        components: Vec<String>,
    },
    /// `tag_resource` invocation.
    Tag {
        /// Identifier components targeted.
        components: Vec<String>,
        /// Combined set of tags to create or update.
        tags: TagSet,
    },
    /// `untag_resource` invocation.
    Untag {
        /// Identifier components targeted.
        components: Vec<String>,
        /// Keys to remove.
        keys: Vec<String>,
    },
}

impl FakeRemote {
    /// Creates a double with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Queues a successful create returning the given identifier components.
    pub fn push_created<I, S>(&self, components: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(ScriptedResponse::Created(CreateResponse {
            id_components: components.into_iter().map(Into::into).collect(),
            state: None,
        }));
    }

    /// Queues a successful fetch observing the given status.
    pub fn push_status(&self, status: &str) {
        self.push(ScriptedResponse::State(RemoteState::new(status)));
    }

    /// Queues a successful fetch observing a full state.
    pub fn push_state(&self, state: RemoteState) {
        self.push(ScriptedResponse::State(state));
    }

    /// Queues a fetch observing absence.
    pub fn push_absent(&self) {
        self.push(ScriptedResponse::Absent);
    }

    /// Queues a successful response with no payload.
    pub fn push_done(&self) {
        self.push(ScriptedResponse::Done);
    }

    /// Queues a successful tag listing.
    pub fn push_tags(&self, tags: TagSet) {
        self.push(ScriptedResponse::Tags(tags));
    }

    /// Queues a remote failure.
    pub fn push_error(&self, code: &str, message: &str) {
        self.push(ScriptedResponse::Fail(RemoteError::new(code, message)));
    }

    fn push(&self, response: ScriptedResponse) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
    }

    fn next(&self, method: &'static str) -> ScriptedResponse {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| {
                ScriptedResponse::Fail(RemoteError::new(
                    "ScriptExhausted",
                    format!("no scripted response available for {method}"),
                ))
            })
    }

    fn record(&self, call: RemoteCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn mismatch(method: &'static str, response: &ScriptedResponse) -> RemoteError {
        RemoteError::new(
            "ScriptMismatch",
            format!("unexpected scripted response {response:?} for {method}"),
        )
    }
}

impl RemoteApi for FakeRemote {
    fn create_resource<'a>(
        &'a self,
        request: &'a CreateRequest,
    ) -> RemoteFuture<'a, CreateResponse> {
        self.record(RemoteCall::Create {
            kind: request.kind.clone(),
            parameters: request.parameters.clone(),
            tags: request.tags.clone(),
        });
        let response = self.next("create_resource");
        Box::pin(async move {
            match response {
                ScriptedResponse::Created(created) => Ok(created),
                ScriptedResponse::Fail(error) => Err(error),
                other => Err(Self::mismatch("create_resource", &other)),
            }
        })
    }

    fn read_resource<'a>(
        &'a self,
        components: &'a [String],
    ) -> RemoteFuture<'a, Option<RemoteState>> {
        self.record(RemoteCall::Read {
            components: components.to_vec(),
        });
        let response = self.next("read_resource");
        Box::pin(async move {
            match response {
                ScriptedResponse::State(state) => Ok(Some(state)),
                ScriptedResponse::Absent => Ok(None),
                ScriptedResponse::Fail(error) => Err(error),
                other => Err(Self::mismatch("read_resource", &other)),
            }
        })
    }

    fn update_resource<'a>(
        &'a self,
        components: &'a [String],
        changes: &'a ParameterSet,
    ) -> RemoteFuture<'a, Option<RemoteState>> {
        self.record(RemoteCall::Update {
            components: components.to_vec(),
            changes: changes.clone(),
        });
        let response = self.next("update_resource");
        Box::pin(async move {
            match response {
                ScriptedResponse::Done => Ok(None),
                ScriptedResponse::State(state) => Ok(Some(state)),
                ScriptedResponse::Fail(error) => Err(error),
                other => Err(Self::mismatch("update_resource", &other)),
            }
        })
    }

    fn delete_resource<'a>(&'a self, components: &'a [String]) -> RemoteFuture<'a, ()> {
        self.record(RemoteCall::Delete {
            components: components.to_vec(),
        });
        let response = self.next("delete_resource");
        Box::pin(async move {
            match response {
                ScriptedResponse::Done => Ok(()),
                ScriptedResponse::Fail(error) => Err(error),
                other => Err(Self::mismatch("delete_resource", &other)),
            }
        })
    }

    fn list_tags<'a>(&'a self, components: &'a [String]) -> RemoteFuture<'a, TagSet> {
        self.record(RemoteCall::ListTags {
            components: components.to_vec(),
        });
        let response = self.next("list_tags");
        Box::pin(async move {
            match response {
                ScriptedResponse::Tags(tags) => Ok(tags),
                ScriptedResponse::Fail(error) => Err(error),
                other => Err(Self::mismatch("list_tags", &other)),
            }
        })
    }

    fn tag_resource<'a>(
        &'a self,
        components: &'a [String],
        tags: &'a TagSet,
    ) -> RemoteFuture<'a, ()> {
        self.record(RemoteCall::Tag {
            components: components.to_vec(),
            tags: tags.clone(),
        });
        let response = self.next("tag_resource");
        Box::pin(async move {
            match response {
                ScriptedResponse::Done => Ok(()),
                ScriptedResponse::Fail(error) => Err(error),
                other => Err(Self::mismatch("tag_resource", &other)),
            }
        })
    }

    fn untag_resource<'a>(
        &'a self,
        components: &'a [String],
        keys: &'a [String],
    ) -> RemoteFuture<'a, ()> {
        self.record(RemoteCall::Untag {
            components: components.to_vec(),
            keys: keys.to_vec(),
        });
        let response = self.next("untag_resource");
        Box::pin(async move {
            match response {
                ScriptedResponse::Done => Ok(()),
                ScriptedResponse::Fail(error) => Err(error),
                other => Err(Self::mismatch("untag_resource", &other)),
            }
        })
    }
}
