use async_trait::async_trait;
use log::debug;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::api::ReferralApi;
use crate::error::{ApiError, ApiResult};
use crate::models::{Forest, InvitationNode, RegistrationRequest, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Exists,
    Lookup,
    Register,
    Tree,
}

#[derive(Debug, Clone)]
struct StoredUser {
    user_id: String,
    name: String,
    invitor_id: Option<String>,
}

#[derive(Default)]
struct MockState {
    users: Vec<StoredUser>,
    id_delays: HashMap<String, Duration>,
    op_delays: HashMap<Operation, Duration>,
    failing: HashSet<Operation>,
}

#[derive(Default)]
struct CallCounts {
    exists: AtomicUsize,
    lookup: AtomicUsize,
    register: AtomicUsize,
    tree: AtomicUsize,
}

impl CallCounts {
    fn counter(&self, op: Operation) -> &AtomicUsize {
        match op {
            Operation::Exists => &self.exists,
            Operation::Lookup => &self.lookup,
            Operation::Register => &self.register,
            Operation::Tree => &self.tree,
        }
    }
}

/// In-memory stand-in for the referral service.
///
/// Users are kept in registration order and the forest is rebuilt from the
/// invitor links on every `fetch_tree`. Latency can be injected per user id
/// (for `exists` and `by-id`) or per operation, and any operation can be
/// switched to fail.
#[derive(Default)]
pub struct MockReferralApi {
    state: Mutex<MockState>,
    calls: CallCounts,
}

impl MockReferralApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a user. `invitor_id = None` makes it a root.
    pub fn with_user(self, user_id: &str, name: &str, invitor_id: Option<&str>) -> Self {
        self.state().users.push(StoredUser {
            user_id: user_id.to_string(),
            name: name.to_string(),
            invitor_id: invitor_id.map(str::to_string),
        });
        self
    }

    /// Delay lookups and existence checks for one user id.
    pub fn with_id_delay(self, user_id: &str, delay: Duration) -> Self {
        self.state().id_delays.insert(user_id.to_string(), delay);
        self
    }

    pub fn with_delay(self, op: Operation, delay: Duration) -> Self {
        self.state().op_delays.insert(op, delay);
        self
    }

    pub fn set_failing(&self, op: Operation, failing: bool) {
        let mut state = self.state();
        if failing {
            state.failing.insert(op);
        } else {
            state.failing.remove(&op);
        }
    }

    pub fn calls(&self, op: Operation) -> usize {
        self.calls.counter(op).load(Ordering::SeqCst)
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.state().users.iter().any(|u| u.user_id == user_id)
    }

    /// Current hierarchy, built the way the real service reports it.
    pub fn forest(&self) -> Forest {
        let users = self.state().users.clone();
        let known: HashSet<&str> = users.iter().map(|u| u.user_id.as_str()).collect();

        users
            .iter()
            .filter(|u| match u.invitor_id.as_deref() {
                Some(invitor) => !known.contains(invitor),
                None => true,
            })
            .map(|root| build_node(root, &users))
            .collect()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Counts the call, waits for any configured latency and reports
    /// whether the operation should fail.
    async fn enter(&self, op: Operation, user_id: Option<&str>) -> ApiResult<()> {
        self.calls.counter(op).fetch_add(1, Ordering::SeqCst);

        let (delay, failing) = {
            let state = self.state();
            let id_delay = user_id.and_then(|id| state.id_delays.get(id).copied());
            let delay = id_delay.or_else(|| state.op_delays.get(&op).copied());
            (delay, state.failing.contains(&op))
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if failing {
            debug!("Mock API failing {:?} on purpose", op);
            return Err(ApiError::Unavailable(format!("{:?} is switched off", op)));
        }
        Ok(())
    }
}

fn build_node(user: &StoredUser, users: &[StoredUser]) -> InvitationNode {
    let mut node = InvitationNode::new(user.name.clone()).with_attribute("id", user.user_id.clone());
    for child in users
        .iter()
        .filter(|u| u.invitor_id.as_deref() == Some(user.user_id.as_str()))
    {
        node = node.with_child(build_node(child, users));
    }
    node
}

fn to_user(stored: &StoredUser) -> User {
    let mut user = User::new(stored.user_id.clone(), stored.name.clone());
    user.invitor_id = stored.invitor_id.clone();
    user
}

#[async_trait]
impl ReferralApi for MockReferralApi {
    async fn check_exists(&self, user_id: &str) -> ApiResult<bool> {
        self.enter(Operation::Exists, Some(user_id)).await?;
        Ok(self.contains(user_id))
    }

    async fn get_user_by_id(&self, user_id: &str) -> ApiResult<Option<User>> {
        self.enter(Operation::Lookup, Some(user_id)).await?;
        let state = self.state();
        Ok(state
            .users
            .iter()
            .find(|u| u.user_id == user_id)
            .map(to_user))
    }

    async fn register_user(&self, request: &RegistrationRequest) -> ApiResult<Option<User>> {
        self.enter(Operation::Register, None).await?;

        let mut state = self.state();
        if state.users.iter().any(|u| u.user_id == request.user_id) {
            return Err(ApiError::Http {
                status: 409,
                url: "mock:/register".to_string(),
            });
        }

        let invitor_id = match request.invitor_id.as_str() {
            "" => None,
            id if state.users.iter().any(|u| u.user_id == id) => Some(id.to_string()),
            _ => {
                return Err(ApiError::Http {
                    status: 400,
                    url: "mock:/register".to_string(),
                })
            }
        };

        let stored = StoredUser {
            user_id: request.user_id.clone(),
            name: request.name.clone(),
            invitor_id,
        };
        let user = to_user(&stored);
        state.users.push(stored);
        Ok(Some(user))
    }

    async fn fetch_tree(&self) -> ApiResult<Option<Forest>> {
        self.enter(Operation::Tree, None).await?;
        Ok(Some(self.forest()))
    }
}
