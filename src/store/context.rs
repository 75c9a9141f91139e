//! Per-request execution state

use crate::element::Element;
use crate::operation::GraphFailure;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Principal a request runs as
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    /// Visibility labels the user may read
    #[serde(default)]
    pub data_auths: IndexSet<String>,
    /// Authorisations checked against graph access
    #[serde(default)]
    pub op_auths: IndexSet<String>,
}

impl User {
    pub const UNKNOWN_USER_ID: &'static str = "UNKNOWN";

    pub fn new(user_id: impl Into<String>) -> Self {
        User {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    pub fn unknown() -> Self {
        User::new(User::UNKNOWN_USER_ID)
    }

    pub fn with_data_auths<I, S>(mut self, auths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_auths = auths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_op_auths<I, S>(mut self, auths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.op_auths = auths.into_iter().map(Into::into).collect();
        self
    }
}

/// State shared by the steps of one request
#[derive(Debug, Clone)]
pub struct Context {
    user: User,
    job_id: String,
    exports: IndexMap<String, IndexSet<Element>>,
    partial_failures: Vec<GraphFailure>,
}

impl Context {
    pub fn new(user: User) -> Self {
        Context {
            user,
            job_id: uuid::Uuid::new_v4().to_string(),
            exports: IndexMap::new(),
            partial_failures: Vec::new(),
        }
    }

    /// Context for a sub-request on a constituent graph: same user and job,
    /// fresh exports and failures.
    pub fn child(&self) -> Context {
        Context {
            user: self.user.clone(),
            job_id: self.job_id.clone(),
            exports: IndexMap::new(),
            partial_failures: Vec::new(),
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Append to an export, keeping the first occurrence of each element
    pub fn add_export<I>(&mut self, name: &str, elements: I)
    where
        I: IntoIterator<Item = Element>,
    {
        self.exports
            .entry(name.to_string())
            .or_default()
            .extend(elements);
    }

    pub fn export(&self, name: &str) -> Option<&IndexSet<Element>> {
        self.exports.get(name)
    }

    pub fn export_names(&self) -> impl Iterator<Item = &String> {
        self.exports.keys()
    }

    pub fn record_failure(&mut self, failure: GraphFailure) {
        self.partial_failures.push(failure);
    }

    /// Constituent failures skipped so far
    pub fn partial_failures(&self) -> &[GraphFailure] {
        &self.partial_failures
    }

    pub fn take_partial_failures(&mut self) -> Vec<GraphFailure> {
        std::mem::take(&mut self.partial_failures)
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new(User::unknown())
    }
}
