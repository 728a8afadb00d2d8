use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatementError {
    #[error("permission name is empty")]
    EmptyName,

    #[error("statement action is empty")]
    EmptyAction,

    #[error("statement resource is empty")]
    EmptyResource,

    #[error("invalid statement action: {0}")]
    InvalidAction(String),

    #[error("invalid statement resource: {0}")]
    InvalidResource(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}

/// Policy expression handed to the policy engine. Opaque to routing apart
/// from its structural validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub effect: Effect,
    pub action: String,
    pub resource: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
}

impl Statement {
    pub fn allow(action: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            effect: Effect::Allow,
            action: action.into(),
            resource: resource.into(),
            fields: Vec::new(),
        }
    }

    pub fn deny(action: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            effect: Effect::Deny,
            ..Self::allow(action, resource)
        }
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Actions are `*` or lowercase `segment[:segment]*` (`trip:view`).
    /// Resources are `*` or `/`-separated non-blank segments.
    pub fn validate(&self) -> Result<(), StatementError> {
        if self.action.is_empty() {
            return Err(StatementError::EmptyAction);
        }
        if self.resource.is_empty() {
            return Err(StatementError::EmptyResource);
        }
        let action_ok = self.action == "*"
            || self.action.split(':').all(|segment| {
                !segment.is_empty()
                    && segment
                        .chars()
                        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_' | '*'))
            });
        if !action_ok {
            return Err(StatementError::InvalidAction(self.action.clone()));
        }
        let resource_ok = self.resource == "*"
            || self
                .resource
                .split('/')
                .all(|segment| !segment.is_empty() && !segment.chars().any(char::is_whitespace));
        if !resource_ok {
            return Err(StatementError::InvalidResource(self.resource.clone()));
        }
        Ok(())
    }
}

/// Named capability: a statement plus the domain ids it authorizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub name: String,
    pub domains: BTreeSet<String>,
    pub statement: Statement,
}

impl Permission {
    pub fn new<I, S>(name: impl Into<String>, domains: I, statement: Statement) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            domains: domains.into_iter().map(Into::into).collect(),
            statement,
        }
    }

    pub fn validate(&self) -> Result<(), StatementError> {
        if self.name.trim().is_empty() {
            return Err(StatementError::EmptyName);
        }
        self.statement.validate()
    }

    pub fn authorizes(&self, domain_id: &str) -> bool {
        self.domains.contains(domain_id)
    }
}
