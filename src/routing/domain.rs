use serde::{Deserialize, Serialize};

use crate::config::DomainsConfig;

/// The fixed set of authorization domains a route can be exposed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainScope {
    System,
    Corporate,
    Team,
    User,
}

impl DomainScope {
    pub const ALL: [DomainScope; 4] = [
        DomainScope::System,
        DomainScope::Corporate,
        DomainScope::Team,
        DomainScope::User,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DomainScope::System => "system",
            DomainScope::Corporate => "corporate",
            DomainScope::Team => "team",
            DomainScope::User => "user",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|scope| scope.name() == name)
    }

    /// Path parameter carrying the tenant identifier, if the scope has one.
    pub fn tenant_param(&self) -> Option<&'static str> {
        match self {
            DomainScope::Corporate => Some("company_id"),
            DomainScope::Team => Some("team_id"),
            DomainScope::System | DomainScope::User => None,
        }
    }

    /// Concrete endpoint (no leading slash) for a relative route path.
    pub fn expand(&self, path: &str) -> String {
        match self {
            DomainScope::System => join("system", path),
            DomainScope::Corporate => join("corporate/:company_id", path),
            DomainScope::Team => join("team/:team_id", path),
            DomainScope::User => normalize(path),
        }
    }
}

fn normalize(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

fn join(prefix: &str, path: &str) -> String {
    let path = normalize(path);
    if path.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix}/{path}")
    }
}

/// A named authorization domain together with its policy identifier.
///
/// The name selects the path template; the id is what permissions list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthorizationDomain {
    pub name: String,
    pub id: String,
}

impl AuthorizationDomain {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }

    /// `None` when the name is outside the fixed set.
    pub fn scope(&self) -> Option<DomainScope> {
        DomainScope::from_name(&self.name)
    }
}

/// The four domains of this deployment, with ids from configuration.
#[derive(Debug, Clone)]
pub struct AuthDomains {
    pub system: AuthorizationDomain,
    pub corporate: AuthorizationDomain,
    pub team: AuthorizationDomain,
    pub user: AuthorizationDomain,
}

impl AuthDomains {
    pub fn from_config(config: &DomainsConfig) -> Self {
        Self {
            system: AuthorizationDomain::new(DomainScope::System.name(), &config.system),
            corporate: AuthorizationDomain::new(DomainScope::Corporate.name(), &config.corporate),
            team: AuthorizationDomain::new(DomainScope::Team.name(), &config.team),
            user: AuthorizationDomain::new(DomainScope::User.name(), &config.user),
        }
    }

    pub fn get(&self, scope: DomainScope) -> &AuthorizationDomain {
        match scope {
            DomainScope::System => &self.system,
            DomainScope::Corporate => &self.corporate,
            DomainScope::Team => &self.team,
            DomainScope::User => &self.user,
        }
    }

    pub fn all(&self) -> Vec<AuthorizationDomain> {
        DomainScope::ALL.iter().map(|s| self.get(*s).clone()).collect()
    }
}

impl Default for AuthDomains {
    fn default() -> Self {
        Self::from_config(&DomainsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_each_scope() {
        assert_eq!(DomainScope::System.expand("trips"), "system/trips");
        assert_eq!(DomainScope::Corporate.expand("invoices"), "corporate/:company_id/invoices");
        assert_eq!(DomainScope::Team.expand("members/:id"), "team/:team_id/members/:id");
        assert_eq!(DomainScope::User.expand("trips"), "trips");
    }

    #[test]
    fn expansion_cleans_slashes() {
        assert_eq!(DomainScope::System.expand("/trips/"), "system/trips");
        assert_eq!(DomainScope::System.expand(""), "system");
        assert_eq!(DomainScope::User.expand("a//b"), "a/b");
    }

    #[test]
    fn scope_is_resolved_by_name() {
        let domains = AuthDomains::default();
        assert_eq!(domains.team.scope(), Some(DomainScope::Team));
        assert_eq!(AuthorizationDomain::new("galaxy", "g-1").scope(), None);
    }

    #[test]
    fn tenant_params_only_for_tenant_scopes() {
        assert_eq!(DomainScope::Corporate.tenant_param(), Some("company_id"));
        assert_eq!(DomainScope::Team.tenant_param(), Some("team_id"));
        assert_eq!(DomainScope::User.tenant_param(), None);
    }
}
