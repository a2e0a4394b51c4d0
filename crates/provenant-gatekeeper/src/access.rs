//! Static access policy and per-user edit guards

use crate::{AccessError, ConfigError};
use provenant_domain::traits::AccessService;
use provenant_domain::{ReleaseInstance, ReleasabilityEntry, SourceEntry, SourceInstance, Tlo};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Sources and role of one user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserAccess {
    /// Source names the user may see and act for
    #[serde(default)]
    pub sources: BTreeSet<String>,

    /// Administrators bypass source checks on edits
    #[serde(default)]
    pub admin: bool,
}

/// User → source table loaded from configuration
///
/// Unknown users see nothing.
///
/// # Examples
///
/// ```
/// use provenant_domain::traits::AccessService;
/// use provenant_gatekeeper::AccessPolicy;
///
/// let policy = AccessPolicy::from_toml_str(r#"
///     [users.alice]
///     sources = ["TSRC"]
///
///     [users.root]
///     admin = true
/// "#).unwrap();
///
/// assert!(policy.sources_for("alice").contains("TSRC"));
/// assert!(policy.is_admin("root"));
/// assert!(policy.sources_for("mallory").is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessPolicy {
    /// Access per user name
    #[serde(default)]
    pub users: BTreeMap<String, UserAccess>,
}

impl AccessPolicy {
    /// Create an empty policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a user
    pub fn with_user<I, S>(mut self, user: impl Into<String>, sources: I, admin: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.users.insert(
            user.into(),
            UserAccess {
                sources: sources.into_iter().map(Into::into).collect(),
                admin,
            },
        );
        self
    }

    /// Parse a policy from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load a policy from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}

impl AccessService for AccessPolicy {
    fn sources_for(&self, user: &str) -> BTreeSet<String> {
        self.users
            .get(user)
            .map(|access| access.sources.clone())
            .unwrap_or_default()
    }

    fn is_admin(&self, user: &str) -> bool {
        self.users.get(user).is_some_and(|access| access.admin)
    }
}

/// Source and releasability edits performed on behalf of one user
///
/// A non-admin user must hold the source named by the edit.
pub struct AccessGuard<'a, A: AccessService + ?Sized> {
    access: &'a A,
    user: &'a str,
}

impl<'a, A: AccessService + ?Sized> AccessGuard<'a, A> {
    /// Create a guard for a user
    pub fn new(access: &'a A, user: &'a str) -> Self {
        Self { access, user }
    }

    /// Check the user may act for a source
    pub fn check(&self, source_name: &str) -> Result<(), AccessError> {
        if self.access.is_admin(self.user)
            || self.access.sources_for(self.user).contains(source_name)
        {
            Ok(())
        } else {
            Err(AccessError::Denied {
                user: self.user.to_string(),
                source_name: source_name.to_string(),
            })
        }
    }

    /// Add (merge) a source entry
    pub fn add_source(&self, tlo: &mut Tlo, entry: SourceEntry) -> Result<usize, AccessError> {
        self.check(&entry.name)?;
        Ok(tlo.add_source(entry)?)
    }

    /// Add one instance of a source
    pub fn add_source_instance(
        &self,
        tlo: &mut Tlo,
        name: &str,
        instance: SourceInstance,
    ) -> Result<usize, AccessError> {
        self.check(name)?;
        Ok(tlo.add_source_instance(name, instance)?)
    }

    /// Remove a whole source
    pub fn remove_source(&self, tlo: &mut Tlo, name: &str) -> Result<SourceEntry, AccessError> {
        self.check(name)?;
        Ok(tlo.remove_source(name)?)
    }

    /// Remove one instance of a source
    pub fn remove_source_instance(
        &self,
        tlo: &mut Tlo,
        name: &str,
        date: u64,
    ) -> Result<SourceInstance, AccessError> {
        self.check(name)?;
        Ok(tlo.remove_source_instance(name, date)?)
    }

    /// Grant releasability to a source
    pub fn add_releasability(
        &self,
        tlo: &mut Tlo,
        entry: ReleasabilityEntry,
    ) -> Result<bool, AccessError> {
        self.check(&entry.name)?;
        Ok(tlo.add_releasability(entry))
    }

    /// Record a release
    pub fn add_release_instance(
        &self,
        tlo: &mut Tlo,
        name: &str,
        instance: ReleaseInstance,
    ) -> Result<bool, AccessError> {
        self.check(name)?;
        Ok(tlo.add_release_instance(name, instance)?)
    }

    /// Withdraw releasability
    pub fn remove_releasability(
        &self,
        tlo: &mut Tlo,
        name: &str,
    ) -> Result<ReleasabilityEntry, AccessError> {
        self.check(name)?;
        Ok(tlo.remove_releasability(name)?)
    }

    /// Remove a recorded release
    pub fn remove_release_instance(
        &self,
        tlo: &mut Tlo,
        name: &str,
        date: u64,
    ) -> Result<ReleaseInstance, AccessError> {
        self.check(name)?;
        Ok(tlo.remove_release_instance(name, date)?)
    }
}
