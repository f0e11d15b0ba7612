//! Caller identity.
//!
//! The identity provider is external; the core only sees who is calling
//! (`{id, role}`) or that nobody is. Read operations fail closed by
//! returning empty results for anonymous callers, writes return
//! [`Error::Unauthorized`].

use crate::store::Store;
use crate::types::{Profile, Role};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// An authenticated user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: Uuid,
    pub role: Role,
}

/// Whoever invoked an operation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    Authenticated(Identity),
}

impl Caller {
    pub fn trainer(id: Uuid) -> Self {
        Caller::Authenticated(Identity {
            id,
            role: Role::Trainer,
        })
    }

    pub fn client(id: Uuid) -> Self {
        Caller::Authenticated(Identity {
            id,
            role: Role::Client,
        })
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Caller::Anonymous => None,
            Caller::Authenticated(identity) => Some(identity),
        }
    }

    /// Id of the caller, for read paths that fail closed
    pub fn user_id(&self) -> Option<Uuid> {
        self.identity().map(|i| i.id)
    }

    /// Id of the caller, for write paths
    pub fn require(&self) -> Result<Uuid> {
        self.user_id().ok_or(Error::Unauthorized)
    }

    /// Id of the caller if they hold the given role
    pub fn require_role(&self, role: Role) -> Result<Uuid> {
        match self.identity() {
            Some(identity) if identity.role == role => Ok(identity.id),
            Some(identity) => {
                tracing::debug!("Caller {} lacks role {:?}", identity.id, role);
                Err(Error::Unauthorized)
            }
            None => Err(Error::Unauthorized),
        }
    }
}

/// Resolve an opaque user id into a caller
///
/// Unknown or absent ids resolve to [`Caller::Anonymous`].
pub fn identify<S: Store>(store: &S, user_id: Option<Uuid>) -> Result<Caller> {
    let Some(id) = user_id else {
        return Ok(Caller::Anonymous);
    };

    let role = store.read(|t| t.profile(id).map(|p| p.role))?;
    Ok(match role {
        Some(role) => Caller::Authenticated(Identity { id, role }),
        None => {
            tracing::warn!("Unknown user id {}, treating as anonymous", id);
            Caller::Anonymous
        }
    })
}

/// Create a profile, standing in for the identity provider's sign-up
pub fn register_profile<S: Store>(
    store: &S,
    full_name: &str,
    role: Role,
    now: DateTime<Utc>,
) -> Result<Profile> {
    let full_name = full_name.trim();
    if full_name.is_empty() {
        return Err(Error::Validation("full name is required".into()));
    }

    let profile = Profile {
        id: Uuid::new_v4(),
        full_name: full_name.to_string(),
        role,
        created_at: now,
    };

    store.write(|t| {
        t.profiles.push(profile.clone());
        Ok(())
    })?;

    tracing::info!("Registered {:?} profile {}", role, profile.id);
    Ok(profile)
}
