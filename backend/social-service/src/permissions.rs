//! Ownership guard.
//!
//! Authorization is an ordered list of predicate checks evaluated in
//! sequence; the first failing check decides the denial reason. Request-level
//! checks run before the resource is loaded, object-level checks after, so a
//! caller sees 401, then 404, then 403 in that order.

use actix_middleware::{AuthUser, Principal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn is_read(self) -> bool {
        matches!(self, Action::Read)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    Unauthenticated,
    NotOwner,
}

/// Anything with a single owning principal
pub trait Owned {
    fn owner_id(&self) -> i64;
}

/// `owner` is `None` for request-level evaluation (no resource loaded yet)
type Check = fn(&Principal, Action, Option<i64>) -> Result<(), Denial>;

const REQUEST_CHECKS: &[Check] = &[authenticated_or_read_only];
const OBJECT_CHECKS: &[Check] = &[authenticated_or_read_only, owner_or_read_only];

fn authenticated_or_read_only(
    principal: &Principal,
    action: Action,
    _owner: Option<i64>,
) -> Result<(), Denial> {
    if action.is_read() || principal.is_authenticated() {
        Ok(())
    } else {
        Err(Denial::Unauthenticated)
    }
}

fn owner_or_read_only(
    principal: &Principal,
    action: Action,
    owner: Option<i64>,
) -> Result<(), Denial> {
    if action.is_read() {
        return Ok(());
    }
    match (principal.id(), owner) {
        (Some(actor), Some(owner)) if actor == owner => Ok(()),
        (None, _) => Err(Denial::Unauthenticated),
        _ => Err(Denial::NotOwner),
    }
}

fn run(checks: &[Check], principal: &Principal, action: Action, owner: Option<i64>) -> Result<(), Denial> {
    checks
        .iter()
        .try_for_each(|check| check(principal, action, owner))
}

/// Request-level guard, evaluated before any resource is loaded.
pub fn require(principal: &Principal, action: Action) -> Result<(), Denial> {
    run(REQUEST_CHECKS, principal, action, None)
}

/// Request-level guard for writes that need the acting user.
///
/// Creation only needs this; the caller assigns ownership to the returned user.
pub fn require_user(principal: &Principal) -> Result<&AuthUser, Denial> {
    run(REQUEST_CHECKS, principal, Action::Create, None)?;
    principal.user().ok_or(Denial::Unauthenticated)
}

/// Object-level guard, evaluated against a loaded resource.
pub fn check_object<R: Owned>(principal: &Principal, action: Action, resource: &R) -> Result<(), Denial> {
    run(OBJECT_CHECKS, principal, action, Some(resource.owner_id())).map_err(|denial| {
        tracing::warn!(?action, actor = ?principal.id(), owner = resource.owner_id(), ?denial, "permission denied");
        denial
    })
}
