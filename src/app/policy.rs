//! Authorization predicates for the content service.
//!
//! Each predicate takes the caller (if any) and returns a [`Decision`]; handlers
//! evaluate the relevant one before doing any work.

use crate::app::error::ServiceError;

/// The authenticated caller as far as authorization is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub is_staff: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    Unauthenticated(&'static str),
    Forbidden(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn into_result(self) -> Result<(), ServiceError> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(Denial::Unauthenticated(reason)) => {
                Err(ServiceError::Unauthenticated(reason))
            }
            Self::Deny(Denial::Forbidden(reason)) => Err(ServiceError::PermissionDenied(reason)),
        }
    }
}

const LOGIN_REQUIRED: &str = "Authentication required";
const STAFF_REQUIRED: &str = "Permission denied";

pub fn view_vacations(_caller: Option<Principal>) -> Decision {
    Decision::Allow
}

pub fn manage_vacations(caller: Option<Principal>) -> Decision {
    require_staff(caller)
}

pub fn like_vacations(caller: Option<Principal>) -> Decision {
    match caller {
        Some(_) => Decision::Allow,
        None => Decision::Deny(Denial::Unauthenticated("Not authenticated")),
    }
}

pub fn view_countries(_caller: Option<Principal>) -> Decision {
    Decision::Allow
}

pub fn create_country(caller: Option<Principal>) -> Decision {
    match caller {
        Some(_) => Decision::Allow,
        None => Decision::Deny(Denial::Unauthenticated(LOGIN_REQUIRED)),
    }
}

pub fn delete_country(caller: Option<Principal>) -> Decision {
    require_staff(caller)
}

fn require_staff(caller: Option<Principal>) -> Decision {
    match caller {
        None => Decision::Deny(Denial::Unauthenticated(LOGIN_REQUIRED)),
        Some(principal) if principal.is_staff => Decision::Allow,
        Some(_) => Decision::Deny(Denial::Forbidden(STAFF_REQUIRED)),
    }
}
