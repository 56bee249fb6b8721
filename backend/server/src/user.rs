//! # Frontend Payloads
//!
//! Client logic/relevant structures.
//!
//! ## Overall Payloads
//!
//! JSON requests/responses between the frontend and backend.
//!
//! ### Session
//! Cookies
//! - session: hex token, `HttpOnly`, `SameSite=Lax`, lasts `SESSION_TTL_SECS`
//!
//! Sign up, log in
//! - To backend: [`Credentials`]
//! - From backend: [`SessionBody`] + session cookie
//!
//! Log out
//! - From backend: 204 + expired session cookie
//!
//! ### Password Reset
//! - To backend: [`ResetRequest`], the reset code goes out of band
//! - To backend: [`ResetConfirm`] with that code and the new password
//!
//! ### Contacts
//! - To backend: [`NewContact`](ledger::NewContact) on add, record id in the path on delete
//! - From backend: [`ContactsBody`], always a fresh read of the namespace
//!
//! ### Errors
//! - From backend: [`ErrorBody`], a single "Failed to ..." line
//!
//!
//!
//! ## Flow
//!
//! - Visiting `/` without a session redirects to `/login`
//! - Sign up or log in sets the cookie, then `/` lists the user's contacts
//! - Save and delete answer with the re-read list, the view just replaces its table
//! - The save/delete buttons stay disabled while a request is out, the backend answers
//!   409 if a second one slips through anyway
//! - Forgot password: request a code, then confirm it with a new password, then log in
use ledger::{ContactRecord, Identity};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetConfirm {
    pub code: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SessionBody {
    pub email: String,
}

impl From<&Identity> for SessionBody {
    fn from(identity: &Identity) -> Self {
        Self {
            email: identity.email().to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ContactsBody {
    pub email: String,
    pub contacts: Vec<ContactRecord>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}
