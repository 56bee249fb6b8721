//! # Contacts Ledger
//!
//! Shared domain logic between the server and the tester.
//!
//! ## Pieces
//!
//! - [`identity`]: emails, identities, namespaces and session secrets
//! - [`contact`]: the contact record schema and its validation
//! - [`store`]: seams to the record store, the account store and the reset outbox
//! - [`sessions`]: the session store (register, authenticate, reset, notify)
//! - [`session`]: one client's session context over the session store
//! - [`gate`]: the access gate for protected views
//! - [`ledger`]: add/list/delete of contacts inside one namespace
//! - [`memory`]: in-memory backends for tests and local runs
//!
//! Nothing in here touches the network or the filesystem. Backends plug in through
//! the traits in [`store`].

pub mod contact;
pub mod error;
pub mod gate;
pub mod identity;
pub mod ledger;
pub mod memory;
pub mod session;
pub mod sessions;
pub mod store;

pub use contact::{ContactRecord, Field, NewContact, RecordId, ValidContact};
pub use error::{AuthError, ErrorKind, LedgerError, StoreError};
pub use gate::{Admission, LOGIN_PATH, admit};
pub use identity::{Email, Identity, Namespace, ResetCode, SessionToken};
pub use ledger::Ledger;
pub use session::Session;
pub use sessions::{SessionEvent, SessionStore};
pub use store::{AccountStore, Outbox, RecordStore};
