//! # Ledger
//!
//! Binds an identity to its namespace in the record store.
//!
//! ## Operations
//!
//! - Load: point-in-time snapshot of the namespace, store order, empty if never written
//! - Add: validate, then create in the namespace
//! - Delete: remove by id from the namespace
//!
//! ## Consistency
//!
//! Add and Delete return only their own result. Callers holding a local list
//! re-run Load after every successful mutation; nothing is patched locally.
//!
//! ## In-flight guard
//!
//! One mutation per namespace at a time. A second Add or Delete submitted while
//! one is outstanding fails with [`LedgerError::Busy`] without reaching the store.
//! Load is never blocked.
use std::{
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError},
};

use tracing::{debug, warn};

use crate::{
    contact::{ContactRecord, NewContact, RecordId},
    error::LedgerError,
    identity::{Identity, Namespace},
    store::RecordStore,
};

pub struct Ledger {
    store: Arc<dyn RecordStore>,
    in_flight: Mutex<HashSet<Namespace>>,
}

impl Ledger {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub async fn load(&self, identity: &Identity) -> Result<Vec<ContactRecord>, LedgerError> {
        let namespace = identity.namespace();

        self.store.list(&namespace).await.map_err(|e| {
            warn!(%namespace, "Failed to list contacts: {e}");
            LedgerError::from(e)
        })
    }

    pub async fn add(
        &self,
        identity: &Identity,
        contact: &NewContact,
    ) -> Result<ContactRecord, LedgerError> {
        let contact = contact.validate()?;
        let namespace = identity.namespace();
        let _guard = self.begin(&namespace)?;

        let record = self.store.create(&namespace, contact).await.map_err(|e| {
            warn!(%namespace, "Failed to create contact: {e}");
            LedgerError::from(e)
        })?;

        debug!(%namespace, id = %record.id, "Contact added");
        Ok(record)
    }

    pub async fn delete(&self, identity: &Identity, id: RecordId) -> Result<(), LedgerError> {
        let namespace = identity.namespace();
        let _guard = self.begin(&namespace)?;

        self.store.delete(&namespace, id).await.map_err(|e| {
            warn!(%namespace, %id, "Failed to delete contact: {e}");
            LedgerError::from(e)
        })?;

        debug!(%namespace, %id, "Contact deleted");
        Ok(())
    }

    fn begin(&self, namespace: &Namespace) -> Result<InFlight<'_>, LedgerError> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);

        if !in_flight.insert(namespace.clone()) {
            debug!(%namespace, "Rejected overlapping mutation");
            return Err(LedgerError::Busy);
        }

        Ok(InFlight {
            ledger: self,
            namespace: namespace.clone(),
        })
    }
}

/// Marks a namespace busy until dropped.
struct InFlight<'a> {
    ledger: &'a Ledger,
    namespace: Namespace,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.ledger
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.namespace);
    }
}
