//! Scenarios run directly against the ledger, the session context and the gate.
use std::sync::Arc;

use anyhow::{Result, bail, ensure};
use ledger::{
    Admission, ErrorKind, Ledger, LedgerError, NewContact, Session, SessionStore,
    memory::{MemoryAccountStore, MemoryOutbox, MemoryRecordStore},
};

struct World {
    sessions: Arc<SessionStore>,
    ledger: Ledger,
}

impl World {
    fn new() -> Self {
        Self {
            sessions: Arc::new(SessionStore::new(
                Arc::new(MemoryAccountStore::new()),
                Arc::new(MemoryOutbox::new()),
            )),
            ledger: Ledger::new(Arc::new(MemoryRecordStore::new())),
        }
    }

    fn session(&self) -> Session {
        Session::new(self.sessions.clone())
    }
}

pub async fn run() -> Result<()> {
    add_then_delete().await?;
    println!("add then delete: ok");

    wrong_password().await?;
    println!("wrong password: ok");

    namespace_isolation().await?;
    println!("namespace isolation: ok");

    Ok(())
}

async fn add_then_delete() -> Result<()> {
    let world = World::new();
    let session = world.session();

    session.sign_up("a@x.com", "pw1pw1").await?;
    session.log_out().await?;
    let identity = session.log_in("a@x.com", "pw1pw1").await?;

    let Admission::Admit(admitted) = session.admission() else {
        bail!("gate refused a bound session");
    };
    ensure!(admitted == identity, "gate admitted the wrong identity");

    let bob = world
        .ledger
        .add(&identity, &NewContact::new("Bob", "555-1234", "bob@x.com"))
        .await?;

    let records = world.ledger.load(&identity).await?;
    ensure!(records.len() == 1, "expected one record, got {}", records.len());
    ensure!(records[0].name == "Bob", "expected Bob, got {}", records[0].name);

    world.ledger.delete(&identity, bob.id).await?;
    ensure!(
        world.ledger.load(&identity).await?.is_empty(),
        "record survived its delete"
    );

    Ok(())
}

async fn wrong_password() -> Result<()> {
    let world = World::new();
    world.sessions.register("a@x.com", "pw1pw1").await?;
    let session = world.session();

    match session.log_in("a@x.com", "wrong-pw").await {
        Err(e) if e.kind() == ErrorKind::AuthFailure => {}
        Err(e) => bail!("expected an auth failure, got {e}"),
        Ok(_) => bail!("wrong password was accepted"),
    }

    ensure!(session.current().is_none(), "identity bound after failure");
    ensure!(
        matches!(session.admission(), Admission::Redirect(_)),
        "gate let an unbound session through"
    );

    Ok(())
}

async fn namespace_isolation() -> Result<()> {
    let world = World::new();
    let alice = world.session().sign_up("a@x.com", "pw1pw1").await?;
    let bea = world.session().sign_up("b@x.com", "pw2pw2").await?;

    world
        .ledger
        .add(&alice, &NewContact::new("Bob", "5551234", "bob@x.com"))
        .await?;
    let eve = world
        .ledger
        .add(&bea, &NewContact::new("Eve", "5559876", "eve@x.com"))
        .await?;

    let alices = world.ledger.load(&alice).await?;
    ensure!(
        alices.iter().all(|record| record.id != eve.id),
        "a@x.com sees b@x.com's record"
    );

    match world.ledger.delete(&alice, eve.id).await {
        Err(LedgerError::Store(_)) => {}
        other => bail!("cross-namespace delete went through: {other:?}"),
    }

    Ok(())
}
