//! The add/delete scenario over HTTP.
use anyhow::{Context, Result, ensure};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

#[derive(Deserialize)]
struct Contact {
    id: Uuid,
    name: String,
}

#[derive(Deserialize)]
struct Contacts {
    contacts: Vec<Contact>,
}

pub async fn run(base: &str) -> Result<()> {
    let base = base.trim_end_matches('/');
    let client = Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()?;

    // fresh account per run so the scenario can be repeated against one store
    let email = format!("smoke-{}@example.com", Uuid::new_v4().simple());
    let password = "smoke-pw";
    info!(%email, "Using throwaway account");

    let response = client
        .post(format!("{base}/signup"))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .context("signup request")?;
    ensure!(
        response.status() == StatusCode::CREATED,
        "signup answered {}",
        response.status()
    );

    client.post(format!("{base}/logout")).send().await?;
    let response = client.get(format!("{base}/")).send().await?;
    ensure!(
        response.status() == StatusCode::SEE_OTHER,
        "contacts reachable after logout: {}",
        response.status()
    );

    let response = client
        .post(format!("{base}/login"))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .context("login request")?;
    ensure!(response.status().is_success(), "login answered {}", response.status());

    let listed: Contacts = client
        .post(format!("{base}/contacts"))
        .json(&json!({ "name": "Bob", "phone": "555-1234", "email": "bob@x.com" }))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    ensure!(listed.contacts.len() == 1, "expected one contact after add");
    ensure!(listed.contacts[0].name == "Bob", "unexpected contact name");
    println!("add: ok");

    let listed: Contacts = client
        .delete(format!("{base}/contacts/{}", listed.contacts[0].id))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    ensure!(listed.contacts.is_empty(), "contact survived its delete");
    println!("delete: ok");

    client.post(format!("{base}/logout")).send().await?;
    Ok(())
}
