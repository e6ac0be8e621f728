//! Upload a roster and generate certificates with live progress.
//!
//! Expects a running certificate service and a `names.csv` file with a
//! `name` column in the working directory.
//!
//! ```sh
//! cargo run --example basic_generation
//! ```

use certgen_client::{CertClient, JobSession, SessionEvent};

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let client = CertClient::new("http://127.0.0.1:5000");
    let (session, mut events) = JobSession::new(client);

    session.resume_on_load().await?;

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::ItemRendered { item } => {
                    if item.is_ok() {
                        println!("  {} -> {}", item.name, item.url.unwrap_or_default());
                    } else {
                        println!(
                            "  {} failed: {}",
                            item.name,
                            item.error.unwrap_or_else(|| "Unknown".into())
                        );
                    }
                }
                SessionEvent::StateChanged { state } => println!("phase: {:?}", state),
            }
        }
    });

    let roster = std::fs::read("names.csv")?;
    let upload = session.upload_source("names.csv", roster).await?;
    println!("{}", upload.message);

    let outcome = session.generate().await?;
    println!(
        "Done: {} new certificate(s), {} total",
        outcome.new_results.len(),
        outcome.results.len()
    );

    drop(session);
    let _ = printer.await;
    Ok(())
}
