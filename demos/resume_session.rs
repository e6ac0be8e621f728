//! Reconnect to whatever job the service already knows about.
//!
//! A page-reload analogue: derive the session phase from the server-side
//! job store, re-render existing results without duplicates, and continue
//! the job if it is resumable.
//!
//! ```sh
//! cargo run --example resume_session
//! ```

use certgen_client::{CertClient, JobSession, SessionEvent, SessionState};

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let client = CertClient::new("http://127.0.0.1:5000");
    let (session, mut events) = JobSession::new(client);

    let state = session.resume_on_load().await?;
    println!("resumed in {:?}", state);

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let SessionEvent::ItemRendered { item } = event {
                println!("  {}", item.name);
            }
        }
    });

    match state {
        SessionState::ReadyToResume {
            processed,
            source_available: true,
        } => {
            println!("Continuing after {} certificate(s)...", processed);
            let outcome = session.generate().await?;
            println!("Finished with {} total", outcome.results.len());
        }
        SessionState::ReadyToResume {
            source_available: false,
            ..
        } => {
            println!("Job is resumable but the service lost the roster; upload it again first");
        }
        SessionState::Running { processed } => {
            println!("Job already running with {} done; watching until it stops", processed);
            while !matches!(
                session.state(),
                SessionState::Completed | SessionState::ReadyToResume { .. }
            ) {
                tokio::time::sleep(std::time::Duration::from_millis(500)).await;
            }
            println!("settled in {:?}", session.state());
        }
        other => println!("Nothing to resume ({:?})", other),
    }

    drop(session);
    let _ = printer.await;
    Ok(())
}
