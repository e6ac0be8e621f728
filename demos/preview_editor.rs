//! Drag the name placement around and watch the debounced preview.
//!
//! Simulates a drag gesture over an 800x600 template view plus a burst of
//! slider changes; only the last change within the debounce window hits
//! the service.
//!
//! ```sh
//! cargo run --example preview_editor
//! ```

use certgen_client::{Bounds, CertClient, CoordinateEditor, PreviewDebouncer, PreviewUpdate};

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let client = CertClient::new("http://127.0.0.1:5000");
    let mut settings = client.settings().await.unwrap_or_default();

    let (debouncer, mut updates) = PreviewDebouncer::new(client);

    let mut editor = CoordinateEditor::new();
    let view = Bounds::new(0.0, 0.0, 800.0, 600.0);

    // Drag from the center toward the lower edge; the position clamps
    // inside the legal band the whole way.
    editor.begin();
    for (x, y) in [(400.0, 300.0), (400.0, 480.0), (400.0, 640.0)] {
        if let Some(pos) = editor.move_to(x, y, view) {
            println!("dragging at ({:.2}, {:.2})", pos.x, pos.y);
        }
    }
    if editor.end() {
        settings.position = editor.position();
        debouncer.trigger(settings.clone(), "Jane Sample");
    }

    // A quick burst of slider changes collapses into one request.
    for size in [100, 110, 120] {
        settings.font_size = size;
        debouncer.trigger(settings.clone(), "Jane Sample");
    }

    match updates.recv().await {
        Some(PreviewUpdate::Ready { image }) => {
            println!("preview ready ({} bytes of base64)", image.data.len());
        }
        Some(PreviewUpdate::Failed { message }) => println!("preview failed: {}", message),
        None => {}
    }

    Ok(())
}
