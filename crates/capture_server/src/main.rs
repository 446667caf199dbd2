#[tokio::main]
async fn main() {
    if let Err(e) = lib_capture_server::init().await {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }

    // A stdin feed keeps a blocking reader thread alive past shutdown.
    std::process::exit(0);
}
