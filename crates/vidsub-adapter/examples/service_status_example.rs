/*
[INPUT]:  Optional base URL of a running task service
[OUTPUT]: Service diagnostics and the current task listing
[POS]:    Examples - read-only service queries
[UPDATE]: When adding new diagnostic endpoints
*/

use vidsub_adapter::*;

/// Example: inspect a running task service
///
/// Usage: cargo run --example service_status_example -- http://localhost:8080/api
#[tokio::main]
async fn main() {
    println!("=== Video Task Service Status Example ===\n");

    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let client = match TaskServiceClient::with_config_and_base_url(ClientConfig::default(), &base_url) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create client: {}", e);
            return;
        }
    };
    println!("✓ HTTP client created for {}\n", client.base_url());

    println!("Querying service status...");
    match client.service_status().await {
        Ok(status) => println!("✓ Status: {}", status),
        Err(e) => println!("✗ Error: {}", e),
    }

    println!("\nQuerying FFmpeg status...");
    match client.ffmpeg_status().await {
        Ok(status) => println!("✓ FFmpeg: {}", status),
        Err(e) => println!("✗ Error: {}", e),
    }

    println!("\nListing tasks...");
    match client.list_tasks().await {
        Ok(tasks) => {
            for task in &tasks {
                println!(
                    "  {} {:<10} {}",
                    task.id,
                    task.status,
                    task.original_name().unwrap_or("-")
                );
            }
            println!("✓ {} task(s)", tasks.len());
        }
        Err(e) => println!("✗ Error: {}", e),
    }

    println!("\n✓ Service status example complete");
}
