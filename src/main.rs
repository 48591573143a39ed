use simulation::{simulate_divergence_repair, simulate_offline_edit, simulate_session};
pub mod simulation;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async_main());
}

async fn async_main() {
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║          CHORUS SESSION SIMULATIONS                        ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    println!("\nTurn-taking sessions (full propagation between edits):");
    let stats = simulate_session(3, 20).await;
    stats.print();
    let stats = simulate_session(10, 10).await;
    stats.print();
    let stats = simulate_session(25, 4).await;
    stats.print();

    println!("\nConcurrent inserts, arrival-order-wins, resync repair:");
    simulate_divergence_repair().await;

    println!("\nOffline edit with deferred publication:");
    simulate_offline_edit().await;

    println!("\n✓ All simulations completed");
}
