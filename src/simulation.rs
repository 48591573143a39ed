//! Multi-replica session simulations.
//!
//! Deterministic edit scripts driven step by step, so every run is
//! reproducible: no timers, no randomness, just explicit drains of the
//! engine and replica queues.

use chorus_core::ReplicaId;
use chorus_session::{
    EditChannel, EngineService, EngineSnapshots, MemoryHub, MemoryPublisher, PlainBuffer,
    ReconciliationEngine, Replica, SnapshotSource,
};
use std::sync::Arc;
use std::time::Instant;

/// Results of one simulated session.
pub struct SessionStats {
    pub replicas: usize,
    pub edits: usize,
    pub final_len: usize,
    pub converged: bool,
    pub elapsed_ms: u128,
}

impl SessionStats {
    pub fn print(&self) {
        println!(
            "  replicas: {:>3}   edits: {:>5}   final length: {:>6}   converged: {}   {} ms",
            self.replicas,
            self.edits,
            self.final_len,
            if self.converged { "yes" } else { "NO" },
            self.elapsed_ms,
        );
    }
}

type SimReplica = Replica<PlainBuffer, MemoryPublisher>;

async fn build_session(
    replica_count: usize,
    initial_text: &str,
) -> (Arc<MemoryHub>, EngineService, Vec<SimReplica>) {
    let hub = Arc::new(MemoryHub::new("simulated-doc"));
    let engine = ReconciliationEngine::new(initial_text).into_handle();
    let service = EngineService::new(engine.clone(), hub.clone());
    let snapshots: Arc<dyn SnapshotSource> = Arc::new(EngineSnapshots::new(engine));

    let mut replicas = Vec::with_capacity(replica_count);
    for i in 0..replica_count {
        let id = ReplicaId::new(format!("replica-{}", i));
        let updates = hub.attach(&id);
        let mut replica =
            Replica::<PlainBuffer, _>::attach(id.clone(), updates, hub.publisher(), snapshots.clone());
        hub.signal_synced(&id, true).await;
        replica.drain().await;
        replicas.push(replica);
    }
    (hub, service, replicas)
}

async fn propagate(service: &mut EngineService, replicas: &mut [SimReplica]) {
    service.drain().await;
    for replica in replicas.iter_mut() {
        replica.drain().await;
    }
}

/// Run a session where replicas take turns editing, with every edit fully
/// propagated before the next: the regime in which all replicas must end
/// bit-identical.
pub async fn simulate_session(replica_count: usize, rounds: usize) -> SessionStats {
    let start = Instant::now();
    let (_hub, mut service, mut replicas) = build_session(replica_count, "").await;

    let mut edits = 0;
    for round in 0..rounds {
        for i in 0..replicas.len() {
            let len = replicas[i].text().chars().count();
            if round % 5 == 4 && len > 3 {
                // Every fifth round each replica deletes a small range.
                let from = (round * 7 + i * 3) % (len - 2);
                replicas[i].edit(from, from + 2, "").await.unwrap();
            } else {
                let at = (round * 11 + i * 5) % (len + 1);
                let token = format!("[r{}e{}]", i, round);
                replicas[i].edit(at, at, &token).await.unwrap();
            }
            edits += 1;
            propagate(&mut service, &mut replicas).await;
        }
    }

    let authoritative = service.engine().text();
    let converged = replicas.iter().all(|r| r.text() == authoritative);

    SessionStats {
        replicas: replica_count,
        edits,
        final_len: authoritative.chars().count(),
        converged,
        elapsed_ms: start.elapsed().as_millis(),
    }
}

/// Demonstrate the arrival-order-wins policy and the full-resync repair:
/// two replicas insert at offset 0 before seeing each other's operation,
/// one of them diverges, and the "synced" signal repairs it.
pub async fn simulate_divergence_repair() {
    let (hub, mut service, mut replicas) = build_session(2, "").await;

    replicas[0].edit(0, 0, "ab").await.unwrap();
    replicas[1].edit(0, 0, "cd").await.unwrap();
    propagate(&mut service, &mut replicas).await;

    let authoritative = service.engine().text();
    println!("  engine (arrival order X then Y): {:?}", authoritative);
    println!("  replica X: {:?}", replicas[0].text());
    println!("  replica Y: {:?} (diverged)", replicas[1].text());

    let y = replicas[1].id().clone();
    hub.signal_synced(&y, true).await;
    replicas[1].drain().await;
    println!("  replica Y after resync: {:?}", replicas[1].text());
    assert_eq!(replicas[1].text(), authoritative);
}

/// Demonstrate offline editing: publication is deferred while the channel
/// is disconnected and flushed in order on reconnect.
pub async fn simulate_offline_edit() {
    let (_hub, mut service, mut replicas) = build_session(2, "shared notes").await;

    replicas[0].channel().disconnect();
    replicas[0].edit(0, 0, "(offline) ").await.unwrap();
    propagate(&mut service, &mut replicas).await;
    println!("  while offline, engine: {:?}", service.engine().text());

    replicas[0].channel().reconnect().await.unwrap();
    propagate(&mut service, &mut replicas).await;
    println!("  after reconnect, engine: {:?}", service.engine().text());
    println!("  replica B: {:?}", replicas[1].text());
}
