//! Chorus Session - The operation-translation / reconciliation / replay
//! pipeline that keeps a text document consistent across replicas.
//!
//! # Quick Start
//!
//! ```rust
//! use chorus_core::ReplicaId;
//! use chorus_session::{
//!     EngineService, EngineSnapshots, MemoryHub, PlainBuffer, ReconciliationEngine, Replica,
//! };
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), chorus_session::SessionError> {
//! let hub = Arc::new(MemoryHub::new("shared-doc"));
//! let engine = ReconciliationEngine::new("").into_handle();
//! let mut service = EngineService::new(engine.clone(), hub.clone());
//!
//! let id = ReplicaId::generate();
//! let mut replica = Replica::<PlainBuffer, _>::attach(
//!     id.clone(),
//!     hub.attach(&id),
//!     hub.publisher(),
//!     Arc::new(EngineSnapshots::new(engine.clone())),
//! );
//! hub.signal_synced(&id, true).await;
//! replica.drain().await;
//!
//! replica.edit(0, 0, "hello").await?;
//! service.drain().await;
//! replica.drain().await;
//! assert_eq!(engine.text(), "hello");
//! assert_eq!(replica.text(), "hello");
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`channel`] - Broadcast channel abstraction and in-memory hub
//! - [`buffer`] - Editable-buffer boundary and a plain in-memory buffer
//! - [`translator`] - Local transactions to canonical operation batches
//! - [`engine`] - The single authoritative serialization point
//! - [`applier`] - Per-replica replay with echo suppression
//! - [`bootstrap`] - Snapshot seeding and idempotent full-resync repair
//! - [`error`] - Error types
//!
//! All document mutation funnels through [`engine::ReconciliationEngine`];
//! replicas never touch each other's state, only the channel.

pub mod applier;
pub mod bootstrap;
pub mod buffer;
pub mod channel;
pub mod engine;
pub mod error;
pub mod translator;

pub use applier::{LocalApplier, Replica};
pub use bootstrap::{EngineSnapshots, SnapshotSource};
pub use buffer::{Change, EditBuffer, OriginTag, PlainBuffer, Span, Transaction};
pub use channel::{ChannelMessage, EditChannel, MemoryHub, MemoryPublisher};
pub use engine::{EngineHandle, EngineService, ReconciliationEngine};
pub use error::{Result, SessionError};
pub use translator::OperationTranslator;
