//! # frutiandante-store: Backend Plumbing for Frutiandante
//!
//! Live document and collection mirrors, writes, the error channel,
//! identity, blob uploads and the persistent cart.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      frutiandante-store                                 │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                 AppContext (per session)                         │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ LiveDocument   │  │ Writer         │  │ CheckoutService        │    │
//! │  │ LiveCollection │  │ Admin          │  │ PersistentCart         │    │
//! │  └───────┬────────┘  └───────┬────────┘  └────────────────────────┘    │
//! │          │ denied read       │ denied write                             │
//! │          ▼                   ▼                                          │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  EventBus  ── "permission-error" ──►  FailureListener ──► UI     │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  PORTS: RecordStore • IdentityProvider • BlobStorage • LocalStorage    │
//! │  ADAPTERS: MemoryStore • MemoryIdentity • MemoryBlobStorage •          │
//! │            MemoryStorage • FileStorage                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! ### Error Channel
//! - [`events`] - Topic-keyed event bus
//! - [`failure`] - Refused operation record
//! - [`notify`] - Top-level failure listener
//!
//! ### Records
//! - [`backend`] - `RecordStore` port, snapshots, listener registrations
//! - [`target`] - Document references and queries
//! - [`memory`] - In-memory record store
//! - [`live`] - Live document and collection mirrors
//! - [`writes`] - Writes that report refusals
//! - [`queries`] - Named storefront and admin queries
//!
//! ### Storefront
//! - [`cart_store`] - Cart persisted to local storage
//! - [`checkout`] - Order placement and WhatsApp handoff
//! - [`identity`] - Sign-in and the loyalty lookup
//! - [`admin`] - Catalogue, order and settings management
//! - [`blob`] - Image uploads
//! - [`storage`] - Local key-value storage
//!
//! ### Ambient
//! - [`config`] - Storefront configuration
//! - [`context`] - Session wiring and tracing setup
//! - [`error`] - Store error types

pub mod admin;
pub mod backend;
pub mod blob;
pub mod cart_store;
pub mod checkout;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod failure;
pub mod identity;
pub mod live;
pub mod memory;
pub mod notify;
pub mod queries;
pub mod storage;
pub mod target;
pub mod writes;

// =============================================================================
// Re-exports
// =============================================================================

pub use backend::{DocumentSnapshot, ListenerRegistration, QuerySnapshot, RecordStore};
pub use config::{AppConfig, Environment};
pub use context::{init_tracing, AppContext};
pub use error::{StoreError, StoreResult};
pub use events::{AppEvent, EventBus, HandlerId, Topic};
pub use failure::{OperationFailure, OperationKind};
pub use live::{CollectionState, DocumentState, LiveCollection, LiveDocument, MirrorState};
pub use memory::MemoryStore;
pub use target::{DocumentRef, Query};
