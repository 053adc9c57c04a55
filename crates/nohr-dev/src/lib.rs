//! # NOHR dev loop
//!
//! Hot-reload orchestration for NOHR projects:
//!
//! ```text
//! FileWatcher → Classifier → BuildCoordinator → (ProcessSupervisor) → UpdateChannel → clients
//! ```
//!
//! Every rebuild starts by regenerating the route manifest, so the served
//! application and the hydration bootstrap always see the same route table.
//! The bundler is an external program behind the [`Bundler`] trait.

pub mod bundler;
pub mod channel;
pub mod classify;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod server;
pub mod supervisor;
pub mod watcher;
pub mod ws;

pub use bundler::{BuildTarget, Bundler, CommandBundler};
pub use channel::{BroadcastReport, ClientId, UpdateChannel, UpdateKind, UpdateMessage};
pub use classify::Classifier;
pub use client::{ReconnectPolicy, UpdateClient};
pub use config::{CommandsConfig, DevConfig, NohrConfig, RoutingConfig};
pub use coordinator::{BuildContext, BuildCoordinator, BuildState, BuildStats, CoordinatorHandle};
pub use error::{DevError, Result};
pub use event::{ChangeEvent, Classification};
pub use server::{DevOptions, DevServer};
pub use supervisor::ProcessSupervisor;
pub use watcher::FileWatcher;
