//! Infrastructure layer - external I/O adapters
//!
//! This module contains all code that interacts with external systems:
//! - Source repositories (git)
//! - Container engine and registry (docker, platform CLI)
//! - Caller identity (platform CLI)
//! - Service orchestrator (platform CLI)
//!
//! Each adapter sits behind a trait so the pipeline can be exercised with
//! in-memory fakes.

pub mod engine;
pub mod identity;
pub mod orchestrator;
pub mod source;

// Re-export commonly used types
pub use engine::{registry_host, ContainerEngine, DockerEngine};
pub use identity::{IdentityProvider, StsIdentity};
pub use orchestrator::{EcsOrchestrator, Orchestrator, Rollout, ServiceTarget};
pub use source::{GitSource, SourceProvider, SourceRevision};
