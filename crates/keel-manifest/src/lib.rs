//! Keel Manifest
//!
//! Decoding, defaulting and validation of `.keel.yaml` pipeline manifests,
//! plus evaluation of the triggers they declare against incoming events.
//! Everything here is synchronous and works on an in-memory tree; the only
//! I/O is the optional file loader.

pub mod bot;
pub mod builder;
pub mod error;
pub mod event;
pub mod helpers;
pub mod loader;
pub mod manifest;
pub mod ports;
pub mod preferences;
pub mod release;
pub mod release_template;
pub mod schema;
pub mod section;
pub mod service;
pub mod stage;
pub mod trigger;
pub mod version;

pub use bot::Bot;
pub use builder::{Builder, BuilderType, OperatingSystem, StorageMedium};
pub use error::{Error, Result};
pub use event::Event;
pub use loader::{exists, read_manifest, read_manifest_from_file};
pub use manifest::Manifest;
pub use preferences::Preferences;
pub use release::{Release, ReleaseAction};
pub use release_template::ReleaseTemplate;
pub use section::Named;
pub use service::{ReadinessProbe, Service};
pub use stage::Stage;
pub use trigger::{Trigger, TriggerContext};
pub use version::{Version, VersionParams};
