//! # dvhcheck - DVH constraint scorecards
//!
//! dvhcheck checks a radiotherapy plan's dose-volume histogram metrics
//! against a clinical protocol's dose/volume constraints. Protocols are
//! declarative `.scp` files; plan structures are matched to the
//! protocol's canonical ROI names by weighted fuzzy matching with
//! persisted aliases and manual override; each (ROI, constraint) row is
//! evaluated against a cached DVH to a strict pass/fail verdict.
//!
//! ## Modules
//!
//! - [`protocol`] - Protocol constraint repository and file grammar
//! - [`constraint`] - Typed constraint model with derived operators/units
//! - [`aliases`] - Structure alias registry with persistence
//! - [`matching`] - Fuzzy ROI name scoring
//! - [`resolver`] - Plan ROI to template ROI resolution
//! - [`engine`] - Per-row evaluation state machine and session state
//! - [`providers`] - Collaborator traits (plans, structures, DVHs)
//! - [`snapshot`] - JSON snapshot-backed collaborator implementations
//! - [`report`] - Scorecard rendering and JSON export
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use dvhcheck::aliases::AliasRegistry;
//! use dvhcheck::protocol::ProtocolLibrary;
//!
//! let library = ProtocolLibrary::load(Path::new("protocols")).expect("protocols");
//! let registry =
//!     AliasRegistry::load(Path::new("protocols/structure_aliases.csv")).expect("aliases");
//!
//! for protocol in library.protocol_names() {
//!     println!("{}: {:?}", protocol, library.fractionations(&protocol));
//! }
//! println!("{} template ROIs known", registry.template_rois().len());
//! ```

pub mod aliases;
pub mod config;
pub mod constraint;
pub mod engine;
pub mod error;
pub mod matching;
pub mod protocol;
pub mod providers;
pub mod report;
pub mod resolver;
pub mod snapshot;
pub mod ui;

/// Default path constants for the dvhcheck directory layout.
pub mod paths {
    /// Directory containing protocol definition files: `protocols`
    pub const PROTOCOL_DIR: &str = "protocols";
    /// Structure alias persistence file: `protocols/structure_aliases.csv`
    pub const ALIASES_FILE: &str = "protocols/structure_aliases.csv";
    /// Directory scanned for plan snapshot exports: `inbox`
    pub const INBOX_DIR: &str = "inbox";
    /// Project configuration file: `dvhcheck.yml`
    pub const CONFIG_FILE: &str = "dvhcheck.yml";
}

/// Generate a UTC timestamp in ISO 8601 format: `YYYY-MM-DDTHH:MM:SSZ`
pub fn utc_now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
