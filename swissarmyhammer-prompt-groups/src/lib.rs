//! Prompt grouping engine
//!
//! Organizes entries of an externally owned, ordered list into named, nested
//! groups. The external list stays the single source of truth for order and
//! enabled state; this crate keeps a last-known membership cache per group,
//! computes aggregated enabled/total counts, and translates group-relative
//! moves into order list edits.
//!
//! ## Overview
//!
//! - **Order store** ([`OrderStore`]) - the authoritative list, read and
//!   written through a trait
//! - **Presentation layer** ([`PresentationLayer`]) - what is currently shown,
//!   plus visual side effects with no-op defaults
//! - **Discovery** - membership read from the presentation layer, falling back
//!   to the cache when nothing is shown
//! - **Reconciler** - neighbor-anchored insertion of moved entries
//! - **Modes** - Off, Tray (overlay) and Accordion (inline) presentation
//! - **Toggles** - enable/disable with validation, pending tickets and an
//!   async decision path
//!
//! ## Basic Usage
//!
//! ```rust
//! use swissarmyhammer_prompt_groups::{
//!     GroupsConfig, InMemoryOrderStore, OrderEntry, PresentationLayer, PresentedElement,
//!     GroupId, PromptGroups,
//! };
//!
//! struct Shown;
//!
//! impl PresentationLayer for Shown {
//!     fn elements(&self, _group: &GroupId) -> Vec<PresentedElement> {
//!         vec![PresentedElement::entry("p1", "Opening")]
//!     }
//! }
//!
//! # fn main() -> swissarmyhammer_prompt_groups::Result<()> {
//! let store = InMemoryOrderStore::with_order("chat", vec![OrderEntry::new("p1", true)]);
//! let mut groups = PromptGroups::new(GroupsConfig::default(), store, Shown);
//! let story = groups.create_group("Story", None)?;
//! groups.initialize()?;
//!
//! let counts = groups.get_aggregated_counts(&story)?;
//! assert_eq!((counts.enabled, counts.total), (1, 1));
//! # Ok(())
//! # }
//! ```

pub mod activity;
pub mod aggregate;
pub mod cache;
pub mod config;
pub mod discovery;
pub mod drag;
mod engine;
mod error;
pub mod interaction;
pub mod logging;
pub mod mode;
pub mod presentation;
pub mod reconcile;
pub mod store;
pub mod toggle;
pub mod tree;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use activity::{ActivityLog, MutationRecord, Outcome};
pub use aggregate::Aggregator;
pub use cache::{CacheSlot, GroupCache};
pub use config::{ConfigLoader, GroupsConfig};
pub use discovery::{discover, Discovery, DiscoverySource};
pub use drag::{DragSession, DropAction, DropOutcome, GridDrop, SourceContainer};
pub use engine::PromptGroups;
pub use error::{GroupError, Result};
pub use interaction::{ContextMenu, InteractionSlot};
pub use logging::{init_tracing, Pretty};
pub use mode::{ConvertAction, ModeController, PresentationMode};
pub use presentation::{PresentationLayer, PresentedElement};
pub use reconcile::{OrderReconciler, Reconciled};
pub use store::{InMemoryOrderStore, OrderStore};
pub use toggle::{
    AutoResolution, BlockedEntry, Committed, Decision, DecisionPrompt, DialogDecision,
    GroupToggleReport, IssueKind, MutationGuard, NoValidation, NoopGuard, ToggleCoordinator,
    ToggleOutcome, ToggleResolution, ValidationCollaborator, ValidationIssue,
};
pub use tree::GroupTree;
pub use types::{
    Counts, Entry, EntryId, Group, GroupId, GroupKind, Member, OrderEntry, SubHeaderMarker,
    ToggleTicket,
};
