//! Core module - fundamental types and utilities

pub mod allocator;
pub mod category;
pub mod config;
pub mod entity;
pub mod identity;
pub mod mirror;
pub mod project;
pub mod sequence;
pub mod store;

pub use allocator::{allocate, AllocationError, AllocationRequest, Allocator};
pub use category::{AssetCategory, CategoryRegistry};
pub use config::{Config, ConfigError};
pub use entity::{Entity, Numbered};
pub use identity::{DocumentId, DocumentKind, GroupKey, IdParseError, OfficeCode, RecordId};
pub use mirror::{CouncilSnapshot, FileMirror, MirrorBackend, MirrorError};
pub use project::{Project, ProjectError};
pub use sequence::{MemorySequenceStore, SequenceStore, SqliteSequenceStore};
pub use store::{RecordStore, RecordStoreError};
