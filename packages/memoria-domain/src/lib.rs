pub mod entity;
pub mod entry;
pub mod intent;
pub mod relation;
pub mod scope;
pub mod strategy;
pub mod summary;
pub mod time_serde;

pub use entity::{EntityMatch, extract_entities, match_entities};
pub use entry::{EntryKey, EntryPayload, EntrySnapshot, EntryType};
pub use intent::{QueryIntent, QueryRewrite, detect_intent, normalize_query, rewrite_query, search_terms};
pub use relation::{RelationDirection, RelationEdge};
pub use scope::{Scope, ScopeLevel, ScopeType, scope_index};
pub use strategy::SearchStrategy;
pub use summary::{MemberType, Summary, SummaryMember};
