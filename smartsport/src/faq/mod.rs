//! FAQ knowledge base: categories of ordered questions and answers.
//!
//! Everyone may read the catalog; only administrators edit it.

pub mod manager;
pub mod models;

pub use manager::{FaqError, FaqManager, FaqResult};
pub use models::{
    CategoryId, EntryId, FaqCategory, FaqCategoryUpdate, FaqEntry, FaqEntryFilter, FaqEntryUpdate,
    NewFaqCategory, NewFaqEntry,
};
