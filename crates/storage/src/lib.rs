#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    ActivityResultRepository, InMemoryRepository, LearningEventRepository, Storage, StorageError,
};
