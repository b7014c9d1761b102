//! Retrieval over the hosted vector index

pub mod gateway;

pub use gateway::{IndexHandle, VectorStoreGateway};
