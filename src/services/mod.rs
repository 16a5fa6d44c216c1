pub mod azure_blob;
pub mod blob_store;
pub mod migration;
pub mod repository;
