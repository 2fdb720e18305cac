pub mod dependency;
pub mod metadata;
pub mod pom;
pub mod repository;
pub mod resolver;
pub mod transfer;
pub mod version;
