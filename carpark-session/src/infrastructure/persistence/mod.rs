pub mod memory_repository;
pub mod postgres_repository;
pub mod redis_repository;

pub use memory_repository::InMemorySessionStore;
pub use postgres_repository::PostgresSessionStore;
pub use redis_repository::RedisSessionStore;
