pub mod directory;
pub mod messages;
pub mod pool;
pub mod schema;
