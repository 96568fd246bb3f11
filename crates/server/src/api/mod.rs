pub mod handlers;
pub mod infohashes;
pub mod middleware;
pub mod peers;
pub mod probe;
pub mod routes;
pub mod stats;

pub use routes::create_router;
