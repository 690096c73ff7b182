pub mod auth;
pub mod client;
pub mod dry_run;
pub mod types;

pub use auth::VenueAuth;
pub use client::{VenueClient, VenueError};
pub use dry_run::DryRunExecutor;
