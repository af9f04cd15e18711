//! Services shared by every LOOP client.

mod database;
mod organisations;
mod retry;

pub use database::DatabaseService;
pub use organisations::OrganisationService;
pub use retry::RetryCoordinator;
