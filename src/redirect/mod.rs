pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::{RedirectState, TRIGGER_HEADER};
pub use routes::create_redirect_router;
