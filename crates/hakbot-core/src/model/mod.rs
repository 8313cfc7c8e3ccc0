mod message;
mod user;

pub use message::{ChatMessage, Role};
pub use user::{validate_email, IssuedSession, User};
