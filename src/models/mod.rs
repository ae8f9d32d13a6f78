pub mod auth;
pub mod diagnostics;
pub mod error;
pub mod health;
pub mod messages;
pub mod room;
pub mod upload;

pub use auth::*;
pub use diagnostics::*;
pub use error::*;
pub use health::*;
pub use messages::*;
pub use room::*;
pub use upload::*;
