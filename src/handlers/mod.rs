pub mod auth;
pub mod diagnostics;
pub mod health;
pub mod rooms;
pub mod upload;

pub use auth::*;
pub use diagnostics::*;
pub use health::*;
pub use rooms::*;
pub use upload::*;

#[cfg(test)]
mod tests;
