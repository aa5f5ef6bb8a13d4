pub mod auth;
pub mod boards;
pub mod credentials;
pub mod dispatcher;
pub mod error;
pub mod pins;
pub mod transfer;

pub use auth::AuthStore;
pub use dispatcher::Dispatcher;
pub use error::{Result, StoreError};
pub use pins::PinStore;
