//! Storage key names. Each key holds one serialized JSON blob.

/// The signed-in user (credential-free snapshot).
pub const CURRENT_USER: &str = "pinboard_user";

/// Every registered user, credentials included.
pub const USERS: &str = "pinboard_users";

pub const PINS: &str = "pinboard_pins";

pub const BOARDS: &str = "pinboard_boards";
