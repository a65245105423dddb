//! Service Layer
//!
//! Entry points for transports: federation flow, intent tokens and user
//! request mapping. Everything here delegates to [`Commands`](crate::operations::Commands).

pub mod federation;
pub mod intent_token;
pub mod user;

pub use federation::{FederationService, IdpInformation, StartedFlow};
pub use intent_token::{check_intent_token, issue_intent_token};
pub use user::{
    add_user_request_to_add_human, hashed_password_to_command, AddUserRequest, EmailVerification, HashedPassword,
    ProfileRequest, UserService,
};
