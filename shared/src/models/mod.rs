mod responses;
mod tree;
mod user;

pub use responses::{ExistsResponse, RegisterResponse, TreeResponse, UserLookupResponse};
pub use tree::{Forest, InvitationNode};
pub use user::{RegistrationRequest, User};
