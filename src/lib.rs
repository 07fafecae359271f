//! Rust SDK for the Meeple board-game tables API: a typed client for every
//! mobile endpoint plus a session manager owning the sign-in lifecycle and
//! the persisted bearer token.

pub mod errors;
pub mod invite;
pub mod structs;


pub use errors::{user_message, MeepleError};
pub use structs::client::{Client, ClientOptions, DEFAULT_SEARCH_LIMIT};
pub use structs::session::{
    AuthApi, FileTokenStore, MemoryTokenStore, Session, SessionManager, TokenStore,
};
pub use structs::{
    CityCount, InviteCreated, InviteRedeemed, LoginSuccess, Message, MessageAuthor,
    PollWithResults, ProfileUpdate, Table, TableDetail, TableEvent, User,
};
