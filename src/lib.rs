//! Messaging client core for the SkillSync marketplace: session, REST and
//! realtime plumbing, and the thread/conversation state the desktop shell renders.

pub mod api;
pub mod composer;
pub mod config;
pub mod conversation;
pub mod error;
pub mod jobs;
pub mod messenger;
pub mod model;
pub mod normalize;
pub mod notify;
pub mod realtime;
pub mod route;
pub mod runtime;
pub mod session;
pub mod threads;
pub mod typing;

pub use error::{ClientError, Result};
pub use messenger::{Effect, Messenger};
