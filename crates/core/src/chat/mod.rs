mod room;
mod worker;

pub use room::{ChatEvent, ChatRoom, ChatRoomRegistry};
pub use worker::{ChatErrorPolicy, ChatWorker, SendOutcome};
