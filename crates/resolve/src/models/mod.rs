mod document;
mod message;
mod update;

pub use self::document::Document;
pub use self::message::Message;
pub use self::update::{MAX_TIMESTAMP, Update};
