//! Domain entities (`spec.md` §3).

mod block;
mod conversation;
mod favorite;
mod interaction;
mod match_;
mod message;
mod outbox;
mod photo;
mod profile;
mod read_cursor;
mod report;
mod user;

pub use block::Block;
pub use conversation::Conversation;
pub use favorite::{Favorite, MAX_FAVORITES_PER_USER};
pub use interaction::{Interaction, InteractionKind};
pub use match_::Match;
pub use message::{ContentType, Message, MAX_CONTENT_BYTES};
pub use outbox::OutboxEvent;
pub use photo::{Photo, PhotoStatus};
pub use profile::{AllowMessagesFrom, Education, Gender, Goal, Orientation, Profile};
pub use read_cursor::ReadCursor;
pub use report::Report;
pub use user::User;
