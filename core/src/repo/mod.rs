//! Hand-written repository queries over the domain entities (`spec.md` §9:
//! "explicit schema definitions and hand-written query builders").
//!
//! Every repo is a thin wrapper over a shared `PgPool`; none of them
//! hold state of their own, so they are cheap to clone and pass around
//! `axum` handlers via `Arc` or directly in `State`.

mod blocks;
mod conversations;
mod favorites;
mod interactions;
mod matches;
mod messages;
mod outbox;
mod photos;
mod profiles;
mod read_cursors;
mod reports;
mod users;

pub use blocks::BlockRepo;
pub use conversations::ConversationRepo;
pub use favorites::FavoriteRepo;
pub use interactions::{InteractionRepo, UpsertOutcome};
pub use matches::MatchRepo;
pub use messages::{MessageRepo, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use outbox::{backoff_for, OutboxRepo, MAX_DELIVERY_ATTEMPTS};
pub use photos::PhotoRepo;
pub use profiles::{CandidateFilters, ProfileRepo, ProfileUpsert};
pub use read_cursors::ReadCursorRepo;
pub use reports::ReportRepo;
pub use users::UserRepo;

use sqlx::PgPool;

/// Bundle of every repository, built once per service from a shared pool.
#[derive(Clone)]
pub struct Repos {
    pub users: UserRepo,
    pub profiles: ProfileRepo,
    pub photos: PhotoRepo,
    pub interactions: InteractionRepo,
    pub matches: MatchRepo,
    pub favorites: FavoriteRepo,
    pub conversations: ConversationRepo,
    pub messages: MessageRepo,
    pub read_cursors: ReadCursorRepo,
    pub blocks: BlockRepo,
    pub reports: ReportRepo,
    pub outbox: OutboxRepo,
}

impl Repos {
    /// Build every repository over the same pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserRepo::new(pool.clone()),
            profiles: ProfileRepo::new(pool.clone()),
            photos: PhotoRepo::new(pool.clone()),
            interactions: InteractionRepo::new(pool.clone()),
            matches: MatchRepo::new(pool.clone()),
            favorites: FavoriteRepo::new(pool.clone()),
            conversations: ConversationRepo::new(pool.clone()),
            messages: MessageRepo::new(pool.clone()),
            read_cursors: ReadCursorRepo::new(pool.clone()),
            blocks: BlockRepo::new(pool.clone()),
            reports: ReportRepo::new(pool.clone()),
            outbox: OutboxRepo::new(pool),
        }
    }
}
