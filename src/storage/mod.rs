/// On-disk content stores
///
/// Feeds, lists, identity documents, cached search pages, and the broadcast
/// journal are all served straight from the filesystem by the public web
/// tier; these stores own the path layout and the line-oriented formats.
pub mod feeds;
pub mod identities;
pub mod journal;
pub mod lists;
pub mod pages;

pub use feeds::FeedStore;
pub use identities::IdentityStore;
pub use journal::BroadcastJournal;
pub use lists::ListStore;
pub use pages::PageStore;
