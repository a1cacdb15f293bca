pub use super::cats::Entity as Cats;
pub use super::logs::Entity as Logs;
pub use super::media::Entity as Media;
pub use super::settings::Entity as Settings;
