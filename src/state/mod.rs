pub mod backend;
pub mod messages;
pub mod reveal;
pub mod settings;
