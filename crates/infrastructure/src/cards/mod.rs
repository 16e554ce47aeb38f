mod static_provider;

pub use static_provider::{CardConfig, StaticCardProvider};
