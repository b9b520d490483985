pub mod fixtures;
pub mod mocks;

#[allow(unused_imports)]
pub use fixtures::{Fixture, item};
#[allow(unused_imports)]
pub use mocks::{FlakyAssetStore, InstrumentedContentStore};
