//! Domain classifier implementations

mod keyword;

pub use keyword::KeywordClassifier;
