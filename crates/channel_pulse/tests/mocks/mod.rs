pub mod extractor;
pub mod feed;
pub mod storage;
pub mod strategy;
