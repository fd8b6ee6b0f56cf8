pub mod aggregate;
pub mod appwrite;
pub mod error;
pub mod extraction;
pub mod fanout;
pub mod pipeline;
pub mod resolver;
pub mod stager;
pub mod storage;
