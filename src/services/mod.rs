pub mod converter;
pub mod dispatcher;
pub mod invoker;
pub mod render;
pub mod storage;
