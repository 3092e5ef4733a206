pub(crate) mod config;
pub(crate) mod games;
pub(crate) mod openai;
pub(crate) mod scores;
