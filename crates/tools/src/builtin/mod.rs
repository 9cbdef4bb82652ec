pub mod notice;
pub mod time;
pub mod web_fetch;
