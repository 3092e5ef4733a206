//! A picture-guessing game bot for Telegram group chats.
//!
//! PicGuessr is a Telegram bot based on [`teloxide`](https://docs.rs/teloxide/latest/teloxide/)
//! framework and [`async_openai`](https://docs.rs/async-openai/latest/async_openai/). It runs
//! small guessing games in group chats:
//!
//! - `/guess`: guess a Chinese idiom from a generated picture;
//! - `/guess_p`: guess a line of classical poetry from a generated picture
//!   (`/guess_p hard` for the less famous ones);
//! - `/guess_emperor`: guess a historical figure from a series of clues.
//!
//! Players answer by replying to the bot. Wrong guesses are answered with a
//! Wordle-style mask, replying "提示" reveals one more character and "答案"
//! gives up. Wins are counted per chat and shown with `/score`.
//!
//! ## Running
//!
//! The `picguessr` binary takes the path of a JSON config:
//!
//! ```shell
//! $ picguessr -c config.json --debug
//! ```
//!
//! `--debug` turns on verbose logs and allows games in private chats. Every
//! config key is listed on [`config::Config`]. To embed the bot in another
//! program, call [`app::run`].

#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate async_trait;

pub mod app;
pub mod config;
mod database;
mod dispatcher;
mod module_mgr;
mod modules;
mod types;
mod utils;
