mod app;
mod cli;
mod config;
mod env;
mod error;
mod executor;
mod fallback;
mod help;
mod llm;
mod ops;
mod prompt;
mod safety;
mod shell;
mod ui;
mod validator;

use anyhow::Result;

fn main() -> Result<()> {
    app::run()
}
