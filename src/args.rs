use cle::Result;

use std::{
    env,
    fs,
    path::PathBuf,
};

use anyhow::Context;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InputArgsError {
    #[error("Couldn't parse input arguments: {0}")]
    Parse(String),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

/// Paths to the accounts file and the transactions file, in that order
#[derive(Debug)]
pub struct InputPaths {
    pub accounts: PathBuf,
    pub transactions: PathBuf,
}

pub fn parse_input_args() -> Result<InputPaths> {
    let mut args = env::args().skip(1);

    let accounts = args.next()
        .ok_or_else(|| InputArgsError::Parse("First argument must be the accounts file.".to_string()))?;
    let transactions = args.next()
        .ok_or_else(|| InputArgsError::Parse("Second argument must be the transactions file.".to_string()))?;

    return Ok(InputPaths {
        accounts: canonicalize(accounts)?,
        transactions: canonicalize(transactions)?,
    });
}

fn canonicalize(filename: String) -> Result<PathBuf> {
    let path = fs::canonicalize(filename.clone())
        .with_context(|| InputArgsError::FileNotFound(filename))?;

    Ok(path)
}
