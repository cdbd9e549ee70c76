//! Command implementations.

use anyhow::Result;

use gex::ops::Repository;
use gex::util::cancel::CancelToken;

pub fn add(repo: &Repository, cancel: &CancelToken, specs: &[String]) -> Result<()> {
    repo.add(cancel, specs)?;
    Ok(())
}

pub fn init(repo: &Repository) -> Result<()> {
    repo.init()?;
    Ok(())
}

pub fn build(repo: &Repository, cancel: &CancelToken) -> Result<()> {
    repo.build_all(cancel)?;
    Ok(())
}

pub fn regenerate(repo: &Repository, cancel: &CancelToken) -> Result<()> {
    repo.regenerate(cancel)?;
    Ok(())
}

pub fn list(repo: &Repository) -> Result<()> {
    for tool in repo.list()? {
        println!("{}", tool);
    }
    Ok(())
}

pub fn run(repo: &Repository, cancel: &CancelToken, tool: &str, args: &[String]) -> Result<()> {
    repo.run(cancel, tool, args)?;
    Ok(())
}
