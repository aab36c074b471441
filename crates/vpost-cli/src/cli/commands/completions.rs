//! `vpost completions` and `vpost man`.

use anyhow::Result;
use clap_complete::Shell;
use std::io;

pub fn run_completions(shell: Shell) -> Result<()> {
    let mut cmd = crate::cli::command();
    clap_complete::generate(shell, &mut cmd, "vpost", &mut io::stdout());
    Ok(())
}

pub fn run_man() -> Result<()> {
    let man = clap_mangen::Man::new(crate::cli::command());
    man.render(&mut io::stdout())?;
    Ok(())
}
