//! `skillpack` binary. Errors print with their cause chain and exit 1.

fn main() -> anyhow::Result<()> {
    skillpack::run()?;
    Ok(())
}
