use anyhow::Result;

fn main() -> Result<()> {
    pathlock_shell::cli::run()
}
