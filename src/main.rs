fn main() -> anyhow::Result<()> {
    fqcheck::cli::run::entry()
}
