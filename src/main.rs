fn main() -> anyhow::Result<()> {
    geosnap::run()?;
    Ok(())
}
