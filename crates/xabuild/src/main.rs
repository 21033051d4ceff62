fn main() -> anyhow::Result<()> {
    xabuild::run()
}
