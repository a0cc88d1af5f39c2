use jambo_config::Config;

/// Writes the configuration template to `~/jambo/config.json`. Refuses to
/// overwrite an existing file.
#[derive(Debug, Clone, Copy)]
pub struct InitStrategy;

impl super::CommandStrategy for InitStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        Config::create_config()
    }
}
