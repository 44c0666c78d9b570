use super::*;

mod pool;
pub mod template;

#[derive(Debug, Parser)]
pub(crate) enum Subcommand {
    #[command(about = "Run the mining pool")]
    Pool(pool::Pool),
    #[command(about = "Build a job from the daemon's block template and print it")]
    Template(template::Template),
}

impl Subcommand {
    pub(crate) async fn run(self, settings: Settings, cancel_token: CancellationToken) -> Result {
        match self {
            Self::Pool(pool) => pool.run(settings, cancel_token).await,
            Self::Template(template) => template.run(settings).await,
        }
    }
}
