use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Template {
    #[arg(long, help = "Print only the `mining.notify` params.")]
    raw: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Output {
    pub height: u64,
    pub previous_block_hash: String,
    pub bits: String,
    pub target: String,
    pub network_difficulty: f64,
    pub pool_difficulty: f64,
    pub coinbase_value: u64,
    pub coinbase_size: usize,
    pub transactions: usize,
    pub notify: Notify,
}

impl Output {
    fn new(job: &Job) -> Self {
        Self {
            height: job.height(),
            previous_block_hash: job.prev_hash_hex(),
            bits: job.template.bits.clone(),
            target: format!("{:064x}", job.target),
            network_difficulty: job.difficulty,
            pool_difficulty: job.difficulty_adj,
            coinbase_value: job.template.coinbase_value,
            coinbase_size: job.coinbase.coinbase1.len()
                + Extranonce::SIZE
                + EXTRANONCE2_SIZE
                + job.coinbase.coinbase2.len(),
            transactions: job.template.transactions.len(),
            notify: job.notify(true),
        }
    }
}

impl Template {
    pub(crate) async fn run(self, settings: Settings) -> Result {
        let daemon = settings.rpc_client()?;

        let info = daemon.getinfo().await.context("Daemon not ready.")?;

        let template = daemon
            .getblocktemplate()
            .await
            .context("failed to fetch block template")?;

        let job = Job::new(JobId::new(1), template, &settings.job_config(info.testnet))
            .context("failed to build job from block template")?;

        let output = Output::new(&job);

        if self.raw {
            println!("{}", serde_json::to_string(&output.notify)?);
        } else {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Ok(())
    }
}
