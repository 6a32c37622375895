use structopt::StructOpt;

use crate::core::CORE_COUNT;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "multikern",
    about = "Shared-nothing multikernel scheduling simulator"
)]
pub struct MultikernCliArgs {
    #[structopt(short = "c", long = "cores", default_value = "8")]
    /// Number of simulated cores, one kernel instance each
    pub cores: usize,
    #[structopt(short = "s", long = "seed", default_value = "1")]
    /// Base seed for the per-core termination policy RNGs
    pub seed: u64,
    #[structopt(short = "p", long = "processes", default_value = "16")]
    /// Number of processes the scripted scenario creates
    pub processes: usize,
    #[structopt(short = "d", long = "duration", default_value = "2")]
    /// Seconds the scenario lets the schedulers run
    pub duration: u64,
    #[structopt(long = "skip-smp")]
    /// Skip the shared-memory baseline comparison
    pub skip_smp: bool,
}

/// Defaults are mirrored here for use from tests
impl Default for MultikernCliArgs {
    fn default() -> Self {
        Self {
            cores: CORE_COUNT,
            seed: 1,
            processes: 16,
            duration: 2,
            skip_smp: false,
        }
    }
}
