use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "lorchestra",
    about = "Lorchestra: dispatch callables, turn their results into idempotent plans, submit them",
    version
)]
pub struct Cli {
    /// Path to lorchestra.toml (falls back to $LORCHESTRA_CONFIG, then ./lorchestra.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List registered callables and whether they are installed
    Callables {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Invoke one callable and print its result
    Dispatch {
        /// Callable name (or alias)
        name: String,

        /// Parameters as a JSON object
        #[arg(long, default_value = "{}")]
        params: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Invoke a callable and print the plan built from its result
    Plan {
        /// Callable name (or alias)
        name: String,

        /// Correlation ID stamped on the plan
        #[arg(long)]
        correlation_id: String,

        /// Operation method (defaults to [plan].method, then wal.append)
        #[arg(long)]
        method: Option<String>,

        /// Parameters as a JSON object
        #[arg(long, default_value = "{}")]
        params: String,
    },

    /// Dispatch, plan and submit in one step
    Run {
        /// Callable name (or alias)
        name: String,

        /// Correlation ID for the plan and submission metadata
        #[arg(long)]
        correlation_id: String,

        /// Job identifier recorded in submission metadata
        #[arg(long)]
        job_id: Option<String>,

        /// Run identifier recorded in submission metadata
        #[arg(long)]
        run_id: Option<String>,

        /// Step identifier recorded in submission metadata
        #[arg(long)]
        step_id: Option<String>,

        /// Operation method (defaults to [plan].method, then wal.append)
        #[arg(long)]
        method: Option<String>,

        /// Parameters as a JSON object
        #[arg(long, default_value = "{}")]
        params: String,

        /// Append to a local WAL file instead of the configured engine
        #[arg(long)]
        wal: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compute the idempotency key for one item
    Key {
        /// Item as a JSON object
        #[arg(long)]
        item: String,

        /// Operation method
        #[arg(long, default_value = "wal.append")]
        method: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
