use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a query request into SQL text and parameters
    Compile {
        #[arg(long, help = "Schema file path (JSON)")]
        schema: String,

        #[arg(long, help = "Query request file path (JSON)")]
        request: String,

        /// Target backend: "postgres", "mysql", "sqlserver", "oracle", "db2", "sqlite"
        #[arg(long)]
        backend: String,

        #[arg(long, help = "Compiler settings file path (JSON)")]
        settings: Option<String>,

        #[arg(long, help = "Treat string comparison on the backend as case-insensitive")]
        case_insensitive: bool,

        #[arg(
            long,
            help = "If specified, writes the compiled query to this file instead of stdout"
        )]
        output: Option<String>,
    },
    /// Compile a request and run it against a SQLite database
    Run {
        #[arg(long, help = "SQLite connection string, e.g. sqlite://data.db")]
        conn_str: String,

        #[arg(long, help = "Schema file path (JSON)")]
        schema: String,

        #[arg(long, help = "Query request file path (JSON)")]
        request: String,

        #[arg(long, help = "Compiler settings file path (JSON)")]
        settings: Option<String>,

        #[arg(
            long,
            help = "If specified, writes the fetched rows to this file instead of stdout"
        )]
        output: Option<String>,
    },
    /// Detect whether a SQLite column compares strings case-insensitively
    Probe {
        #[arg(long, help = "SQLite connection string, e.g. sqlite://data.db")]
        conn_str: String,

        #[arg(long, help = "Reference table")]
        table: String,

        #[arg(long, help = "Reference column holding values with letters")]
        column: String,
    },
}
