//! hstore - compile dictionary lookups into PostgreSQL hstore SQL

use anyhow::{Context, Result};
use clap::{Parser as ClapParser, Subcommand};
use hstore::{compile_lookup, HStoreDict, Value};
use log::debug;

/// Compile dictionary lookups into hstore SQL and inspect stored forms
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a lookup on a dictionary column as parameterized SQL
    Compile {
        /// Dictionary column the lookup applies to
        #[arg(short, long, default_value = "data")]
        column: String,

        /// Lookup kind: exact, contains, icontains, isnull, gt, gte, lt, lte
        #[arg(short, long)]
        lookup: String,

        /// Lookup operand as JSON
        #[arg(short, long)]
        operand: String,
    },

    /// Print the stored text and hstore literal of a JSON object
    Canonical {
        /// Dictionary as a JSON object
        json: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match args.command {
        Command::Compile {
            column,
            lookup,
            operand,
        } => {
            let json: serde_json::Value =
                serde_json::from_str(&operand).context("Operand is not valid JSON")?;
            debug!("compiling {} lookup on '{}' with {}", lookup, column, json);

            let condition = compile_lookup(&lookup, Value::from(json))
                .with_context(|| format!("Failed to compile '{}' lookup", lookup))?;
            let fragment = condition.to_sql(&column);

            println!("{}", fragment.sql);
            for (i, param) in fragment.params.iter().enumerate() {
                println!("  ${} = {:?}", i + 1, param);
            }
        }
        Command::Canonical { json } => {
            let dict = HStoreDict::from_json(&json).context("Failed to build dictionary")?;
            println!("text:   {}", dict);
            println!("hstore: {}", dict.to_hstore_literal());
        }
    }

    Ok(())
}
