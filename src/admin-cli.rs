//! Operator tool for campus elections.
//! Talks to the same MongoDB database as the server, through the same store
//! and tallying code, so its output always agrees with the API.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufReader};

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use thiserror::Error;

use campus_vote::{
    model::{
        api::results::ElectionResults, common::ElectionId, mongodb::MongoStore,
        store::{EligibleVoterStore, StoreError},
    },
    roster::{parse_roster, RosterError},
    voting::{compute_results, Rejection},
};

const PROGRAM_NAME: &str = "campus-vote-admin";

const ABOUT_TEXT: &str = "Operator tasks for campus elections.

EXIT CODES:
     0: Success.
     1: Error.";

const DB_URI: &str = "DB_URI";
const DB_NAME: &str = "DB_NAME";
const ELECTION_ID: &str = "ELECTION_ID";
const CSV_PATH: &str = "CSV_PATH";

const IMPORT_VOTERS: &str = "import-voters";
const RESULTS: &str = "results";

/// Arguments every subcommand takes.
fn db_args() -> [Arg; 3] {
    [
        Arg::new(DB_URI)
            .long("db-uri")
            .help("MongoDB connection string")
            .action(ArgAction::Set)
            .required(true),
        Arg::new(DB_NAME)
            .long("db-name")
            .help("Database name")
            .action(ArgAction::Set)
            .default_value("campus_vote"),
        Arg::new(ELECTION_ID)
            .help("The election to operate on")
            .value_parser(value_parser!(u32))
            .action(ArgAction::Set)
            .required(true),
    ]
}

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new(IMPORT_VOTERS)
                .about("Import a voter roster CSV (studentId,name[,department]) into an election")
                .args(db_args())
                .arg(
                    Arg::new(CSV_PATH)
                        .help("Path to the roster CSV, with a header row")
                        .action(ArgAction::Set)
                        .required(true),
                ),
        )
        .subcommand(
            Command::new(RESULTS)
                .about("Print the current tally of an election")
                .args(db_args()),
        )
}

/// Errors that this program may produce.
#[derive(Debug, Error)]
enum Error {
    #[error("Failed to open {path}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Rejected(#[from] Rejection),
}

/// Connection details shared by every subcommand.
struct Target<'a> {
    db_uri: &'a str,
    db_name: &'a str,
    election_id: ElectionId,
}

impl<'a> Target<'a> {
    fn from_args(args: &'a ArgMatches) -> Self {
        Self {
            // Required or defaulted, so clap guarantees these are present.
            db_uri: args.get_one::<String>(DB_URI).map_or("", String::as_str),
            db_name: args
                .get_one::<String>(DB_NAME)
                .map_or("campus_vote", String::as_str),
            election_id: args.get_one::<u32>(ELECTION_ID).copied().unwrap_or_default(),
        }
    }

    async fn connect(&self) -> Result<MongoStore, Error> {
        Ok(MongoStore::connect(self.db_uri, self.db_name).await?)
    }
}

async fn import_voters(target: &Target<'_>, csv_path: &str) -> Result<usize, Error> {
    let file = File::open(csv_path).map_err(|source| Error::Io {
        path: csv_path.to_string(),
        source,
    })?;
    let voters = parse_roster(BufReader::new(file), target.election_id)?;
    let store = target.connect().await?;
    let created = store.bulk_create_eligible_voters(voters).await?;
    Ok(created.len())
}

async fn results(target: &Target<'_>) -> Result<ElectionResults, Error> {
    let store = target.connect().await?;
    Ok(compute_results(&store, target.election_id).await?)
}

/// Render results for a terminal.
fn format_results(results: &ElectionResults) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "{} (election {})", results.election_title, results.election_id);
    let _ = writeln!(
        out,
        "Turnout: {}% ({} of {} eligible voters)",
        results.voter_turnout, results.total_votes_cast, results.total_eligible_voters
    );
    for position in &results.position_results {
        let _ = writeln!(
            out,
            "\n{} ({} vote{})",
            position.position_title,
            position.total_votes,
            if position.total_votes != 1 { "s" } else { "" }
        );
        for candidate in &position.results {
            let marker = if position.winner == Some(candidate.candidate_id) {
                " [winner]"
            } else {
                ""
            };
            let _ = writeln!(
                out,
                "  {}: {} vote{} ({}%){marker}",
                candidate.candidate_name,
                candidate.votes,
                if candidate.votes != 1 { "s" } else { "" },
                candidate.percentage
            );
        }
    }
    out
}

/// Render an error followed by each of its causes.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(message, ": {cause}");
        source = cause.source();
    }
    message
}

/// Run the program, returning the exit code.
fn run(args: &ArgMatches) -> u8 {
    let runtime = match rocket::tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Failed to start async runtime: {err}");
            return 1;
        }
    };

    let result = match args.subcommand() {
        Some((IMPORT_VOTERS, sub_args)) => {
            let target = Target::from_args(sub_args);
            let csv_path = sub_args.get_one::<String>(CSV_PATH).map_or("", String::as_str);
            runtime
                .block_on(import_voters(&target, csv_path))
                .map(|count| format!("{count} voters imported successfully"))
        }
        Some((RESULTS, sub_args)) => {
            let target = Target::from_args(sub_args);
            runtime
                .block_on(results(&target))
                .map(|results| format_results(&results))
        }
        _ => {
            eprintln!("Unknown subcommand");
            return 1;
        }
    };

    match result {
        Ok(output) => {
            println!("{output}");
            0
        }
        Err(err) => {
            eprintln!("Error: {}", error_chain(&err));
            1
        }
    }
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}
