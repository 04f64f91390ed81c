use std::{
    error::Error,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use mtk_ledger::{
    Account, Amount, Ledger, LedgerConfig, LedgerError, LedgerEvent, Operation, Receipt,
};

#[derive(Parser)]
#[command(name = "mtk", version, about = "MyToken ledger: deploy and replay scripted calls")]
struct Cli {
    /// Ledger config (JSON). Built-in defaults when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the genesis ledger and print a deployment summary
    Deploy,
    /// Execute a JSON array of operations against a freshly deployed ledger
    Run {
        script: PathBuf,
        /// Stop at the first reverted call (exit status 1)
        #[arg(long)]
        fail_fast: bool,
        /// Print the final ledger snapshot
        #[arg(long)]
        snapshot: bool,
    },
    /// Write the default config as pretty JSON
    InitConfig { path: PathBuf },
}

#[derive(Serialize)]
struct Deployment<'a> {
    name: &'a str,
    symbol: &'a str,
    decimals: u8,
    issuer: Account,
    total_supply: Amount,
    total_supply_units: String,
    state_root: String,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum CallOutcome<'a> {
    Ok {
        call: usize,
        op: &'a str,
        height: u64,
        events: Vec<LedgerEvent>,
    },
    Reverted {
        call: usize,
        op: &'a str,
        reason: String,
    },
}

fn deploy_cmd(config: &LedgerConfig) -> Result<ExitCode, Box<dyn Error>> {
    tracing::info!(account = %config.genesis.holder, "deploying ledger");
    let ledger = config.build_ledger()?;
    let meta = ledger.metadata();
    let supply = ledger.total_supply();
    let summary = Deployment {
        name: &meta.name,
        symbol: &meta.symbol,
        decimals: meta.decimals,
        issuer: ledger.issuer(),
        total_supply_units: supply.format_units(meta.decimals),
        total_supply: supply,
        state_root: hex::encode(ledger.state_root()),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(ExitCode::SUCCESS)
}

fn call_outcome<'a>(
    call: usize,
    op: &'a Operation,
    result: Result<Receipt, LedgerError>,
    token_name: &str,
) -> CallOutcome<'a> {
    match result {
        Ok(receipt) => CallOutcome::Ok {
            call,
            op: op.name(),
            height: receipt.height,
            events: receipt.events,
        },
        Err(err) => CallOutcome::Reverted {
            call,
            op: op.name(),
            reason: format!("{token_name}: {err}"),
        },
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ReplaySummary {
    applied: usize,
    reverted: usize,
    stopped_early: bool,
}

impl ReplaySummary {
    fn exit_status(&self) -> u8 {
        u8::from(self.stopped_early)
    }
}

/// Executes `ops` in order, writing one JSON line per call to `out`.
fn replay(
    ledger: &mut Ledger,
    ops: &[Operation],
    fail_fast: bool,
    out: &mut impl Write,
) -> Result<ReplaySummary, Box<dyn Error>> {
    let mut summary = ReplaySummary::default();
    for (call, op) in ops.iter().enumerate() {
        let result = ledger.execute(op);
        let outcome = call_outcome(call, op, result, ledger.name());
        writeln!(out, "{}", serde_json::to_string(&outcome)?)?;
        match outcome {
            CallOutcome::Ok { .. } => summary.applied += 1,
            CallOutcome::Reverted { .. } => {
                summary.reverted += 1;
                if fail_fast {
                    summary.stopped_early = true;
                    break;
                }
            }
        }
    }
    Ok(summary)
}

fn run_cmd(
    config: &LedgerConfig,
    script: &Path,
    fail_fast: bool,
    snapshot: bool,
) -> Result<ExitCode, Box<dyn Error>> {
    let raw = fs::read_to_string(script)?;
    let ops: Vec<Operation> = serde_json::from_str(&raw)?;
    let mut ledger = config.build_ledger()?;
    tracing::info!(calls = ops.len(), script = %script.display(), "replaying script");

    let summary = replay(&mut ledger, &ops, fail_fast, &mut io::stdout().lock())?;
    tracing::info!(
        applied = summary.applied,
        reverted = summary.reverted,
        height = ledger.height(),
        "script finished"
    );
    if summary.stopped_early {
        return Ok(ExitCode::from(summary.exit_status()));
    }
    if snapshot {
        println!("{}", serde_json::to_string_pretty(&ledger.snapshot())?);
    }
    Ok(ExitCode::SUCCESS)
}

fn init_config_cmd(path: &Path) -> Result<ExitCode, Box<dyn Error>> {
    LedgerConfig::default().save(path)?;
    eprintln!("wrote {}", path.display());
    Ok(ExitCode::SUCCESS)
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn Error>> {
    let load = || LedgerConfig::load_or_default(cli.config.as_deref());
    match &cli.command {
        Command::Deploy => deploy_cmd(&load()?),
        Command::Run {
            script,
            fail_fast,
            snapshot,
        } => run_cmd(&load()?, script, *fail_fast, *snapshot),
        Command::InitConfig { path } => init_config_cmd(path),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn acct(b: u8) -> Account {
        Account::new([b; 20])
    }

    fn lines(out: &[u8]) -> Vec<Value> {
        std::str::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    fn calls() -> Vec<Operation> {
        vec![
            Operation::Transfer {
                caller: acct(0xd0),
                to: acct(0xa1),
                amount: Amount::from(100u64),
            },
            Operation::BatchTransfer {
                caller: acct(0xd0),
                recipients: vec![],
                amounts: vec![],
            },
            Operation::BatchTransfer {
                caller: acct(0xd0),
                recipients: vec![acct(0xa1), acct(0xb2)],
                amounts: vec![Amount::from(1u64)],
            },
            Operation::Mint {
                caller: acct(0xd0),
                to: acct(0xb2),
                amount: Amount::from(5u64),
            },
        ]
    }

    #[test]
    fn reverted_call_carries_token_prefixed_reason() {
        let op = &calls()[1];
        let outcome = call_outcome(1, op, Err(LedgerError::EmptyBatch), "MyToken");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "reverted");
        assert_eq!(json["call"], 1);
        assert_eq!(json["op"], "batch_transfer");
        assert_eq!(json["reason"], "MyToken: empty arrays");
    }

    #[test]
    fn ok_call_lists_height_and_events() {
        let ops = calls();
        let mut ledger = Ledger::deploy(Amount::from(1_000u64), acct(0xd0));
        let result = ledger.execute(&ops[0]);
        let json = serde_json::to_value(call_outcome(0, &ops[0], result, ledger.name())).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["op"], "transfer");
        assert_eq!(json["height"], 1);
        assert_eq!(json["events"][0]["type"], "transfer");
        assert_eq!(json["events"][0]["to"], acct(0xa1).to_string());
        assert_eq!(json["events"][0]["amount"], "100");
    }

    #[test]
    fn replay_continues_past_reverts_by_default() {
        let mut ledger = Ledger::deploy(Amount::from(1_000u64), acct(0xd0));
        let mut out = Vec::new();
        let summary = replay(&mut ledger, &calls(), false, &mut out).unwrap();
        assert_eq!(
            summary,
            ReplaySummary {
                applied: 2,
                reverted: 2,
                stopped_early: false,
            }
        );
        assert_eq!(summary.exit_status(), 0);

        let lines = lines(&out);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1]["reason"], "MyToken: empty arrays");
        assert_eq!(lines[2]["reason"], "MyToken: arrays length mismatch");
        assert_eq!(lines[3]["status"], "ok");
        assert_eq!(lines[3]["height"], 2);
        assert_eq!(ledger.height(), 2);
    }

    #[test]
    fn fail_fast_stops_at_first_revert() {
        let mut ledger = Ledger::deploy(Amount::from(1_000u64), acct(0xd0));
        let mut out = Vec::new();
        let summary = replay(&mut ledger, &calls(), true, &mut out).unwrap();
        assert!(summary.stopped_early);
        assert_eq!(summary.exit_status(), 1);
        assert_eq!((summary.applied, summary.reverted), (1, 1));

        let lines = lines(&out);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["status"], "reverted");
        assert_eq!(lines[1]["call"], 1);
        // the mint after the revert never ran
        assert!(ledger.balance_of(&acct(0xb2)).is_zero());
        assert_eq!(ledger.height(), 1);
    }
}
