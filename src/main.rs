use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use oncall_roster::calendar::{parse_date, parse_month, MonthRange};
use oncall_roster::config::{Config, ConfigOverrides};
use oncall_roster::eligibility::EligibilityCheck;
use oncall_roster::output::csv::{
    conflicts_to_csv, counts_to_csv, doctor_shifts_to_csv, month_table_to_csv, plan_to_csv,
};
use oncall_roster::output::json::{render_json, MonthReport};
use oncall_roster::output::table::{
    render_check_table, render_conflicts_table, render_counts_table, render_doctors_table,
    render_plan_table, render_unassigned_table,
};
use oncall_roster::roster::{Doctor, DoctorId};
use oncall_roster::schedule::summary::{month_table, DoctorShiftCount};
use oncall_roster::schedule::{DistributionPlan, ShiftConflict};
use oncall_roster::server::run_server;
use oncall_roster::store::RosterStore;
use oncall_roster::taxonomy::{parse_shift_types, ShiftType};
use oncall_roster::workflow::{
    assign, check_doctor, clear_month, distribute_month, month_conflicts, month_counts,
    month_records, month_unassigned,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(name = "oncall-roster", about = "Monthly on-call duty distribution")]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Overrides storage.db_path.
    #[arg(long)]
    db: Option<String>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fill the auto-distributed slots of a month.
    Distribute {
        #[arg(long)]
        month: String,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        dry_run: bool,
    },
    Conflicts {
        #[arg(long)]
        month: String,
    },
    Counts {
        #[arg(long)]
        month: String,
    },
    Unassigned {
        #[arg(long)]
        month: String,
    },
    /// Empty every assigned slot of a month.
    Clear {
        #[arg(long)]
        month: String,
    },
    /// Write the month sheet, or one doctor's duties, as CSV.
    Export {
        #[arg(long)]
        month: String,
        #[arg(long)]
        doctor: Option<DoctorId>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Assign {
        #[arg(long)]
        date: String,
        #[arg(long)]
        shift: String,
        /// Comma-separated ids. Empty clears the slot.
        #[arg(long, value_delimiter = ',')]
        doctors: Vec<DoctorId>,
    },
    /// Explain whether a doctor could take a slot.
    Check {
        #[arg(long)]
        doctor: DoctorId,
        #[arg(long)]
        shift: String,
        #[arg(long)]
        date: String,
    },
    Doctor {
        #[command(subcommand)]
        command: DoctorCommand,
    },
    Unavailable {
        #[command(subcommand)]
        command: UnavailableCommand,
    },
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[derive(Debug, Subcommand)]
enum DoctorCommand {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        id: Option<DoctorId>,
        #[arg(long)]
        oa: bool,
        #[arg(long)]
        color: Option<String>,
        /// Shift types the doctor never works, comma-separated.
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,
    },
    List,
    Disable {
        id: DoctorId,
    },
    Enable {
        id: DoctorId,
    },
}

#[derive(Debug, Subcommand)]
enum UnavailableCommand {
    Add {
        #[arg(long)]
        doctor: DoctorId,
        #[arg(long)]
        date: String,
    },
    Remove {
        #[arg(long)]
        doctor: DoctorId,
        #[arg(long)]
        date: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides {
        db_path: cli.db.clone(),
        seed: match &cli.command {
            Commands::Distribute { seed, .. } => *seed,
            _ => None,
        },
    });

    if matches!(cli.command, Commands::Config { .. }) {
        return handle_config_command(&cli.command, &config, &config_path);
    }
    if let Commands::Serve { host, port } = &cli.command {
        let host = host.clone().unwrap_or_else(|| config.server.host.clone());
        let port = port.unwrap_or(config.server.port);
        let bind = format!("{host}:{port}");
        let addr: SocketAddr = bind
            .parse()
            .map_err(|e| anyhow!("invalid bind address {bind}: {e}"))?;
        return run_server(config, addr).await;
    }

    let store = RosterStore::open(&config.resolved_db_path())?;

    match &cli.command {
        Commands::Distribute { month, dry_run, .. } => {
            let month = parse_month(month)?;
            let plan = distribute_month(&store, &config, month, None, *dry_run)?;
            print_plan(month, &plan, &store.list_doctors()?, cli.output)?;
        }
        Commands::Conflicts { month } => {
            let month = parse_month(month)?;
            let conflicts = month_conflicts(&store, month)?;
            print_conflicts(month, &conflicts, &store.list_doctors()?, cli.output)?;
        }
        Commands::Counts { month } => {
            let month = parse_month(month)?;
            print_counts(month, &month_counts(&store, month)?, cli.output)?;
        }
        Commands::Unassigned { month } => {
            let month = parse_month(month)?;
            print_unassigned(month, &month_unassigned(&store, month)?, cli.output)?;
        }
        Commands::Clear { month } => {
            let month = parse_month(month)?;
            let cleared = clear_month(&store, month)?;
            println!("Cleared {cleared} slot(s) in {month}");
        }
        Commands::Export { month, doctor, out } => {
            let month = parse_month(month)?;
            let records = month_records(&store, month)?;
            let data = match doctor {
                Some(id) => doctor_shifts_to_csv(&records, *id)?,
                None => month_table_to_csv(&month_table(month, &records, &store.list_doctors()?))?,
            };
            write_export(out.as_deref(), &data)?;
        }
        Commands::Assign {
            date,
            shift,
            doctors,
        } => {
            let date = parse_date(date)?;
            let shift_type: ShiftType = shift.parse()?;
            warn_if_unstaffed(shift_type, date);
            let record = assign(&store, date, shift_type, doctors.clone())?;
            println!("{}", render_json(&record)?);
        }
        Commands::Check {
            doctor,
            shift,
            date,
        } => {
            let doctors = store.list_doctors()?;
            let target = find_doctor(&doctors, *doctor)?;
            let check = check_doctor(&store, target, shift.parse()?, parse_date(date)?)?;
            print_check(&check, &doctors, cli.output)?;
        }
        Commands::Doctor { command } => handle_doctor_command(&store, command, cli.output)?,
        Commands::Unavailable { command } => match command {
            UnavailableCommand::Add { doctor, date } => {
                let date = parse_date(date)?;
                if !store.add_unavailable_date(*doctor, date)? {
                    warn!(doctor, %date, "date already recorded");
                }
            }
            UnavailableCommand::Remove { doctor, date } => {
                let date = parse_date(date)?;
                if !store.remove_unavailable_date(*doctor, date)? {
                    warn!(doctor, %date, "no such unavailable date");
                }
            }
        },
        Commands::Serve { .. } | Commands::Config { .. } => {}
    }

    Ok(())
}

fn handle_config_command(command: &Commands, config: &Config, config_path: &Path) -> Result<()> {
    let Commands::Config { init, show } = command else {
        return Ok(());
    };
    if *init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if *show || !*init {
        println!("{}", render_json(config)?);
    }
    Ok(())
}

fn handle_doctor_command(
    store: &RosterStore,
    command: &DoctorCommand,
    format: OutputFormat,
) -> Result<()> {
    match command {
        DoctorCommand::Add {
            name,
            id,
            oa,
            color,
            exclude,
        } => {
            let id = match id {
                Some(id) => *id,
                None => store.next_doctor_id()?,
            };
            let mut doctor = Doctor::new(id, name).with_oa(*oa);
            doctor.color = color.clone();
            doctor.unavailable_shift_types = parse_shift_types(exclude.as_slice())?
                .into_iter()
                .collect::<BTreeSet<_>>();
            store.insert_doctor(&doctor)?;
            println!("Added doctor {} ({})", doctor.name, doctor.id);
        }
        DoctorCommand::List => {
            let doctors = store.list_doctors()?;
            match format {
                OutputFormat::Table => println!("{}", render_doctors_table(&doctors)),
                OutputFormat::Json => println!("{}", render_json(&doctors)?),
                OutputFormat::Csv => {
                    warn!("CSV output for doctors not implemented, using JSON");
                    println!("{}", render_json(&doctors)?);
                }
            }
        }
        DoctorCommand::Disable { id } | DoctorCommand::Enable { id } => {
            let disabled = matches!(command, DoctorCommand::Disable { .. });
            if !store.set_doctor_disabled(*id, disabled)? {
                return Err(anyhow!("no doctor with id {id}"));
            }
        }
    }
    Ok(())
}

fn find_doctor(doctors: &[Doctor], id: DoctorId) -> Result<&Doctor> {
    doctors
        .iter()
        .find(|d| d.id == id)
        .ok_or_else(|| anyhow!("no doctor with id {id}"))
}

fn warn_if_unstaffed(shift_type: ShiftType, date: NaiveDate) {
    if !shift_type.is_staffed_on(date) {
        warn!(%shift_type, %date, "slot is not staffed on this day");
    }
}

fn write_export(out: Option<&Path>, data: &str) -> Result<()> {
    match out {
        Some(path) => std::fs::write(path, data)
            .with_context(|| format!("failed writing export: {}", path.display())),
        None => {
            print!("{data}");
            Ok(())
        }
    }
}

fn print_plan(
    month: MonthRange,
    plan: &DistributionPlan,
    doctors: &[Doctor],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!("{}", render_plan_table(plan, doctors));
            println!(
                "{month}: {} filled, {} unfilled (seed {})",
                plan.filled(),
                plan.unfilled(),
                plan.seed
            );
        }
        OutputFormat::Json => println!("{}", render_json(&MonthReport::new(month, plan))?),
        OutputFormat::Csv => print!("{}", plan_to_csv(plan, doctors)?),
    }
    Ok(())
}

fn print_conflicts(
    month: MonthRange,
    conflicts: &[ShiftConflict],
    doctors: &[Doctor],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Table if conflicts.is_empty() => println!("No conflicts in {month}"),
        OutputFormat::Table => println!("{}", render_conflicts_table(conflicts, doctors)),
        OutputFormat::Json => println!("{}", render_json(&MonthReport::new(month, conflicts))?),
        OutputFormat::Csv => print!("{}", conflicts_to_csv(conflicts, doctors)?),
    }
    Ok(())
}

fn print_counts(month: MonthRange, counts: &[DoctorShiftCount], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_counts_table(counts)),
        OutputFormat::Json => println!("{}", render_json(&MonthReport::new(month, counts))?),
        OutputFormat::Csv => print!("{}", counts_to_csv(counts)?),
    }
    Ok(())
}

fn print_unassigned(month: MonthRange, dates: &[NaiveDate], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_unassigned_table(dates)),
        OutputFormat::Json => println!("{}", render_json(&MonthReport::new(month, dates))?),
        OutputFormat::Csv => {
            warn!("CSV output for unassigned not implemented, using JSON");
            println!("{}", render_json(&MonthReport::new(month, dates))?);
        }
    }
    Ok(())
}

fn print_check(check: &EligibilityCheck, doctors: &[Doctor], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_check_table(check, doctors)),
        OutputFormat::Json | OutputFormat::Csv => println!("{}", render_json(check)?),
    }
    Ok(())
}
