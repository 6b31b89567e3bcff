mod commands;

use anyhow::Context;
use care_core::note::{NoteKind, SignOptions};
use care_core::scoring::AldreteComponents;
use care_core::{locale_from_env_value, CoreConfig};
use care_uuid::RecordId;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "care")]
#[command(about = "Clinical scoring and note certification CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cardiovascular risk from a YAML file holding `patient` and `episode`
    CvRisk {
        file: PathBuf,
    },
    /// Obstetric risk of a pregnancy episode stored as YAML
    ObstetricRisk {
        file: PathBuf,
    },
    /// Aldrete recovery score (each component 0-2)
    Aldrete {
        activity: u8,
        respiration: u8,
        circulation: u8,
        consciousness: u8,
        oxygenation: u8,
    },
    /// Fluid balance in mL
    FluidBalance {
        /// Intake volume (repeatable)
        #[arg(long = "in")]
        inputs: Vec<f64>,
        /// Output volume (repeatable)
        #[arg(long = "out")]
        outputs: Vec<f64>,
    },
    /// Gestational age and expected delivery date
    GestationalAge {
        /// Last menstrual period (YYYY-MM-DD)
        #[arg(long)]
        lmp: NaiveDate,
        /// Reference date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        on: Option<NaiveDate>,
    },
    /// Print an empty draft note as YAML
    NewNote {
        /// admission, interconsultation, anesthesia, certificate, discharge or referral
        kind: NoteKind,
        /// Patient id (32 lowercase hex characters)
        #[arg(long)]
        patient: RecordId,
        #[arg(long)]
        author: String,
    },
    /// Sign a draft note stored as YAML
    SignNote {
        file: PathBuf,
        #[arg(long)]
        signer: String,
        /// Accept an Aldrete total below 8
        #[arg(long)]
        acknowledge_low_aldrete: bool,
        /// Write the signed note here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("care=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let locale = locale_from_env_value(std::env::var("CARE_LOCALE").ok())
        .context("invalid CARE_LOCALE")?;
    let cfg = CoreConfig::new(locale);

    let cli = Cli::parse();

    let output = match cli.command {
        Commands::CvRisk { file } => commands::cv_risk(&file, &cfg)?,
        Commands::ObstetricRisk { file } => commands::obstetric_risk(&file, &cfg)?,
        Commands::Aldrete {
            activity,
            respiration,
            circulation,
            consciousness,
            oxygenation,
        } => commands::aldrete(AldreteComponents {
            activity,
            respiration,
            circulation,
            consciousness,
            oxygenation,
        })?,
        Commands::FluidBalance { inputs, outputs } => commands::fluid_balance(&inputs, &outputs)?,
        Commands::GestationalAge { lmp, on } => {
            let on = on.unwrap_or_else(|| chrono::Local::now().date_naive());
            commands::gestational_age(lmp, on)?
        }
        Commands::NewNote {
            kind,
            patient,
            author,
        } => commands::new_note(kind, patient, &author)?,
        Commands::SignNote {
            file,
            signer,
            acknowledge_low_aldrete,
            output,
        } => commands::sign_note(
            &file,
            &signer,
            SignOptions {
                acknowledge_low_aldrete,
            },
            output.as_deref(),
        )?,
    };

    print!("{}", output);
    if !output.ends_with('\n') {
        println!();
    }
    Ok(())
}
