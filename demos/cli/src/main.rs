use std::path::PathBuf;

use anyhow::Context;
use caremodel_core::TransformConfig;
use caremodel_fhir::transform_bundle_str;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "caremodel-cli",
    about = "Derive a patient model from a FHIR JSON bundle."
)]
struct Args {
    /// Path to the FHIR bundle JSON file.
    #[arg(short, long)]
    input: PathBuf,

    /// Print the full patient model as JSON instead of a summary.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let data = std::fs::read_to_string(&args.input)
        .with_context(|| format!("could not read {:?}", args.input))?;

    let config = TransformConfig::default();
    let patient = transform_bundle_str(&data, &config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&patient)?);
        return Ok(());
    }

    println!(
        "Patient: {} (risk score {})",
        patient.profile.name, patient.profile.risk_score
    );
    println!(
        "Conditions: {} | Observations: {} | Medications: {} | Care journeys: {}",
        patient.conditions.len(),
        patient.observations.len(),
        patient.medications.len(),
        patient.care_journeys.len()
    );
    for journey in &patient.care_journeys {
        println!(
            "  [{}] {} (severity {}, {:?} risk)",
            journey.kind, journey.title, journey.severity, journey.risk_level
        );
    }

    Ok(())
}
