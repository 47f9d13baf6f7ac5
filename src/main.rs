//! # RNC CLI
//!
//! Usage:
//!   rnc record.json -o out.pdf
//!   echo '{ ... }' | rnc --orientation landscape
//!   rnc --example > record.json

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use rnc::{LayoutConfig, Orientation, RenderOptions};

/// Generate a paginated Non-Conformity Record PDF from a JSON form record.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Form record JSON. Read from stdin when omitted.
    input: Option<PathBuf>,

    /// Output file. Defaults to `<document id>.pdf`.
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OrientationArg::Portrait)]
    orientation: OrientationArg,

    /// Layout config JSON; missing fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print a sample record and exit.
    #[arg(long)]
    example: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OrientationArg {
    Portrait,
    Landscape,
}

impl From<OrientationArg> for Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Portrait => Orientation::Portrait,
            OrientationArg::Landscape => Orientation::Landscape,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.example {
        print!("{}", example_record_json());
        return;
    }

    if let Err(e) = run(args) {
        error!("Document generation failed: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let input = match &args.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let config = match &args.config {
        Some(path) => LayoutConfig::from_file(path)?,
        None => LayoutConfig::default(),
    };
    let options = RenderOptions {
        orientation: args.orientation.into(),
        config,
        stamp: None,
    };

    let document = rnc::render_json(&input, &options)?;
    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(&document.file_name));
    fs::write(&output, &document.bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(
        "Written {} ({} page(s), {} bytes)",
        output.display(),
        document.page_count,
        document.bytes.len()
    );
    Ok(())
}

fn example_record_json() -> &'static str {
    r##"{
  "activityStatus": "liberadaRestricao",
  "company": "Construtora Vale do Paraíba Ltda.",
  "contract": "CT-2026/0147",
  "scope": "Implantação de rede coletora de esgoto, trecho 3",
  "location": "Rua das Acácias, entre os números 210 e 480",
  "siteManager": "Eng. Marcos Tavares",
  "ncTypes": ["ses"],
  "natures": ["execucao", "seguranca"],
  "workCategories": ["coletor", "pavimentacao"],
  "grade": "grave",
  "problem": "Vala aberta sem escoramento em profundidade superior a 1,25 m, com acúmulo de material escavado junto à borda. Sinalização viária incompleta no trecho e ausência de passarela para pedestres.",
  "image1Caption": "Vala sem escoramento",
  "image2Caption": "Material junto à borda",
  "disposition": "corrigir",
  "actions": [
    { "action": "Instalar escoramento contínuo conforme projeto", "responsible": "Marcos Tavares", "dueDate": "20/10/2026" },
    { "action": "Afastar o material escavado a no mínimo 0,60 m da borda", "responsible": "Encarregado de turma", "dueDate": "19/10/2026" },
    { "action": "Completar sinalização e instalar passarela", "responsible": "Equipe de segurança", "dueDate": "21/10/2026" }
  ],
  "openingDate": "18/10/2026",
  "closingDate": ""
}
"##
}
