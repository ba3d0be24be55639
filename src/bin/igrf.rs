use chrono::{NaiveDate, NaiveDateTime};
use clap::Parser;
use igrfield::{igrf, CoefficientTable, Config, ModelDate, TableSelector};
use std::fs;
use std::path::PathBuf;
use tracing::info;

pub type BinResult<T, E = Box<dyn std::error::Error + Send + Sync>> = Result<T, E>;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = bin_main() {
        eprintln!("error: {e}");
        if let Some(e) = e.source() {
            eprintln!("error: {e}");
        }
        std::process::exit(1);
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Evaluate the IGRF at geodetic positions", long_about = None)]
struct Args {
    /// Longitude in degrees
    #[arg(allow_negative_numbers = true, requires_all = ["latitude", "altitude"], conflicts_with = "input")]
    longitude: Option<f64>,

    /// Geodetic latitude in degrees
    #[arg(allow_negative_numbers = true)]
    latitude: Option<f64>,

    /// Altitude above the WGS84 ellipsoid in km
    #[arg(allow_negative_numbers = true)]
    altitude: Option<f64>,

    /// Date as YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS
    #[arg(long, conflicts_with = "year", required_unless_present = "year")]
    date: Option<String>,

    /// Date as a fractional year
    #[arg(long)]
    year: Option<f64>,

    /// Coefficient table generation to use
    #[arg(long, default_value_t = TableSelector::default())]
    table: TableSelector,

    /// Directory holding the coefficient files, overriding IGRF_COEFF_DIR
    #[arg(long, conflicts_with = "coeff_file")]
    coeff_dir: Option<PathBuf>,

    /// Explicit coefficient file in IAGA or SHC format
    #[arg(long)]
    coeff_file: Option<PathBuf>,

    /// Whitespace separated file of "longitude latitude altitude" lines
    #[arg(long, short)]
    input: Option<PathBuf>,
}

fn parse_date(date: &str) -> BinResult<ModelDate> {
    if let Ok(datetime) = NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S") {
        return Ok(datetime.into());
    }
    Ok(NaiveDate::parse_from_str(date, "%Y-%m-%d")?.into())
}

fn read_positions(path: &PathBuf) -> BinResult<(Vec<f64>, Vec<f64>, Vec<f64>)> {
    let contents = fs::read_to_string(path)?;
    let (mut lon, mut lat, mut alt) = (vec![], vec![], vec![]);
    for (i, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let values = line
            .split_whitespace()
            .map(str::parse::<f64>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("line {}: {e}", i + 1))?;
        if values.len() != 3 {
            Err(format!("line {}: expected 3 values, found {}", i + 1, values.len()))?
        }
        lon.push(values[0]);
        lat.push(values[1]);
        alt.push(values[2]);
    }
    Ok((lon, lat, alt))
}

fn bin_main() -> BinResult<()> {
    let args = Args::parse();

    let date = match (&args.date, args.year) {
        (Some(date), _) => parse_date(date)?,
        (None, Some(year)) => ModelDate::from(year),
        (None, None) => Err("either --date or --year is required")?,
    };

    let table = match (&args.coeff_file, &args.coeff_dir) {
        (Some(file), _) => CoefficientTable::from_path(file)?,
        (None, Some(dir)) => CoefficientTable::load(args.table, &Config::new(dir))?,
        (None, None) => CoefficientTable::load(args.table, &Config::from_env())?,
    };

    let (lon, lat, alt) = match (&args.input, args.longitude, args.latitude, args.altitude) {
        (Some(path), ..) => read_positions(path)?,
        (None, Some(lon), Some(lat), Some(alt)) => (vec![lon], vec![lat], vec![alt]),
        _ => Err("give either a position or --input")?,
    };
    info!(positions = lon.len(), "evaluating");

    let field = igrf(&lon, &lat, &alt, date, &table)?;
    for (i, vector) in field.iter().enumerate() {
        println!(
            "{:.4} {:.4} {:.3} {:.1} {:.1} {:.1}",
            lon[i], lat[i], alt[i], vector.east, vector.north, vector.up
        );
    }
    Ok(())
}
