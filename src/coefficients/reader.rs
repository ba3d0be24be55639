//! Parsers for the two text formats coefficient tables are distributed in.
//!
//! The IAGA coefficient format tabulates one `g` or `h` coefficient per row, one column
//! per epoch, and closes each row with the secular variation:
//!
//! ```text
//! # 14th Generation International Geomagnetic Reference Field ...
//! c/s deg ord IGRF IGRF ... IGRF   SV
//! g/h n   m   1900.0 ...   2025.0 2025-30
//! g   1   0   -31543 ...   -29350.0  12.6
//! ```
//!
//! The SHC format carries a parameter line and an epoch line, then rows of `n m values`
//! where a negative order marks an `h` coefficient. It has no secular variation column,
//! so the rate between the last two epochs is used.
use crate::coefficients::table::CoefficientTable;
use crate::coefficients::{num_terms, term_index};
use crate::error::{IgrfError, Result};
use ndarray::{Array1, Array2};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Harmonic {
    G,
    H,
}

/// One parsed coefficient row.
struct Row {
    line: usize,
    harmonic: Harmonic,
    n: usize,
    m: usize,
    values: Vec<f64>,
    secular_variation: Option<f64>,
}

/// Parses a coefficient table, detecting its format from the first non-comment line.
pub fn parse_table(contents: &str) -> Result<CoefficientTable> {
    let first = contents
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .ok_or_else(|| IgrfError::format(0, "no header found"))?;

    if first.starts_with("c/s") || first.starts_with("g/h") {
        parse_coeffs(contents)
    } else {
        parse_shc(contents)
    }
}

/// Looks for "<ordinal> Generation" in a comment line, e.g. "# 13th Generation ...".
fn generation_from_comment(line: &str) -> Option<u32> {
    let words: Vec<&str> = line.trim_start_matches('#').split_whitespace().collect();
    let position = words
        .iter()
        .position(|w| w.eq_ignore_ascii_case("generation"))?;
    let ordinal = words.get(position.checked_sub(1)?)?;
    let digits: String = ordinal.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn parse_number<T: std::str::FromStr>(token: &str, line: usize, what: &str) -> Result<T> {
    token
        .parse::<T>()
        .map_err(|_| IgrfError::format(line, format!("unable to read {what} from '{token}'")))
}

/// Reads the length of the secular variation window from a label such as `2020-25`.
fn secular_variation_window(label: &str, line: usize) -> Result<f64> {
    let (start, end) = label.split_once('-').ok_or_else(|| {
        IgrfError::format(line, format!("last column '{label}' is not a secular variation"))
    })?;
    let start: i32 = parse_number(start, line, "secular variation start")?;
    let end_digits: i32 = parse_number(end, line, "secular variation end")?;
    let end = if end.len() <= 2 {
        let mut end = start - start.rem_euclid(100) + end_digits;
        if end <= start {
            end += 100;
        }
        end
    } else {
        end_digits
    };
    if end <= start {
        Err(IgrfError::format(
            line,
            format!("secular variation window '{label}' is empty"),
        ))?
    }
    Ok((end - start) as f64)
}

fn parse_coeffs(contents: &str) -> Result<CoefficientTable> {
    let mut generation = None;
    let mut header: Option<(Vec<f64>, f64)> = None;
    let mut rows = vec![];

    for (i, raw_line) in contents.lines().enumerate() {
        let line = i + 1;
        let text = raw_line.trim();
        if text.is_empty() {
            continue;
        }
        if text.starts_with('#') {
            generation = generation.or_else(|| generation_from_comment(text));
            continue;
        }
        let tokens: Vec<&str> = text.split_whitespace().collect();
        match tokens[0] {
            "c/s" => continue,
            "g/h" => {
                if header.is_some() {
                    Err(IgrfError::format(line, "duplicate epoch header"))?
                }
                if tokens.len() < 5 {
                    Err(IgrfError::format(
                        line,
                        "epoch header needs at least one epoch and a secular variation column",
                    ))?
                }
                let epochs = tokens[3..tokens.len() - 1]
                    .iter()
                    .map(|t| parse_number::<f64>(t, line, "epoch"))
                    .collect::<Result<Vec<_>>>()?;
                let window = secular_variation_window(tokens[tokens.len() - 1], line)?;
                header = Some((epochs, window));
            }
            flag => {
                let (epochs, _) = header
                    .as_ref()
                    .ok_or_else(|| IgrfError::format(line, "coefficient row before epoch header"))?;
                let harmonic = match flag {
                    "g" => Harmonic::G,
                    "h" => Harmonic::H,
                    _ => Err(IgrfError::format(line, format!("unknown coefficient type '{flag}'")))?,
                };
                let expected = epochs.len() + 4;
                if tokens.len() != expected {
                    Err(IgrfError::format(
                        line,
                        format!("expected {expected} columns, found {}", tokens.len()),
                    ))?
                }
                let values = tokens[3..tokens.len() - 1]
                    .iter()
                    .map(|t| parse_number::<f64>(t, line, "coefficient"))
                    .collect::<Result<Vec<_>>>()?;
                rows.push(Row {
                    line,
                    harmonic,
                    n: parse_number(tokens[1], line, "degree")?,
                    m: parse_number(tokens[2], line, "order")?,
                    values,
                    secular_variation: Some(parse_number(
                        tokens[tokens.len() - 1],
                        line,
                        "secular variation",
                    )?),
                })
            }
        }
    }

    let (epochs, window) = header.ok_or_else(|| IgrfError::format(0, "missing 'g/h n m' epoch header"))?;
    assemble(generation, epochs, window, rows)
}

fn parse_shc(contents: &str) -> Result<CoefficientTable> {
    let mut generation = None;
    let mut parameters: Option<(usize, usize, usize)> = None;
    let mut epochs: Option<Vec<f64>> = None;
    let mut rows = vec![];

    for (i, raw_line) in contents.lines().enumerate() {
        let line = i + 1;
        let text = raw_line.trim();
        if text.is_empty() {
            continue;
        }
        if text.starts_with('#') {
            generation = generation.or_else(|| generation_from_comment(text));
            continue;
        }
        let tokens: Vec<&str> = text.split_whitespace().collect();
        match (parameters, epochs.is_some()) {
            (None, _) => {
                if tokens.len() < 3 {
                    Err(IgrfError::format(
                        line,
                        "parameter line needs N_min, N_max and the number of epochs",
                    ))?
                }
                let n_min: usize = parse_number(tokens[0], line, "minimum degree")?;
                let n_max: usize = parse_number(tokens[1], line, "maximum degree")?;
                let n_times: usize = parse_number(tokens[2], line, "number of epochs")?;
                if n_min != 1 {
                    Err(IgrfError::format(line, format!("tables must start at degree 1, not {n_min}")))?
                }
                if n_times < 2 {
                    Err(IgrfError::format(
                        line,
                        "at least two epochs are needed to derive the secular variation",
                    ))?
                }
                parameters = Some((n_min, n_max, n_times));
            }
            (Some((_, _, n_times)), false) => {
                if tokens.len() != n_times {
                    Err(IgrfError::format(
                        line,
                        format!("expected {n_times} epochs, found {}", tokens.len()),
                    ))?
                }
                epochs = Some(
                    tokens
                        .iter()
                        .map(|t| parse_number::<f64>(t, line, "epoch"))
                        .collect::<Result<Vec<_>>>()?,
                );
            }
            (Some((_, n_max, n_times)), true) => {
                let expected = n_times + 2;
                if tokens.len() != expected {
                    Err(IgrfError::format(
                        line,
                        format!("expected {expected} columns, found {}", tokens.len()),
                    ))?
                }
                let n: usize = parse_number(tokens[0], line, "degree")?;
                let m: i64 = parse_number(tokens[1], line, "order")?;
                if n > n_max {
                    Err(IgrfError::format(
                        line,
                        format!("degree {n} exceeds the declared maximum {n_max}"),
                    ))?
                }
                rows.push(Row {
                    line,
                    harmonic: if m < 0 { Harmonic::H } else { Harmonic::G },
                    n,
                    m: m.unsigned_abs() as usize,
                    values: tokens[2..]
                        .iter()
                        .map(|t| parse_number::<f64>(t, line, "coefficient"))
                        .collect::<Result<Vec<_>>>()?,
                    secular_variation: None,
                });
            }
        }
    }

    let (_, n_max, _) = parameters.ok_or_else(|| IgrfError::format(0, "missing parameter line"))?;
    let epochs = epochs.ok_or_else(|| IgrfError::format(0, "missing epoch line"))?;
    let found_max = rows.iter().map(|r| r.n).max().unwrap_or(0);
    if found_max != n_max {
        Err(IgrfError::format(
            0,
            format!("declared maximum degree {n_max} but rows reach degree {found_max}"),
        ))?
    }
    let last = epochs.len() - 1;
    let window = epochs[last] - epochs[last - 1];
    if !(window > 0.0) {
        Err(IgrfError::format(0, "epochs are not strictly increasing"))?
    }
    for row in rows.iter_mut() {
        row.secular_variation = Some((row.values[last] - row.values[last - 1]) / window);
    }
    assemble(generation, epochs, window, rows)
}

/// Places parsed rows into flat coefficient arrays, checking that every term up to the
/// largest degree is present exactly once.
fn assemble(
    generation: Option<u32>,
    epochs: Vec<f64>,
    window: f64,
    rows: Vec<Row>,
) -> Result<CoefficientTable> {
    let max_degree = rows.iter().map(|r| r.n).max().unwrap_or(0);
    if max_degree == 0 {
        Err(IgrfError::format(0, "no coefficient rows found"))?
    }
    let terms = num_terms(max_degree);
    let mut g = Array2::<f64>::zeros((epochs.len(), terms));
    let mut h = Array2::<f64>::zeros((epochs.len(), terms));
    let mut sv_g = Array1::<f64>::zeros(terms);
    let mut sv_h = Array1::<f64>::zeros(terms);
    let mut seen_g = vec![false; terms];
    let mut seen_h = vec![false; terms];

    for row in rows {
        if row.n == 0 {
            Err(IgrfError::format(row.line, "degree must be at least 1"))?
        }
        if row.m > row.n {
            Err(IgrfError::format(
                row.line,
                format!("order {} exceeds degree {}", row.m, row.n),
            ))?
        }
        if row.harmonic == Harmonic::H && row.m == 0 {
            Err(IgrfError::format(row.line, "h coefficient of order 0"))?
        }
        let i = term_index(row.n, row.m);
        let (values, rates, seen) = match row.harmonic {
            Harmonic::G => (&mut g, &mut sv_g, &mut seen_g),
            Harmonic::H => (&mut h, &mut sv_h, &mut seen_h),
        };
        if seen[i] {
            Err(IgrfError::format(
                row.line,
                format!("duplicate coefficient for n={} m={}", row.n, row.m),
            ))?
        }
        seen[i] = true;
        values.column_mut(i).assign(&Array1::from(row.values));
        rates[i] = row.secular_variation.unwrap_or(0.0);
    }

    for n in 1..=max_degree {
        for m in 0..=n {
            let i = term_index(n, m);
            if !seen_g[i] || (m > 0 && !seen_h[i]) {
                Err(IgrfError::format(
                    0,
                    format!("missing coefficient for n={n} m={m}"),
                ))?
            }
        }
    }

    CoefficientTable::new(generation, epochs, max_degree, g, h, sv_g, sv_h, window)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COEFFS: &str = "\
# 13th Generation International Geomagnetic Reference Field
# test table
c/s deg ord IGRF IGRF SV
g/h n m 2000.0 2005.0 2005-10
g 1 0 -29000.0 -29500.0 10.0
g 1 1 -1700.0 -1600.0 5.0
h 1 1 5000.0 4900.0 -20.0
";

    const SHC: &str = "\
# a two epoch SHC table
1 1 2 2 1
2000.0 2005.0
1 0 -29000.0 -29500.0
1 1 -1700.0 -1600.0
1 -1 5000.0 4900.0
";

    #[test]
    fn reads_coeffs_format() {
        let table = parse_table(COEFFS).unwrap();
        assert_eq!(table.generation(), Some(13));
        assert_eq!(table.epochs(), &[2000.0, 2005.0]);
        assert_eq!(table.max_degree(), 1);
        assert_eq!(table.secular_variation_window(), 5.0);
        assert_eq!(table.coefficient(0, 1, 0), Some((-29000.0, 0.0)));
        assert_eq!(table.coefficient(1, 1, 1), Some((-1600.0, 4900.0)));
        assert_eq!(table.secular_variation(1, 1), Some((5.0, -20.0)));
    }

    #[test]
    fn reads_shc_format() {
        let table = parse_table(SHC).unwrap();
        assert_eq!(table.generation(), None);
        assert_eq!(table.coefficient(1, 1, 1), Some((-1600.0, 4900.0)));
        assert_eq!(table.secular_variation(1, 0), Some((-100.0, 0.0)));
        assert_eq!(table.secular_variation(1, 1), Some((20.0, -20.0)));
        assert_eq!(table.secular_variation_window(), 5.0);
    }

    #[test]
    fn window_labels() {
        assert_eq!(secular_variation_window("2020-25", 1).unwrap(), 5.0);
        assert_eq!(secular_variation_window("2095-00", 1).unwrap(), 5.0);
        assert_eq!(secular_variation_window("2025-2030", 1).unwrap(), 5.0);
        assert!(secular_variation_window("SV", 1).is_err());
    }

    #[test]
    fn generation_comment() {
        assert_eq!(generation_from_comment("# 14th Generation IGRF"), Some(14));
        assert_eq!(generation_from_comment("# nothing here"), None);
    }

    fn format_error_line(contents: &str) -> usize {
        match parse_table(contents) {
            Err(IgrfError::Format { line, .. }) => line,
            other => panic!("expected a format error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_tables() {
        // Missing header
        assert_eq!(format_error_line("g 1 0 1.0 2.0\n"), 1);
        // Wrong number of columns
        assert_eq!(
            format_error_line(&COEFFS.replace("g 1 1 -1700.0 -1600.0 5.0", "g 1 1 -1700.0 5.0")),
            6
        );
        // Non-monotonic epochs
        assert_eq!(
            format_error_line(&COEFFS.replace("2000.0 2005.0 2005-10", "2005.0 2000.0 2005-10")),
            0
        );
        // Missing h(1, 1)
        assert_eq!(format_error_line(&COEFFS.replace("h 1 1 5000.0 4900.0 -20.0\n", "")), 0);
        // Duplicate g(1, 0)
        assert_eq!(
            format_error_line(&format!("{COEFFS}g 1 0 -29000.0 -29500.0 10.0\n")),
            8
        );
        // h of order zero
        assert_eq!(format_error_line(&format!("{COEFFS}h 1 0 1.0 1.0 1.0\n")), 8);
        // Unparsable number
        assert_eq!(format_error_line(&COEFFS.replace("-29500.0", "abc")), 5);
        // SHC epoch count disagrees with the parameter line
        assert_eq!(format_error_line(&SHC.replace("2000.0 2005.0", "2000.0")), 3);
        // Empty file
        assert_eq!(format_error_line("# only a comment\n"), 0);
    }
}
