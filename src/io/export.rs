//! CSV export for hourly and yearly simulation results.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::aggregate::YearRecord;
use crate::calendar;
use crate::sim::engine::Scenario;

/// Exports the per-hour records of a simulated scenario to a CSV file.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_hourly_csv(scenario: &Scenario<'_>, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_hourly_csv(scenario, io::BufWriter::new(file))
}

/// Writes per-hour records as CSV to any writer.
///
/// Columns are `year,month,day,hour,power_req`, then five columns per
/// source (capacity, power, energy, reserve, status code), then the
/// scenario shortfall fields and the log line. Output is deterministic for
/// identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_hourly_csv(scenario: &Scenario<'_>, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    let mut header: Vec<String> = ["year", "month", "day", "hour", "power_req"]
        .iter()
        .map(ToString::to_string)
        .collect();
    for source in scenario.sources() {
        for field in ["capacity", "power", "energy", "reserve", "status"] {
            header.push(format!("{}_{field}", source.name));
        }
    }
    for field in [
        "unserved_power_req",
        "sudden_power_drop",
        "unserved_power_drop",
        "load_shed",
        "bess_charge",
        "log",
    ] {
        header.push(field.to_string());
    }
    wtr.write_record(&header)?;

    for at in calendar::iter_hours() {
        let record = scenario.hourly(at);
        let mut row = vec![
            at.year.to_string(),
            at.month.to_string(),
            at.day.to_string(),
            at.hour.to_string(),
            format!("{:.4}", record.power_req),
        ];
        for source in scenario.sources() {
            let cell = source.cell(at);
            row.push(format!("{:.4}", cell.capacity));
            row.push(format!("{:.4}", cell.power_output));
            row.push(format!("{:.4}", cell.energy_output));
            row.push(format!("{:.4}", cell.reserve));
            row.push(format!("{}", cell.status.code()));
        }
        row.push(format!("{:.4}", record.unserved_power_req));
        row.push(format!("{:.4}", record.sudden_power_drop));
        row.push(format!("{:.4}", record.unserved_power_drop));
        row.push(format!("{:.4}", record.load_shed));
        row.push(format!("{:.4}", record.bess_charge_mw));
        row.push(record.log.clone());
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports the yearly records to a CSV file.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_yearly_csv(records: &[YearRecord], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_yearly_csv(records, io::BufWriter::new(file))
}

/// Writes yearly records as CSV to any writer.
///
/// Scenario-level columns first, then four columns per source name
/// (energy, operating-hour fraction, total cost, unit cost). Source
/// columns follow the first record's ordering.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_yearly_csv(records: &[YearRecord], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    let mut header: Vec<String> = [
        "year",
        "total_energy_req_mwh",
        "energy_served_mwh",
        "fulfilment_pct",
        "critical_interruptions",
        "shedding_events",
        "total_cost",
        "unit_cost",
    ]
    .iter()
    .map(ToString::to_string)
    .collect();
    if let Some(first) = records.first() {
        for source in &first.sources {
            for field in ["energy_mwh", "op_fraction", "total_cost", "unit_cost"] {
                header.push(format!("{}_{field}", source.name));
            }
        }
    }
    wtr.write_record(&header)?;

    for record in records {
        let mut row = vec![
            record.year.to_string(),
            format!("{:.4}", record.total_energy_req_mwh),
            format!("{:.4}", record.energy_served_mwh),
            format!("{:.4}", record.fulfilment_pct),
            record.critical_interruptions.to_string(),
            record.shedding_events.to_string(),
            format!("{:.2}", record.total_cost),
            format!("{:.6}", record.unit_cost),
        ];
        for source in &record.sources {
            row.push(format!("{:.4}", source.energy_mwh));
            row.push(format!("{:.6}", source.operation_hour_fraction));
            row.push(format!("{:.2}", source.total_cost));
            row.push(format!("{:.6}", source.unit_cost));
        }
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}
