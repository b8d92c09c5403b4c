// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use chrono::{Days, NaiveDate};
use circulation_rs::{
    BookCopy, Catalog, CatalogKey, Category, CirculationConfig, CirculationError, ManualClock,
    Money,
};
use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Circulation replay - Run lending commands against a catalog
///
/// Loads copies from a catalog CSV, replays a command CSV against a simulated
/// clock, and writes the final state of every copy to stdout.
#[derive(Parser, Debug)]
#[command(name = "circulation-rs")]
#[command(about = "Replays borrow/return/reserve/fine commands against a catalog", long_about = None)]
struct Args {
    /// Path to CSV file with copies
    ///
    /// Expected format: key,title,author,year,category
    #[arg(value_name = "CATALOG")]
    catalog: PathBuf,

    /// Path to CSV file with commands
    ///
    /// Expected format: day,command,title,person,value
    /// Example: cargo run -- catalog.csv commands.csv > copies.csv
    #[arg(value_name = "COMMANDS")]
    commands: PathBuf,

    /// Display name of the catalog
    #[arg(long, default_value = "Library")]
    name: String,

    /// Fine charged per overdue day
    #[arg(long, env = "CIRCULATION_RATE_PER_DAY", default_value = "0.50")]
    rate_per_day: Money,

    /// Maximum fine for a single loan
    #[arg(long, env = "CIRCULATION_MAX_FINE", default_value = "25.00")]
    max_fine: Money,

    /// Default loan period in days
    #[arg(long, env = "CIRCULATION_LOAN_DAYS", default_value_t = 14)]
    loan_days: u32,

    /// Calendar date of day 0 in the command file
    #[arg(long, default_value = "2025-01-01")]
    start_date: NaiveDate,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("circulation_rs=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = CirculationConfig {
        rate_per_day: args.rate_per_day,
        max_fine: args.max_fine,
        loan_days: args.loan_days,
    };
    let clock = Arc::new(ManualClock::starting_on(args.start_date));
    let catalog = match Catalog::with_config(&args.name, &config, clock.clone()) {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };
    tracing::info!(name = catalog.name(), policy = %catalog.policy(), "catalog ready");

    let result = open(&args.catalog)
        .and_then(|file| load_catalog(file, &catalog))
        .and_then(|_| open(&args.commands))
        .and_then(|file| replay_commands(file, &catalog, &clock, args.start_date));
    if let Err(e) = result {
        tracing::error!("Error processing input: {}", e);
        process::exit(1);
    }

    if let Err(e) = write_copies(&catalog, std::io::stdout()) {
        tracing::error!("Error writing output: {}", e);
        process::exit(1);
    }
}

fn open(path: &Path) -> Result<BufReader<File>, csv::Error> {
    File::open(path).map(BufReader::new).map_err(|e| {
        tracing::error!("Error opening file '{}': {}", path.display(), e);
        csv::Error::from(e)
    })
}

fn reader_builder() -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder
        .trim(Trim::All) // Handle whitespace in fields like " borrow "
        .flexible(true) // Allow trailing optional columns to be omitted
        .has_headers(true);
    builder
}

/// Raw catalog CSV record.
///
/// Fields: `key, title, author, year, category`
#[derive(Debug, Deserialize)]
struct CatalogRecord {
    key: String,
    title: String,
    author: String,
    year: i32,
    category: String,
}

impl CatalogRecord {
    fn into_copy(self) -> Result<BookCopy, CirculationError> {
        BookCopy::new(
            CatalogKey::new(&self.key)?,
            &self.title,
            &self.author,
            self.year,
            self.category.parse::<Category>()?,
        )
    }
}

/// Loads copies from a catalog CSV into `catalog`.
///
/// Invalid rows and duplicate keys are logged and skipped. Returns the number
/// of copies added.
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the CSV structure is invalid.
pub fn load_catalog<R: Read>(reader: R, catalog: &Catalog) -> Result<usize, csv::Error> {
    let mut rdr = reader_builder().from_reader(reader);
    let mut added = 0;

    for result in rdr.deserialize::<CatalogRecord>() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Skipping malformed catalog row: {}", e);
                continue;
            }
        };

        let key = record.key.clone();
        match record.into_copy() {
            Ok(copy) => {
                if catalog.add(copy) {
                    added += 1;
                } else {
                    tracing::warn!(%key, "Skipping duplicate catalog key");
                }
            }
            Err(e) => tracing::warn!(%key, "Skipping invalid copy: {}", e),
        }
    }

    Ok(added)
}

/// Raw command CSV record.
///
/// Fields: `day, command, title, person, value`
#[derive(Debug, Deserialize)]
struct CommandRecord {
    day: u64,
    command: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    person: Option<String>,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Borrow {
        title: String,
        person: String,
        days: Option<u32>,
    },
    Return {
        title: String,
    },
    Reserve {
        title: String,
        person: String,
    },
    Cancel {
        title: String,
        person: String,
    },
    Assess {
        title: String,
    },
    AssessAll,
    Pay {
        title: String,
        amount: Money,
    },
    Waive {
        title: String,
        reason: String,
    },
    Rate {
        title: String,
        rating: f64,
    },
}

impl CommandRecord {
    /// Converts a CSV record to a command.
    ///
    /// Returns `None` for unknown commands or missing required fields.
    fn into_command(self) -> Option<Command> {
        let title = self.title;
        let person = self.person;
        let value = self.value;

        match self.command.to_lowercase().as_str() {
            "borrow" => Some(Command::Borrow {
                title: title?,
                person: person?,
                days: match value {
                    Some(days) => Some(days.parse().ok()?),
                    None => None,
                },
            }),
            "return" => Some(Command::Return { title: title? }),
            "reserve" => Some(Command::Reserve {
                title: title?,
                person: person?,
            }),
            "cancel" => Some(Command::Cancel {
                title: title?,
                person: person?,
            }),
            "assess" => Some(Command::Assess { title: title? }),
            "assess-all" => Some(Command::AssessAll),
            "pay" => Some(Command::Pay {
                title: title?,
                amount: value?.parse().ok()?,
            }),
            "waive" => Some(Command::Waive {
                title: title?,
                reason: value?,
            }),
            "rate" => Some(Command::Rate {
                title: title?,
                rating: value?.parse().ok()?,
            }),
            _ => None,
        }
    }
}

impl Command {
    fn apply(&self, catalog: &Catalog) -> Result<bool, CirculationError> {
        match self {
            Self::Borrow { title, person, days } => match days {
                Some(days) => catalog.borrow_for(title, person, *days),
                None => catalog.borrow(title, person),
            },
            Self::Return { title } => catalog.return_copy(title),
            Self::Reserve { title, person } => catalog.reserve(title, person),
            Self::Cancel { title, person } => catalog.cancel_reservation(title, person),
            Self::Assess { title } => catalog.assess_fine(title),
            Self::AssessAll => Ok(catalog.assess_all_fines() > 0),
            Self::Pay { title, amount } => catalog.pay_fine(title, *amount),
            Self::Waive { title, reason } => catalog.waive_fine(title, reason),
            Self::Rate { title, rating } => catalog.rate(title, *rating),
        }
    }
}

/// Replays commands from a CSV reader.
///
/// Before each row the clock is moved to `start_date + day`. Days must not
/// decrease; malformed rows, unknown commands, rows that would move the clock
/// backwards, and rejected operations are logged and skipped.
///
/// # CSV Format
///
/// Expected columns: `day, command, title, person, value`
/// - `day`: Days since `start_date`
/// - `command`: borrow, return, reserve, cancel, assess, assess-all, pay, waive, rate
/// - `title`: Copy title (not needed for assess-all)
/// - `person`: Borrower or requester (borrow, reserve, cancel)
/// - `value`: Loan days (borrow, optional), amount (pay), reason (waive), rating (rate)
///
/// # Example
///
/// ```csv
/// day,command,title,person,value
/// 0,borrow,1984,Alice,1
/// 1,reserve,1984,Bob,
/// 6,assess,1984,,
/// 6,pay,1984,,2.50
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the CSV structure is invalid.
pub fn replay_commands<R: Read>(
    reader: R,
    catalog: &Catalog,
    clock: &ManualClock,
    start_date: NaiveDate,
) -> Result<(), csv::Error> {
    let mut rdr = reader_builder().from_reader(reader);
    let mut last_day = 0;

    for result in rdr.deserialize::<CommandRecord>() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Skipping malformed command row: {}", e);
                continue;
            }
        };

        let day = record.day;
        if day < last_day {
            tracing::warn!(day, last_day, "Skipping command that would move the clock backwards");
            continue;
        }
        let Some(command) = record.into_command() else {
            tracing::warn!(day, "Skipping invalid command record");
            continue;
        };

        match start_date.checked_add_days(Days::new(day)) {
            Some(date) => {
                clock.set_date(date);
                last_day = day;
            }
            None => {
                tracing::warn!(day, "Skipping command with out-of-range day");
                continue;
            }
        }

        match command.apply(catalog) {
            Ok(true) => tracing::debug!(day, ?command, "applied"),
            Ok(false) => tracing::info!(day, ?command, "not applicable"),
            Err(e) => tracing::warn!(day, ?command, "rejected: {}", e),
        }
    }

    Ok(())
}

/// Flat CSV view of a copy.
#[derive(Debug, Serialize)]
struct CopyRow {
    key: String,
    title: String,
    status: &'static str,
    holder: Option<String>,
    due_date: Option<NaiveDate>,
    reservations: String,
    read_count: u32,
    rating: f64,
    days_overdue: u64,
    fine_due: Option<Money>,
    fine_paid: Option<Money>,
    fine_state: Option<&'static str>,
}

/// Write copy states to a CSV writer, ordered by key.
///
/// # CSV Format
///
/// Columns: `key, title, status, holder, due_date, reservations, read_count,
/// rating, days_overdue, fine_due, fine_paid, fine_state`
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_copies<W: Write>(catalog: &Catalog, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    for snapshot in catalog.snapshots() {
        let fine = snapshot.fine.as_ref();
        wtr.serialize(CopyRow {
            key: snapshot.key.to_string(),
            title: snapshot.title.clone(),
            status: if snapshot.holder().is_some() { "held" } else { "available" },
            holder: snapshot.holder().map(str::to_string),
            due_date: snapshot.due_date(),
            reservations: snapshot.reservations.join(";"),
            read_count: snapshot.read_count,
            rating: snapshot.rating,
            days_overdue: snapshot.days_overdue,
            fine_due: fine.map(|fine| fine.amount_due()),
            fine_paid: fine.map(|fine| fine.amount_paid()),
            fine_state: fine.map(|fine| {
                if fine.is_waived() {
                    "waived"
                } else if fine.is_fully_paid() {
                    "paid"
                } else {
                    "open"
                }
            }),
        })?;
    }

    // Flush to ensure all data is written
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use circulation_rs::Clock;
    use std::io::Cursor;

    const CATALOG: &str = "key,title,author,year,category\n\
                           978-0451524935,1984,George Orwell,1949,Fiction\n\
                           978-0061120084,To Kill a Mockingbird,Harper Lee,1960,Classic\n";

    fn setup() -> (Catalog, Arc<ManualClock>, NaiveDate) {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let clock = Arc::new(ManualClock::starting_on(start));
        let catalog =
            Catalog::with_config("Test", &CirculationConfig::default(), clock.clone()).unwrap();
        load_catalog(Cursor::new(CATALOG), &catalog).unwrap();
        (catalog, clock, start)
    }

    #[test]
    fn load_catalog_adds_valid_rows() {
        let (catalog, _, _) = setup();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.find_by_title("1984").unwrap().is_some());
    }

    #[test]
    fn load_catalog_skips_invalid_and_duplicate_rows() {
        let (catalog, _, _) = setup();
        let csv = "key,title,author,year,category\n\
                   978-0451524935,1984,George Orwell,1949,Fiction\n\
                   x-1,Untitled,Nobody,1999,Poetry\n\
                   x-2,,Nobody,1999,Fiction\n\
                   x-3,Dune,Frank Herbert,not-a-year,Science Fiction\n\
                   x-4,Dune,Frank Herbert,1965,Science Fiction\n";
        let added = load_catalog(Cursor::new(csv), &catalog).unwrap();
        assert_eq!(added, 1);
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn parse_commands() {
        let record = CommandRecord {
            day: 0,
            command: " BORROW ".trim().to_string(),
            title: Some("1984".to_string()),
            person: Some("Alice".to_string()),
            value: None,
        };
        assert_eq!(
            record.into_command(),
            Some(Command::Borrow {
                title: "1984".to_string(),
                person: "Alice".to_string(),
                days: None,
            })
        );

        let record = CommandRecord {
            day: 0,
            command: "pay".to_string(),
            title: Some("1984".to_string()),
            person: None,
            value: Some("not money".to_string()),
        };
        assert_eq!(record.into_command(), None);

        let record = CommandRecord {
            day: 0,
            command: "assess-all".to_string(),
            title: None,
            person: None,
            value: None,
        };
        assert_eq!(record.into_command(), Some(Command::AssessAll));
    }

    #[test]
    fn replay_overdue_fine_scenario() {
        let (catalog, clock, start) = setup();
        let commands = "day,command,title,person,value\n\
                        0,borrow,1984,Alice,1\n\
                        1,reserve,1984,Bob,\n\
                        6,assess,1984,,\n\
                        6,pay,1984,,1.50\n\
                        7,pay,1984,,100.00\n";
        replay_commands(Cursor::new(commands), &catalog, &clock, start).unwrap();

        let copy = catalog.find_by_title("1984").unwrap().unwrap();
        let fine = copy.current_fine().unwrap();
        assert_eq!(fine.amount_due(), Money::from_cents(250));
        assert_eq!(fine.amount_paid(), Money::from_cents(150));
        assert_eq!(copy.reservations(), vec!["Bob".to_string()]);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 1, 8).unwrap());
    }

    #[test]
    fn replay_skips_malformed_rows() {
        let (catalog, clock, start) = setup();
        let commands = "day,command,title,person,value\n\
                        x,borrow,1984,Alice,\n\
                        0,explode,1984,Alice,\n\
                        0,borrow,1984,,\n\
                        0,borrow,1984,Alice,\n";
        replay_commands(Cursor::new(commands), &catalog, &clock, start).unwrap();

        let copy = catalog.find_by_title("1984").unwrap().unwrap();
        assert_eq!(copy.holder().as_deref(), Some("Alice"));
        assert_eq!(copy.read_count(), 1);
    }

    #[test]
    fn replay_skips_rows_that_move_the_clock_backwards() {
        let (catalog, clock, start) = setup();
        let commands = "day,command,title,person,value\n\
                        0,borrow,1984,Alice,1\n\
                        8,assess,1984,,\n\
                        8,pay,1984,,3.50\n\
                        3,assess,1984,,\n\
                        3,borrow,To Kill a Mockingbird,Bob,\n";
        replay_commands(Cursor::new(commands), &catalog, &clock, start).unwrap();

        let copy = catalog.find_by_title("1984").unwrap().unwrap();
        let fine = copy.current_fine().unwrap();
        assert_eq!(fine.amount_due(), Money::from_cents(350));
        assert!(fine.is_fully_paid());
        assert!(catalog.find_by_title("To Kill a Mockingbird").unwrap().unwrap().is_available());
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 1, 9).unwrap());
    }

    #[test]
    fn replay_survives_an_oversized_payment() {
        let (catalog, clock, start) = setup();
        let commands = "day,command,title,person,value\n\
                        0,borrow,1984,Alice,1\n\
                        6,assess,1984,,\n\
                        6,pay,1984,,1.50\n\
                        6,pay,1984,,79228162514264337593543950335\n\
                        6,pay,1984,,792281625142643375935439503.35\n";
        replay_commands(Cursor::new(commands), &catalog, &clock, start).unwrap();

        let fine = catalog.find_by_title("1984").unwrap().unwrap().current_fine().unwrap();
        assert_eq!(fine.amount_paid(), Money::from_cents(150));
    }

    #[test]
    fn write_copies_to_csv() {
        let (catalog, clock, start) = setup();
        let commands = "day,command,title,person,value\n\
                        0,borrow,1984,Alice,1\n\
                        3,assess,1984,,\n";
        replay_commands(Cursor::new(commands), &catalog, &clock, start).unwrap();

        let mut output = Vec::new();
        write_copies(&catalog, &mut output).unwrap();
        let output = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(
            lines[0],
            "key,title,status,holder,due_date,reservations,read_count,rating,days_overdue,fine_due,fine_paid,fine_state"
        );
        assert_eq!(
            lines[1],
            "978-0061120084,To Kill a Mockingbird,available,,,,0,0.0,0,,,"
        );
        assert_eq!(
            lines[2],
            "978-0451524935,1984,held,Alice,2025-01-02,,1,0.0,2,1.00,0.00,open"
        );
    }
}
