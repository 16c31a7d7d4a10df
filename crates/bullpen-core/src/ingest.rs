// Game log ingestion: CSV rows into an aggregated pitcher snapshot.
//
// The header is validated once up front; a missing required column aborts
// the whole ingestion with a single error message. Individual rows that
// fail to decode are skipped with a warning and never reach the error list.

use std::collections::HashMap;
use std::io::Read;

use thiserror::Error;
use tracing::{debug, warn};

use crate::dates::{parse_date, DateParseError};
use crate::pitcher::{name_key, Appearance, Pitcher, ScoredPitcher};

/// Columns every game log must carry. Extra columns are ignored.
pub const REQUIRED_COLUMNS: [&str; 5] = ["name", "team", "handedness", "date", "pitch_count"];

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Row counters for one ingestion pass. Logged, never returned to API callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub rows_read: usize,
    pub rows_accepted: usize,
    pub missing_field: usize,
    pub invalid_pitch_count: usize,
    pub invalid_date: usize,
    pub malformed: usize,
}

impl IngestStats {
    pub fn rows_skipped(&self) -> usize {
        self.missing_field + self.invalid_pitch_count + self.invalid_date + self.malformed
    }

    fn record_skip(&mut self, reason: &SkipReason) {
        match reason {
            SkipReason::MissingField(_) => self.missing_field += 1,
            SkipReason::InvalidPitchCount(_) => self.invalid_pitch_count += 1,
            SkipReason::InvalidDate(_) => self.invalid_date += 1,
            SkipReason::Malformed(_) => self.malformed += 1,
        }
    }
}

/// Every pitcher found in one game log, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pitchers: Vec<Pitcher>,
    index: HashMap<String, usize>,
    errors: Vec<String>,
    stats: IngestStats,
}

impl Snapshot {
    /// A snapshot for a missing or empty game log.
    pub fn empty() -> Self {
        Self::default()
    }

    fn schema_error(message: String) -> Self {
        Self {
            errors: vec![message],
            ..Self::default()
        }
    }

    pub fn pitchers(&self) -> &[Pitcher] {
        &self.pitchers
    }

    /// Schema-level errors. Non-empty means no pitchers were ingested.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.pitchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pitchers.is_empty()
    }

    /// Case-insensitive exact lookup by name.
    pub fn get(&self, name: &str) -> Option<&Pitcher> {
        self.index
            .get(&name_key(name))
            .map(|&i| &self.pitchers[i])
    }

    /// Score every pitcher against `reference_date`, preserving order.
    pub fn score_all(&self, reference_date: chrono::NaiveDate) -> Vec<ScoredPitcher> {
        self.pitchers
            .iter()
            .map(|p| p.score(reference_date))
            .collect()
    }

    fn record(&mut self, row: DecodedRow) {
        let key = name_key(&row.name);
        match self.index.get(&key) {
            Some(&i) => {
                let pitcher = &mut self.pitchers[i];
                pitcher.backfill_handedness(&row.handedness);
                pitcher.add_appearance(row.appearance);
            }
            None => {
                let mut pitcher = Pitcher::new(row.name, row.team, row.handedness);
                pitcher.add_appearance(row.appearance);
                self.index.insert(key, self.pitchers.len());
                self.pitchers.push(pitcher);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

/// Why a row was left out of the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("missing value for `{0}`")]
    MissingField(&'static str),

    #[error("invalid pitch_count '{0}'")]
    InvalidPitchCount(String),

    #[error(transparent)]
    InvalidDate(#[from] DateParseError),

    #[error("malformed row: {0}")]
    Malformed(String),
}

/// A fully validated game log row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRow {
    pub name: String,
    pub team: String,
    pub handedness: String,
    pub appearance: Appearance,
}

/// Result of decoding a single row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Accepted(DecodedRow),
    Skipped(SkipReason),
}

/// Positions of the required columns within the header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnMap {
    name: usize,
    team: usize,
    handedness: usize,
    date: usize,
    pitch_count: usize,
}

impl ColumnMap {
    /// Locate every required column, or return the sorted list of those missing.
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, Vec<&'static str>> {
        let position = |col: &str| headers.iter().position(|h| h == col);
        match (
            position("name"),
            position("team"),
            position("handedness"),
            position("date"),
            position("pitch_count"),
        ) {
            (Some(name), Some(team), Some(handedness), Some(date), Some(pitch_count)) => {
                Ok(Self {
                    name,
                    team,
                    handedness,
                    date,
                    pitch_count,
                })
            }
            _ => Err(missing_columns(headers)),
        }
    }

    /// Pull the required cells out of a record. Cells past the end of a
    /// short row read as empty.
    fn raw_row(&self, record: &csv::StringRecord) -> RawRow {
        let cell = |i: usize| record.get(i).unwrap_or_default().to_string();
        RawRow {
            name: cell(self.name),
            team: cell(self.team),
            handedness: cell(self.handedness),
            date: cell(self.date),
            pitch_count: cell(self.pitch_count),
        }
    }
}

/// The required cells of one row, not yet validated.
#[derive(Debug, Default)]
struct RawRow {
    name: String,
    team: String,
    handedness: String,
    date: String,
    pitch_count: String,
}

impl RawRow {
    fn decode(self) -> RowOutcome {
        let fields = [
            ("name", &self.name),
            ("team", &self.team),
            ("handedness", &self.handedness),
            ("date", &self.date),
            ("pitch_count", &self.pitch_count),
        ];
        if let Some((field, _)) = fields.iter().find(|(_, v)| v.trim().is_empty()) {
            return RowOutcome::Skipped(SkipReason::MissingField(*field));
        }

        let pitch_count = match self.pitch_count.trim().parse::<u32>() {
            Ok(pc) => pc,
            Err(_) => {
                return RowOutcome::Skipped(SkipReason::InvalidPitchCount(
                    self.pitch_count.trim().to_string(),
                ))
            }
        };

        let date = match parse_date(self.date.trim()) {
            Ok(d) => d,
            Err(e) => return RowOutcome::Skipped(e.into()),
        };

        RowOutcome::Accepted(DecodedRow {
            name: self.name.trim().to_string(),
            team: self.team.trim().to_string(),
            handedness: self.handedness.trim().to_string(),
            appearance: Appearance::new(date, pitch_count),
        })
    }
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

/// Columns from [`REQUIRED_COLUMNS`] absent from `headers`, sorted.
pub fn missing_columns(headers: &csv::StringRecord) -> Vec<&'static str> {
    let mut missing: Vec<&'static str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    missing.sort_unstable();
    missing
}

/// Ingest a game log from any reader.
pub fn ingest_reader<R: Read>(rdr: R) -> Snapshot {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(rdr);

    let headers = match reader.headers() {
        Ok(h) => h.clone(),
        Err(e) => {
            let msg = format!("failed to read CSV header: {e}");
            warn!("{msg}");
            return Snapshot::schema_error(msg);
        }
    };

    let mut records = reader.records().peekable();

    // Only a header that reads as nothing, with nothing after it, is an empty
    // log. A row of blank header cells is still checked against the schema.
    let blank_header = headers.len() <= 1 && headers.iter().all(str::is_empty);
    if blank_header && records.peek().is_none() {
        debug!("game log is empty; no pitchers ingested");
        return Snapshot::empty();
    }

    let columns = match ColumnMap::from_headers(&headers) {
        Ok(columns) => columns,
        Err(missing) => {
            let msg = format!("CSV is missing required columns: {}", missing.join(", "));
            warn!("{msg}");
            return Snapshot::schema_error(msg);
        }
    };

    let mut snapshot = Snapshot::empty();
    for (idx, result) in records.enumerate() {
        let row_num = idx + 1;
        snapshot.stats.rows_read += 1;

        let outcome = match result {
            Ok(record) => columns.raw_row(&record).decode(),
            Err(e) => RowOutcome::Skipped(SkipReason::Malformed(e.to_string())),
        };

        match outcome {
            RowOutcome::Accepted(row) => {
                snapshot.stats.rows_accepted += 1;
                snapshot.record(row);
            }
            RowOutcome::Skipped(reason) => {
                warn!("row {row_num} skipped: {reason}");
                snapshot.stats.record_skip(&reason);
            }
        }
    }

    debug!(
        "ingested {} pitchers from {} rows ({} skipped)",
        snapshot.len(),
        snapshot.stats.rows_read,
        snapshot.stats.rows_skipped()
    );
    snapshot
}

/// Ingest a game log held in memory.
pub fn ingest_str(data: &str) -> Snapshot {
    ingest_reader(data.as_bytes())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const HEADER: &str = "name,team,handedness,date,pitch_count";

    #[test]
    fn empty_source_is_not_an_error() {
        let snap = ingest_str("");
        assert!(snap.is_empty());
        assert!(!snap.has_errors());

        let snap = ingest_str("\n\n");
        assert!(snap.is_empty());
        assert!(!snap.has_errors());
    }

    #[test]
    fn blank_header_cells_are_a_schema_error() {
        let snap = ingest_str(",,,,\nAlice,Mets,R,2024-01-01,50\n");
        assert!(snap.is_empty());
        assert_eq!(
            snap.errors(),
            ["CSV is missing required columns: date, handedness, name, pitch_count, team"]
        );

        let snap = ingest_str(",,,,\n");
        assert_eq!(snap.errors().len(), 1);
    }

    #[test]
    fn header_only_yields_no_pitchers() {
        let snap = ingest_str(HEADER);
        assert!(snap.is_empty());
        assert!(!snap.has_errors());
    }

    #[test]
    fn basic_rows_are_ingested() {
        let csv_data = "\
name,team,handedness,date,pitch_count
Alice,Mets,R,2024-01-01,50
Bob,Yankees,L,2024-01-02,30";

        let snap = ingest_str(csv_data);
        assert!(!snap.has_errors());
        assert_eq!(snap.len(), 2);

        let alice = &snap.pitchers()[0];
        assert_eq!(alice.name, "Alice");
        assert_eq!(alice.team, "Mets");
        assert_eq!(alice.handedness, "R");
        assert_eq!(
            alice.appearances,
            vec![Appearance::new(date(2024, 1, 1), 50)]
        );
        assert_eq!(snap.pitchers()[1].name, "Bob");
    }

    #[test]
    fn missing_team_column_is_a_schema_error() {
        let csv_data = "\
name,handedness,date,pitch_count
Alice,R,2024-01-01,50";

        let snap = ingest_str(csv_data);
        assert!(snap.is_empty());
        assert_eq!(snap.errors().len(), 1);
        assert!(snap.errors()[0].contains("team"));
    }

    #[test]
    fn missing_columns_listed_sorted() {
        let snap = ingest_str("pitch_count,name\n50,Alice");
        assert_eq!(
            snap.errors(),
            &["CSV is missing required columns: date, handedness, team".to_string()]
        );
        assert_eq!(snap.stats().rows_read, 0);
    }

    #[test]
    fn extra_columns_and_order_are_irrelevant() {
        let csv_data = "\
pitch_count,opponent,date,name,handedness,team
44,Braves,2024-05-01,Alice,R,Mets";

        let snap = ingest_str(csv_data);
        assert!(!snap.has_errors());
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.pitchers()[0].team, "Mets");
        assert_eq!(snap.pitchers()[0].appearances[0].pitch_count, 44);
    }

    #[test]
    fn malformed_pitch_count_drops_only_that_row() {
        let csv_data = "\
name,team,handedness,date,pitch_count
Alice,Mets,R,2024-01-01,50
Bob,Yankees,L,2024-01-01,abc
Carol,Giants,R,2024-01-02,40";

        let snap = ingest_str(csv_data);
        assert!(!snap.has_errors());
        assert_eq!(snap.len(), 2);
        let total: usize = snap.pitchers().iter().map(|p| p.appearances.len()).sum();
        assert_eq!(total, 2);
        assert!(snap.get("Bob").is_none());
        assert_eq!(snap.stats().invalid_pitch_count, 1);
    }

    #[test]
    fn negative_and_fractional_pitch_counts_are_skipped() {
        let csv_data = "\
name,team,handedness,date,pitch_count
Alice,Mets,R,2024-01-01,-5
Bob,Mets,R,2024-01-01,12.5
Carol,Mets,R,2024-01-01,+7";

        let snap = ingest_str(csv_data);
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.pitchers()[0].name, "Carol");
        assert_eq!(snap.pitchers()[0].appearances[0].pitch_count, 7);
        assert_eq!(snap.stats().invalid_pitch_count, 2);
    }

    #[test]
    fn rows_with_empty_fields_are_skipped_silently() {
        let csv_data = "\
name,team,handedness,date,pitch_count
,Mets,R,2024-01-01,50
Bob,   ,L,2024-01-01,30
Carol,Giants,,2024-01-01,30
Dan,Giants,R,,30
Eve,Giants,R,2024-01-01,
Finn,Padres,L,2024-01-01,25";

        let snap = ingest_str(csv_data);
        assert!(!snap.has_errors());
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.pitchers()[0].name, "Finn");
        assert_eq!(snap.stats().missing_field, 5);
        assert_eq!(snap.stats().rows_read, 6);
    }

    #[test]
    fn short_rows_are_skipped_not_fatal() {
        let csv_data = "\
name,team,handedness,date,pitch_count
Alice,Mets,R
Bob,Yankees,L,2024-01-01,30";

        let snap = ingest_str(csv_data);
        assert!(!snap.has_errors());
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.pitchers()[0].name, "Bob");
        assert_eq!(snap.stats().missing_field, 1);
    }

    #[test]
    fn unparseable_dates_are_skipped() {
        let csv_data = "\
name,team,handedness,date,pitch_count
Alice,Mets,R,01/02/2024,50
Bob,Mets,R,2024-02-30,50
Carol,Mets,R,2024/02/03,50";

        let snap = ingest_str(csv_data);
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.pitchers()[0].appearances[0].date, date(2024, 2, 3));
        assert_eq!(snap.stats().invalid_date, 2);
    }

    #[test]
    fn whitespace_is_trimmed_everywhere() {
        let csv_data = "\
 name , team ,handedness, date ,pitch_count
  Alice  ,  Mets , R ,  2024-01-01 , 50 ";

        let snap = ingest_str(csv_data);
        assert!(!snap.has_errors());
        let alice = &snap.pitchers()[0];
        assert_eq!(alice.name, "Alice");
        assert_eq!(alice.team, "Mets");
        assert_eq!(alice.handedness, "R");
        assert_eq!(alice.appearances[0].pitch_count, 50);
    }

    #[test]
    fn repeated_names_aggregate_into_one_pitcher() {
        let csv_data = "\
name,team,handedness,date,pitch_count
Alice,Mets,R,2024-01-01,50
Bob,Yankees,L,2024-01-01,20
Alice,Mets,R,2024-01-03,30";

        let snap = ingest_str(csv_data);
        assert_eq!(snap.len(), 2);
        let alice = snap.get("Alice").unwrap();
        assert_eq!(alice.appearances.len(), 2);
        assert_eq!(
            alice.appearances,
            vec![
                Appearance::new(date(2024, 1, 1), 50),
                Appearance::new(date(2024, 1, 3), 30),
            ]
        );
        // 50 * 0.7 + 30 * 1.0
        assert_eq!(alice.score(date(2024, 1, 3)).fatigue, 65.0);
    }

    #[test]
    fn later_rows_keep_the_first_team() {
        let csv_data = "\
name,team,handedness,date,pitch_count
Alice,Mets,R,2024-01-01,50
Alice,Phillies,L,2024-01-02,30";

        let snap = ingest_str(csv_data);
        let alice = snap.get("alice").unwrap();
        assert_eq!(alice.team, "Mets");
        assert_eq!(alice.handedness, "R");
        assert_eq!(alice.appearances.len(), 2);
    }

    #[test]
    fn name_identity_ignores_case_and_keeps_first_spelling() {
        let csv_data = "\
name,team,handedness,date,pitch_count
Alice Smith,Mets,R,2024-01-01,50
ALICE SMITH,Mets,R,2024-01-02,30
Bob,Mets,R,2024-01-02,30";

        let snap = ingest_str(csv_data);
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.pitchers()[0].name, "Alice Smith");
        assert_eq!(snap.pitchers()[0].appearances.len(), 2);
        assert!(snap.get("alice smith").is_some());
        assert!(snap.get("ALICE SMITH").is_some());
        assert!(snap.get("Alice").is_none());
    }

    #[test]
    fn first_seen_order_is_preserved() {
        let csv_data = "\
name,team,handedness,date,pitch_count
Zed,Mets,R,2024-01-01,10
Amy,Mets,R,2024-01-01,10
Zed,Mets,R,2024-01-02,10
Mia,Mets,R,2024-01-01,10";

        let snap = ingest_str(csv_data);
        let names: Vec<&str> = snap.pitchers().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Zed", "Amy", "Mia"]);
    }

    #[test]
    fn column_map_finds_positions() {
        let headers = csv::StringRecord::from(vec![
            "pitch_count", "x", "date", "name", "handedness", "team",
        ]);
        let columns = ColumnMap::from_headers(&headers).unwrap();
        assert_eq!(columns.pitch_count, 0);
        assert_eq!(columns.date, 2);
        assert_eq!(columns.name, 3);
        assert_eq!(columns.handedness, 4);
        assert_eq!(columns.team, 5);

        let headers = csv::StringRecord::from(vec!["name", "date"]);
        assert_eq!(
            ColumnMap::from_headers(&headers),
            Err(vec!["handedness", "pitch_count", "team"])
        );
    }

    #[test]
    fn row_decode_reports_first_missing_field() {
        let raw = RawRow {
            name: "Alice".into(),
            team: "".into(),
            handedness: "".into(),
            date: "2024-01-01".into(),
            pitch_count: "50".into(),
        };
        assert_eq!(
            raw.decode(),
            RowOutcome::Skipped(SkipReason::MissingField("team"))
        );
    }

    #[test]
    fn row_decode_reports_date_reason() {
        let raw = RawRow {
            name: "Alice".into(),
            team: "Mets".into(),
            handedness: "R".into(),
            date: "tomorrow".into(),
            pitch_count: "50".into(),
        };
        assert_eq!(
            raw.decode(),
            RowOutcome::Skipped(SkipReason::InvalidDate(DateParseError::Format(
                "tomorrow".into()
            )))
        );
    }

    #[test]
    fn stats_account_for_every_row() {
        let csv_data = "\
name,team,handedness,date,pitch_count
Alice,Mets,R,2024-01-01,50
Bob,Mets,R,2024-01-01,x
Carol,Mets,R,nope,10
,Mets,R,2024-01-01,10
Dan,Mets,R,2024-01-01,70";

        let stats = ingest_str(csv_data).stats();
        assert_eq!(stats.rows_read, 5);
        assert_eq!(stats.rows_accepted, 2);
        assert_eq!(stats.rows_skipped(), 3);
        assert_eq!(stats.rows_read, stats.rows_accepted + stats.rows_skipped());
    }
}
