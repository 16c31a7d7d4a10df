// Filtering, sorting and truncation of scored pitchers.
//
// Parameter validation is deliberately uneven and pinned by tests: an
// unknown `sort` key is rejected while an unknown `order` falls back to
// descending, and a negative `limit` is ignored while a non-integer one is
// rejected.

use std::cmp::Ordering;
use std::num::IntErrorKind;

use chrono::NaiveDate;
use thiserror::Error;

use crate::ingest::Snapshot;
use crate::pitcher::ScoredPitcher;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("{param} must be numeric")]
    NotNumeric { param: &'static str },

    #[error("sort must be one of 'fatigue', 'name', or 'team'")]
    InvalidSort { value: String },

    #[error("limit must be an integer")]
    InvalidLimit { value: String },
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Raw list parameters as they arrive on the query string.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub team: Option<String>,
    pub min_fatigue: Option<String>,
    pub max_fatigue: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub limit: Option<String>,
}

impl ListParams {
    /// Collect parameters from decoded query pairs. The first occurrence of a
    /// repeated key wins; unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "team" => &mut params.team,
                "min_fatigue" => &mut params.min_fatigue,
                "max_fatigue" => &mut params.max_fatigue,
                "sort" => &mut params.sort,
                "order" => &mut params.order,
                "limit" => &mut params.limit,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        params
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Fatigue,
    Name,
    Team,
}

impl SortKey {
    /// Exact, case-sensitive key names.
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        match raw {
            "fatigue" => Ok(SortKey::Fatigue),
            "name" => Ok(SortKey::Name),
            "team" => Ok(SortKey::Team),
            other => Err(QueryError::InvalidSort {
                value: other.to_string(),
            }),
        }
    }

    fn compare(&self, a: &ScoredPitcher, b: &ScoredPitcher) -> Ordering {
        match self {
            SortKey::Fatigue => a.fatigue.total_cmp(&b.fatigue),
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::Team => a.team.cmp(&b.team),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// `asc` in any case selects ascending; anything else is descending.
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("asc") {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        }
    }
}

/// A validated list query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    /// Lowercased team substring.
    pub team: Option<String>,
    pub min_fatigue: Option<f64>,
    pub max_fatigue: Option<f64>,
    pub sort: SortKey,
    pub order: SortOrder,
    pub limit: Option<usize>,
}

/// Treat an empty parameter the same as an absent one.
fn present(param: &Option<String>) -> Option<&str> {
    param.as_deref().filter(|s| !s.is_empty())
}

fn is_overflow(kind: &IntErrorKind) -> bool {
    matches!(kind, IntErrorKind::PosOverflow | IntErrorKind::NegOverflow)
}

fn parse_bound(param: &Option<String>, name: &'static str) -> Result<Option<f64>, QueryError> {
    present(param)
        .map(|s| {
            s.trim()
                .parse::<f64>()
                .map_err(|_| QueryError::NotNumeric { param: name })
        })
        .transpose()
}

impl Query {
    /// Validate raw parameters. Errors are reported in the order
    /// `min_fatigue`, `max_fatigue`, `sort`, `limit`.
    pub fn from_params(params: &ListParams) -> Result<Self, QueryError> {
        let team = params
            .team
            .as_deref()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty());

        let min_fatigue = parse_bound(&params.min_fatigue, "min_fatigue")?;
        let max_fatigue = parse_bound(&params.max_fatigue, "max_fatigue")?;

        let sort = match params.sort.as_deref() {
            Some(raw) => SortKey::parse(raw)?,
            None => SortKey::Fatigue,
        };

        let order = params
            .order
            .as_deref()
            .map(SortOrder::parse)
            .unwrap_or_default();

        let limit = match present(&params.limit) {
            // Negative limits parse fine and are then ignored. An integer
            // too large to represent cannot truncate anything.
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(n) => usize::try_from(n).ok(),
                Err(e) if is_overflow(e.kind()) => None,
                Err(_) => {
                    return Err(QueryError::InvalidLimit {
                        value: raw.to_string(),
                    })
                }
            },
            None => None,
        };

        Ok(Self {
            team,
            min_fatigue,
            max_fatigue,
            sort,
            order,
            limit,
        })
    }

    /// Filter, stable-sort and truncate `rows`.
    pub fn apply(&self, mut rows: Vec<ScoredPitcher>) -> Vec<ScoredPitcher> {
        if let Some(team) = &self.team {
            rows.retain(|r| r.team.to_lowercase().contains(team.as_str()));
        }
        if let Some(min) = self.min_fatigue {
            rows.retain(|r| r.fatigue >= min);
        }
        if let Some(max) = self.max_fatigue {
            rows.retain(|r| r.fatigue <= max);
        }

        // `sort_by` is stable; reversing the comparator keeps ties in
        // first-seen order for descending sorts too.
        let key = self.sort;
        match self.order {
            SortOrder::Asc => rows.sort_by(|a, b| key.compare(a, b)),
            SortOrder::Desc => rows.sort_by(|a, b| key.compare(a, b).reverse()),
        }

        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }
        rows
    }

    /// Score a snapshot and apply this query to it.
    pub fn run(&self, snapshot: &Snapshot, reference_date: NaiveDate) -> Vec<ScoredPitcher> {
        self.apply(snapshot.score_all(reference_date))
    }
}

/// Case-insensitive exact lookup of a single scored pitcher.
pub fn find_by_name(
    snapshot: &Snapshot,
    name: &str,
    reference_date: NaiveDate,
) -> Option<ScoredPitcher> {
    snapshot.get(name).map(|p| p.score(reference_date))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
