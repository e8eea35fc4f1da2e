//! Column resolution for tabular record sources
//!
//! Header names are matched case-insensitively against a short list of
//! candidates per field. A source with neither a tag column nor a key
//! column cannot produce anything and is rejected up front.

use crate::entity::EntityRecord;
use crate::error::{GraphBuildError, GraphBuildResult};
use crate::graph::{Observation, TagId};
use crate::normalize::{coerce_year, is_skip_entity, normalize, parse_timestamp_ms};
use serde::{Deserialize, Serialize};

const GENRE_COLUMNS: &[&str] = &["genres", "genre"];
const STYLE_COLUMNS: &[&str] = &["styles", "style"];
const TITLE_COLUMNS: &[&str] = &["title", "album", "record"];
const ARTIST_COLUMNS: &[&str] = &["artist", "artists"];
const YEAR_COLUMNS: &[&str] = &["release_year", "year", "released"];
const TIMESTAMP_COLUMNS: &[&str] = &["ts", "timestamp", "played_at"];

/// Which field a tag comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    Genres,
    Styles,
    Artists,
}

impl TagKind {
    /// Category name used in entity metadata
    pub fn category(&self) -> &'static str {
        match self {
            TagKind::Genres => "genres",
            TagKind::Styles => "styles",
            TagKind::Artists => "artists",
        }
    }
}

/// How entity keys are derived from a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKeyMode {
    /// One entity per artist; tags merge across all of an artist's records
    Artist,
    /// One entity per `"<title>::<artist>"`, lowercased
    Album,
}

/// Resolved column positions for one header row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSchema {
    pub genres: Option<usize>,
    pub styles: Option<usize>,
    pub title: Option<usize>,
    pub artist: Option<usize>,
    pub release_year: Option<usize>,
    pub timestamp: Option<usize>,
}

fn find_column<S: AsRef<str>>(headers: &[S], candidates: &[&str]) -> Option<usize> {
    candidates.iter().find_map(|candidate| {
        headers
            .iter()
            .position(|h| h.as_ref().trim().eq_ignore_ascii_case(candidate))
    })
}

fn cell<S: AsRef<str>>(row: &[S], column: Option<usize>) -> Option<&str> {
    column
        .and_then(|i| row.get(i))
        .map(|v| v.as_ref().trim())
        .filter(|v| !v.is_empty())
}

impl RecordSchema {
    /// Resolve field positions from a header row
    pub fn resolve<S: AsRef<str>>(headers: &[S]) -> GraphBuildResult<Self> {
        let schema = RecordSchema {
            genres: find_column(headers, GENRE_COLUMNS),
            styles: find_column(headers, STYLE_COLUMNS),
            title: find_column(headers, TITLE_COLUMNS),
            artist: find_column(headers, ARTIST_COLUMNS),
            release_year: find_column(headers, YEAR_COLUMNS),
            timestamp: find_column(headers, TIMESTAMP_COLUMNS),
        };
        if schema.genres.is_none()
            && schema.styles.is_none()
            && schema.title.is_none()
            && schema.artist.is_none()
        {
            return Err(GraphBuildError::MissingColumn(
                "genres, styles, title, artist".to_string(),
            ));
        }
        Ok(schema)
    }

    /// Check that every column needed for `kinds` exists
    pub fn require_tags(&self, kinds: &[TagKind]) -> GraphBuildResult<()> {
        for kind in kinds {
            let (present, candidates) = match kind {
                TagKind::Genres => (self.genres.is_some(), GENRE_COLUMNS),
                TagKind::Styles => (self.styles.is_some(), STYLE_COLUMNS),
                TagKind::Artists => (self.artist.is_some(), ARTIST_COLUMNS),
            };
            if !present {
                return Err(GraphBuildError::MissingColumn(candidates.join("|")));
            }
        }
        Ok(())
    }

    /// Check that the key column for `mode` exists
    pub fn require_key(&self, mode: EntityKeyMode) -> GraphBuildResult<()> {
        match mode {
            EntityKeyMode::Artist if self.artist.is_none() => {
                Err(GraphBuildError::MissingColumn(ARTIST_COLUMNS.join("|")))
            }
            EntityKeyMode::Album if self.title.is_none() => {
                Err(GraphBuildError::MissingColumn(TITLE_COLUMNS.join("|")))
            }
            _ => Ok(()),
        }
    }

    /// Pull typed fields out of one data row; short rows read as empty
    pub fn project<S: AsRef<str>>(&self, row: &[S]) -> RawRecord {
        RawRecord {
            genres: cell(row, self.genres).map(normalize).unwrap_or_default(),
            styles: cell(row, self.styles).map(normalize).unwrap_or_default(),
            title: cell(row, self.title).map(str::to_string),
            artist: cell(row, self.artist).map(str::to_string),
            release_year: cell(row, self.release_year).and_then(coerce_year),
            timestamp: cell(row, self.timestamp).and_then(parse_timestamp_ms),
        }
    }
}

/// One projected row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub genres: Vec<TagId>,
    pub styles: Vec<TagId>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub release_year: Option<i32>,
    pub timestamp: Option<i64>,
}

impl RawRecord {
    /// Tags of the requested kinds, in `kinds` order
    pub fn tags(&self, kinds: &[TagKind]) -> Vec<TagId> {
        let mut tags = Vec::new();
        for kind in kinds {
            match kind {
                TagKind::Genres => tags.extend(self.genres.iter().cloned()),
                TagKind::Styles => tags.extend(self.styles.iter().cloned()),
                TagKind::Artists => tags.extend(self.artist_tags()),
            }
        }
        tags
    }

    fn artist_tags(&self) -> Vec<TagId> {
        match self.artist.as_deref() {
            Some(artist) if !is_skip_entity(artist) => normalize(artist),
            _ => Vec::new(),
        }
    }

    /// The row as a tag co-occurrence observation
    pub fn observation(&self, kinds: &[TagKind]) -> Observation {
        Observation::new(self.tags(kinds), self.timestamp)
    }

    /// Derive an entity record, or `None` when the row has no usable key
    ///
    /// Edge tags come from `kinds`; genres and styles are always carried as
    /// categories for display and filtering.
    pub fn entity_record(&self, mode: EntityKeyMode, kinds: &[TagKind]) -> Option<EntityRecord> {
        let artist = self.artist.as_deref().unwrap_or("");
        if is_skip_entity(artist) {
            return None;
        }

        let mut record = match mode {
            EntityKeyMode::Artist => {
                if artist.is_empty() {
                    return None;
                }
                EntityRecord::new(artist, artist)
            }
            EntityKeyMode::Album => {
                let title = self.title.as_deref()?;
                let key = format!("{}::{}", title.to_lowercase(), artist.to_lowercase());
                let mut record = EntityRecord::new(key, title).with_property("artist", artist);
                if let Some(year) = self.release_year {
                    record = record.with_property("release_year", year as i64);
                }
                record
            }
        };

        // The artist filter matches the whole name, so "Earth, Wind & Fire"
        // is one value here even though it splits into two edge tags.
        let artists = Some(artist.trim().to_lowercase()).filter(|a| !a.is_empty());
        record = record
            .with_edge_tags(self.tags(kinds))
            .with_category(TagKind::Artists.category(), artists)
            .with_category(TagKind::Genres.category(), self.genres.iter().cloned())
            .with_category(TagKind::Styles.category(), self.styles.iter().cloned())
            .with_first_seen(self.timestamp);
        Some(record)
    }
}
