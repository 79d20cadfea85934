use chrono::{DateTime, Utc};
use serde::Serialize;

/// One `<doc>` of the FIRDS file index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexEntry {
    pub file_name: Option<String>,
    pub download_link: Option<String>,
    pub file_type: Option<String>,
    pub publication_date: Option<DateTime<Utc>>,
    pub checksum: Option<String>,
}

impl IndexEntry {
    pub(crate) fn set_field(&mut self, name: &str, value: String) {
        match name {
            "file_name" => self.file_name = Some(value),
            "download_link" => self.download_link = Some(value),
            "file_type" => self.file_type = Some(value),
            "checksum" => self.checksum = Some(value),
            "publication_date" => {
                self.publication_date = DateTime::parse_from_rfc3339(&value)
                    .ok()
                    .map(|date| date.with_timezone(&Utc));
            }
            _ => {}
        }
    }

    /// Entries without a `file_type` field match any requested type.
    pub fn matches_type(&self, file_type: &str) -> bool {
        self.file_type
            .as_deref()
            .map_or(true, |value| value.eq_ignore_ascii_case(file_type))
    }

    pub fn reference(&self) -> Option<IndexReference> {
        match (&self.file_name, &self.download_link) {
            (Some(name), Some(url)) if !name.is_empty() && !url.is_empty() => {
                Some(IndexReference {
                    archive_name: name.clone(),
                    archive_url: url.clone(),
                })
            }
            _ => None,
        }
    }
}

/// Name and download URL of the archive an index points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReference {
    pub archive_name: String,
    pub archive_url: String,
}

impl IndexReference {
    pub fn into_pair(self) -> (String, String) {
        (self.archive_name, self.archive_url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordColumn {
    Id,
    FullName,
    ClassificationType,
    CommodityDerivativeIndicator,
    NotionalCurrency,
    Issuer,
}

impl RecordColumn {
    pub const ALL: [RecordColumn; 6] = [
        RecordColumn::Id,
        RecordColumn::FullName,
        RecordColumn::ClassificationType,
        RecordColumn::CommodityDerivativeIndicator,
        RecordColumn::NotionalCurrency,
        RecordColumn::Issuer,
    ];

    pub fn canonical_name(&self) -> &'static str {
        match self {
            RecordColumn::Id => "FinInstrmGnlAttrbts.Id",
            RecordColumn::FullName => "FinInstrmGnlAttrbts.FullNm",
            RecordColumn::ClassificationType => "FinInstrmGnlAttrbts.ClssfctnTp",
            RecordColumn::CommodityDerivativeIndicator => "FinInstrmGnlAttrbts.CmmdtyDerivInd",
            RecordColumn::NotionalCurrency => "FinInstrmGnlAttrbts.NtnlCcy",
            RecordColumn::Issuer => "Issr",
        }
    }

    /// Local element name the value is read from.
    pub fn source_tag(&self) -> &'static [u8] {
        match self {
            RecordColumn::Id => b"Id",
            RecordColumn::FullName => b"FullNm",
            RecordColumn::ClassificationType => b"ClssfctnTp",
            RecordColumn::CommodityDerivativeIndicator => b"CmmdtyDerivInd",
            RecordColumn::NotionalCurrency => b"NtnlCcy",
            RecordColumn::Issuer => b"Issr",
        }
    }

    pub(crate) fn general_attribute(tag: &[u8]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .filter(|column| *column != RecordColumn::Issuer)
            .find(|column| column.source_tag() == tag)
    }
}

pub const RECORD_COLUMNS: [&str; 6] = [
    "FinInstrmGnlAttrbts.Id",
    "FinInstrmGnlAttrbts.FullNm",
    "FinInstrmGnlAttrbts.ClssfctnTp",
    "FinInstrmGnlAttrbts.CmmdtyDerivInd",
    "FinInstrmGnlAttrbts.NtnlCcy",
    "Issr",
];

/// One instrument reference record, flattened to the CSV schema.
///
/// Fields absent from the source record stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstrumentRecord {
    pub id: String,
    pub full_name: String,
    pub classification_type: String,
    pub commodity_derivative_indicator: String,
    pub notional_currency: String,
    pub issuer: String,
}

impl InstrumentRecord {
    pub fn get(&self, column: RecordColumn) -> &str {
        match column {
            RecordColumn::Id => &self.id,
            RecordColumn::FullName => &self.full_name,
            RecordColumn::ClassificationType => &self.classification_type,
            RecordColumn::CommodityDerivativeIndicator => &self.commodity_derivative_indicator,
            RecordColumn::NotionalCurrency => &self.notional_currency,
            RecordColumn::Issuer => &self.issuer,
        }
    }

    pub(crate) fn field_mut(&mut self, column: RecordColumn) -> &mut String {
        match column {
            RecordColumn::Id => &mut self.id,
            RecordColumn::FullName => &mut self.full_name,
            RecordColumn::ClassificationType => &mut self.classification_type,
            RecordColumn::CommodityDerivativeIndicator => &mut self.commodity_derivative_indicator,
            RecordColumn::NotionalCurrency => &mut self.notional_currency,
            RecordColumn::Issuer => &mut self.issuer,
        }
    }
}
