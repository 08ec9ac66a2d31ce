//! Field names of offer documents as served by the search API.

/// Position title. Matched against catalog areas.
pub const TITLE: &str = "cargo";
/// Area code. Matched against catalog codes.
pub const AREA_CODE: &str = "areaincumbencia";
/// Free-text area description.
pub const AREA_DESCRIPTION: &str = "descripcionarea";
pub const STATUS: &str = "estado";
pub const DISTRICT: &str = "descdistrito";
pub const LEVEL: &str = "descnivelmodalidad";
pub const SCHOOL: &str = "escuela";
pub const IGE: &str = "ige";
pub const LISTING_ID: &str = "idoferta";
pub const OFFER_TYPE: &str = "tipooferta";
/// Hours or modules of the position.
pub const HOURS: &str = "hsmodulos";
/// Closing date of the offer. Also the default sort key.
pub const CLOSING_DATE: &str = "finoferta";
/// Enrichment sub-object written by the matcher.
pub const CATEGORY_INFO: &str = "cargo_info";
