//! Read-only quotes list from dummyjson.

use serde::{Deserialize, Serialize};

use crate::api::{ApiError, QueryEndpoint, RequestSpec, Tag};

pub const REDUCER_PATH: &str = "quotesApi";
pub const DEFAULT_BASE_URL: &str = "https://dummyjson.com/quotes";
pub const QUOTES_TAG: &str = "Quotes";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: u64,
    pub quote: String,
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotesResponse {
    pub quotes: Vec<Quote>,
    pub total: u64,
    pub skip: u64,
    pub limit: u64,
}

/// `GET {base}?limit={n}`, cached per limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetQuotes;

impl QueryEndpoint for GetQuotes {
    type Arg = u32;
    type Output = QuotesResponse;

    const NAME: &'static str = "getQuotes";

    fn request(&self, limit: &u32) -> RequestSpec {
        RequestSpec::get("").param("limit", limit)
    }

    fn provides_tags(
        &self,
        _result: Option<&QuotesResponse>,
        _error: Option<&ApiError>,
        limit: &u32,
    ) -> Vec<Tag> {
        vec![Tag::with_id(QUOTES_TAG, limit)]
    }
}
