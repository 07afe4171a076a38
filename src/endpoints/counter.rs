//! Counter-service API: one read, one write.

use serde_json::json;

use crate::api::{ApiError, MutationEndpoint, QueryEndpoint, RequestSpec, Tag};

pub const REDUCER_PATH: &str = "counterApi";
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000/api";
pub const COUNT_TAG: &str = "Count";

/// `GET {base}/count`
#[derive(Debug, Clone, Copy, Default)]
pub struct GetCount;

impl QueryEndpoint for GetCount {
    type Arg = ();
    type Output = i64;

    const NAME: &'static str = "getCount";

    fn request(&self, _arg: &()) -> RequestSpec {
        RequestSpec::get("count")
    }

    fn provides_tags(&self, _result: Option<&i64>, _error: Option<&ApiError>, _arg: &()) -> Vec<Tag> {
        vec![Tag::kind(COUNT_TAG)]
    }
}

/// `POST {base}/increment` with `{"amount": n}`; returns the new count.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncrementCount;

impl MutationEndpoint for IncrementCount {
    type Arg = i64;
    type Output = i64;

    const NAME: &'static str = "incrementCount";

    fn request(&self, amount: &i64) -> RequestSpec {
        RequestSpec::post("increment", json!({ "amount": amount }))
    }

    fn invalidates_tags(&self, _result: &i64, _amount: &i64) -> Vec<Tag> {
        vec![Tag::kind(COUNT_TAG)]
    }
}
