pub mod cost;
pub mod history;
pub mod patient;
pub mod query;
pub mod response;
pub mod stage;
pub mod test_result;
pub mod token_count;
